//! Routing of raw records into normal/setup/teardown buckets.

use tracing::debug;

use super::map::FilterRule;
use super::record::{BucketKind, ResultBucket, ResultRecord};
use crate::error::{ReporterError, Result};

/// Partition `records`. The first rule whose pattern matches the start of
/// `test_id` wins; the record's `test_id` is rewritten by the rule's actions
/// and its status optionally overridden. Unmatched records stay normal.
pub fn classify(records: Vec<ResultRecord>, rules: &[FilterRule]) -> Result<ResultBucket> {
    let mut bucket = ResultBucket::default();
    for mut record in records {
        let Some(rule) = rules.iter().find(|r| r.pattern.is_match(&record.test_id)) else {
            bucket.push(BucketKind::Normal, record);
            continue;
        };

        if !rule.actions.is_empty() {
            let rewritten = rule
                .actions
                .evaluate_text(&record.test_id)?
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ReporterError::field_missed("test_id"))?;
            debug!(from = %record.test_id, to = %rewritten, kind = ?rule.kind, "record reclassified");
            record.test_id = rewritten;
        }
        if let Some(status) = &rule.status {
            record.status = status.clone();
        }
        bucket.push(rule.kind, record);
    }
    Ok(bucket)
}
