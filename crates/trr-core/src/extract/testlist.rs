//! Test lists: one test name per line, turned into case records.

use serde_json::{Map, Value};

use super::map::CaseMap;
use super::record::TestCaseRecord;
use crate::error::Result;

/// Build case records from a newline-separated list. Lines are sorted and
/// blank lines ignored. Each case starts from `attrs`; every mapped field
/// that evaluates to a value overrides it.
pub fn parse_test_list(content: &str, map: &CaseMap, attrs: &Map<String, Value>) -> Result<Vec<TestCaseRecord>> {
    let mut lines: Vec<&str> = content
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect();
    lines.sort_unstable();

    lines
        .into_iter()
        .map(|line| {
            let mut fields = attrs.clone();
            for spec in &map.fields {
                if let Some(value) = spec.evaluate_text(line)? {
                    fields.insert(spec.name.clone(), value);
                }
            }
            TestCaseRecord::from_fields(fields)
        })
        .collect()
}
