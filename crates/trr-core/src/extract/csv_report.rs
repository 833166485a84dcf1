//! Delimited reports: header row, one row per test.

use serde_json::{Map, Value};
use tracing::debug;

use super::map::ResultMap;
use super::record::ResultRecord;
use crate::error::{ReporterError, Result};

/// Summary row emitted by load-test tools; not a test.
const AGGREGATED: &str = "Aggregated";

pub fn extract_csv(content: &str, map: &ResultMap, attrs: &Map<String, Value>) -> Result<Vec<ResultRecord>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| ReporterError::report(format!("malformed CSV header: {}", e)))?
        .clone();

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|e| ReporterError::report(format!("malformed CSV row {}: {}", line + 1, e)))?;

        let mut fields = attrs.clone();
        for spec in &map.fields {
            if let Some(value) = spec.evaluate_row(&headers, &row)? {
                fields.insert(spec.name.clone(), value);
            }
        }

        if fields.get("test_id").and_then(Value::as_str) == Some(AGGREGATED) {
            debug!(row = line + 1, "dropping aggregated row");
            continue;
        }
        records.push(ResultRecord::from_fields(fields)?);
    }
    Ok(records)
}
