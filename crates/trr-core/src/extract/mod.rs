//! Extraction pipeline: report file -> raw records -> classified bucket.

mod classify;
mod csv_report;
mod map;
mod record;
mod testlist;
mod xml_report;

use std::path::Path;

use serde_json::{Map, Value};
use tracing::info;

use crate::error::{ReporterError, Result};

pub use classify::classify;
pub use csv_report::extract_csv;
pub use map::{CaseMap, ConvertType, FieldSource, FieldSpec, FilterRule, ResultMap};
pub use record::{BucketKind, Reference, ResultBucket, ResultRecord, StatusRef, TestCaseRecord};
pub use testlist::parse_test_list;
pub use xml_report::extract_xml;

pub(crate) use map::yaml_to_json;

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Xml,
    Csv,
}

impl ReportKind {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if ext.eq_ignore_ascii_case("xml") {
            Ok(Self::Xml)
        } else if ext.eq_ignore_ascii_case("csv") {
            Ok(Self::Csv)
        } else {
            Err(ReporterError::report(format!(
                "unsupported report type: {}",
                path.display()
            )))
        }
    }
}

/// Extract and classify records from report content.
pub fn parse_results(
    kind: ReportKind,
    content: &str,
    map: &ResultMap,
    attrs: &Map<String, Value>,
) -> Result<ResultBucket> {
    let records = match kind {
        ReportKind::Xml => extract_xml(content, map, attrs)?,
        ReportKind::Csv => extract_csv(content, map, attrs)?,
    };
    classify(records, &map.filters)
}

/// Read a report file and extract its results.
pub fn extract_results(path: &Path, map: &ResultMap, attrs: &Map<String, Value>) -> Result<ResultBucket> {
    let kind = ReportKind::from_path(path)?;
    let content = read_file(path)?;
    let bucket = parse_results(kind, &content, map, attrs)?;
    info!(
        report = %path.display(),
        normal = bucket.normal.len(),
        setup = bucket.setup.len(),
        teardown = bucket.teardown.len(),
        "report parsed"
    );
    Ok(bucket)
}

/// Read a test list file and build case records.
pub fn load_test_list(path: &Path, map: &CaseMap, attrs: &Map<String, Value>) -> Result<Vec<TestCaseRecord>> {
    let content = read_file(path)?;
    let cases = parse_test_list(&content, map, attrs)?;
    info!(list = %path.display(), cases = cases.len(), "test list parsed");
    Ok(cases)
}

pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ReporterError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_report_kind_from_extension() {
        assert_eq!(ReportKind::from_path(Path::new("report.xml")).unwrap(), ReportKind::Xml);
        assert_eq!(ReportKind::from_path(Path::new("stats.CSV")).unwrap(), ReportKind::Csv);
        let err = ReportKind::from_path(Path::new("report.json")).unwrap_err();
        assert!(matches!(err, ReporterError::Report { .. }));
    }

    #[test]
    fn test_extract_results_from_file() {
        let map = ResultMap::from_yaml_str(
            "test_id:\n  xml_actions: [{get_attribute: name}]\nstatus_id:\n  default: passed\n",
        )
        .unwrap();
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        write!(file, r#"<testsuite><testcase name="a"/><testcase name="b"/></testsuite>"#).unwrap();

        let bucket = extract_results(file.path(), &map, &Map::new()).unwrap();
        assert_eq!(bucket.normal.len(), 2);
        assert!(bucket.setup.is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let map = ResultMap::from_yaml_str(
            "test_id:\n  xml_actions: [{get_attribute: name}]\nstatus_id:\n  default: passed\n",
        )
        .unwrap();
        let err = extract_results(Path::new("/nonexistent/report.xml"), &map, &Map::new()).unwrap_err();
        assert!(matches!(err, ReporterError::Io { .. }));
    }
}
