//! JUnit-style XML reports: `<testsuites>` or a single `<testsuite>` root.

use serde_json::{Map, Value};
use tracing::warn;

use super::map::ResultMap;
use super::record::ResultRecord;
use crate::actions::ReportNode;
use crate::error::{ReporterError, Result};

const SUITES: &str = "testsuites";
const SUITE: &str = "testsuite";

pub fn extract_xml(content: &str, map: &ResultMap, attrs: &Map<String, Value>) -> Result<Vec<ResultRecord>> {
    let doc = roxmltree::Document::parse(content)
        .map_err(|e| ReporterError::report(format!("malformed XML report: {}", e)))?;
    let root = doc.root_element();

    let mut records = Vec::new();
    match root.tag() {
        SUITES => {
            for suite in root.child_elements() {
                if suite.tag() != SUITE {
                    warn!(tag = suite.tag(), "expected <testsuite>, skipping element");
                    continue;
                }
                process_suite(&suite, map, attrs, &mut records)?;
            }
        }
        SUITE => process_suite(&root, map, attrs, &mut records)?,
        other => {
            return Err(ReporterError::report(format!(
                "expected <{}> or <{}> root, got <{}>",
                SUITES, SUITE, other
            )))
        }
    }
    Ok(records)
}

fn process_suite<N: ReportNode>(
    suite: &N,
    map: &ResultMap,
    attrs: &Map<String, Value>,
    out: &mut Vec<ResultRecord>,
) -> Result<()> {
    for child in suite.child_elements() {
        if child.tag() == SUITE {
            process_suite(&child, map, attrs, out)?;
            continue;
        }
        if child.tag() != map.tc_tag {
            warn!(tag = child.tag(), expected = %map.tc_tag, "skipping non-testcase element");
            continue;
        }
        out.push(build_record(&child, map, attrs)?);
    }
    Ok(())
}

fn build_record<N: ReportNode>(node: &N, map: &ResultMap, attrs: &Map<String, Value>) -> Result<ResultRecord> {
    let mut fields = attrs.clone();
    for spec in &map.fields {
        if let Some(value) = spec.evaluate_node(node)? {
            fields.insert(spec.name.clone(), value);
        }
    }
    ResultRecord::from_fields(fields)
}
