//! Integration tests for the synchronization engine.
//!
//! TestRail is mocked with wiremock. Every call goes through
//! `/index.php?/api/v2/<method>`, so mocks match on the query string.

use serde_json::{json, Map, Value};
use trr_client::{ClientConfig, TestRailClient};
use trr_core::config::{self, CustomFieldList};
use trr_core::extract::{self, Reference, ResultBucket, ResultRecord, StatusRef, TestCaseRecord};
use trr_core::{CasePolicy, ConfigSelection, EntityKind, ProjectContext, PublishOptions, Reporter, ReporterError};
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="suite" tests="2" failures="1">
  <testcase classname="suite" name="Case1" time="0.10"/>
  <testcase classname="suite" name="Case2" time="0.20"><failure message="x">AssertionError: x</failure></testcase>
</testsuite>"#;

fn api(uri: &'static str) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |req: &Request| req.url.query() == Some(&format!("/api/v2/{}", uri)[..])
}

fn create_test_client(mock_server: &MockServer) -> TestRailClient {
    let config = ClientConfig::default()
        .with_url(mock_server.uri())
        .with_credentials("user", "pass")
        .with_retry_timeout(0);
    TestRailClient::new(config).expect("failed to create client")
}

fn project_context() -> ProjectContext {
    let project = serde_json::from_value(json!({"id": 1, "name": "Cloud"})).unwrap();
    ProjectContext::new(project)
        .with_statuses(
            serde_json::from_value(json!([
                {"id": 1, "name": "passed", "label": "Passed"},
                {"id": 3, "name": "untested", "label": "Untested"},
                {"id": 5, "name": "failed", "label": "Failed"}
            ]))
            .unwrap(),
        )
        .with_case_types(serde_json::from_value(json!([{"id": 1, "name": "Automated"}])).unwrap())
        .with_priorities(serde_json::from_value(json!([{"id": 4, "name": "Medium"}])).unwrap())
        .with_case_fields(
            serde_json::from_value(json!([{
                "id": 2,
                "system_name": "custom_qa_team",
                "configs": [{"options": {"items": "1, Core\n2, Network"}}]
            }]))
            .unwrap(),
        )
        .with_configurations(
            serde_json::from_value(json!([
                {"id": 1, "name": "Operating System", "configs": [{"id": 4, "name": "Ubuntu"}]}
            ]))
            .unwrap(),
        )
}

async fn mount_get(mock_server: &MockServer, uri: &'static str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(api(uri))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(mock_server)
        .await;
}

async fn mount_existing_run(mock_server: &MockServer) {
    mount_get(mock_server, "get_suites/1", json!([{"id": 2, "name": "Tempest"}])).await;
    mount_get(
        mock_server,
        "get_plans/1",
        json!({"_links": {"next": null}, "plans": [{"id": 7, "name": "Nightly", "milestone_id": null}]}),
    )
    .await;
    mount_get(
        mock_server,
        "get_plan/7",
        json!({
            "id": 7,
            "name": "Nightly",
            "entries": [{
                "id": "e-1",
                "name": "Smoke",
                "runs": [{"id": 30, "name": "Smoke", "config_ids": [], "url": "https://tr.local/index.php?/runs/view/30"}]
            }]
        }),
    )
    .await;
    mount_get(
        mock_server,
        "get_tests/30",
        json!({"_links": {"next": null}, "tests": [
            {"id": 301, "title": "suite.Case1", "case_id": 11},
            {"id": 302, "title": "suite.Case2", "case_id": 12}
        ]}),
    )
    .await;
}

fn parse_report() -> ResultBucket {
    let map = config::builtin_result_map("tempest").unwrap();
    extract::parse_results(extract::ReportKind::Xml, REPORT, &map, &Map::new()).unwrap()
}

#[tokio::test]
async fn test_fetch_project_context() {
    let mock_server = MockServer::start().await;
    mount_get(
        &mock_server,
        "get_projects",
        json!({"_links": {"next": null}, "projects": [{"id": 3, "name": "Other"}, {"id": 1, "name": "Cloud"}]}),
    )
    .await;
    mount_get(
        &mock_server,
        "get_milestones/1&is_completed=0",
        json!({"_links": {"next": null}, "milestones": [{"id": 10, "name": "24.1"}]}),
    )
    .await;
    mount_get(&mock_server, "get_statuses", json!([{"id": 5, "name": "failed", "label": "Failed"}])).await;
    mount_get(&mock_server, "get_case_types", json!([{"id": 1, "name": "Automated"}])).await;
    mount_get(&mock_server, "get_priorities", json!([{"id": 4, "name": "Medium"}])).await;
    mount_get(&mock_server, "get_case_fields", json!([])).await;
    mount_get(
        &mock_server,
        "get_configs/1",
        json!([{"id": 1, "name": "Operating System", "configs": [{"id": 4, "name": "Ubuntu"}]}]),
    )
    .await;

    let client = create_test_client(&mock_server);
    let context = ProjectContext::fetch(&client, "Cloud").await.expect("fetch failed");

    assert_eq!(context.project_id(), 1);
    assert_eq!(context.status_id("Failed").unwrap(), 5);
    assert_eq!(context.milestone_id("24.1").unwrap(), 10);
    assert_eq!(context.priority_id("Medium").unwrap(), 4);

    let err = ProjectContext::fetch(&client, "Missing").await.unwrap_err();
    assert!(matches!(err, ReporterError::NotFound { kind: EntityKind::Project, .. }));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_publish_into_existing_run() {
    let mock_server = MockServer::start().await;
    mount_existing_run(&mock_server).await;

    Mock::given(method("POST"))
        .and(api("update_plan_entry/7/e-1"))
        .and(body_json(json!({"include_all": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "e-1", "name": "Smoke"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(api("add_results/30"))
        .and(body_json(json!({"results": [
            {"test_id": 301, "status_id": 1},
            {"test_id": 302, "status_id": 5, "comment": "AssertionError: x"}
        ]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reporter = Reporter::new(&client, project_context());
    let options = PublishOptions::new("Nightly", "Tempest", "Smoke").update_existing(true);

    let summary = reporter.publish_results(parse_report(), &options).await.expect("publish failed");
    assert_eq!(summary.plan_id, 7);
    assert_eq!(summary.run_id, 30);
    assert!(!summary.run_created);
    assert_eq!(summary.submitted, 2);
    assert_eq!(summary.batches, 1);
    assert_eq!(summary.pruned, None);
}

#[tokio::test]
async fn test_publish_existing_run_conflicts() {
    let mock_server = MockServer::start().await;
    mount_existing_run(&mock_server).await;

    Mock::given(method("POST"))
        .and(api("add_results/30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reporter = Reporter::new(&client, project_context());
    let options = PublishOptions::new("Nightly", "Tempest", "Smoke");

    let err = reporter.publish_results(parse_report(), &options).await.unwrap_err();
    match &err {
        ReporterError::Conflict { message } => assert!(message.contains("runs/view/30"), "{}", message),
        other => panic!("expected conflict, got {:?}", other),
    }
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_publish_finds_run_past_first_of_entry() {
    let mock_server = MockServer::start().await;
    mount_get(&mock_server, "get_suites/1", json!([{"id": 2, "name": "Tempest"}])).await;
    mount_get(
        &mock_server,
        "get_plans/1",
        json!({"_links": {"next": null}, "plans": [{"id": 7, "name": "Nightly"}]}),
    )
    .await;
    mount_get(
        &mock_server,
        "get_plan/7",
        json!({
            "id": 7,
            "name": "Nightly",
            "entries": [{
                "id": "e-1",
                "name": "Smoke",
                "runs": [
                    {"id": 31, "name": "Smoke", "config_ids": [2], "url": "https://tr.local/index.php?/runs/view/31"},
                    {"id": 32, "name": "Smoke", "config_ids": [4], "url": "https://tr.local/index.php?/runs/view/32"}
                ]
            }]
        }),
    )
    .await;
    Mock::given(method("POST"))
        .and(api("add_plan_entry/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "e-2", "name": "Smoke"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reporter = Reporter::new(&client, project_context());
    let configuration: ConfigSelection = [("Operating System".to_string(), "Ubuntu".to_string())]
        .into_iter()
        .collect();
    let options = PublishOptions::new("Nightly", "Tempest", "Smoke").with_configuration(configuration);

    let err = reporter.publish_results(parse_report(), &options).await.unwrap_err();
    match &err {
        ReporterError::Conflict { message } => assert!(message.contains("runs/view/32"), "{}", message),
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_publish_unknown_test_aborts() {
    let mock_server = MockServer::start().await;
    mount_existing_run(&mock_server).await;
    Mock::given(method("POST"))
        .and(api("update_plan_entry/7/e-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "e-1", "name": "Smoke"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(api("add_results/30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reporter = Reporter::new(&client, project_context());
    let options = PublishOptions::new("Nightly", "Tempest", "Smoke").update_existing(true);
    let mut bucket = parse_report();
    bucket.normal.push(ResultRecord::new("suite.Case9", StatusRef::label("passed")));

    let err = reporter.publish_results(bucket, &options).await.unwrap_err();
    assert!(matches!(err, ReporterError::NotFound { kind: EntityKind::Test, ref name } if name == "suite.Case9"));
}

#[tokio::test]
async fn test_publish_creates_plan_and_run_then_prunes() {
    let mock_server = MockServer::start().await;
    mount_get(&mock_server, "get_suites/1", json!([{"id": 2, "name": "Tempest"}])).await;
    mount_get(&mock_server, "get_plans/1", json!({"_links": {"next": null}, "plans": []})).await;

    Mock::given(method("POST"))
        .and(api("add_plan/1"))
        .and(body_partial_json(json!({"name": "Nightly"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 8, "name": "Nightly", "entries": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(api("add_plan_entry/8"))
        .and(body_partial_json(json!({"suite_id": 2, "name": "Smoke", "config_ids": [4]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "e-9",
            "name": "Smoke",
            "runs": [{"id": 31, "name": "Smoke", "config_ids": [4]}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_get(
        &mock_server,
        "get_tests/31",
        json!({"_links": {"next": null}, "tests": [
            {"id": 311, "title": "suite.Case1", "case_id": 11},
            {"id": 312, "title": "suite.Case2", "case_id": 12},
            {"id": 313, "title": "suite.Case3", "case_id": 13}
        ]}),
    )
    .await;

    // One result per call with a one-byte limit.
    Mock::given(method("POST"))
        .and(api("add_results/31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&mock_server)
        .await;

    mount_get(
        &mock_server,
        "get_tests/31&status_id=1,5",
        json!({"_links": {"next": null}, "tests": [
            {"id": 311, "title": "suite.Case1", "case_id": 11},
            {"id": 312, "title": "suite.Case2", "case_id": 12}
        ]}),
    )
    .await;

    Mock::given(method("POST"))
        .and(api("update_plan_entry/8/e-9"))
        .and(body_json(json!({"include_all": false, "case_ids": [11, 12], "config_ids": [4]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "e-9", "name": "Smoke"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reporter = Reporter::new(&client, project_context());
    let configuration: ConfigSelection = [("Operating System".to_string(), "Ubuntu".to_string())]
        .into_iter()
        .collect();
    let options = PublishOptions::new("Nightly", "Tempest", "Smoke")
        .with_configuration(configuration)
        .remove_untested(true)
        .with_payload_limit(1);

    let summary = reporter.publish_results(parse_report(), &options).await.expect("publish failed");
    assert!(summary.run_created);
    assert_eq!(summary.run_id, 31);
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.pruned, Some(1));
}

#[tokio::test]
async fn test_publish_folds_teardown_and_fans_out_setup() {
    let mock_server = MockServer::start().await;
    mount_existing_run(&mock_server).await;
    Mock::given(method("GET"))
        .and(api("get_tests/30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_links": {"next": null}, "tests": [
            {"id": 301, "title": "suite.Case1"},
            {"id": 303, "title": "other.Images.test_a"},
            {"id": 304, "title": "other.Images.test_b"}
        ]})))
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(api("update_plan_entry/7/e-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "e-1", "name": "Smoke"})))
        .mount(&mock_server)
        .await;

    let folded = "ok\n=================================\nSome TearDown actions are failed:\n\
                  =================================\ncleanup failed";
    Mock::given(method("POST"))
        .and(api("add_results/30"))
        .and(body_json(json!({"results": [
            {"test_id": 301, "status_id": 1, "comment": folded},
            {"test_id": 303, "status_id": 5, "comment": "setUpClass failed"},
            {"test_id": 304, "status_id": 5, "comment": "setUpClass failed"}
        ]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let bucket = ResultBucket {
        normal: vec![ResultRecord::new("suite.Case1", StatusRef::label("passed")).with_comment("ok")],
        setup: vec![ResultRecord::new("other.Images", StatusRef::label("failed")).with_comment("setUpClass failed")],
        teardown: vec![ResultRecord::new("suite", StatusRef::label("failed")).with_comment("cleanup failed")],
    };

    let client = create_test_client(&mock_server);
    let reporter = Reporter::new(&client, project_context());
    let options = PublishOptions::new("Nightly", "Tempest", "Smoke").update_existing(true);

    let summary = reporter.publish_results(bucket, &options).await.expect("publish failed");
    assert_eq!(summary.submitted, 3);
}

fn case(title: &str, section: &str) -> TestCaseRecord {
    let mut case = TestCaseRecord::new(title).with_section(Reference::name(section));
    case.type_id = Some(Reference::name("Automated"));
    case.priority_id = Some(Reference::name("Medium"));
    case.fields.insert("custom_qa_team".into(), json!("Network"));
    case
}

async fn mount_suite(mock_server: &MockServer, existing_cases: Value) {
    mount_get(mock_server, "get_suites/1", json!([{"id": 2, "name": "Tempest"}])).await;
    mount_get(mock_server, "get_cases/1&suite_id=2", existing_cases).await;
    mount_get(
        mock_server,
        "get_sections/1&suite_id=2",
        json!({"_links": {"next": null}, "sections": [{"id": 3, "name": "Other"}]}),
    )
    .await;
}

#[tokio::test]
async fn test_update_suite_creates_missing_cases() {
    let mock_server = MockServer::start().await;
    mount_suite(&mock_server, json!({"_links": {"next": null}, "cases": []})).await;

    Mock::given(method("POST"))
        .and(api("add_section/1"))
        .and(body_json(json!({"suite_id": 2, "name": "Neutron"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5, "name": "Neutron"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(api("add_case/5"))
        .and(body_json(json!({
            "title": "tempest.api.network.test_ports",
            "type_id": 1,
            "priority_id": 4,
            "custom_qa_team": 2
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 100, "title": "tempest.api.network.test_ports", "section_id": 5})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(api("add_case/3"))
        .and(body_partial_json(json!({"title": "tempest.api.misc.test_misc"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 101, "title": "tempest.api.misc.test_misc", "section_id": 3})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reporter = Reporter::new(&client, project_context()).with_custom_fields(CustomFieldList {
        attributes2id: vec!["custom_qa_team".to_string()],
    });
    let cases = vec![
        case("tempest.api.network.test_ports", "Neutron"),
        case("tempest.api.misc.test_misc", "Other"),
        // Same title twice in the list: created once.
        case("tempest.api.network.test_ports", "Neutron"),
    ];

    let summary = reporter
        .update_test_suite("Tempest", cases, CasePolicy::CreateMissing)
        .await
        .expect("update failed");
    assert_eq!(summary.suite_id, 2);
    assert!(!summary.suite_created);
    assert_eq!(summary.sections_created, 1);
    assert_eq!(summary.cases_created, 2);
    assert_eq!(summary.cases_skipped, 1);
}

#[tokio::test]
async fn test_update_suite_second_run_creates_nothing() {
    let mock_server = MockServer::start().await;
    mount_suite(
        &mock_server,
        json!({"_links": {"next": null}, "cases": [
            {"id": 100, "title": "tempest.api.network.test_ports", "section_id": 5},
            {"id": 101, "title": "tempest.api.misc.test_misc", "section_id": 3}
        ]}),
    )
    .await;

    for uri in ["add_section/1", "add_case/3", "add_case/5"] {
        Mock::given(method("POST"))
            .and(api(uri))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&mock_server)
            .await;
    }

    let client = create_test_client(&mock_server);
    let reporter = Reporter::new(&client, project_context());
    let cases = vec![
        case("tempest.api.network.test_ports", "Neutron"),
        case("tempest.api.misc.test_misc", "Other"),
    ];

    let summary = reporter
        .update_test_suite("Tempest", cases, CasePolicy::CreateMissing)
        .await
        .expect("update failed");
    assert_eq!(summary.cases_created, 0);
    assert_eq!(summary.cases_skipped, 2);
}

#[tokio::test]
async fn test_update_suite_sends_only_changed_fields() {
    let mock_server = MockServer::start().await;
    mount_suite(
        &mock_server,
        json!({"_links": {"next": null}, "cases": [
            {"id": 100, "title": "a.test_one", "section_id": 3, "type_id": 1, "priority_id": 2, "custom_qa_team": 2},
            {"id": 101, "title": "a.test_two", "section_id": 3, "type_id": 1, "priority_id": 4, "custom_qa_team": 2}
        ]}),
    )
    .await;

    Mock::given(method("POST"))
        .and(api("update_case/100"))
        .and(body_json(json!({"priority_id": 4})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 100, "title": "a.test_one"})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(api("update_case/101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 101, "title": "a.test_two"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reporter = Reporter::new(&client, project_context()).with_custom_fields(CustomFieldList {
        attributes2id: vec!["custom_qa_team".to_string()],
    });
    let cases = vec![case("a.test_one", "Other"), case("a.test_two", "Other")];

    let summary = reporter
        .update_test_suite("Tempest", cases, CasePolicy::UpdateChanged)
        .await
        .expect("update failed");
    assert_eq!(summary.cases_updated, 1);
    assert_eq!(summary.cases_skipped, 1);
    assert_eq!(summary.cases_created, 0);
}

#[tokio::test]
async fn test_update_suite_unknown_priority_aborts() {
    let mock_server = MockServer::start().await;
    mount_suite(&mock_server, json!({"_links": {"next": null}, "cases": []})).await;
    Mock::given(method("POST"))
        .and(api("add_case/3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reporter = Reporter::new(&client, project_context());
    let mut bad = case("a.test_one", "Other");
    bad.priority_id = Some(Reference::name("Critical"));

    let err = reporter
        .update_test_suite("Tempest", vec![bad], CasePolicy::CreateMissing)
        .await
        .unwrap_err();
    assert!(matches!(err, ReporterError::NotFound { kind: EntityKind::Priority, .. }));
}
