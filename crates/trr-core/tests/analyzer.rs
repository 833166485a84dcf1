//! Integration tests for the known-issue analyzer.

use serde_json::json;
use trr_client::{ClientConfig, TestRailClient};
use trr_core::analyzer::ANALYZER_COMMENT;
use trr_core::{Analyzer, CheckList, ConfigSelection, EntityKind, ProjectContext, ReporterError, RunSelector};
use wiremock::matchers::{body_json, method};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

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
                {"id": 5, "name": "failed", "label": "Failed"},
                {"id": 8, "name": "known_issue", "label": "Known Issue"},
                {"id": 9, "name": "product_failed", "label": "Product Failed"}
            ]))
            .unwrap(),
        )
        .with_configurations(
            serde_json::from_value(json!([
                {"id": 1, "name": "Operating System", "configs": [{"id": 4, "name": "Ubuntu"}]},
                {"id": 2, "name": "Deployment", "configs": [{"id": 2, "name": "HA"}]}
            ]))
            .unwrap(),
        )
}

async fn mount_failed_run(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(api("get_runs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": {"next": null},
            "runs": [{"id": 39, "name": "Full"}, {"id": 40, "name": "Smoke"}]
        })))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(api("get_tests/40&status_id=5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": {"next": null},
            "tests": [
                {"id": 401, "title": "suite.Case2", "status_id": 5},
                {"id": 402, "title": "suite.Case3", "status_id": 5}
            ]
        })))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_matching_comment_rewrites_status() {
    let mock_server = MockServer::start().await;
    mount_failed_run(&mock_server).await;

    // Newest result first.
    Mock::given(method("GET"))
        .and(api("get_results/401"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": {"next": null},
            "results": [
                {"id": 12, "test_id": 401, "comment": "Traceback:\n  raise AssertionError(&quot;x&quot;)\nAssertionError: x &ndash; see log&hellip;"},
                {"id": 11, "test_id": 401, "comment": "older run"}
            ]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(api("get_results/402"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": {"next": null},
            "results": [{"id": 13, "test_id": 402, "comment": "TimeoutError"}]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(api("add_result/401"))
        .and(body_json(json!({"status_id": 8, "comment": ANALYZER_COMMENT, "defects": "LP-1,LP-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 20, "test_id": 401, "status_id": 8})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(api("add_result/402"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 21, "test_id": 402})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let checks = CheckList::from_yaml_str(
        r#"
tests:
  - title: suite.Case2
    status: known_issue
    errors: ["AssertionError: x", 'raise AssertionError("x")', "x – see log…"]
    defects: [LP-1, LP-2]
  - title: suite.Case3
    status: known_issue
    errors: ["AssertionError: x"]
"#,
    )
    .unwrap();

    let client = create_test_client(&mock_server);
    let analyzer = Analyzer::new(&client, project_context());
    let summary = analyzer
        .analyze(&checks, &RunSelector::new("Smoke"))
        .await
        .expect("analysis failed");

    assert_eq!(summary.run_id, 40);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.rewritten, vec!["suite.Case2".to_string()]);
}

#[tokio::test]
async fn test_exact_title_claims_before_pattern() {
    let mock_server = MockServer::start().await;
    mount_failed_run(&mock_server).await;

    Mock::given(method("POST"))
        .and(api("add_result/401"))
        .and(body_json(json!({"status_id": 8, "comment": ANALYZER_COMMENT})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 20, "test_id": 401})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(api("add_result/402"))
        .and(body_json(json!({"status_id": 9, "comment": ANALYZER_COMMENT})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 21, "test_id": 402})))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The pattern entry comes first but must not take the exact-title test.
    let checks = CheckList::from_yaml_str(
        r#"
tests:
  - title_regex: 'suite\.Case\d'
    status: product_failed
  - title: suite.Case2
    status: known_issue
"#,
    )
    .unwrap();

    let client = create_test_client(&mock_server);
    let analyzer = Analyzer::new(&client, project_context());
    let summary = analyzer
        .analyze(&checks, &RunSelector::new("Smoke"))
        .await
        .expect("analysis failed");

    assert_eq!(summary.rewritten, vec!["suite.Case2".to_string(), "suite.Case3".to_string()]);
}

#[tokio::test]
async fn test_unmatched_entry_leaves_test_to_later_entries() {
    let mock_server = MockServer::start().await;
    mount_failed_run(&mock_server).await;
    for uri in ["get_results/401", "get_results/402"] {
        Mock::given(method("GET"))
            .and(api(uri))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_links": {"next": null},
                "results": [{"id": 12, "test_id": 401, "comment": "TimeoutError: boom"}]
            })))
            .mount(&mock_server)
            .await;
    }
    for uri in ["add_result/401", "add_result/402"] {
        Mock::given(method("POST"))
            .and(api(uri))
            .and(body_json(json!({"status_id": 9, "comment": ANALYZER_COMMENT})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 20, "test_id": 401})))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    // Case2: the exact entry does not match, the pattern does.
    // Case3: the first of two same-title entries does not match, the second does.
    // The trailing pattern must not touch either once rewritten.
    let checks = CheckList::from_yaml_str(
        r#"
tests:
  - title: suite.Case2
    status: known_issue
    errors: ["AssertionError: x"]
  - title: suite.Case3
    status: known_issue
    errors: ["AssertionError: x"]
  - title: suite.Case3
    status: product_failed
    errors: ["TimeoutError"]
  - title_regex: 'suite\.Case2'
    status: product_failed
    errors: ["TimeoutError"]
  - title_regex: 'suite\..*'
    status: known_issue
"#,
    )
    .unwrap();

    let client = create_test_client(&mock_server);
    let summary = Analyzer::new(&client, project_context())
        .analyze(&checks, &RunSelector::new("Smoke"))
        .await
        .expect("analysis failed");

    assert_eq!(summary.rewritten, vec!["suite.Case3".to_string(), "suite.Case2".to_string()]);
}

#[tokio::test]
async fn test_missing_comment_is_not_a_match() {
    let mock_server = MockServer::start().await;
    mount_failed_run(&mock_server).await;
    Mock::given(method("GET"))
        .and(api("get_results/401"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": {"next": null},
            "results": [{"id": 12, "test_id": 401, "comment": null}]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(api("add_result/401"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let checks = CheckList::from_yaml_str(
        "tests:\n  - title: suite.Case2\n    status: known_issue\n    errors: [boom]\n",
    )
    .unwrap();
    let client = create_test_client(&mock_server);
    let summary = Analyzer::new(&client, project_context())
        .analyze(&checks, &RunSelector::new("Smoke"))
        .await
        .expect("analysis failed");
    assert!(summary.rewritten.is_empty());
}

#[tokio::test]
async fn test_find_run_in_plan_by_configuration() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(api("get_plans/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": {"next": null},
            "plans": [{"id": 7, "name": "Nightly"}]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(api("get_plan/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "name": "Nightly",
            "entries": [{
                "id": "e-1",
                "name": "Smoke",
                "runs": [
                    {"id": 50, "name": "Smoke", "config_ids": [4]},
                    {"id": 51, "name": "Smoke", "config_ids": [4, 2]}
                ]
            }]
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let analyzer = Analyzer::new(&client, project_context());

    let configuration: ConfigSelection = [
        ("Operating System".to_string(), "Ubuntu".to_string()),
        ("Deployment".to_string(), "HA".to_string()),
    ]
    .into_iter()
    .collect();
    let selector = RunSelector::new("Smoke").in_plan("Nightly").with_configuration(configuration);
    assert_eq!(analyzer.find_run(&selector).await.unwrap(), 51);

    let err = analyzer
        .find_run(&RunSelector::new("Full").in_plan("Nightly"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReporterError::NotFound { kind: EntityKind::Run, .. }));

    let err = analyzer
        .find_run(&RunSelector::new("Smoke").in_plan("Weekly"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReporterError::NotFound { kind: EntityKind::Plan, .. }));
}
