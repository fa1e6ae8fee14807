//! Provisioning wizard API integration tests.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use adprovision_core::{AdapterCall, AdapterError};
use common::{fixtures, TestConfig, TestFixture};

fn order_body() -> serde_json::Value {
    json!({
        "name": "Header Bidding A",
        "revenue_share": 20,
        "bidders": ["medianet"]
    })
}

#[tokio::test]
async fn test_initial_wizard_state() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/wizard").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["step"]["step"], "idle");
    assert_eq!(response.body["attempt"], "fresh_attempt");
    assert_eq!(response.body["in_flight"], false);
    assert_eq!(response.body["has_issues"], false);
    assert_eq!(response.body["notices"], json!([]));
}

#[tokio::test]
async fn test_run_end_to_end() {
    let fixture = TestFixture::new().await;
    fixture.server.set_lica_len(250).await;

    let response = fixture.put("/api/v1/wizard/config", order_body()).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["config"]["name"], "Header Bidding A");

    let response = fixture.post_empty("/api/v1/wizard/run").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["order"]["lica_batch_count"], 3);
    assert_eq!(response.body["wizard"]["total_steps"], 6);
    assert_eq!(response.body["wizard"]["notices"][0]["level"], "info");

    assert_eq!(
        fixture.server.create_calls(AdapterCall::CreateOrder).await,
        1
    );
    assert_eq!(fixture.server.creative_batches().await, vec![1, 2, 3]);

    let response = fixture.get("/api/v1/wizard/issues").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["has_issues"], false);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .put(
            "/api/v1/wizard/config",
            json!({ "name": "", "revenue_share": 20, "bidders": [] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = fixture
        .put(
            "/api/v1/wizard/config",
            json!({ "name": "A", "revenue_share": 150, "bidders": [] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = fixture
        .put(
            "/api/v1/wizard/config",
            json!({ "name": "A", "revenue_share": 10, "bidders": ["unknown"] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("unknown"));
}

#[tokio::test]
async fn test_recoverable_failure_then_retry() {
    let fixture = TestFixture::new().await;
    fixture.server.set_lica_len(150).await;
    fixture
        .server
        .fail_next(AdapterCall::CreateLineItems, AdapterError::Timeout)
        .await;

    fixture.put("/api/v1/wizard/config", order_body()).await;

    let response = fixture.post_empty("/api/v1/wizard/run").await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);

    let response = fixture.get("/api/v1/wizard").await;
    assert_eq!(response.body["attempt"], "retry_pending");
    assert_eq!(response.body["last_failure"]["recoverable"], true);
    assert_eq!(response.body["has_issues"], true);
    let notices = response.body["notices"].as_array().unwrap();
    assert_eq!(notices[0]["level"], "error");
    assert_eq!(response.body["last_failure"]["call"], "create_line_items");
    assert!(notices[0]["message"]
        .as_str()
        .unwrap()
        .starts_with("Creating line items failed"));

    let response = fixture.post_empty("/api/v1/wizard/run").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        fixture.server.create_calls(AdapterCall::CreateOrder).await,
        1
    );
}

#[tokio::test]
async fn test_unrecoverable_failure_archives_and_resets() {
    let fixture = TestFixture::new().await;
    fixture.server.set_lica_len(150).await;
    for _ in 0..2 {
        fixture
            .server
            .fail_next(
                AdapterCall::CreateCreatives,
                AdapterError::api(500, "Association failed"),
            )
            .await;
    }

    fixture.put("/api/v1/wizard/config", order_body()).await;
    fixture.post_empty("/api/v1/wizard/run").await;
    let response = fixture.post_empty("/api/v1/wizard/run").await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);

    let archived = fixture.server.archived_orders().await;
    assert_eq!(archived.len(), 1);

    let response = fixture.get("/api/v1/wizard").await;
    assert_eq!(response.body["attempt"], "exhausted");
    assert_eq!(response.body["config"]["order_id"], serde_json::Value::Null);
    assert_eq!(response.body["config"]["name"], "Header Bidding A");
    assert_eq!(response.body["last_failure"]["recoverable"], false);
    assert_eq!(response.body["last_failure"]["order_id"], archived[0]);
}

#[tokio::test]
async fn test_resume_existing_order() {
    let fixture = TestFixture::new().await;
    fixture.server.set_lica_len(400).await;
    fixture
        .server
        .insert_order(fixtures::order_state(321, 4, 1))
        .await;

    fixture.put("/api/v1/wizard/config", order_body()).await;
    let response = fixture.post_empty("/api/v1/wizard/resume/321").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["resuming_existing"], true);
    assert_eq!(response.body["config"]["order_id"], 321);

    let response = fixture.get("/api/v1/wizard/issues").await;
    assert_eq!(response.body["has_issues"], true);

    let response = fixture.post_empty("/api/v1/wizard/run").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(fixture.server.creative_batches().await, vec![2, 3, 4]);
}

#[tokio::test]
async fn test_resume_unknown_order() {
    let fixture = TestFixture::new().await;
    let response = fixture.post_empty("/api/v1/wizard/resume/999").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset() {
    let fixture = TestFixture::new().await;
    fixture.put("/api/v1/wizard/config", order_body()).await;
    fixture.post_empty("/api/v1/wizard/run").await;

    let response = fixture.post_empty("/api/v1/wizard/reset").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["config"]["order_id"], serde_json::Value::Null);
    assert_eq!(response.body["order"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_overlapping_run_conflicts() {
    let fixture = TestFixture::new().await;
    fixture
        .server
        .set_call_delay(Duration::from_millis(100))
        .await;
    fixture.put("/api/v1/wizard/config", order_body()).await;

    let router = fixture.router.clone();
    let first = tokio::spawn(async move {
        use tower::ServiceExt;
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/v1/wizard/run")
            .body(axum::body::Body::empty())
            .unwrap();
        router.oneshot(request).await.unwrap().status()
    });
    tokio::time::sleep(Duration::from_millis(30)).await;

    let response = fixture.get("/api/v1/wizard").await;
    assert_eq!(response.body["in_flight"], true);
    assert!(response.body["notices"][0]["message"]
        .as_str()
        .unwrap()
        .contains("15 minutes"));

    let response = fixture.post_empty("/api/v1/wizard/run").await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = fixture.post_empty("/api/v1/wizard/reset").await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    assert_eq!(first.await.unwrap(), StatusCode::OK);
}

#[tokio::test]
async fn test_wizard_unavailable_without_adapter() {
    let fixture = TestFixture::with_config(TestConfig::without_provisioning()).await;

    let response = fixture.get("/api/v1/wizard").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);

    let response = fixture.post_empty("/api/v1/wizard/run").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}
