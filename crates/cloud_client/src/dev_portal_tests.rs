use super::*;
use crate::mock_client;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(uri: &str) -> DevPortalClient {
    // Keep the test fast: the portal policy would wait 5 s between attempts.
    DevPortalClient {
        client: mock_client(uri),
    }
}

#[test]
fn test_portal_policy_is_patient() {
    let portal = DevPortalClient::with_client(mock_client("http://localhost"));
    assert_eq!(portal.client.retry_policy().attempts(), DEV_PORTAL_ATTEMPTS);
    assert_eq!(portal.client.retry_policy().delay_after(1), DEV_PORTAL_DELAY);
}

#[tokio::test]
async fn test_list_apps() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/appdefinitions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "teamsAppId": "one", "appName": "fxE2E1" },
            { "teamsAppId": "two", "appName": "other" }
        ])))
        .mount(&mock_server)
        .await;

    let apps = client(&mock_server.uri()).list_apps().await.unwrap();

    assert_eq!(apps.len(), 2);
    assert_eq!(apps[0].teams_app_id, "one");
}

#[tokio::test]
async fn test_delete_app_conflict_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/appdefinitions/app"))
        .respond_with(ResponseTemplate::new(409).set_body_string("app is published"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server.uri()).delete_app("app").await;

    assert!(matches!(result, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn test_cancel_staged_app() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/publishing/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "id": "staged-1", "externalId": "app", "publishingState": "submitted" }]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/publishing/app/appdefinitions/staged-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    client(&mock_server.uri())
        .cancel_staged_app("app")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancel_without_staged_app_is_a_no_op() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/publishing/app"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    client(&mock_server.uri())
        .cancel_staged_app("app")
        .await
        .unwrap();
}
