use super::*;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::mock_cloud_client;

fn validator(server: &MockServer) -> AadValidator {
    AadValidator::new(GraphClient::new(mock_cloud_client(&server.uri())))
        .with_lookup_policy(RetryPolicy::fixed(3, Duration::from_millis(10)))
}

fn outputs() -> HashMap<String, String> {
    HashMap::from([
        ("AAD_APP_OBJECT_ID".to_string(), "object-1".to_string()),
        ("AAD_APP_CLIENT_ID".to_string(), "client-1".to_string()),
    ])
}

#[test]
fn test_expectations_from_outputs() {
    let expected = AadExpectations::from_outputs(&outputs()).unwrap();
    assert_eq!(expected.object_id, "object-1");
    assert_eq!(expected.client_id.as_deref(), Some("client-1"));

    let err = AadExpectations::from_outputs(&HashMap::new()).unwrap_err();
    assert!(err.to_string().contains("AAD_APP_OBJECT_ID"));
}

#[tokio::test]
async fn test_validate_matching_app() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/applications/object-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "object-1",
            "appId": "client-1",
            "displayName": "fxE2Eapp-aad",
            "identifierUris": ["api://localhost/client-1"]
        })))
        .mount(&server)
        .await;

    let expected = AadExpectations::from_outputs(&outputs())
        .unwrap()
        .with_display_name("fxE2Eapp-aad")
        .with_identifier_uri("api://localhost/client-1");
    let verification = validator(&server).validate(&expected).await.unwrap();

    assert!(verification.passed, "{:?}", verification.failures);
}

#[tokio::test]
async fn test_validate_reports_every_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/applications/object-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "object-1",
            "appId": "other-client",
            "displayName": "renamed",
            "identifierUris": []
        })))
        .mount(&server)
        .await;

    let expected = AadExpectations::from_outputs(&outputs())
        .unwrap()
        .with_display_name("fxE2Eapp-aad")
        .with_identifier_uri("api://localhost/client-1");
    let verification = validator(&server).validate(&expected).await.unwrap();

    assert!(!verification.passed);
    assert_eq!(verification.failures.len(), 3);
}

#[tokio::test]
async fn test_validate_waits_for_replication() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/applications/object-1"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/applications/object-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "object-1",
            "appId": "client-1"
        })))
        .mount(&server)
        .await;

    let expected = AadExpectations::from_outputs(&outputs()).unwrap();
    let verification = validator(&server).validate(&expected).await.unwrap();

    assert!(verification.passed, "{:?}", verification.failures);
}

#[tokio::test]
async fn test_validate_missing_app_is_a_failed_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/applications/object-1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let expected = AadExpectations::from_outputs(&outputs()).unwrap();
    let verification = validator(&server).validate(&expected).await.unwrap();

    assert!(!verification.passed);
    assert!(verification.failures[0].contains("does not exist"));
}

async fn mount_app_with_owners(server: &MockServer, owners: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/applications/object-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "object-1",
            "appId": "client-1",
            "displayName": "fxE2Eapp-aad"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/applications/object-1/owners"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": owners })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_validate_owner_matches_case_insensitively() {
    let server = MockServer::start().await;
    mount_app_with_owners(
        &server,
        json!([
            { "id": "sp-1", "displayName": "deploy principal" },
            { "id": "user-1", "userPrincipalName": "Tester@Contoso.onmicrosoft.com" }
        ]),
    )
    .await;

    let expected = AadExpectations::from_outputs(&outputs())
        .unwrap()
        .with_owner("tester@contoso.onmicrosoft.com");
    let verification = validator(&server).validate(&expected).await.unwrap();

    assert!(verification.passed, "{:?}", verification.failures);
}

#[tokio::test]
async fn test_validate_reports_missing_owner() {
    let server = MockServer::start().await;
    mount_app_with_owners(
        &server,
        json!([{ "id": "user-2", "userPrincipalName": "someone@contoso.onmicrosoft.com" }]),
    )
    .await;

    let expected = AadExpectations::from_outputs(&outputs())
        .unwrap()
        .with_owner("tester@contoso.onmicrosoft.com");
    let verification = validator(&server).validate(&expected).await.unwrap();

    assert_eq!(
        verification.failures,
        vec!["AAD app object-1 is not owned by tester@contoso.onmicrosoft.com"]
    );
}
