use super::*;
use crate::mock_client;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE_PATH: &str =
    "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Web/sites/frontend";

#[tokio::test]
async fn test_get_site() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SITE_PATH))
        .and(query_param("api-version", WEB_API_VERSION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": SITE_PATH,
            "name": "frontend",
            "kind": "app",
            "properties": {
                "state": "Running",
                "defaultHostName": "frontend.azurewebsites.net",
                "serverFarmId":
                    "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Web/serverfarms/plan"
            }
        })))
        .mount(&mock_server)
        .await;

    let client = WebAppClient::new(mock_client(&mock_server.uri()), "sub");
    let site = client.get_site("rg", "frontend").await.unwrap();

    assert_eq!(site.properties.state.as_deref(), Some("Running"));
    assert_eq!(
        site.properties.default_host_name.as_deref(),
        Some("frontend.azurewebsites.net")
    );
}

#[tokio::test]
async fn test_list_app_settings_uses_post() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{SITE_PATH}/config/appsettings/list")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {
                "BOT_ID": "bot-client-id",
                "BOT_PASSWORD": "@Microsoft.KeyVault(SecretUri=https://vault/secrets/botPassword/)"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = WebAppClient::new(mock_client(&mock_server.uri()), "sub");
    let settings = client.list_app_settings("rg", "frontend").await.unwrap();

    assert_eq!(settings.get("BOT_ID").map(String::as_str), Some("bot-client-id"));
    assert!(settings.contains_key("BOT_PASSWORD"));
}

#[tokio::test]
async fn test_get_service_plan() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Web/serverfarms/plan",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "plan",
            "sku": { "name": "B1", "tier": "Basic", "capacity": 1 }
        })))
        .mount(&mock_server)
        .await;

    let client = WebAppClient::new(mock_client(&mock_server.uri()), "sub");
    let plan = client.get_service_plan("rg", "plan").await.unwrap();

    assert_eq!(plan.sku.name, "B1");
    assert_eq!(plan.sku.tier.as_deref(), Some("Basic"));
}
