use super::*;
use crate::mock_client;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVER_PATH: &str =
    "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Sql/servers/sqlsrv";

#[tokio::test]
async fn test_firewall_rule_lifecycle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("{SERVER_PATH}/firewallRules/e2e-client")))
        .and(body_json(json!({
            "properties": { "startIpAddress": "10.0.0.1", "endIpAddress": "10.0.0.1" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "name": "e2e-client",
            "properties": { "startIpAddress": "10.0.0.1", "endIpAddress": "10.0.0.1" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SERVER_PATH}/firewallRules")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {
                    "name": "AllowAllWindowsAzureIps",
                    "properties": { "startIpAddress": "0.0.0.0", "endIpAddress": "0.0.0.0" }
                },
                {
                    "name": "e2e-client",
                    "properties": { "startIpAddress": "10.0.0.1", "endIpAddress": "10.0.0.1" }
                }
            ]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{SERVER_PATH}/firewallRules/e2e-client")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sql = SqlClient::new(mock_client(&mock_server.uri()), "sub");

    let rule = sql
        .create_or_update_firewall_rule("rg", "sqlsrv", "e2e-client", "10.0.0.1", "10.0.0.1")
        .await
        .unwrap();
    assert_eq!(rule.properties.start_ip_address, "10.0.0.1");

    let rules = sql.list_firewall_rules("rg", "sqlsrv").await.unwrap();
    assert!(rules.iter().any(|r| r.name == "AllowAllWindowsAzureIps"));

    sql.delete_firewall_rule("rg", "sqlsrv", "e2e-client")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_get_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SERVER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "sqlsrv",
            "properties": {
                "fullyQualifiedDomainName": "sqlsrv.database.windows.net",
                "administratorLogin": "admin",
                "state": "Ready"
            }
        })))
        .mount(&mock_server)
        .await;

    let sql = SqlClient::new(mock_client(&mock_server.uri()), "sub");
    let server = sql.get_server("rg", "sqlsrv").await.unwrap();

    assert_eq!(
        server.properties.fully_qualified_domain_name.as_deref(),
        Some("sqlsrv.database.windows.net")
    );
}
