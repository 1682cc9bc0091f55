//! Keystone provider integration tests against a local HTTP mock.
//!
//! Run with:
//!   cargo test --test integration_keystone --features keystone

#![cfg(feature = "keystone")]

use mockito::{Matcher, Server};
use osconnect::provider::Connection;
use osconnect::providers::keystone::KeystoneConnection;
use osconnect::{
    AuthSettings, CloudConfigStore, CloudProfile, ConnectError, ConnectRequest, Connections,
    Connector, InlineCredentials,
};
use serde_json::json;

fn init_library() {
    osconnect::init();
}

fn token_body() -> String {
    json!({
        "token": {
            "methods": ["password"],
            "expires_at": "2999-01-01T00:00:00.000000Z",
            "project": { "id": "p-123", "name": "admin", "domain": { "id": "default" } },
            "user": { "id": "u-456", "name": "admin", "domain": { "id": "default" } },
            "catalog": [
                {
                    "type": "compute",
                    "name": "nova",
                    "endpoints": [
                        { "interface": "internal", "region": "regionOne", "url": "http://nova.internal:8774/v2.1" },
                        { "interface": "public", "region": "regionOne", "url": "https://nova.example:13774/v2.1" }
                    ]
                },
                {
                    "type": "image",
                    "name": "glance",
                    "endpoints": [
                        { "interface": "public", "region": "regionTwo", "url": "https://glance.two:13292" }
                    ]
                }
            ]
        }
    })
    .to_string()
}

fn password_profile(name: &str, auth_url: &str) -> CloudProfile {
    CloudProfile::new(name)
        .with_region("regionOne")
        .with_auth(AuthSettings {
            auth_url: Some(auth_url.to_string()),
            username: Some("admin".into()),
            password: Some("secret".into()),
            project_name: Some("admin".into()),
            user_domain_name: Some("Default".into()),
            project_domain_name: Some("Default".into()),
            ..Default::default()
        })
}

#[tokio::test]
async fn test_password_authorize() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/auth/tokens")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": { "user": { "name": "admin", "password": "secret" } }
                },
                "scope": { "project": { "name": "admin" } }
            }
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_header("X-Subject-Token", "gAAAA-token")
        .with_body(token_body())
        .create_async()
        .await;

    let mut conn = KeystoneConnection::new(password_profile("lab", &server.url())).unwrap();
    let session = conn.authorize().await.unwrap();

    mock.assert_async().await;
    assert_eq!(session.cloud(), "lab");
    assert_eq!(session.token(), "gAAAA-token");
    assert_eq!(session.project_id(), Some("p-123"));
    assert!(session.is_valid());
    assert_eq!(session.catalog().len(), 2);
    assert_eq!(session.endpoint("compute"), Some("https://nova.example:13774/v2.1"));
    assert_eq!(session.endpoint("image"), None);
    assert_eq!(session.endpoint("volumev3"), None);

    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_auth_url_already_versioned() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/auth/tokens")
        .with_status(201)
        .with_header("X-Subject-Token", "tok")
        .with_body(token_body())
        .create_async()
        .await;

    let auth_url = format!("{}/v3/", server.url());
    let mut conn = KeystoneConnection::new(password_profile("versioned", &auth_url)).unwrap();
    conn.authorize().await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_unauthorized() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v3/auth/tokens")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": {"code": 401, "title": "Unauthorized", "message": "The request you have made requires authentication."}}"#)
        .create_async()
        .await;

    let mut conn = KeystoneConnection::new(password_profile("denied", &server.url())).unwrap();
    let err = conn.authorize().await.unwrap_err();

    match err {
        ConnectError::AuthenticationFailed(msg) => {
            assert_eq!(msg, "The request you have made requires authentication.");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_server_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v3/auth/tokens")
        .with_status(503)
        .with_body("service unavailable")
        .create_async()
        .await;

    let mut conn = KeystoneConnection::new(password_profile("down", &server.url())).unwrap();
    let err = conn.authorize().await.unwrap_err();

    assert!(matches!(
        err,
        ConnectError::Http { status: 503, ref body } if body == "service unavailable"
    ));
}

#[tokio::test]
async fn test_missing_subject_token() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v3/auth/tokens")
        .with_status(201)
        .with_body(token_body())
        .create_async()
        .await;

    let mut conn = KeystoneConnection::new(password_profile("headless", &server.url())).unwrap();
    let err = conn.authorize().await.unwrap_err();

    assert!(err.to_string().contains("X-Subject-Token"));
}

#[tokio::test]
async fn test_application_credential_is_unscoped() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/auth/tokens")
        .match_body(Matcher::PartialJson(json!({
            "auth": {
                "identity": {
                    "methods": ["application_credential"],
                    "application_credential": { "id": "ac-1", "secret": "s3cr3t" }
                }
            }
        })))
        .with_status(201)
        .with_header("X-Subject-Token", "ac-token")
        .with_body(token_body())
        .create_async()
        .await;

    let profile = CloudProfile::new("appcred")
        .with_auth_type("v3applicationcredential")
        .with_auth(AuthSettings {
            auth_url: Some(server.url()),
            application_credential_id: Some("ac-1".into()),
            application_credential_secret: Some("s3cr3t".into()),
            project_name: Some("ignored".into()),
            ..Default::default()
        });
    let mut conn = KeystoneConnection::new(profile).unwrap();

    assert!(conn.auth_request()["auth"].get("scope").is_none());
    let session = conn.authorize().await.unwrap();

    mock.assert_async().await;
    assert_eq!(session.token(), "ac-token");
}

#[tokio::test]
async fn test_connector_profiles_from_clouds_yaml() {
    init_library();

    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v3/auth/tokens")
        .match_body(Matcher::PartialJson(json!({
            "auth": { "identity": { "password": { "user": { "name": "good" } } } }
        })))
        .with_status(201)
        .with_header("X-Subject-Token", "good-token")
        .with_body(token_body())
        .create_async()
        .await;
    server
        .mock("POST", "/v3/auth/tokens")
        .match_body(Matcher::PartialJson(json!({
            "auth": { "identity": { "password": { "user": { "name": "bad" } } } }
        })))
        .with_status(401)
        .with_body("denied")
        .create_async()
        .await;

    let yaml = format!(
        r#"
clouds:
  ks-good:
    region_name: regionOne
    auth:
      auth_url: {url}
      username: good
      password: pw
      project_name: admin
  ks-bad:
    auth:
      auth_url: {url}
      username: bad
      password: pw
      project_name: admin
"#,
        url = server.url()
    );
    let connector = Connector::new(CloudConfigStore::from_yaml_str(&yaml).unwrap());

    let ok = connector
        .connect_with_env(&ConnectRequest::new().with_clouds(["ks-good"]), None)
        .await
        .unwrap();
    let session = ok.session("ks-good").unwrap();
    assert_eq!(session.token(), "good-token");
    assert_eq!(session.endpoint("compute"), Some("https://nova.example:13774/v2.1"));

    let err = connector
        .connect_with_env(
            &ConnectRequest::new().with_clouds(["ks-good", "ks-bad"]),
            None,
        )
        .await
        .unwrap_err();
    match err {
        ConnectError::Cloud { cloud, source, .. } => {
            assert_eq!(cloud, "ks-bad");
            assert!(matches!(*source, ConnectError::AuthenticationFailed(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_connector_inline_best_effort() {
    init_library();

    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v3/auth/tokens")
        .match_body(Matcher::PartialJson(json!({
            "auth": { "identity": { "password": { "user": { "name": "good" } } } }
        })))
        .with_status(201)
        .with_header("X-Subject-Token", "inline-token")
        .with_body(token_body())
        .create_async()
        .await;
    server
        .mock("POST", "/v3/auth/tokens")
        .match_body(Matcher::PartialJson(json!({
            "auth": { "identity": { "password": { "user": { "name": "bad" } } } }
        })))
        .with_status(401)
        .with_body("denied")
        .create_async()
        .await;

    let creds: Vec<InlineCredentials> = serde_json::from_value(json!([
        {
            "cloud": "inline-bad",
            "auth_url": server.url(),
            "username": "bad",
            "password": "pw",
            "project_name": "admin"
        },
        {
            "cloud": "inline-good",
            "auth_url": server.url(),
            "username": "good",
            "password": "pw",
            "project_name": "admin"
        },
        {
            "cloud": "inline-incomplete",
            "auth_url": server.url(),
            "username": "good"
        }
    ]))
    .unwrap();

    let connector = Connector::new(CloudConfigStore::empty());
    let connections = connector
        .connect_with_env(&ConnectRequest::new().with_creds(creds), None)
        .await
        .unwrap();

    assert!(matches!(connections, Connections::BestEffort(_)));
    assert_eq!(
        connections.keys(),
        vec!["inline-bad", "inline-good", "inline-incomplete"]
    );
    assert_eq!(
        connections.session("inline-good").map(|s| s.token().to_string()),
        Some("inline-token".to_string())
    );
    assert_eq!(connections.failed(), vec!["inline-bad", "inline-incomplete"]);
}
