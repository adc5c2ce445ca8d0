//! Integration tests for the HTTP remote using wiremock

use serde_json::json;
use switcher_client::model::{EvaluationRequest, StrategyType};
use switcher_client::remote::{HttpRemote, Remote};
use switcher_client::{ClientContext, Error};
use wiremock::matchers::{bearer_token, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn context(server: &MockServer) -> ClientContext {
    ClientContext::new("Business")
        .url(server.uri())
        .api_key("secret-key")
        .component("checkout")
        .environment("staging")
}

#[tokio::test]
async fn test_authenticate_sends_api_key_and_identity() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/criteria/auth"))
        .and(header("switcher-api-key", "secret-key"))
        .and(body_partial_json(json!({
            "domain": "Business",
            "component": "checkout",
            "environment": "staging"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "abc", "exp": 1_900_000_000 })))
        .expect(1)
        .mount(&server)
        .await;

    let remote = HttpRemote::new(&context(&server)).unwrap();
    let auth = remote.authenticate().await.unwrap();

    assert_eq!(auth.token, "abc");
    assert_eq!(auth.exp, 1_900_000_000);
}

#[tokio::test]
async fn test_authenticate_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/criteria/auth"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(&context(&server)).unwrap();
    let err = remote.authenticate().await.unwrap_err();

    match &err {
        Error::Remote { status, message } => {
            assert_eq!(*status, Some(401));
            assert!(message.contains("Invalid API key"), "unexpected message: {message}");
        }
        other => panic!("Expected remote error, got {other:?}"),
    }
    assert!(err.is_remote_failure());
}

#[tokio::test]
async fn test_evaluate_posts_entries_with_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/criteria"))
        .and(query_param("key", "FEATURE01"))
        .and(query_param("showReason", "true"))
        .and(bearer_token("abc"))
        .and(body_partial_json(json!({
            "entry": [{ "strategy": "VALUE_VALIDATION", "input": "USER_1" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": true,
            "reason": "Success",
            "metadata": { "region": "eu" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let remote = HttpRemote::new(&context(&server)).unwrap();
    let request = EvaluationRequest::new("FEATURE01").with(StrategyType::Value, "USER_1");
    let result = remote.evaluate("abc", &request, true).await.unwrap();

    assert!(result.result);
    assert_eq!(result.reason.as_deref(), Some("Success"));
    assert_eq!(result.metadata.unwrap()["region"], "eu");
}

#[tokio::test]
async fn test_evaluate_malformed_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/criteria"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(&context(&server)).unwrap();
    let err = remote.evaluate("abc", &EvaluationRequest::new("FEATURE01"), false).await.unwrap_err();

    assert!(matches!(err, Error::Remote { status: Some(200), .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_snapshot_version_and_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/criteria/snapshot_check/3"))
        .and(bearer_token("abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": false })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(bearer_token("abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "domain": {
                "name": "Business", "version": 7, "activated": true,
                "group": [{ "name": "Main", "activated": true, "config": [{ "key": "FEATURE01", "activated": true }] }]
            } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let remote = HttpRemote::new(&context(&server)).unwrap();
    assert!(!remote.check_snapshot_version("abc", 3).await.unwrap());

    let snapshot = remote.fetch_snapshot("abc").await.unwrap();
    assert_eq!(snapshot.version(), 7);
    assert!(snapshot.domain().find_config("FEATURE01").is_some());

    let requests = server.received_requests().await.unwrap();
    let graphql = requests.iter().find(|r| r.url.path() == "/graphql").unwrap();
    let body: serde_json::Value = serde_json::from_slice(&graphql.body).unwrap();
    let query = body["query"].as_str().unwrap();
    assert!(query.contains(r#"domain(name: "Business", environment: "staging", _component: "checkout")"#));
}

#[tokio::test]
async fn test_check_switchers_reports_unknown_keys() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/criteria/switchers_check"))
        .and(body_partial_json(json!({ "switchers": ["FEATURE01", "GHOST"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "not_found": ["GHOST"] })))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(&context(&server)).unwrap();
    let keys = vec!["FEATURE01".to_string(), "GHOST".to_string()];
    let missing = remote.check_switchers("abc", &keys).await.unwrap();

    assert_eq!(missing, vec!["GHOST".to_string()]);
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/check"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let remote = HttpRemote::new(&context(&server)).unwrap();
    assert!(remote.health().await);

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/check"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    assert!(!remote.health().await);
}

#[test]
fn test_new_requires_remote_fields() {
    let err = HttpRemote::new(&ClientContext::new("Business")).unwrap_err();
    assert_eq!(err.to_string(), "Missing API url field");

    let err = HttpRemote::new(&ClientContext::new("Business").url("http://localhost").api_key("k")).unwrap_err();
    assert_eq!(err.to_string(), "Missing component field");
}
