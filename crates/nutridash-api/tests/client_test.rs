#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use nutridash_api::{ApiClient, Error, MemoryTokenStore, TokenPair, TokenStore};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(tokens: Option<TokenPair>) -> (MockServer, ApiClient, Arc<MemoryTokenStore>) {
    let server = MockServer::start().await;
    let store = Arc::new(tokens.map_or_else(MemoryTokenStore::new, MemoryTokenStore::with_tokens));
    let client =
        ApiClient::with_client(&server.uri(), reqwest::Client::new(), store.clone()).unwrap();
    (server, client, store)
}

fn page_body(ids: &[&str], last: bool) -> serde_json::Value {
    let content: Vec<_> = ids
        .iter()
        .map(|id| json!({ "id": id, "name": format!("item {id}") }))
        .collect();
    json!({
        "code": 200,
        "data": { "content": content, "number": 0, "size": ids.len(), "last": last }
    })
}

fn refreshed(access: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": 200,
        "data": { "accessToken": access }
    }))
}

/// Matches requests whose bearer token is exactly `token`.
fn bearer(token: &str) -> wiremock::matchers::HeaderExactMatcher {
    header("Authorization", format!("Bearer {token}").as_str())
}

// ── Token attachment ────────────────────────────────────────────────

#[tokio::test]
async fn test_bearer_token_attached() {
    let (server, client, _) = setup(Some(TokenPair::new("access-1", "refresh-1"))).await;

    Mock::given(method("GET"))
        .and(path("/foods/all"))
        .and(bearer("access-1"))
        .and(query_param("page", "0"))
        .and(query_param("size", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["1", "2"], true)))
        .expect(1)
        .mount(&server)
        .await;

    let page = client.list_page("foods", 0, 20, None).await.unwrap();
    assert_eq!(page.content.len(), 2);
    assert!(page.last);
}

#[tokio::test]
async fn test_unauthenticated_without_token() {
    let (server, client, _) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/conditions/search"))
        .and(query_param("name", "dia"))
        .respond_with(move |req: &Request| {
            assert!(!req.headers.contains_key("authorization"));
            ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": 7, "name": "Diabetes" }]
            }))
        })
        .mount(&server)
        .await;

    let hits = client.search("conditions", "dia").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "7");
}

#[tokio::test]
async fn test_401_without_token_is_not_refreshed() {
    let (server, client, _) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/foods/all"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auths/refresh"))
        .respond_with(refreshed("never"))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.list_page("foods", 0, 10, None).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized { status: 401, .. }), "{err:?}");
}

// ── Refresh and retry ───────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_then_retry_succeeds() {
    let (server, client, store) = setup(Some(TokenPair::new("stale", "refresh-1"))).await;

    Mock::given(method("GET"))
        .and(path("/ingredients/all"))
        .and(bearer("stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ingredients/all"))
        .and(bearer("fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["a"], true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auths/refresh"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(refreshed("fresh"))
        .expect(1)
        .mount(&server)
        .await;

    let page = client.list_page("ingredients", 0, 10, None).await.unwrap();
    assert_eq!(page.content[0].id, "a");

    let stored = store.load().unwrap();
    assert_eq!(stored.access_token.expose_secret(), "fresh");
    // The backend didn't rotate the refresh token, so the old one is kept.
    assert_eq!(stored.refresh_token.expose_secret(), "refresh-1");
}

#[tokio::test]
async fn test_retried_request_is_not_retried_again() {
    let (server, client, _) = setup(Some(TokenPair::new("stale", "refresh-1"))).await;

    // Every data request is rejected, even with the fresh token.
    Mock::given(method("GET"))
        .and(path("/foods/all"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auths/refresh"))
        .respond_with(refreshed("fresh"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.list_page("foods", 0, 10, None).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_refresh_failure_clears_tokens() {
    let (server, client, store) = setup(Some(TokenPair::new("stale", "expired"))).await;

    Mock::given(method("GET"))
        .and(path("/allergies/all"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "token expired" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auths/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.list_page("allergies", 0, 10, None).await.unwrap_err();
    match err {
        Error::Unauthorized { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "token expired");
        }
        other => panic!("expected original 401, got {other:?}"),
    }
    assert!(store.load().is_none());
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let (server, client, _) = setup(Some(TokenPair::new("stale", "refresh-1"))).await;

    Mock::given(method("GET"))
        .and(path("/foods/all"))
        .and(bearer("stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/foods/all"))
        .and(bearer("fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["1"], true)))
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auths/refresh"))
        .respond_with(refreshed("fresh").set_delay(std::time::Duration::from_millis(150)))
        .expect(1)
        .mount(&server)
        .await;

    let (a, b, c, d) = tokio::join!(
        client.list_page("foods", 0, 10, None),
        client.list_page("foods", 1, 10, None),
        client.list_page("foods", 2, 10, None),
        client.list_page("foods", 3, 10, None),
    );
    for result in [a, b, c, d] {
        assert!(result.is_ok(), "{result:?}");
    }
}

#[tokio::test]
async fn test_login_stores_tokens() {
    let (server, client, store) = setup(None).await;

    Mock::given(method("POST"))
        .and(path("/auths/login"))
        .and(body_json(json!({ "email": "staff@example.com", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "accessToken": "acc",
                "accessExpiresAt": "2030-01-01T00:00:00Z",
                "refreshToken": "ref",
                "refreshExpiresAt": 1_900_000_000_000_i64
            }
        })))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "pw".to_string().into();
    let pair = client.login("staff@example.com", &secret).await.unwrap();
    assert!(pair.access_expires_at.is_some());
    assert!(pair.refresh_expires_at.is_some());
    assert_eq!(store.load().unwrap().refresh_token.expose_secret(), "ref");

    client.logout().unwrap();
    assert!(store.load().is_none());
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn test_conflict_carries_backend_message_and_field() {
    let (server, client, _) = setup(None).await;

    Mock::given(method("POST"))
        .and(path("/conditions"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "DUPLICATE_NAME",
            "message": "Condition name already exists",
            "field": "name"
        })))
        .mount(&server)
        .await;

    let err = client
        .create(&["conditions"], &json!({ "name": "Celiac" }))
        .await
        .unwrap_err();
    match err {
        Error::Http {
            status,
            message,
            code,
            field,
        } => {
            assert_eq!(status, 409);
            assert_eq!(message, "Condition name already exists");
            assert_eq!(code.as_deref(), Some("DUPLICATE_NAME"));
            assert_eq!(field.as_deref(), Some("name"));
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_statuses() {
    let (server, client, _) = setup(None).await;

    Mock::given(method("DELETE"))
        .and(path("/foods/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/foods/locked"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/foods/busy"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let missing = client.delete("foods", "missing").await.unwrap_err();
    assert!(missing.is_not_found());

    let locked = client.delete("foods", "locked").await.unwrap_err();
    assert!(matches!(locked, Error::Unauthorized { status: 403, .. }));

    let busy = client.delete("foods", "busy").await.unwrap_err();
    assert!(busy.is_transient());
    assert_eq!(busy.status(), Some(503));
}

#[tokio::test]
async fn test_non_envelope_response_is_rejected() {
    let (server, client, _) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/foods/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1, "name": "Rice" }])))
        .mount(&server)
        .await;

    let err = client.search("foods", "ri").await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }), "{err:?}");
}

#[tokio::test]
async fn test_ids_are_path_encoded() {
    let (server, client, _) = setup(None).await;

    Mock::given(method("PUT"))
        .and(path("/ingredients/salt%20pepper"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": "salt pepper", "name": "Seasoning" }
        })))
        .mount(&server)
        .await;

    let item = client
        .update("ingredients", "salt pepper", &json!({ "name": "Seasoning" }))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.name, "Seasoning");
}

#[tokio::test]
async fn test_overview_returns_raw_aggregate() {
    let (server, client, _) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/overview/foods"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "total": 120, "complete": 98 }
        })))
        .mount(&server)
        .await;

    let stats = client.overview("foods").await.unwrap();
    assert_eq!(stats["total"], 120);
}
