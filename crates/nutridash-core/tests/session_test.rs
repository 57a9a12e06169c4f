#![allow(clippy::unwrap_used)]
// Integration tests for list sessions: scrolling, search, mutations, stats.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nutridash_api::{MemoryTokenStore, TokenPair};
use nutridash_core::{
    CoreError, Dashboard, DashboardConfig, Item, ResourceKind, SearchState, StatsState,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Dashboard) {
    let server = MockServer::start().await;
    let mut config = DashboardConfig::new(Url::parse(&server.uri()).unwrap());
    config.page_size = NonZeroUsize::new(2).unwrap();
    config.search_debounce = Duration::from_millis(20);
    let tokens = Arc::new(MemoryTokenStore::with_tokens(TokenPair::new("acc", "ref")));
    let dashboard = Dashboard::new(config, tokens).unwrap();
    (server, dashboard)
}

fn items(ids: &[&str]) -> Vec<serde_json::Value> {
    ids.iter()
        .map(|id| json!({ "id": id, "name": format!("item {id}") }))
        .collect()
}

async fn mount_collection(server: &MockServer, resource: &str, ids: &[&str], expect: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{resource}/all")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": { "content": items(ids), "number": 0, "size": 1000, "last": true }
        })))
        .expect(expect)
        .mount(server)
        .await;
}

async fn mount_search(server: &MockServer, resource: &str, name: &str, ids: &[&str], delay: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{resource}/search")))
        .and(query_param("name", name))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": items(ids) }))
                .set_delay(Duration::from_millis(delay)),
        )
        .mount(server)
        .await;
}

fn ids(items: &[Arc<Item>]) -> Vec<String> {
    items.iter().map(|i| i.id.clone()).collect()
}

// ── Infinite scroll ─────────────────────────────────────────────────

#[tokio::test]
async fn test_sentinel_appends_until_last_page() {
    let (server, dashboard) = setup().await;
    mount_collection(&server, "foods", &["1", "2", "3", "4", "5"], 1).await;

    let session = dashboard.session(ResourceKind::Foods);
    assert!(session.load_first_page().await.unwrap());
    assert_eq!(ids(&session.view().browse), ["1", "2"]);

    assert!(session.on_sentinel_visible().await.unwrap());
    assert!(session.on_sentinel_visible().await.unwrap());
    let view = session.view();
    assert_eq!(ids(&view.browse), ["1", "2", "3", "4", "5"]);
    assert!(view.last);
    assert_eq!(view.page, 2);

    // Terminal until an explicit refresh.
    assert!(!session.on_sentinel_visible().await.unwrap());
}

#[tokio::test]
async fn test_delete_then_scroll_shows_every_remaining_row() {
    let (server, dashboard) = setup().await;
    mount_collection(&server, "foods", &["1", "2", "3", "4", "5"], 1).await;
    Mock::given(method("DELETE"))
        .and(path("/foods/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = dashboard.session(ResourceKind::Foods);
    session.load_first_page().await.unwrap();
    session.delete("1").await.unwrap();
    assert_eq!(ids(&session.view().browse), ["2"]);

    while session.on_sentinel_visible().await.unwrap() {}
    let view = session.view();
    assert_eq!(ids(&view.browse), ["2", "3", "4", "5"]);
    assert!(view.last);
}

#[tokio::test]
async fn test_create_then_scroll_keeps_rows_unique_and_complete() {
    let (server, dashboard) = setup().await;
    mount_collection(&server, "foods", &["1", "2", "3", "4"], 1).await;
    Mock::given(method("POST"))
        .and(path("/foods/save"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": "new", "name": "Soup" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = dashboard.session(ResourceKind::Foods);
    session.load_first_page().await.unwrap();
    session.create(&json!({ "name": "Soup" })).await.unwrap();

    while session.on_sentinel_visible().await.unwrap() {}
    assert_eq!(ids(&session.view().browse), ["new", "1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_scroll_suppressed_during_search() {
    let (server, dashboard) = setup().await;
    mount_collection(&server, "ingredients", &["1", "2", "3", "4"], 1).await;
    mount_search(&server, "ingredients", "salt", &["9"], 0).await;

    let session = dashboard.session(ResourceKind::Ingredients);
    session.load_first_page().await.unwrap();

    session.set_query("salt");
    assert!(!session.on_sentinel_visible().await.unwrap());
    assert_eq!(session.scroll().state().next_page, 1);
    assert_eq!(ids(&session.view().browse), ["1", "2"]);

    let list_calls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/ingredients/all")
        .count();
    assert_eq!(list_calls, 1);
}

// ── Search ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_newer_query_supersedes_slow_older_one() {
    let (server, dashboard) = setup().await;
    mount_search(&server, "conditions", "dia", &["old"], 300).await;
    mount_search(&server, "conditions", "diabetes", &["new"], 0).await;

    let session = dashboard.session(ResourceKind::Conditions);
    session.set_query("dia");
    // Past the debounce: the slow request is in flight.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(matches!(session.search().state(), SearchState::Searching { .. }));

    session.set_query("diabetes");
    let view = session.search_settled().await;
    assert_eq!(ids(&view.displayed()), ["new"]);

    // Give the superseded response time to arrive; it must not show up.
    tokio::time::sleep(Duration::from_millis(400)).await;
    let view = session.view();
    assert_eq!(view.query, "diabetes");
    assert_eq!(ids(&view.displayed()), ["new"]);
}

#[tokio::test]
async fn test_keystrokes_within_debounce_send_one_request() {
    let (server, dashboard) = setup().await;
    mount_search(&server, "foods", "rice", &["r1"], 0).await;

    let session = dashboard.session(ResourceKind::Foods);
    for prefix in ["r", "ri", "ric", "rice"] {
        session.set_query(prefix);
    }
    let view = session.search_settled().await;
    assert_eq!(ids(&view.displayed()), ["r1"]);

    let searches = server.received_requests().await.unwrap();
    assert_eq!(searches.len(), 1);
}

#[tokio::test]
async fn test_empty_query_reverts_to_browse_list() {
    let (server, dashboard) = setup().await;
    mount_collection(&server, "allergies", &["a", "b", "c"], 1).await;
    mount_search(&server, "allergies", "abc", &["x", "y", "z"], 0).await;

    let session = dashboard.session(ResourceKind::Allergies);
    session.load_first_page().await.unwrap();

    session.set_query("abc");
    let view = session.search_settled().await;
    assert_eq!(view.displayed().len(), 3);
    assert_eq!(ids(&view.displayed()), ["x", "y", "z"]);

    session.set_query("   ");
    let view = session.view();
    assert!(!view.is_searching());
    assert_eq!(view.search, SearchState::Idle);
    assert_eq!(ids(&view.displayed()), ["a", "b"]);
}

#[tokio::test]
async fn test_search_failure_clears_results() {
    let (server, dashboard) = setup().await;
    Mock::given(method("GET"))
        .and(path("/foods/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = dashboard.session(ResourceKind::Foods);
    session.set_query("oats");
    let view = session.search_settled().await;
    assert_eq!(
        view.search.error(),
        Some("System error, please try again later.")
    );
    assert!(view.displayed().is_empty());
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_then_delete_keeps_list_and_cache_consistent() {
    let (server, dashboard) = setup().await;
    mount_collection(&server, "ingredients", &["1", "2", "3"], 1).await;

    Mock::given(method("POST"))
        .and(path("/ingredients/save"))
        .and(body_json(json!({ "name": "Quinoa" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": "new", "name": "Quinoa" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/ingredients/new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/overview/ingredients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "total": 4 } })))
        .mount(&server)
        .await;

    let session = dashboard.session(ResourceKind::Ingredients);
    session.load_first_page().await.unwrap();

    let created = session
        .create(&json!({ "name": "Quinoa" }))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.id, "new");
    assert_eq!(session.view().browse[0].id, "new");
    assert!(matches!(session.stats(), StatsState::Loaded(_)));

    // Served from the patched cache: the collection mock expects one call.
    let all = dashboard
        .cache()
        .get_or_build(ResourceKind::Ingredients, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(ids(&all), ["new", "1", "2", "3"]);

    session.delete("new").await.unwrap();
    assert!(!session.view().browse.iter().any(|i| i.id == "new"));
    let all = dashboard.cache().peek(ResourceKind::Ingredients).unwrap();
    assert_eq!(ids(&all), ["1", "2", "3"]);
}

#[tokio::test]
async fn test_create_without_echo_or_id_reloads_first_page() {
    let (server, dashboard) = setup().await;
    mount_collection(&server, "conditions", &["1"], 2).await;

    Mock::given(method("POST"))
        .and(path("/conditions"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let session = dashboard.session(ResourceKind::Conditions);
    session.load_first_page().await.unwrap();

    let created = session.create(&json!({ "name": "Gout" })).await.unwrap();
    assert!(created.is_none());
    assert_eq!(ids(&session.view().browse), ["1"]);
}

#[tokio::test]
async fn test_update_without_echo_merges_payload() {
    let (server, dashboard) = setup().await;
    mount_collection(&server, "foods", &["1", "2"], 1).await;

    Mock::given(method("PUT"))
        .and(path("/foods/2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let session = dashboard.session(ResourceKind::Foods);
    session.load_first_page().await.unwrap();

    let updated = session
        .update("2", &json!({ "name": "Porridge", "calories": 150 }))
        .await
        .unwrap();
    assert!(!updated.partial);
    assert_eq!(updated.item.id, "2");
    assert_eq!(updated.item.name, "Porridge");

    let view = session.view();
    assert_eq!(ids(&view.browse), ["1", "2"]);
    assert_eq!(view.browse[1].fields["calories"], 150);
    assert_eq!(
        dashboard.cache().get(ResourceKind::Foods, "2").unwrap().name,
        "Porridge"
    );
}

#[tokio::test]
async fn test_update_without_echo_or_known_row_is_partial() {
    let (server, dashboard) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/foods/9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let payload = json!({ "calories": 90 });
    let updated = dashboard
        .mutator()
        .update(ResourceKind::Foods, "9", &payload, None)
        .await
        .unwrap();
    assert!(updated.partial);
    assert_eq!(updated.item.id, "9");
    assert!(updated.item.name.is_empty());
    assert_eq!(updated.item.fields["calories"], 90);

    // A row the caller already shows is a full base for the merge.
    let known = Arc::new(Item::new("9", "Apple"));
    let updated = dashboard
        .mutator()
        .update(ResourceKind::Foods, "9", &payload, Some(&known))
        .await
        .unwrap();
    assert!(!updated.partial);
    assert_eq!(updated.item.name, "Apple");
    assert_eq!(updated.item.fields["calories"], 90);
}

#[tokio::test]
async fn test_failed_mutation_changes_nothing() {
    let (server, dashboard) = setup().await;
    mount_collection(&server, "allergies", &["1", "2"], 1).await;

    Mock::given(method("POST"))
        .and(path("/allergies"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "Allergy name already exists"
        })))
        .mount(&server)
        .await;

    let session = dashboard.session(ResourceKind::Allergies);
    session.load_first_page().await.unwrap();

    let err = session
        .create(&json!({ "id": "3", "name": "Peanut" }))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { status: 409, .. }));
    assert_eq!(err.field(), Some("name"));
    assert_eq!(err.user_message(), "Allergy name already exists");

    assert_eq!(ids(&session.view().browse), ["1", "2"]);
    let cached = dashboard.cache().peek(ResourceKind::Allergies).unwrap();
    assert_eq!(ids(&cached), ["1", "2"]);
}

// ── Stats and kind switching ────────────────────────────────────────

#[tokio::test]
async fn test_stats_degrade_without_failing_refresh() {
    let (server, dashboard) = setup().await;
    mount_collection(&server, "foods", &["1"], 1).await;
    Mock::given(method("GET"))
        .and(path("/overview/foods"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = dashboard.session(ResourceKind::Foods);
    assert!(session.refresh().await.unwrap());
    assert_eq!(session.stats(), StatsState::Unavailable);
    assert_eq!(ids(&session.view().browse), ["1"]);
}

#[tokio::test]
async fn test_switch_kind_resets_view_and_drops_previous_cache() {
    let (server, dashboard) = setup().await;
    mount_collection(&server, "conditions", &["c1", "c2", "c3"], 1).await;
    mount_collection(&server, "allergies", &["a1"], 1).await;

    let session = dashboard.session(ResourceKind::Conditions);
    session.load_first_page().await.unwrap();
    session.on_sentinel_visible().await.unwrap();
    assert!(dashboard.cache().peek(ResourceKind::Conditions).is_some());

    session.switch_kind(ResourceKind::Allergies).await.unwrap();
    let view = session.view();
    assert_eq!(view.kind, ResourceKind::Allergies);
    assert_eq!(ids(&view.browse), ["a1"]);
    assert!(view.last);
    assert!(dashboard.cache().peek(ResourceKind::Conditions).is_none());
}

#[tokio::test]
async fn test_unauthorized_page_load_stops_scrolling() {
    let server = MockServer::start().await;
    let config = DashboardConfig::new(Url::parse(&server.uri()).unwrap());
    let dashboard = Dashboard::new(config, Arc::new(MemoryTokenStore::new())).unwrap();

    Mock::given(method("GET"))
        .and(path("/foods/all"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let session = dashboard.session(ResourceKind::Foods);
    let err = session.load_first_page().await.unwrap_err();
    assert_eq!(err.user_message(), "You are not authorized. Please sign in again.");

    let view = session.view();
    assert!(!view.loading);
    assert_eq!(view.error.as_deref(), Some("You are not authorized. Please sign in again."));
    assert!(!session.on_sentinel_visible().await.unwrap());
}
