//! Integration tests for the location, filter state, and list route.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use userdesk::cache::QueryCache;
use userdesk::client::UserClient;
use userdesk::mock::{MockBackend, MockTransport};
use userdesk::models::{Role, SearchParams, Status};
use userdesk::search::{Location, SearchPatch};
use userdesk::view::{LoadOutcome, UsersRoute};

fn route(href: &str, latency: Duration) -> (Arc<MockTransport>, Arc<UsersRoute>) {
    let mock = Arc::new(MockTransport::new(Arc::new(MockBackend::new())).with_latency(latency));
    let client = Arc::new(UserClient::new(mock.clone(), Arc::new(QueryCache::default())));
    let location = Location::parse(href).unwrap();
    (mock, Arc::new(UsersRoute::new(client, location)))
}

// ---------------------------------------------------------------------------
// location and cache keys
// ---------------------------------------------------------------------------

#[test]
fn default_values_are_left_out_of_the_url() {
    let mut location = Location::parse("/users?page=1&limit=10&search=").unwrap();
    assert!(location.normalize());
    assert_eq!(location.href(), "http://localhost/users");
    assert_eq!(location.search(), SearchParams::default());
}

#[test]
fn equivalent_urls_share_a_cache_key() {
    let a = Location::parse("/users?role=admin").unwrap();
    let b = Location::parse("/users?page=1&role=admin&unknown=x").unwrap();
    let c = Location::parse("/users?role=admin&status=active").unwrap();
    assert_eq!(a.cache_key(), b.cache_key());
    assert_ne!(a.cache_key(), c.cache_key());
}

#[test]
fn hand_edited_values_are_clamped() {
    let location = Location::parse("/users?page=-3&limit=500&role=root").unwrap();
    let params = location.search();
    assert_eq!(params.page, 1);
    assert_eq!(params.limit, 100);
    assert_eq!(params.role, None);
}

#[test]
fn any_filter_edit_resets_page() {
    let mut location = Location::parse("/users?page=4&role=admin").unwrap();
    let params = location.update_search(&SearchPatch::default().status(Some(Status::Inactive)));
    assert_eq!(params.page, 1);
    assert_eq!(params.role, Some(Role::Admin));
    assert_eq!(params.status, Some(Status::Inactive));
    assert_eq!(location.href(), "http://localhost/users?role=admin&status=inactive");
}

#[test]
fn page_edits_keep_filters_and_back_restores() {
    let mut location = Location::parse("/users?search=jo").unwrap();
    location.update_page(3);
    assert_eq!(location.href(), "http://localhost/users?page=3&search=jo");
    assert!(location.back());
    assert_eq!(location.href(), "http://localhost/users?search=jo");
    assert!(!location.back());
}

// ---------------------------------------------------------------------------
// route loading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_reflects_location_filters() {
    let (_, route) = route("/users?status=active&limit=2", Duration::ZERO);
    match route.load().await {
        LoadOutcome::Ready(page) => {
            assert_eq!(page.list.total, 3);
            assert_eq!(page.list.users.len(), 2);
            assert_eq!(page.info.total_pages, 2);
            assert!(page.info.has_next());
            assert!(!page.info.has_previous());
        }
        other => panic!("expected a page, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn navigation_during_load_supersedes_it() {
    let (_, route) = route("/users", Duration::from_millis(100));

    let loading = tokio::spawn({
        let route = Arc::clone(&route);
        async move { route.load().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    route.update_search(&SearchPatch::default().role(Some(Role::User)));

    assert_eq!(loading.await.unwrap(), LoadOutcome::Superseded);

    match route.load().await {
        LoadOutcome::Ready(page) => {
            assert_eq!(page.params.role, Some(Role::User));
            assert_eq!(page.list.total, 3);
        }
        other => panic!("expected a page, got {other:?}"),
    }
}

#[tokio::test]
async fn going_back_reuses_the_cached_page() {
    let (mock, route) = route("/users", Duration::ZERO);
    assert!(matches!(route.load().await, LoadOutcome::Ready(_)));
    route.update_page(2);
    assert!(matches!(route.load().await, LoadOutcome::Ready(_)));
    assert!(route.back());

    assert!(route.cached().is_some());
    assert!(matches!(route.load().await, LoadOutcome::Ready(_)));
    assert_eq!(mock.request_count(), 2);
}
