//! The user list route.
//!
//! [`UsersRoute`] owns the location and derives everything else from it:
//! filter edits navigate, and a load always fetches what the location
//! currently decodes to. A load whose location changed while it was in
//! flight reports [`LoadOutcome::Superseded`] instead of its data.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::{ApiError, UserClient};
use crate::models::{SearchParams, UserList};
use crate::search::{Location, SearchPatch};

/// Pagination figures for one loaded page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    pub total_pages: u64,
    pub total: u64,
    /// 1-based index of the first user shown, 0 when the page is empty.
    pub first: u64,
    /// 1-based index of the last user shown, 0 when the page is empty.
    pub last: u64,
}

impl PageInfo {
    pub fn of(list: &UserList) -> Self {
        let shown = list.users.len() as u64;
        let offset = u64::from(list.page.saturating_sub(1)) * u64::from(list.limit);
        let (first, last) = if shown == 0 {
            (0, 0)
        } else {
            (offset + 1, offset + shown)
        };
        Self {
            page: list.page,
            total_pages: list.total_pages(),
            total: list.total,
            first,
            last,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }
}

/// A page ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct UsersPage {
    /// The state the page was loaded for.
    pub params: SearchParams,
    pub list: Arc<UserList>,
    pub info: PageInfo,
}

/// Result of [`UsersRoute::load`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Ready(UsersPage),
    /// The location moved on before the response arrived.
    Superseded,
    Failed(ApiError),
}

/// Binds a [`Location`] to the data-access layer.
pub struct UsersRoute {
    client: Arc<UserClient>,
    location: Arc<Mutex<Location>>,
}

impl UsersRoute {
    pub fn new(client: Arc<UserClient>, location: Location) -> Self {
        Self {
            client,
            location: Arc::new(Mutex::new(location)),
        }
    }

    /// Handle for navigating from elsewhere (another task, a key binding).
    pub fn location(&self) -> Arc<Mutex<Location>> {
        Arc::clone(&self.location)
    }

    pub fn href(&self) -> String {
        self.lock().href().to_string()
    }

    /// Search state currently in effect.
    pub fn params(&self) -> SearchParams {
        self.lock().search()
    }

    /// Merge a filter edit into the location. The page resets to 1.
    pub fn update_search(&self, patch: &SearchPatch) -> SearchParams {
        self.lock().update_search(patch)
    }

    pub fn update_page(&self, page: u32) -> SearchParams {
        self.lock().update_page(page)
    }

    /// Rewrite a hand-edited location into the clamped values in effect.
    pub fn normalize(&self) -> bool {
        self.lock().normalize()
    }

    pub fn back(&self) -> bool {
        self.lock().back()
    }

    /// Whatever is cached for the current state, fresh or not.
    pub fn cached(&self) -> Option<Arc<UserList>> {
        let key = self.lock().cache_key();
        self.client.cache().peek(&key)
    }

    /// Load the page the location currently points at.
    pub async fn load(&self) -> LoadOutcome {
        let (revision, params) = {
            let location = self.lock();
            (location.revision(), location.search())
        };

        let result = self.client.list(&params).await;

        if self.lock().revision() != revision {
            tracing::debug!(?params, "location changed during load, dropping result");
            return LoadOutcome::Superseded;
        }
        match result {
            Ok(list) => LoadOutcome::Ready(UsersPage {
                info: PageInfo::of(&list),
                params,
                list,
            }),
            Err(err) => LoadOutcome::Failed(err),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Location> {
        self.location
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::cache::QueryCache;
    use crate::mock::{MockBackend, MockTransport};
    use crate::models::{Role, Status};

    fn route_at(href: &str, latency: Duration) -> (Arc<MockTransport>, UsersRoute) {
        let mock = Arc::new(MockTransport::new(Arc::new(MockBackend::new())).with_latency(latency));
        let client = Arc::new(UserClient::new(mock.clone(), Arc::new(QueryCache::default())));
        let location = Location::parse(href).unwrap();
        (mock, UsersRoute::new(client, location))
    }

    fn ready(outcome: LoadOutcome) -> UsersPage {
        match outcome {
            LoadOutcome::Ready(page) => page,
            other => panic!("expected a page, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn loads_what_the_location_says() {
        let (_, route) = route_at("/users?role=user&limit=2", Duration::ZERO);
        let page = ready(route.load().await);
        assert_eq!(page.params.role, Some(Role::User));
        assert_eq!(page.list.total, 3);
        assert_eq!(page.list.users.len(), 2);
        assert!(page.info.has_next());
    }

    #[tokio::test(start_paused = true)]
    async fn filter_edit_resets_page_and_reloads() {
        let (_, route) = route_at("/users?page=3&limit=1", Duration::ZERO);
        let params = route.update_search(&SearchPatch::default().status(Some(Status::Active)));
        assert_eq!(params.page, 1);
        assert_eq!(route.href(), "http://localhost/users?limit=1&status=active");

        let page = ready(route.load().await);
        assert_eq!(page.list.total, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_during_load_supersedes_it() {
        let (_, route) = route_at("/users", Duration::from_millis(100));
        let location = route.location();

        let (outcome, _) = tokio::join!(route.load(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            location.lock().unwrap().update_page(2);
        });
        assert_eq!(outcome, LoadOutcome::Superseded);

        let page = ready(route.load().await);
        assert_eq!(page.params.page, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_reported_not_thrown() {
        let (mock, route) = route_at("/users", Duration::ZERO);
        mock.fail_next(2);
        assert!(matches!(route.load().await, LoadOutcome::Failed(ApiError::Network(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn cached_page_survives_back_navigation() {
        let (mock, route) = route_at("/users", Duration::ZERO);
        ready(route.load().await);
        route.update_page(2);
        ready(route.load().await);
        assert!(route.back());
        assert!(route.cached().is_some());
        ready(route.load().await);
        assert_eq!(mock.request_count(), 2);
    }

    #[test]
    fn page_info_counts_from_one() {
        let list = UserList {
            users: vec![],
            total: 25,
            page: 3,
            limit: 10,
        };
        let info = PageInfo::of(&list);
        assert_eq!((info.first, info.last), (0, 0));
        assert_eq!(info.total_pages, 3);
        assert!(info.has_previous());
        assert!(!info.has_next());
    }
}
