//! Paginated list controller.
//!
//! Composes a [`CollectionFetcher`] with a [`FilterState`]. The visible
//! result is a function of `(page, applied filters)`; every operation that
//! changes that pair issues exactly one fetch for the new pair, and an
//! operation that leaves it unchanged issues none. Draft filter edits
//! never fetch.
//!
//! Each fetch is tagged with a sequence number. A response is applied only
//! if its number is still the latest issued, so a slow response can never
//! overwrite a newer one.
//!
//! State is published as [`ListSnapshot`]s on a `watch` channel. The
//! internal lock is never held across a fetch.

use std::sync::Arc;

use carehub_core::error::CoreError;
use carehub_core::filters::{FilterSchema, FilterState, FilterValues};
use carehub_core::query::{CollectionQuery, Pagination};
use carehub_core::resources::Resource;
use serde::de::DeserializeOwned;
use tokio::sync::{watch, Mutex};

use crate::api::ApiClient;
use crate::fetcher::{CollectionFetcher, RestCollectionFetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStatus {
    /// Not mounted yet.
    Idle,
    Loading,
    Loaded,
    Error,
}

/// What happens to the current rows when a fetch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorRetention {
    /// Drop rows and pagination; the screen shows only the error.
    #[default]
    ClearItems,
    /// Keep the last good rows visible under the error.
    KeepItems,
}

/// Everything a list screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot<T> {
    pub status: ListStatus,
    /// Requested page. May run ahead of `pagination.page` while loading.
    pub page: u32,
    pub limit: u32,
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
    pub error: Option<String>,
    pub draft: FilterValues,
    pub applied: FilterValues,
}

impl<T> ListSnapshot<T> {
    pub fn is_loading(&self) -> bool {
        self.status == ListStatus::Loading
    }

    pub fn has_next_page(&self) -> bool {
        self.pagination.is_some_and(|p| p.has_next_page())
    }

    pub fn has_prev_page(&self) -> bool {
        self.pagination.is_some_and(|p| p.has_prev_page())
    }

    /// Whether the "next" control is enabled.
    pub fn can_go_next(&self) -> bool {
        !self.is_loading() && self.has_next_page()
    }

    /// Whether the "previous" control is enabled.
    pub fn can_go_prev(&self) -> bool {
        !self.is_loading() && self.has_prev_page()
    }

    /// Whether the draft holds unapplied edits.
    pub fn filters_dirty(&self) -> bool {
        self.draft != self.applied
    }
}

struct ListState<T> {
    filters: FilterState,
    page: u32,
    seq: u64,
    last_issued: Option<CollectionQuery>,
    status: ListStatus,
    items: Vec<T>,
    pagination: Option<Pagination>,
    error: Option<String>,
}

/// A fetch the caller must run after releasing the lock.
struct Issued {
    seq: u64,
    query: CollectionQuery,
}

pub struct ListController<T> {
    fetcher: Arc<dyn CollectionFetcher<T>>,
    limit: u32,
    retention: ErrorRetention,
    state: Mutex<ListState<T>>,
    snapshots: watch::Sender<ListSnapshot<T>>,
}

impl<T> ListController<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        fetcher: Arc<dyn CollectionFetcher<T>>,
        filters: &'static FilterSchema,
        limit: u32,
    ) -> Self {
        let state = ListState {
            filters: FilterState::new(filters),
            page: 1,
            seq: 0,
            last_issued: None,
            status: ListStatus::Idle,
            items: Vec::new(),
            pagination: None,
            error: None,
        };
        let limit = CollectionQuery::new(1, limit).limit;
        let (snapshots, _) = watch::channel(snapshot_of(&state, limit));
        Self {
            fetcher,
            limit,
            retention: ErrorRetention::default(),
            state: Mutex::new(state),
            snapshots,
        }
    }

    /// Controller for a list screen backed by the REST API.
    pub fn for_resource(api: Arc<ApiClient>, resource: Resource) -> Self
    where
        T: DeserializeOwned,
    {
        let fetcher = RestCollectionFetcher::<T>::new(api, resource);
        Self::new(Arc::new(fetcher), resource.filters(), resource.default_limit())
    }

    pub fn with_error_retention(mut self, retention: ErrorRetention) -> Self {
        self.retention = retention;
        self
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    // ---- lifecycle ----

    /// Load the first page. Does nothing once the list has fetched.
    pub async fn mount(&self) -> bool {
        let issued = {
            let mut state = self.state.lock().await;
            if state.last_issued.is_some() {
                return false;
            }
            self.issue(&mut state, false)
        };
        self.run(issued).await
    }

    /// Fetch the current page again after a failure.
    pub async fn retry(&self) -> bool {
        let issued = {
            let mut state = self.state.lock().await;
            if state.status != ListStatus::Error {
                return false;
            }
            self.issue(&mut state, true)
        };
        self.run(issued).await
    }

    /// Fetch the current page again, e.g. after a record was saved.
    pub async fn refresh(&self) -> bool {
        let issued = {
            let mut state = self.state.lock().await;
            self.issue(&mut state, true)
        };
        self.run(issued).await
    }

    // ---- filters ----

    /// Edit one draft filter. Never fetches.
    ///
    /// Returns the stored value, which may be sanitised.
    pub async fn set_draft_field(&self, key: &str, value: &str) -> Result<String, CoreError> {
        let mut state = self.state.lock().await;
        let stored = state.filters.set_draft_field(key, value)?.to_string();
        self.publish(&state);
        Ok(stored)
    }

    /// Commit the draft and go back to page 1. Returns whether the
    /// response was applied.
    pub async fn apply_filters(&self) -> bool {
        let issued = {
            let mut state = self.state.lock().await;
            state.filters.apply();
            state.page = 1;
            self.issue(&mut state, false)
        };
        self.run(issued).await
    }

    /// Reset draft and applied filters and go back to page 1.
    pub async fn clear_filters(&self) -> bool {
        let issued = {
            let mut state = self.state.lock().await;
            state.filters.clear();
            state.page = 1;
            self.issue(&mut state, false)
        };
        self.run(issued).await
    }

    // ---- navigation ----

    /// Jump to `page`. Refused while loading, before the first page has
    /// loaded, or outside the known page range.
    pub async fn go_to_page(&self, page: u32) -> bool {
        let issued = {
            let mut state = self.state.lock().await;
            let allowed = state.status != ListStatus::Loading
                && page != state.page
                && state.pagination.is_some_and(|p| p.contains_page(page));
            if !allowed {
                tracing::debug!(page, current = state.page, "Page navigation refused");
                return false;
            }
            state.page = page;
            self.issue(&mut state, false)
        };
        self.run(issued).await
    }

    pub async fn next_page(&self) -> bool {
        let target = {
            let state = self.state.lock().await;
            state.page.saturating_add(1)
        };
        self.go_to_page(target).await
    }

    pub async fn prev_page(&self) -> bool {
        let target = {
            let state = self.state.lock().await;
            state.page.saturating_sub(1)
        };
        if target == 0 {
            return false;
        }
        self.go_to_page(target).await
    }

    // ---- observation ----

    pub fn snapshot(&self) -> ListSnapshot<T> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot<T>> {
        self.snapshots.subscribe()
    }

    // ---- private helpers ----

    /// Start a fetch for the current `(page, applied)` pair unless that
    /// pair was the last one issued. `force` skips the check.
    fn issue(&self, state: &mut ListState<T>, force: bool) -> Option<Issued> {
        let query = state.filters.to_query(state.page, self.limit);
        if !force && state.last_issued.as_ref() == Some(&query) {
            self.publish(state);
            return None;
        }

        state.seq += 1;
        state.last_issued = Some(query.clone());
        state.status = ListStatus::Loading;
        state.error = None;
        self.publish(state);

        Some(Issued {
            seq: state.seq,
            query,
        })
    }

    /// Run an issued fetch and apply its outcome if it is still current.
    async fn run(&self, issued: Option<Issued>) -> bool {
        let Some(Issued { seq, query }) = issued else {
            return false;
        };

        tracing::debug!(seq, page = query.page, limit = query.limit, "Fetching collection page");
        let result = self.fetcher.fetch(&query).await;

        let mut state = self.state.lock().await;
        if state.seq != seq {
            tracing::debug!(seq, latest = state.seq, "Discarding stale collection response");
            return false;
        }

        match result {
            Ok(page) => {
                tracing::debug!(
                    seq,
                    items = page.items.len(),
                    total = page.pagination.total,
                    "Collection page loaded"
                );
                state.status = ListStatus::Loaded;
                state.items = page.items;
                state.pagination = Some(page.pagination);
                state.error = None;
            }
            Err(e) => {
                tracing::warn!(seq, error = %e, "Collection fetch failed");
                state.status = ListStatus::Error;
                state.error = Some(e.user_message());
                if self.retention == ErrorRetention::ClearItems {
                    state.items.clear();
                    state.pagination = None;
                }
            }
        }
        self.publish(&state);
        true
    }

    fn publish(&self, state: &ListState<T>) {
        self.snapshots.send_replace(snapshot_of(state, self.limit));
    }
}

fn snapshot_of<T: Clone>(state: &ListState<T>, limit: u32) -> ListSnapshot<T> {
    ListSnapshot {
        status: state.status,
        page: state.page,
        limit,
        items: state.items.clone(),
        pagination: state.pagination,
        error: state.error.clone(),
        draft: state.filters.draft().clone(),
        applied: state.filters.applied().clone(),
    }
}

#[cfg(test)]
mod tests {
    use carehub_core::query::CollectionPage;

    use super::*;
    use crate::error::ClientError;

    struct Fixed;

    #[async_trait::async_trait]
    impl CollectionFetcher<u32> for Fixed {
        async fn fetch(&self, query: &CollectionQuery) -> Result<CollectionPage<u32>, ClientError> {
            Ok(CollectionPage {
                items: vec![query.page],
                pagination: Pagination {
                    total: 3,
                    page: query.page,
                    pages: 3,
                    limit: 1,
                },
            })
        }
    }

    fn controller() -> ListController<u32> {
        ListController::new(
            Arc::new(Fixed),
            carehub_core::resources::Resource::Doctors.filters(),
            1,
        )
    }

    #[tokio::test]
    async fn starts_idle_and_refuses_navigation() {
        let list = controller();
        assert_eq!(list.snapshot().status, ListStatus::Idle);
        assert!(!list.next_page().await);
    }

    #[tokio::test]
    async fn prev_is_disabled_on_first_page_and_next_on_last() {
        let list = controller();
        list.mount().await;
        assert!(!list.snapshot().can_go_prev());
        assert!(!list.prev_page().await);

        assert!(list.go_to_page(3).await);
        let snap = list.snapshot();
        assert_eq!(snap.items, vec![3]);
        assert!(!snap.can_go_next());
        assert!(!list.next_page().await);
        assert!(!list.go_to_page(4).await);
    }

    #[tokio::test]
    async fn mount_only_fetches_once() {
        let list = controller();
        assert!(list.mount().await);
        assert!(!list.mount().await);
    }
}
