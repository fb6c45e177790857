use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use murmur_types::{Post, UserId};

use crate::api::Backend;
use crate::error::{ClientError, ClientResult};
use crate::lock_unpoisoned;
use crate::session::SessionStore;

/// A pagination context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedScope {
    Global,
    Author(UserId),
}

impl FeedScope {
    pub fn author(&self) -> Option<UserId> {
        match self {
            FeedScope::Global => None,
            FeedScope::Author(id) => Some(*id),
        }
    }
}

/// What a `load_more` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The window grew; `total` items are now held
    Loaded { total: usize },
    /// The larger window returned nothing new; the scope is now exhausted
    ReachedEnd { total: usize },
    /// Scope was already exhausted; nothing was fetched
    Exhausted,
    /// A load for this scope was already running; this trigger was dropped
    InFlight,
    /// The session ended while fetching; the result was thrown away
    Discarded,
}

#[derive(Debug, Default)]
struct PageState {
    items: Vec<Post>,
    limit: usize,
    exhausted: bool,
    in_flight: bool,
    /// Bumped by `reset`; loads started under an older generation are dropped
    generation: u64,
}

/// Incremental, per-scope feed pagination.
///
/// Each `load_more` asks the backend for a larger prefix of the feed and
/// replaces the held items with it. Items are never merged, so a post
/// inserted at the head between two loads shifts the window by one.
pub struct FeedPaginator {
    backend: Arc<dyn Backend>,
    session: Arc<SessionStore>,
    page_increment: usize,
    scopes: Mutex<HashMap<FeedScope, PageState>>,
}

impl FeedPaginator {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionStore>, page_increment: usize) -> Self {
        Self {
            backend,
            session,
            page_increment: page_increment.max(1),
            scopes: Mutex::new(HashMap::new()),
        }
    }

    pub async fn load_more(&self, scope: FeedScope) -> ClientResult<LoadOutcome> {
        let (limit, previous_len, generation) = {
            let mut scopes = lock_unpoisoned(&self.scopes);
            let state = scopes.entry(scope).or_default();
            if state.exhausted {
                return Ok(LoadOutcome::Exhausted);
            }
            if state.in_flight {
                log::debug!(target: "feed", "{:?}: load already in flight, skipping", scope);
                return Ok(LoadOutcome::InFlight);
            }
            state.in_flight = true;
            state.limit += self.page_increment;
            (state.limit, state.items.len(), state.generation)
        };

        let epoch = self.session.epoch();
        log::debug!(target: "feed", "{:?}: fetching with limit {}", scope, limit);
        let result = self.backend.list_posts(limit, scope.author()).await;

        let mut scopes = lock_unpoisoned(&self.scopes);
        let state = scopes.entry(scope).or_default();
        if state.generation != generation {
            log::debug!(target: "feed", "{:?}: scope was reset during fetch, result dropped", scope);
            return Ok(LoadOutcome::Discarded);
        }
        state.in_flight = false;

        if self.session.epoch() != epoch {
            state.limit = state.limit.saturating_sub(self.page_increment);
            log::info!(target: "feed", "{:?}: session ended during fetch, result discarded", scope);
            return Ok(LoadOutcome::Discarded);
        }

        let posts = match result {
            Ok(posts) => posts,
            Err(e) => {
                state.limit = state.limit.saturating_sub(self.page_increment);
                log::warn!(target: "feed", "{:?}: fetch failed: {}", scope, e);
                return Err(ClientError::from_api(&e, "Could not load posts"));
            }
        };

        let posts = dedup_by_id(posts);
        if posts.len() == previous_len {
            state.exhausted = true;
            log::info!(target: "feed", "{:?}: no more posts after {}", scope, posts.len());
            return Ok(LoadOutcome::ReachedEnd { total: previous_len });
        }

        state.items = posts;
        Ok(LoadOutcome::Loaded {
            total: state.items.len(),
        })
    }

    /// Items fetched so far, in server order
    pub fn items(&self, scope: FeedScope) -> Vec<Post> {
        lock_unpoisoned(&self.scopes)
            .get(&scope)
            .map(|state| state.items.clone())
            .unwrap_or_default()
    }

    pub fn is_exhausted(&self, scope: FeedScope) -> bool {
        lock_unpoisoned(&self.scopes)
            .get(&scope)
            .is_some_and(|state| state.exhausted)
    }

    pub fn limit(&self, scope: FeedScope) -> usize {
        lock_unpoisoned(&self.scopes)
            .get(&scope)
            .map_or(0, |state| state.limit)
    }

    /// Start a fresh instance of `scope` (e.g. when its screen is re-entered)
    pub fn reset(&self, scope: FeedScope) {
        let mut scopes = lock_unpoisoned(&self.scopes);
        let generation = scopes.get(&scope).map_or(0, |state| state.generation + 1);
        scopes.insert(
            scope,
            PageState {
                generation,
                ..Default::default()
            },
        );
    }
}

/// Keep the first occurrence of every post id
fn dedup_by_id(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::with_capacity(posts.len());
    posts.into_iter().filter(|post| seen.insert(post.id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{auth_session, make_posts, FakeBackend};
    use std::sync::atomic::Ordering;
    use uuid::Uuid;

    fn paginator(backend: &Arc<FakeBackend>, session: &Arc<SessionStore>, step: usize) -> FeedPaginator {
        FeedPaginator::new(
            Arc::clone(backend) as Arc<dyn Backend>,
            Arc::clone(session),
            step,
        )
    }

    #[tokio::test]
    async fn test_seven_items_step_four() {
        let author = Uuid::new_v4();
        let backend = Arc::new(FakeBackend::with_posts(make_posts(author, 7)));
        let session = Arc::new(SessionStore::new());
        let feed = paginator(&backend, &session, 4);
        let scope = FeedScope::Global;

        assert_eq!(feed.load_more(scope).await.unwrap(), LoadOutcome::Loaded { total: 4 });
        assert!(!feed.is_exhausted(scope));

        assert_eq!(feed.load_more(scope).await.unwrap(), LoadOutcome::Loaded { total: 7 });
        assert!(!feed.is_exhausted(scope));

        assert_eq!(feed.load_more(scope).await.unwrap(), LoadOutcome::ReachedEnd { total: 7 });
        assert!(feed.is_exhausted(scope));
        assert_eq!(feed.items(scope).len(), 7);

        let calls = backend.calls();
        assert_eq!(feed.load_more(scope).await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(backend.calls(), calls);
        assert_eq!(feed.items(scope).len(), 7);
    }

    #[tokio::test]
    async fn test_items_keep_server_order() {
        let posts = make_posts(Uuid::new_v4(), 5);
        let expected: Vec<_> = posts.iter().map(|p| p.id).collect();
        let backend = Arc::new(FakeBackend::with_posts(posts));
        let session = Arc::new(SessionStore::new());
        let feed = paginator(&backend, &session, 10);

        feed.load_more(FeedScope::Global).await.unwrap();
        let ids: Vec<_> = feed.items(FeedScope::Global).iter().map(|p| p.id).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_empty_first_page_is_terminal() {
        let backend = Arc::new(FakeBackend::default());
        let session = Arc::new(SessionStore::new());
        let feed = paginator(&backend, &session, 4);

        assert_eq!(
            feed.load_more(FeedScope::Global).await.unwrap(),
            LoadOutcome::ReachedEnd { total: 0 }
        );
        assert!(feed.is_exhausted(FeedScope::Global));
        assert!(feed.items(FeedScope::Global).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_state_for_retry() {
        let backend = Arc::new(FakeBackend::with_posts(make_posts(Uuid::new_v4(), 6)));
        let session = Arc::new(SessionStore::new());
        let feed = paginator(&backend, &session, 4);
        let scope = FeedScope::Global;

        feed.load_more(scope).await.unwrap();
        backend.fail_list.store(true, Ordering::SeqCst);

        let err = feed.load_more(scope).await.unwrap_err();
        assert_eq!(err, ClientError::Network("feed unavailable".into()));
        assert!(!feed.is_exhausted(scope));
        assert_eq!(feed.items(scope).len(), 4);
        assert_eq!(feed.limit(scope), 4);

        backend.fail_list.store(false, Ordering::SeqCst);
        assert_eq!(feed.load_more(scope).await.unwrap(), LoadOutcome::Loaded { total: 6 });
        assert_eq!(backend.list_limits.lock().unwrap().last(), Some(&(8, None)));
    }

    #[tokio::test]
    async fn test_failure_on_empty_scope_is_not_exhaustion() {
        let backend = Arc::new(FakeBackend::default());
        backend.fail_list.store(true, Ordering::SeqCst);
        let session = Arc::new(SessionStore::new());
        let feed = paginator(&backend, &session, 4);

        assert!(feed.load_more(FeedScope::Global).await.is_err());
        assert!(!feed.is_exhausted(FeedScope::Global));
    }

    #[tokio::test]
    async fn test_concurrent_triggers_are_suppressed() {
        let backend = Arc::new(FakeBackend::with_posts(make_posts(Uuid::new_v4(), 20)));
        let session = Arc::new(SessionStore::new());
        let feed = paginator(&backend, &session, 4);

        let (a, b) = tokio::join!(
            feed.load_more(FeedScope::Global),
            feed.load_more(FeedScope::Global)
        );

        assert_eq!(a.unwrap(), LoadOutcome::Loaded { total: 4 });
        assert_eq!(b.unwrap(), LoadOutcome::InFlight);
        assert_eq!(feed.limit(FeedScope::Global), 4);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_scopes_are_independent() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut posts = make_posts(alice, 3);
        posts.extend(make_posts(bob, 9));
        let backend = Arc::new(FakeBackend::with_posts(posts));
        let session = Arc::new(SessionStore::new());
        let feed = paginator(&backend, &session, 4);

        let (global, mine) = tokio::join!(
            feed.load_more(FeedScope::Global),
            feed.load_more(FeedScope::Author(alice))
        );
        assert_eq!(global.unwrap(), LoadOutcome::Loaded { total: 4 });
        assert_eq!(mine.unwrap(), LoadOutcome::Loaded { total: 3 });

        feed.load_more(FeedScope::Global).await.unwrap();
        assert_eq!(feed.limit(FeedScope::Global), 8);
        assert_eq!(feed.limit(FeedScope::Author(alice)), 4);
        assert!(feed
            .items(FeedScope::Author(alice))
            .iter()
            .all(|post| post.user.id == alice));
    }

    #[tokio::test]
    async fn test_duplicates_suppressed() {
        let mut posts = make_posts(Uuid::new_v4(), 3);
        posts.insert(1, posts[0].clone());
        let backend = Arc::new(FakeBackend::with_posts(posts));
        let session = Arc::new(SessionStore::new());
        let feed = paginator(&backend, &session, 10);

        assert_eq!(
            feed.load_more(FeedScope::Global).await.unwrap(),
            LoadOutcome::Loaded { total: 3 }
        );
        let ids: HashSet<_> = feed.items(FeedScope::Global).iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_sign_out_during_fetch_discards_result() {
        let backend = Arc::new(FakeBackend::with_posts(make_posts(Uuid::new_v4(), 5)));
        let session = Arc::new(SessionStore::new());
        session.set_authenticated_user(auth_session("a@example.test"));
        let feed = paginator(&backend, &session, 4);

        let (outcome, ()) = tokio::join!(feed.load_more(FeedScope::Global), async {
            session.clear();
        });

        assert_eq!(outcome.unwrap(), LoadOutcome::Discarded);
        assert!(feed.items(FeedScope::Global).is_empty());
        assert_eq!(feed.limit(FeedScope::Global), 0);
        assert!(!feed.is_exhausted(FeedScope::Global));
    }

    #[tokio::test]
    async fn test_reset_starts_fresh() {
        let backend = Arc::new(FakeBackend::default());
        let session = Arc::new(SessionStore::new());
        let feed = paginator(&backend, &session, 4);

        feed.load_more(FeedScope::Global).await.unwrap();
        assert!(feed.is_exhausted(FeedScope::Global));

        backend.posts.lock().unwrap().extend(make_posts(Uuid::new_v4(), 2));
        feed.reset(FeedScope::Global);
        assert!(!feed.is_exhausted(FeedScope::Global));
        assert_eq!(
            feed.load_more(FeedScope::Global).await.unwrap(),
            LoadOutcome::Loaded { total: 2 }
        );
    }

    #[tokio::test]
    async fn test_reset_during_fetch_drops_stale_result() {
        let backend = Arc::new(FakeBackend::with_posts(make_posts(Uuid::new_v4(), 5)));
        let session = Arc::new(SessionStore::new());
        let feed = paginator(&backend, &session, 4);

        let (outcome, ()) = tokio::join!(feed.load_more(FeedScope::Global), async {
            feed.reset(FeedScope::Global);
        });

        assert_eq!(outcome.unwrap(), LoadOutcome::Discarded);
        assert!(feed.items(FeedScope::Global).is_empty());
        assert_eq!(feed.limit(FeedScope::Global), 0);
        assert_eq!(
            feed.load_more(FeedScope::Global).await.unwrap(),
            LoadOutcome::Loaded { total: 4 }
        );
    }
}
