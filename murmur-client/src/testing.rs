//! In-memory collaborators for unit tests
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use murmur_types::*;
use uuid::Uuid;

use crate::api::{ApiError, ApiResult, Backend, IdentityProvider, Navigator, ObjectStorage, Screen};

pub fn auth_session(email: &str) -> AuthSession {
    AuthSession {
        access_token: format!("token-{}", Uuid::new_v4()),
        user: AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            name: None,
        },
    }
}

/// `count` posts by `author`, newest first
pub fn make_posts(author: UserId, count: usize) -> Vec<Post> {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    (0..count)
        .map(|i| Post {
            id: Uuid::new_v4(),
            user: PostAuthor {
                id: author,
                name: "author".to_string(),
                image: None,
            },
            body: format!("<p>post {}</p>", i),
            file: None,
            created_at: base - Duration::minutes(i as i64),
            likes: Vec::new(),
            comment_count: 0,
        })
        .collect()
}

#[derive(Default)]
pub struct FakeBackend {
    pub users: Mutex<HashMap<UserId, User>>,
    pub posts: Mutex<Vec<Post>>,
    pub likes: Mutex<HashSet<(PostId, UserId)>>,
    pub comments: Mutex<Vec<(PostId, UserId, String)>>,
    pub updates: Mutex<Vec<(UserId, ProfileUpdate)>>,
    pub list_limits: Mutex<Vec<(usize, Option<UserId>)>>,
    pub fail_get_user: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_list: AtomicBool,
    pub fail_likes: AtomicBool,
    pub fail_comment: AtomicBool,
    calls: AtomicUsize,
}

impl FakeBackend {
    pub fn with_posts(posts: Vec<Post>) -> Self {
        let backend = Self::default();
        *backend.posts.lock().unwrap() = posts;
        backend
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn insert_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Every backend call is a suspension point
        tokio::task::yield_now().await;
    }

    fn check(flag: &AtomicBool, message: &str) -> ApiResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(ApiError::Api(message.to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn get_user(&self, id: UserId) -> ApiResult<User> {
        self.enter().await;
        Self::check(&self.fail_get_user, "user lookup failed")?;
        self.users
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("user {}", id)))
    }

    async fn update_user(&self, id: UserId, update: &ProfileUpdate) -> ApiResult<()> {
        self.enter().await;
        Self::check(&self.fail_update, "profile rejected")?;
        self.updates.lock().unwrap().push((id, update.clone()));
        Ok(())
    }

    async fn list_posts(&self, limit: usize, author: Option<UserId>) -> ApiResult<Vec<Post>> {
        self.enter().await;
        self.list_limits.lock().unwrap().push((limit, author));
        Self::check(&self.fail_list, "feed unavailable")?;
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| author.map_or(true, |id| post.user.id == id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_post(&self, id: PostId) -> ApiResult<Post> {
        self.enter().await;
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("post {}", id)))
    }

    async fn create_like(&self, post_id: PostId, user_id: UserId) -> ApiResult<()> {
        self.enter().await;
        Self::check(&self.fail_likes, "")?;
        self.likes.lock().unwrap().insert((post_id, user_id));
        Ok(())
    }

    async fn delete_like(&self, post_id: PostId, user_id: UserId) -> ApiResult<()> {
        self.enter().await;
        Self::check(&self.fail_likes, "")?;
        self.likes.lock().unwrap().remove(&(post_id, user_id));
        Ok(())
    }

    async fn create_comment(&self, post_id: PostId, user_id: UserId, text: &str) -> ApiResult<()> {
        self.enter().await;
        Self::check(&self.fail_comment, "comments are closed")?;
        self.comments
            .lock()
            .unwrap()
            .push((post_id, user_id, text.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStorage {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_put: AtomicBool,
    pub fail_get: AtomicBool,
    calls: AtomicUsize,
}

impl FakeStorage {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> ApiResult<RemotePath> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        FakeBackend::check(&self.fail_put, "bucket full")?;
        self.objects.lock().unwrap().insert(path.to_string(), bytes);
        Ok(RemotePath::new(path))
    }

    async fn get(&self, path: &RemotePath) -> ApiResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        FakeBackend::check(&self.fail_get, "object unavailable")?;
        self.objects
            .lock()
            .unwrap()
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| ApiError::NotFound(path.to_string()))
    }
}

#[derive(Default)]
pub struct FakeIdentityProvider {
    pub fail: AtomicBool,
    pub sign_outs: AtomicUsize,
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_out(&self) -> ApiResult<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        FakeBackend::check(&self.fail, "")
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub redirects: Mutex<Vec<Screen>>,
    pub backs: AtomicUsize,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<Screen> {
        self.redirects.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, screen: Screen) {
        self.redirects.lock().unwrap().push(screen);
    }

    fn go_back(&self) {
        self.backs.fetch_add(1, Ordering::SeqCst);
    }
}
