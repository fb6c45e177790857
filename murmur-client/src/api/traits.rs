use async_trait::async_trait;
use murmur_types::{Post, PostId, ProfileUpdate, RemotePath, User, UserId};

use super::ApiResult;

/// Data operations offered by the hosted backend.
///
/// Every call may fail with a recoverable [`ApiError`](super::ApiError); the
/// sync layer never treats a failed call as fatal.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_user(&self, id: UserId) -> ApiResult<User>;

    async fn update_user(&self, id: UserId, update: &ProfileUpdate) -> ApiResult<()>;

    /// First `limit` posts, most recent first, optionally restricted to one author
    async fn list_posts(&self, limit: usize, author: Option<UserId>) -> ApiResult<Vec<Post>>;

    async fn get_post(&self, id: PostId) -> ApiResult<Post>;

    async fn create_like(&self, post_id: PostId, user_id: UserId) -> ApiResult<()>;

    async fn delete_like(&self, post_id: PostId, user_id: UserId) -> ApiResult<()>;

    async fn create_comment(&self, post_id: PostId, user_id: UserId, text: &str) -> ApiResult<()>;
}

/// Remote object storage for uploaded media
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `path` and return the stored path
    async fn put(&self, path: &str, bytes: Vec<u8>) -> ApiResult<RemotePath>;

    async fn get(&self, path: &RemotePath) -> ApiResult<Vec<u8>>;
}

/// Source of authentication sessions
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_out(&self) -> ApiResult<()>;
}

/// Logical screens the navigation gate can send the user to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Home,
}

/// Router that executes navigation instructions
pub trait Navigator: Send + Sync {
    fn redirect(&self, screen: Screen);

    fn go_back(&self);
}
