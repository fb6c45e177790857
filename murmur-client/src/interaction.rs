use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use murmur_types::{Post, PostId, UserId};

use crate::api::Backend;
use crate::error::{ClientError, ClientResult};
use crate::lock_unpoisoned;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeDirection {
    Like,
    Unlike,
}

/// One optimistic like mutation: applied locally first, then sent, and undone
/// with its inverse if the backend rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeCommand {
    pub post_id: PostId,
    pub user_id: UserId,
    pub direction: LikeDirection,
}

impl LikeCommand {
    /// The command that flips `user_id`'s membership in `likes`
    pub fn toggle_for(likes: &HashSet<UserId>, post_id: PostId, user_id: UserId) -> Self {
        let direction = if likes.contains(&user_id) {
            LikeDirection::Unlike
        } else {
            LikeDirection::Like
        };
        Self {
            post_id,
            user_id,
            direction,
        }
    }

    pub fn apply(&self, likes: &mut HashSet<UserId>) {
        match self.direction {
            LikeDirection::Like => {
                likes.insert(self.user_id);
            }
            LikeDirection::Unlike => {
                likes.remove(&self.user_id);
            }
        }
    }

    pub fn inverse(&self) -> Self {
        Self {
            direction: match self.direction {
                LikeDirection::Like => LikeDirection::Unlike,
                LikeDirection::Unlike => LikeDirection::Like,
            },
            ..*self
        }
    }
}

#[derive(Debug, Clone)]
struct TrackedPost {
    likes: HashSet<UserId>,
    comment_count: i32,
}

type ToggleLock = Arc<tokio::sync::Mutex<()>>;

/// Per-post like state with optimistic toggles, plus comment submission.
pub struct PostInteractions {
    backend: Arc<dyn Backend>,
    posts: Mutex<HashMap<PostId, TrackedPost>>,
    toggle_locks: Mutex<HashMap<(PostId, UserId), ToggleLock>>,
}

impl PostInteractions {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            posts: Mutex::new(HashMap::new()),
            toggle_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Seed local state from a feed item. A post that is already tracked keeps
    /// its local state.
    pub fn track(&self, post: &Post) {
        lock_unpoisoned(&self.posts)
            .entry(post.id)
            .or_insert_with(|| TrackedPost {
                likes: post.like_set(),
                comment_count: post.comment_count,
            });
    }

    pub fn track_all<'a>(&self, posts: impl IntoIterator<Item = &'a Post>) {
        for post in posts {
            self.track(post);
        }
    }

    pub fn untrack(&self, post_id: PostId) {
        lock_unpoisoned(&self.posts).remove(&post_id);
        lock_unpoisoned(&self.toggle_locks).retain(|(post, _), _| *post != post_id);
    }

    pub fn likes(&self, post_id: PostId) -> Option<HashSet<UserId>> {
        lock_unpoisoned(&self.posts)
            .get(&post_id)
            .map(|tracked| tracked.likes.clone())
    }

    pub fn is_liked(&self, post_id: PostId, user_id: UserId) -> bool {
        lock_unpoisoned(&self.posts)
            .get(&post_id)
            .is_some_and(|tracked| tracked.likes.contains(&user_id))
    }

    pub fn like_count(&self, post_id: PostId) -> usize {
        lock_unpoisoned(&self.posts)
            .get(&post_id)
            .map_or(0, |tracked| tracked.likes.len())
    }

    pub fn comment_count(&self, post_id: PostId) -> i32 {
        lock_unpoisoned(&self.posts)
            .get(&post_id)
            .map_or(0, |tracked| tracked.comment_count)
    }

    /// Flip `user_id`'s like on `post_id`.
    ///
    /// The local set changes before the request is sent. Toggles for the same
    /// (post, user) pair run one at a time in call order; a second tap waits
    /// for the first round trip and then toggles from the state it left.
    pub async fn toggle_like(&self, post_id: PostId, user_id: UserId) -> ClientResult<LikeCommand> {
        let turn = {
            let mut locks = lock_unpoisoned(&self.toggle_locks);
            Arc::clone(locks.entry((post_id, user_id)).or_default())
        };
        let result = {
            let _turn = turn.lock().await;
            self.toggle_in_turn(post_id, user_id).await
        };

        // Drop the pair's lock once nobody else is queued on it
        let key = (post_id, user_id);
        let mut locks = lock_unpoisoned(&self.toggle_locks);
        let ours = locks.get(&key).is_some_and(|lock| Arc::ptr_eq(lock, &turn));
        if ours && Arc::strong_count(&turn) == 2 {
            locks.remove(&key);
        }
        result
    }

    async fn toggle_in_turn(&self, post_id: PostId, user_id: UserId) -> ClientResult<LikeCommand> {
        let command = {
            let mut posts = lock_unpoisoned(&self.posts);
            let tracked = posts
                .get_mut(&post_id)
                .ok_or_else(|| ClientError::NotFound(format!("post {}", post_id)))?;
            let command = LikeCommand::toggle_for(&tracked.likes, post_id, user_id);
            command.apply(&mut tracked.likes);
            command
        };
        log::debug!(target: "likes", "{:?} applied locally", command);

        let result = match command.direction {
            LikeDirection::Like => self.backend.create_like(post_id, user_id).await,
            LikeDirection::Unlike => self.backend.delete_like(post_id, user_id).await,
        };

        match result {
            Ok(()) => Ok(command),
            Err(e) => {
                if let Some(tracked) = lock_unpoisoned(&self.posts).get_mut(&post_id) {
                    command.inverse().apply(&mut tracked.likes);
                }
                log::warn!(target: "likes", "{:?} rolled back: {}", command, e);
                Err(ClientError::from_api(&e, "Something went wrong"))
            }
        }
    }

    /// Post a comment. The caller clears its input only on `Ok`.
    pub async fn submit_comment(&self, post_id: PostId, user_id: UserId, text: &str) -> ClientResult<()> {
        if text.trim().is_empty() {
            return Err(ClientError::EmptyInput);
        }

        match self.backend.create_comment(post_id, user_id, text).await {
            Ok(()) => {
                if let Some(tracked) = lock_unpoisoned(&self.posts).get_mut(&post_id) {
                    tracked.comment_count += 1;
                }
                Ok(())
            }
            Err(e) => {
                log::warn!(target: "likes", "Comment on {} failed: {}", post_id, e);
                Err(ClientError::from_api(&e, "Could not post comment"))
            }
        }
    }

    /// Fetch a single post (post details screen) and start tracking it
    pub async fn load_post(&self, post_id: PostId) -> ClientResult<Post> {
        let post = self
            .backend
            .get_post(post_id)
            .await
            .map_err(|e| ClientError::from_api(&e, "Could not load post"))?;
        self.track(&post);
        Ok(post)
    }
}
