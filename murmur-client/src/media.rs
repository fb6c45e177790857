use std::path::PathBuf;
use std::sync::Arc;

use murmur_types::{MediaKind, RemotePath, UploadFolder};
use uuid::Uuid;

use crate::api::ObjectStorage;
use crate::error::{ClientError, ClientResult};

/// Opaque handle to media picked or captured on the device (a file path or
/// `file://` URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalHandle(String);

impl LocalHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem path behind the handle
    pub fn path(&self) -> PathBuf {
        PathBuf::from(self.0.strip_prefix("file://").unwrap_or(&self.0))
    }
}

/// Media that exists only on the device so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMedia {
    pub handle: LocalHandle,
    pub kind: MediaKind,
}

impl PendingMedia {
    pub fn new(handle: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            handle: LocalHandle::new(handle),
            kind,
        }
    }

    /// Wrap a media-picker result. `None` for anything that is not an image or video.
    pub fn from_picker(handle: impl Into<String>, mime: &str) -> Option<Self> {
        MediaKind::from_mime(mime).map(|kind| Self::new(handle, kind))
    }
}

/// Either not-yet-uploaded local media or an object already in storage.
///
/// Only [`RemotePath`] appears in wire types, so a `Pending` value has to go
/// through [`MediaResolver::upload`] before anything is sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaReference {
    Remote(RemotePath),
    Pending(PendingMedia),
}

impl From<RemotePath> for MediaReference {
    fn from(path: RemotePath) -> Self {
        MediaReference::Remote(path)
    }
}

impl From<PendingMedia> for MediaReference {
    fn from(media: PendingMedia) -> Self {
        MediaReference::Pending(media)
    }
}

/// Where a piece of media can be displayed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayLocator {
    /// Fetchable URL under the storage root
    Remote(String),
    /// Locally readable URL for immediate preview
    Local(String),
    /// No media; show the bundled default avatar
    Placeholder,
}

impl DisplayLocator {
    pub fn url(&self) -> Option<&str> {
        match self {
            DisplayLocator::Remote(url) | DisplayLocator::Local(url) => Some(url),
            DisplayLocator::Placeholder => None,
        }
    }
}

/// Kind of media stored at `path`, from its folder or else its extension
pub fn media_kind(path: &RemotePath) -> Option<MediaKind> {
    match path.folder() {
        Some(UploadFolder::PostVideos) => return Some(MediaKind::Video),
        Some(UploadFolder::PostImages) | Some(UploadFolder::Profiles) => {
            return Some(MediaKind::Image)
        }
        None => {}
    }

    let extension = path.file_name().rsplit_once('.')?.1.to_lowercase();
    match extension.as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "heic" => Some(MediaKind::Image),
        "mp4" | "mov" | "webm" | "m4v" => Some(MediaKind::Video),
        _ => None,
    }
}

/// Maps media references to locators, uploads local media and downloads
/// remote media for sharing.
pub struct MediaResolver {
    storage: Arc<dyn ObjectStorage>,
    storage_root: String,
    cache_dir: PathBuf,
}

impl MediaResolver {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        storage_root: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage,
            storage_root: storage_root.into().trim_end_matches('/').to_string(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Pure mapping to a display locator; never touches the network
    pub fn resolve(&self, reference: &MediaReference) -> DisplayLocator {
        match reference {
            MediaReference::Remote(path) => DisplayLocator::Remote(self.remote_url(path)),
            MediaReference::Pending(media) => {
                let handle = media.handle.as_str();
                if handle.contains("://") {
                    DisplayLocator::Local(handle.to_string())
                } else {
                    DisplayLocator::Local(format!("file://{}", handle))
                }
            }
        }
    }

    /// Locator for a user's avatar, falling back to the default image
    pub fn resolve_avatar(&self, image: Option<&RemotePath>) -> DisplayLocator {
        match image {
            Some(path) => DisplayLocator::Remote(self.remote_url(path)),
            None => DisplayLocator::Placeholder,
        }
    }

    fn remote_url(&self, path: &RemotePath) -> String {
        format!(
            "{}/{}",
            self.storage_root,
            path.as_str().trim_start_matches('/')
        )
    }

    /// Upload local media under `folder` with a fresh, collision-resistant name.
    ///
    /// All-or-nothing: a failed attempt leaves nothing the caller can use, and a
    /// retry writes to a new name.
    pub async fn upload(&self, media: &PendingMedia, folder: UploadFolder) -> ClientResult<RemotePath> {
        let source = media.handle.path();
        let bytes = tokio::fs::read(&source).await.map_err(|e| {
            log::warn!(target: "media", "Cannot read {}: {}", source.display(), e);
            ClientError::Upload(format!("Cannot read selected media: {}", e))
        })?;

        let object_path = format!(
            "{}/{}-{}.{}",
            folder.as_str(),
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            media.kind.extension()
        );
        log::debug!(target: "media", "Uploading {} bytes to {}", bytes.len(), object_path);

        match self.storage.put(&object_path, bytes).await {
            Ok(path) => {
                log::info!(target: "media", "Uploaded {}", path);
                Ok(path)
            }
            Err(e) => {
                log::warn!(target: "media", "Upload to {} failed: {}", object_path, e);
                Err(ClientError::Upload(
                    e.backend_message()
                        .map(str::to_string)
                        .unwrap_or_else(|| "Could not upload media".to_string()),
                ))
            }
        }
    }

    /// Upload media attached to a new post into the folder for its kind
    pub async fn upload_post_media(&self, media: &PendingMedia) -> ClientResult<RemotePath> {
        self.upload(media, UploadFolder::for_post(media.kind)).await
    }

    /// Remote path for `reference`, uploading it first if it is still local
    pub async fn ensure_remote(
        &self,
        reference: &MediaReference,
        folder: UploadFolder,
    ) -> ClientResult<RemotePath> {
        match reference {
            MediaReference::Remote(path) => Ok(path.clone()),
            MediaReference::Pending(media) => self.upload(media, folder).await,
        }
    }

    /// Download a remote object into the share cache.
    ///
    /// Returns `None` on any failure; callers share without the attachment.
    pub async fn fetch_for_sharing(&self, path: &RemotePath) -> Option<PathBuf> {
        let bytes = match self.storage.get(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!(target: "media", "Download of {} failed: {}", path, e);
                return None;
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.cache_dir).await {
            log::warn!(target: "media", "Cannot create cache dir {}: {}", self.cache_dir.display(), e);
            return None;
        }

        let target = self.cache_dir.join(path.file_name());
        match tokio::fs::write(&target, bytes).await {
            Ok(()) => {
                log::debug!(target: "media", "Cached {} at {}", path, target.display());
                Some(target)
            }
            Err(e) => {
                log::warn!(target: "media", "Cannot write {}: {}", target.display(), e);
                None
            }
        }
    }
}
