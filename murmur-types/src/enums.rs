use serde::{Deserialize, Serialize};

/// Kind of media attached to a post or picked on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    /// File extension used for uploaded objects of this kind
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "png",
            MediaKind::Video => "mp4",
        }
    }

    /// Guess the kind from a mime type such as `image/jpeg`
    pub fn from_mime(mime: &str) -> Option<Self> {
        let top = mime.split('/').next().unwrap_or_default();
        Self::parse(top)
    }
}

/// Top-level storage folder an upload is namespaced under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadFolder {
    Profiles,
    PostImages,
    PostVideos,
}

impl UploadFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadFolder::Profiles => "profiles",
            UploadFolder::PostImages => "postImages",
            UploadFolder::PostVideos => "postVideos",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "profiles" => Some(UploadFolder::Profiles),
            "postImages" => Some(UploadFolder::PostImages),
            "postVideos" => Some(UploadFolder::PostVideos),
            _ => None,
        }
    }

    /// Folder for post attachments of the given kind
    pub fn for_post(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => UploadFolder::PostImages,
            MediaKind::Video => UploadFolder::PostVideos,
        }
    }
}
