use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use murmur_types::Post;

use crate::media::MediaResolver;

/// What gets handed to the platform share sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub text: String,
    /// Locally cached copy of the post's media, if it could be downloaded
    pub file: Option<PathBuf>,
}

/// Build a share payload for `post`. A failed media download still yields a
/// text-only payload.
pub async fn compose_share(resolver: &MediaResolver, post: &Post) -> SharePayload {
    let file = match &post.file {
        Some(path) => resolver.fetch_for_sharing(path).await,
        None => None,
    };
    if post.file.is_some() && file.is_none() {
        log::info!(target: "media", "Sharing post {} without its attachment", post.id);
    }
    SharePayload {
        text: strip_html(&post.body),
        file,
    }
}

/// Matches element tags only; a bare `<` in prose is left alone
fn tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"</?[A-Za-z][^<>]*>").unwrap())
}

/// Drop markup tags and decode the handful of entities the editor emits.
pub fn strip_html(body: &str) -> String {
    tag_regex()
        .replace_all(body, "")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ObjectStorage;
    use crate::testing::{make_posts, FakeStorage};
    use murmur_types::RemotePath;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn resolver(storage: &Arc<FakeStorage>, dir: &TempDir) -> MediaResolver {
        MediaResolver::new(
            Arc::clone(storage) as Arc<dyn ObjectStorage>,
            "https://cdn.example.test",
            dir.path().join("share"),
        )
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_html("a&nbsp;b &amp; c"), "a b & c");
        assert_eq!(strip_html("&lt;tag&gt; &quot;q&quot;"), "<tag> \"q\"");
        assert_eq!(strip_html("plain"), "plain");
    }

    #[test]
    fn test_strip_html_keeps_bare_angle_brackets() {
        assert_eq!(
            strip_html("<p>I <3 rust and 2 < 5</p>"),
            "I <3 rust and 2 < 5"
        );
        assert_eq!(strip_html("a > b<br/>c"), "a > bc");
        assert_eq!(strip_html("<div class=\"x\"><span>ok</span></div>"), "ok");
    }

    #[test]
    fn test_strip_html_decodes_ampersand_last() {
        assert_eq!(strip_html("&amp;lt;"), "&lt;");
    }

    #[tokio::test]
    async fn test_text_only_post() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FakeStorage::default());
        let post = make_posts(Uuid::new_v4(), 1).remove(0);

        let payload = compose_share(&resolver(&storage, &dir), &post).await;

        assert_eq!(payload.text, "post 0");
        assert_eq!(payload.file, None);
        assert_eq!(storage.calls(), 0);
    }

    #[tokio::test]
    async fn test_media_is_cached_for_sharing() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FakeStorage::default());
        storage
            .objects
            .lock()
            .unwrap()
            .insert("postImages/cat.png".into(), b"png".to_vec());
        let mut post = make_posts(Uuid::new_v4(), 1).remove(0);
        post.file = Some(RemotePath::new("postImages/cat.png"));

        let payload = compose_share(&resolver(&storage, &dir), &post).await;

        let file = payload.file.unwrap();
        assert_eq!(std::fs::read(file).unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_failed_download_shares_text() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FakeStorage::default());
        storage.fail_get.store(true, Ordering::SeqCst);
        let mut post = make_posts(Uuid::new_v4(), 1).remove(0);
        post.file = Some(RemotePath::new("postVideos/clip.mp4"));

        let payload = compose_share(&resolver(&storage, &dir), &post).await;

        assert_eq!(payload.text, "post 0");
        assert_eq!(payload.file, None);
    }
}
