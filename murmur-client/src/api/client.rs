use async_trait::async_trait;
use murmur_types::*;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::{ApiError, ApiResult, Backend, IdentityProvider, ObjectStorage};

/// REST client for the Murmur backend and its object storage
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    /// Set the access token for authenticated requests
    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Helper to add the bearer token to a request if available
    fn add_auth_header(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.access_token {
            req.bearer_auth(token)
        } else {
            req
        }
    }

    fn storage_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/storage/{}", self.base_url, encoded.join("/"))
    }

    /// Turn a non-success HTTP status into a typed error
    async fn error_from_status(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        // Prefer the envelope message when the body is one
        let clean_error = if let Ok(envelope) =
            serde_json::from_str::<ApiResponse<serde_json::Value>>(&error_text)
        {
            envelope
                .message
                .unwrap_or_else(|| format!("Server returned {} error", status.as_u16()))
        } else if error_text.contains("<html>") || error_text.contains("<!DOCTYPE") {
            // Clean up HTML error messages (e.g., from proxy 404 pages)
            format!(
                "Server returned {} error. Please check the server URL.",
                status.as_u16()
            )
        } else {
            error_text
        };

        match status.as_u16() {
            404 => ApiError::NotFound(clean_error),
            401 => ApiError::Unauthorized(clean_error),
            400 => ApiError::BadRequest(clean_error),
            _ => ApiError::Api(clean_error),
        }
    }

    /// Unwrap the `{success, data, message}` envelope
    async fn read_envelope<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ApiResult<Option<T>> {
        if !response.status().is_success() {
            return Err(Self::error_from_status(response).await);
        }

        let body = response.bytes().await?;
        Self::decode_envelope(&body)
    }

    fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> ApiResult<Option<T>> {
        let envelope: ApiResponse<T> = serde_json::from_slice(body)?;
        if envelope.success {
            Ok(envelope.data)
        } else {
            Err(ApiError::Api(
                envelope
                    .message
                    .unwrap_or_else(|| "Request failed".to_string()),
            ))
        }
    }

    /// Helper for calls that must return data
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> ApiResult<T> {
        self.read_envelope(response)
            .await?
            .ok_or_else(|| ApiError::Api("Response contained no data".to_string()))
    }

    /// Helper for calls whose data is irrelevant
    async fn handle_ack(&self, response: reqwest::Response) -> ApiResult<()> {
        self.read_envelope::<serde_json::Value>(response).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn get_user(&self, id: UserId) -> ApiResult<User> {
        let url = format!("{}/users/{}", self.base_url, id);
        log::debug!(target: "api_calls", "GET {}", url);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn update_user(&self, id: UserId, update: &ProfileUpdate) -> ApiResult<()> {
        let url = format!("{}/users/{}", self.base_url, id);
        log::debug!(target: "api_calls", "PUT {}", url);
        let req = self.add_auth_header(self.client.put(&url).json(update));
        let response = req.send().await?;
        self.handle_ack(response).await
    }

    async fn list_posts(&self, limit: usize, author: Option<UserId>) -> ApiResult<Vec<Post>> {
        let mut url = format!("{}/posts?limit={}", self.base_url, limit);
        if let Some(author_id) = author {
            url.push_str(&format!("&author_id={}", author_id));
        }
        log::debug!(target: "api_calls", "GET {}", url);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn get_post(&self, id: PostId) -> ApiResult<Post> {
        let url = format!("{}/posts/{}", self.base_url, id);
        log::debug!(target: "api_calls", "GET {}", url);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn create_like(&self, post_id: PostId, user_id: UserId) -> ApiResult<()> {
        let url = format!("{}/posts/{}/likes", self.base_url, post_id);
        log::debug!(target: "api_calls", "POST {}", url);
        let request = PostLike { user_id, post_id };
        let req = self.add_auth_header(self.client.post(&url).json(&request));
        let response = req.send().await?;
        self.handle_ack(response).await
    }

    async fn delete_like(&self, post_id: PostId, user_id: UserId) -> ApiResult<()> {
        let url = format!("{}/posts/{}/likes/{}", self.base_url, post_id, user_id);
        log::debug!(target: "api_calls", "DELETE {}", url);
        let req = self.add_auth_header(self.client.delete(&url));
        let response = req.send().await?;
        self.handle_ack(response).await
    }

    async fn create_comment(&self, post_id: PostId, user_id: UserId, text: &str) -> ApiResult<()> {
        let url = format!("{}/posts/{}/comments", self.base_url, post_id);
        log::debug!(target: "api_calls", "POST {}", url);
        let request = CreateCommentRequest {
            user_id,
            text: text.to_string(),
        };
        let req = self.add_auth_header(self.client.post(&url).json(&request));
        let response = req.send().await?;
        self.handle_ack(response).await
    }
}

#[async_trait]
impl ObjectStorage for ApiClient {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> ApiResult<RemotePath> {
        let url = self.storage_url(path);
        log::debug!(target: "api_calls", "PUT {} ({} bytes)", url, bytes.len());
        let req = self.add_auth_header(
            self.client
                .put(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
        );
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn get(&self, path: &RemotePath) -> ApiResult<Vec<u8>> {
        let url = self.storage_url(path.as_str());
        log::debug!(target: "api_calls", "GET {}", url);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_status(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl IdentityProvider for ApiClient {
    async fn sign_out(&self) -> ApiResult<()> {
        let url = format!("{}/auth/logout", self.base_url);
        log::debug!(target: "api_calls", "POST {}", url);
        let req = self.add_auth_header(self.client.post(&url));
        let response = req.send().await?;
        self.handle_ack(response).await
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        let base_url = std::env::var("MURMUR_SERVER_URL")
            .unwrap_or_else(|_| crate::config::DEFAULT_SERVER_URL.to_string());
        Self::new(base_url)
    }
}
