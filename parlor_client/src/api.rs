use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::TokenStore;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{
    AddCommentRequest, Conversation, LikeResponse, Message, Post, SendMessageRequest,
};

/// Typed client for the backend REST API. Every request carries the bearer
/// token from the shared [`TokenStore`]; a missing token refuses the call
/// before anything is dispatched.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, tokens: TokenStore) -> Result<Self> {
        Self::with_timeout(base_url, tokens, Duration::from_secs(15))
    }

    pub fn from_config(config: &ClientConfig, tokens: TokenStore) -> Result<Self> {
        Self::with_timeout(&config.api_base_url, tokens, config.request_timeout())
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        tokens: TokenStore,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = sanitize_base_url(base_url.into())?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            client,
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Precondition check used by the synchronizers before they touch local
    /// state: without a token no request would be sent anyway.
    pub fn ensure_authenticated(&self) -> Result<()> {
        self.tokens.require().map(|_| ())
    }

    pub async fn send_message(&self, conversation_id: &str, body: &str) -> Result<Message> {
        let request = SendMessageRequest {
            message: body.to_string(),
        };
        self.post_json(&format!("/chat/message/{conversation_id}"), &request)
            .await
    }

    pub async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        self.get_json(&format!("/chat/messages/{conversation_id}"))
            .await
    }

    pub async fn fetch_conversations(&self) -> Result<Vec<Conversation>> {
        self.get_json("/chat/conversations").await
    }

    pub async fn toggle_like(&self, post_id: &str) -> Result<LikeResponse> {
        self.post_empty(&format!("/posts/{post_id}/like")).await
    }

    pub async fn fetch_feed(&self) -> Result<Vec<Post>> {
        self.get_json("/posts").await
    }

    pub async fn add_comment(&self, post_id: &str, body: &str) -> Result<Post> {
        let request = AddCommentRequest {
            comment: body.to_string(),
        };
        self.post_json(&format!("/posts/{post_id}/comment"), &request)
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.tokens.require()?;
        let response = self
            .client
            .get(self.url(path)?)
            .bearer_auth(token)
            .send()
            .await?;
        Self::into_json(path, response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let token = self.tokens.require()?;
        let response = self
            .client
            .post(self.url(path)?)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        Self::into_json(path, response).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.tokens.require()?;
        let response = self
            .client
            .post(self.url(path)?)
            .bearer_auth(token)
            .send()
            .await?;
        Self::into_json(path, response).await
    }

    async fn into_json<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status,
                path: path.to_string(),
            });
        }
        Ok(response.json().await?)
    }

    fn url(&self, path: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| Error::InvalidBaseUrl(err.to_string()))?;
        url.set_path(path.trim_start_matches('/'));
        Ok(url)
    }
}

fn sanitize_base_url(base: String) -> Result<String> {
    let mut base = if base.starts_with("http://") || base.starts_with("https://") {
        base
    } else {
        format!("http://{base}")
    };
    // url() joins paths assuming no trailing slash.
    base.truncate(base.trim_end_matches('/').len());
    // Parse eagerly so a bad URL fails at construction, not on every request.
    Url::parse(&base).map_err(|err| Error::InvalidBaseUrl(err.to_string()))?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_adds_scheme_and_strips_slashes() {
        assert_eq!(
            sanitize_base_url("localhost:8080///".into()).unwrap(),
            "http://localhost:8080"
        );
        assert_eq!(
            sanitize_base_url("https://api.example.com/".into()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn sanitize_rejects_garbage() {
        assert!(sanitize_base_url("http://".into()).is_err());
    }
}
