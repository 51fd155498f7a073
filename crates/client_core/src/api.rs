use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Credentials, PostId, SessionState},
    error::{ApiException, ApiMessage},
    protocol::{
        CreatePostRequest, CreatePostResponse, Post, SessionStatusResponse, UpdatePostRequest,
        LOGIN_SUCCESS_MESSAGE, REGISTER_SUCCESS_MESSAGE,
    },
};
use tracing::debug;
use url::Url;

use crate::{config::ClientSettings, error::ClientError};

/// The backend endpoints the controller talks to.
#[async_trait]
pub trait BlogApi: Send + Sync {
    /// Resolves to the backend's success message.
    async fn login(&self, credentials: &Credentials) -> Result<String, ClientError>;
    async fn register(&self, credentials: &Credentials) -> Result<String, ClientError>;
    /// Only transport failures are errors; any HTTP answer counts as done.
    async fn logout(&self) -> Result<(), ClientError>;
    async fn check_session(&self) -> Result<SessionState, ClientError>;
    async fn list_posts(&self) -> Result<Vec<Post>, ClientError>;
    async fn fetch_post(&self, post_id: PostId) -> Result<Post, ClientError>;
    async fn create_post(
        &self,
        request: &CreatePostRequest,
    ) -> Result<CreatePostResponse, ClientError>;
    async fn update_post(
        &self,
        post_id: PostId,
        request: &UpdatePostRequest,
    ) -> Result<ApiMessage, ClientError>;
    async fn delete_post(&self, post_id: PostId) -> Result<ApiMessage, ClientError>;
}

pub struct HttpBlogApi {
    http: Client,
    base_url: Url,
}

struct RawResponse {
    endpoint: String,
    status: StatusCode,
    body: String,
}

impl RawResponse {
    fn decode<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_str(&self.body).map_err(|err| ClientError::malformed(&self.endpoint, err))
    }

    /// Message bodies are optional on success; an empty body reads as none.
    fn message_body(&self) -> Result<ApiMessage, ClientError> {
        if self.body.trim().is_empty() {
            return Ok(ApiMessage::default());
        }
        self.decode()
    }

    /// For mutations: a 2xx means the change happened, so an unreadable body
    /// only loses the message.
    fn lenient_message_body(&self) -> ApiMessage {
        self.message_body().unwrap_or_else(|err| {
            debug!(endpoint = %self.endpoint, "ignoring unreadable success body: {err}");
            ApiMessage::default()
        })
    }

    fn rejection(&self, fallback: &str) -> ClientError {
        let body = serde_json::from_str::<ApiMessage>(&self.body).unwrap_or_default();
        ApiException::from_body(self.status.as_u16(), &body, fallback).into()
    }

    fn into_success<T: DeserializeOwned>(self, fallback: &str) -> Result<T, ClientError> {
        if !self.status.is_success() {
            return Err(self.rejection(fallback));
        }
        self.decode()
    }
}

impl HttpBlogApi {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self::with_client(http, settings.base_url()?))
    }

    /// The client must keep cookies: the backend session lives in one.
    pub fn with_client(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::Validation(format!("invalid endpoint '{path}': {err}")))
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<RawResponse, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(endpoint, status = status.as_u16(), "backend responded");
        Ok(RawResponse {
            endpoint: endpoint.to_string(),
            status,
            body,
        })
    }

    fn post_path(post_id: PostId) -> String {
        format!("api/blog/{}", post_id.0)
    }
}

#[async_trait]
impl BlogApi for HttpBlogApi {
    async fn login(&self, credentials: &Credentials) -> Result<String, ClientError> {
        let url = self.endpoint("login")?;
        let response = self
            .send(self.http.post(url).json(credentials), "/login")
            .await?;
        if !response.status.is_success() {
            return Err(response.rejection("Login failed"));
        }
        let body = response.message_body()?;
        match body.text() {
            Some(LOGIN_SUCCESS_MESSAGE) => Ok(LOGIN_SUCCESS_MESSAGE.to_string()),
            other => Err(ApiException::new(
                response.status.as_u16(),
                other.unwrap_or("Login failed"),
            )
            .into()),
        }
    }

    async fn register(&self, credentials: &Credentials) -> Result<String, ClientError> {
        let url = self.endpoint("register")?;
        let response = self
            .send(self.http.post(url).json(credentials), "/register")
            .await?;
        if !response.status.is_success() {
            return Err(response.rejection("Registration failed"));
        }
        let body = response.message_body()?;
        Ok(body.text().unwrap_or(REGISTER_SUCCESS_MESSAGE).to_string())
    }

    async fn logout(&self) -> Result<(), ClientError> {
        let url = self.endpoint("logout")?;
        self.send(self.http.post(url), "/logout").await?;
        Ok(())
    }

    async fn check_session(&self) -> Result<SessionState, ClientError> {
        let url = self.endpoint("api/check-session")?;
        let status: SessionStatusResponse = self
            .send(self.http.get(url), "/api/check-session")
            .await?
            .into_success("Session check failed")?;
        Ok(SessionState::from_logged_in(status.logged_in))
    }

    async fn list_posts(&self) -> Result<Vec<Post>, ClientError> {
        let url = self.endpoint("api/blog")?;
        self.send(self.http.get(url), "/api/blog")
            .await?
            .into_success("Failed to load posts")
    }

    async fn fetch_post(&self, post_id: PostId) -> Result<Post, ClientError> {
        let path = Self::post_path(post_id);
        let url = self.endpoint(&path)?;
        self.send(self.http.get(url), &format!("/{path}"))
            .await?
            .into_success("Blog post not found")
    }

    async fn create_post(
        &self,
        request: &CreatePostRequest,
    ) -> Result<CreatePostResponse, ClientError> {
        let url = self.endpoint("api/blog")?;
        self.send(self.http.post(url).json(request), "/api/blog")
            .await?
            .into_success("Failed to create post")
    }

    async fn update_post(
        &self,
        post_id: PostId,
        request: &UpdatePostRequest,
    ) -> Result<ApiMessage, ClientError> {
        let path = Self::post_path(post_id);
        let url = self.endpoint(&path)?;
        let response = self
            .send(self.http.patch(url).json(request), &format!("/{path}"))
            .await?;
        if !response.status.is_success() {
            return Err(response.rejection("Failed to update post"));
        }
        Ok(response.lenient_message_body())
    }

    async fn delete_post(&self, post_id: PostId) -> Result<ApiMessage, ClientError> {
        let path = Self::post_path(post_id);
        let url = self.endpoint(&path)?;
        let response = self
            .send(self.http.delete(url), &format!("/{path}"))
            .await?;
        if !response.status.is_success() {
            return Err(response.rejection("Failed to delete post"));
        }
        Ok(response.lenient_message_body())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
