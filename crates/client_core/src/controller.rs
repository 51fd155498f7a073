//! Session-gated UI controller: owns the UI state, talks to the backend and
//! re-renders after every completed mutation.
//!
//! The state lock is never held across a backend call, so refreshes triggered
//! from different places may interleave. Each refresh replaces state wholesale
//! from the response it got; a slow stale response can overwrite a newer one.

use std::sync::Arc;

use shared::{
    domain::{Credentials, PostAction, PostId, SessionState},
    protocol::{CreatePostRequest, Post, UpdatePostRequest, POST_CREATED_MESSAGE},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    api::BlogApi,
    error::ClientError,
    render::{render, PostList, UiState, View},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeContext {
    Session,
    Posts,
    Login,
    Register,
    Logout,
    ShowPost,
    CreatePost,
    UpdatePost,
    DeletePost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message meant for the user, not the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub context: NoticeContext,
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    Rendered(View),
    Notice(Notice),
}

pub struct SessionController {
    api: Arc<dyn BlogApi>,
    state: Mutex<UiState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl SessionController {
    pub fn new(api: Arc<dyn BlogApi>, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            api,
            state: Mutex::new(UiState::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn view(&self) -> View {
        render(&*self.state.lock().await)
    }

    pub async fn session_state(&self) -> SessionState {
        self.state.lock().await.session
    }

    pub async fn draft(&self) -> String {
        self.state.lock().await.draft.clone()
    }

    async fn mutate(&self, apply: impl FnOnce(&mut UiState)) -> View {
        let mut guard = self.state.lock().await;
        apply(&mut *guard);
        let view = render(&guard);
        // Sent under the lock so subscribers see views in mutation order.
        let _ = self.events.send(ControllerEvent::Rendered(view.clone()));
        view
    }

    fn notify(&self, context: NoticeContext, level: NoticeLevel, message: impl Into<String>) {
        let _ = self.events.send(ControllerEvent::Notice(Notice {
            context,
            level,
            message: message.into(),
        }));
    }

    fn report_failure(&self, context: NoticeContext, err: &ClientError) {
        warn!(?context, kind = ?err.kind(), "operation failed: {err}");
        self.notify(context, NoticeLevel::Error, err.user_message());
    }

    /// Start-up sequence: session first, then posts.
    pub async fn initialize(&self) {
        self.refresh_all().await;
    }

    async fn refresh_all(&self) {
        // Both refreshes report their own failures.
        let _ = self.refresh_session().await;
        let _ = self.refresh_posts().await;
    }

    pub async fn refresh_session(&self) -> Result<SessionState, ClientError> {
        match self.api.check_session().await {
            Ok(session) => {
                self.mutate(|state| state.session = session).await;
                info!(?session, "session refreshed");
                Ok(session)
            }
            Err(err) => {
                warn!(kind = ?err.kind(), "session check failed; keeping last known state: {err}");
                self.notify(NoticeContext::Session, NoticeLevel::Error, err.user_message());
                Err(err)
            }
        }
    }

    /// Returns the number of posts now shown.
    pub async fn refresh_posts(&self) -> Result<usize, ClientError> {
        match self.api.list_posts().await {
            Ok(posts) => {
                let count = posts.len();
                self.mutate(|state| state.posts = PostList::Loaded(posts))
                    .await;
                info!(count, "posts refreshed");
                Ok(count)
            }
            Err(err) => {
                warn!(kind = ?err.kind(), "post refresh failed; keeping last rendered list: {err}");
                self.notify(NoticeContext::Posts, NoticeLevel::Error, err.user_message());
                Err(err)
            }
        }
    }

    pub async fn login(&self, credentials: Credentials) -> Result<(), ClientError> {
        let result = self.api.login(&credentials).await;
        drop(credentials);
        match result {
            Ok(message) => {
                info!("login accepted");
                self.notify(NoticeContext::Login, NoticeLevel::Info, message);
                self.refresh_all().await;
                Ok(())
            }
            Err(err) => {
                self.report_failure(NoticeContext::Login, &err);
                Err(err)
            }
        }
    }

    /// Registration never logs the user in.
    pub async fn register(&self, credentials: Credentials) -> Result<(), ClientError> {
        let result = self.api.register(&credentials).await;
        drop(credentials);
        match result {
            Ok(message) => {
                info!("registration accepted");
                self.notify(NoticeContext::Register, NoticeLevel::Info, message);
                Ok(())
            }
            Err(err) => {
                self.report_failure(NoticeContext::Register, &err);
                Err(err)
            }
        }
    }

    pub async fn logout(&self) {
        match self.api.logout().await {
            Ok(()) => {
                self.notify(
                    NoticeContext::Logout,
                    NoticeLevel::Info,
                    "Logged out successfully",
                );
            }
            Err(err) => {
                warn!(kind = ?err.kind(), "logout request failed; refreshing anyway: {err}");
                self.notify(NoticeContext::Logout, NoticeLevel::Error, err.user_message());
            }
        }
        self.refresh_all().await;
    }

    /// Read-only detail fetch; does not touch the rendered list.
    pub async fn show_post(&self, post_id: PostId) -> Result<Post, ClientError> {
        self.api.fetch_post(post_id).await.inspect_err(|err| {
            self.report_failure(NoticeContext::ShowPost, err);
        })
    }

    pub async fn set_draft(&self, text: impl Into<String>) -> View {
        let text = text.into();
        self.mutate(|state| state.draft = text).await
    }

    pub async fn submit_draft(&self) -> Result<(), ClientError> {
        let draft = self.draft().await;
        self.create_post(&draft).await
    }

    pub async fn create_post(&self, content: &str) -> Result<(), ClientError> {
        if content.trim().is_empty() {
            let err = ClientError::Validation("Post content must not be empty".into());
            self.report_failure(NoticeContext::CreatePost, &err);
            return Err(err);
        }

        let request = CreatePostRequest {
            content: content.to_string(),
            author: None,
        };
        match self.api.create_post(&request).await {
            Ok(response) => {
                info!(post_id = ?response.id, "post created");
                let message = response
                    .message
                    .unwrap_or_else(|| POST_CREATED_MESSAGE.to_string());
                self.notify(NoticeContext::CreatePost, NoticeLevel::Info, message);
                // Text published directly leaves an unrelated draft alone.
                self.mutate(|state| {
                    if state.draft == content {
                        state.draft.clear();
                    }
                })
                .await;
                let _ = self.refresh_posts().await;
                Ok(())
            }
            Err(err) => {
                self.report_failure(NoticeContext::CreatePost, &err);
                Err(err)
            }
        }
    }

    pub async fn update_post(&self, post_id: PostId, content: &str) -> Result<(), ClientError> {
        self.ensure_permitted(post_id, PostAction::Edit, NoticeContext::UpdatePost)
            .await?;
        if content.trim().is_empty() {
            let err = ClientError::Validation("Post content must not be empty".into());
            self.report_failure(NoticeContext::UpdatePost, &err);
            return Err(err);
        }

        let request = UpdatePostRequest {
            content: content.to_string(),
        };
        match self.api.update_post(post_id, &request).await {
            Ok(body) => {
                info!(%post_id, "post updated");
                let message = body.text().unwrap_or("Blog post updated").to_string();
                self.notify(NoticeContext::UpdatePost, NoticeLevel::Info, message);
                let _ = self.refresh_posts().await;
                Ok(())
            }
            Err(err) => {
                self.report_failure(NoticeContext::UpdatePost, &err);
                Err(err)
            }
        }
    }

    pub async fn delete_post(&self, post_id: PostId) -> Result<(), ClientError> {
        self.ensure_permitted(post_id, PostAction::Delete, NoticeContext::DeletePost)
            .await?;

        match self.api.delete_post(post_id).await {
            Ok(body) => {
                info!(%post_id, "post deleted");
                let message = body.text().unwrap_or("Blog post deleted").to_string();
                self.notify(NoticeContext::DeletePost, NoticeLevel::Info, message);
                let _ = self.refresh_posts().await;
                Ok(())
            }
            Err(err) => {
                self.report_failure(NoticeContext::DeletePost, &err);
                Err(err)
            }
        }
    }

    /// Checked against the capability flags of the currently loaded list,
    /// before any request goes out.
    async fn ensure_permitted(
        &self,
        post_id: PostId,
        action: PostAction,
        context: NoticeContext,
    ) -> Result<(), ClientError> {
        if self.state.lock().await.permits(post_id, action) {
            return Ok(());
        }
        let err = ClientError::NotPermitted { post_id, action };
        self.report_failure(context, &err);
        Err(err)
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
