use shared::{
    domain::{PostAction, PostId},
    error::{ApiException, ErrorCode},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network failure: {0}")]
    Network(#[source] reqwest::Error),
    #[error(transparent)]
    Rejected(#[from] ApiException),
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },
    #[error("not permitted to {action} post {post_id}")]
    NotPermitted { post_id: PostId, action: PostAction },
    #[error("{0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Auth,
    Rejected,
    Malformed,
    Permission,
    Validation,
}

impl ClientError {
    pub fn malformed(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Rejected(rejection) => match rejection.code {
                ErrorCode::Unauthorized | ErrorCode::Forbidden => ErrorKind::Auth,
                _ => ErrorKind::Rejected,
            },
            Self::Malformed { .. } => ErrorKind::Malformed,
            Self::NotPermitted { .. } => ErrorKind::Permission,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Server unreachable; check the URL or network and retry.".into(),
            Self::Rejected(rejection) => rejection.message.clone(),
            Self::Malformed { .. } => "The server sent a response that could not be read.".into(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err)
    }
}
