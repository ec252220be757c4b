pub mod line;
pub mod webhook;

use async_trait::async_trait;

/// Failure delivering a reply back to the platform
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Delivers reply text into the conversation identified by `reply_token`.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), ReplyError>;
}
