use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to fetch LOF data: {0}")]
    Status(StatusCode),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to send message: {0}")]
    Status(StatusCode),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("Missing WECHAT_WEBHOOK_KEY")]
    MissingWebhookKey,

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
