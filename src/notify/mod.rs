use crate::errors::DispatchError;
use crate::models::BotResponse;
use async_trait::async_trait;

pub mod wechat;

/// A chat sink that accepts pre-rendered markdown.
///
/// A transport failure is an `Err`; a sink that answers with a non-zero code is
/// still `Ok` and the caller decides what to report.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send_markdown(&self, content: &str) -> Result<BotResponse, DispatchError>;
}
