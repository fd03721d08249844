use super::Notifier;
use crate::errors::DispatchError;
use crate::models::BotResponse;
use async_trait::async_trait;
use serde::Serialize;

pub const DEFAULT_WEBHOOK_URL: &str = "https://qyapi.weixin.qq.com/cgi-bin/webhook/send";

/// Message body the group bot accepts, tagged by `msgtype`.
#[derive(Debug, Serialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
enum BotMessage<'a> {
    Markdown { markdown: MarkdownBody<'a> },
}

#[derive(Debug, Serialize)]
struct MarkdownBody<'a> {
    content: &'a str,
}

/// WeCom (enterprise WeChat) group bot webhook.
pub struct WechatBot {
    client: reqwest::Client,
    webhook_url: String,
}

impl WechatBot {
    pub fn new(base_url: &str, webhook_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: format!("{base_url}?key={webhook_key}"),
        }
    }

    async fn send(&self, message: &BotMessage<'_>) -> Result<BotResponse, DispatchError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status(status));
        }

        let body = response.text().await?;
        let reply: BotResponse = serde_json::from_str(&body)?;

        if reply.is_ok() {
            tracing::debug!("[{}] message delivered", self.name());
        } else {
            tracing::warn!(
                "[{}] bot rejected message: {} {}",
                self.name(),
                reply.errcode,
                reply.errmsg
            );
        }
        Ok(reply)
    }
}

#[async_trait]
impl Notifier for WechatBot {
    fn name(&self) -> &'static str {
        "wechat"
    }

    async fn send_markdown(&self, content: &str) -> Result<BotResponse, DispatchError> {
        self.send(&BotMessage::Markdown {
            markdown: MarkdownBody { content },
        })
        .await
    }
}
