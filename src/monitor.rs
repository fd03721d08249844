use crate::config::Config;
use crate::errors::{PushError, RetrievalError};
use crate::models::{BotResponse, FilteredFundRecord};
use crate::notify::Notifier;
use crate::notify::wechat::WechatBot;
use crate::pipeline::render::{self, DigestColumns};
use crate::pipeline::{self, FilterConfig};
use crate::source::FundSource;
use crate::source::jisilu::Jisilu;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Per-call overrides; anything left `None` comes from [`Config`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QueryParams {
    pub dis_limit: Option<f64>,
    pub pre_limit: Option<f64>,
    pub max_items: Option<i64>,
}

/// Outcome of a push. `response` is `None` when nothing matched and no
/// message was sent.
#[derive(Debug)]
pub struct PushReport {
    pub records: Vec<FilteredFundRecord>,
    pub table: String,
    pub response: Option<BotResponse>,
}

/// Runs one fetch-select-render cycle per call. Nothing is kept between calls.
pub struct Monitor {
    config: Config,
    source: Arc<dyn FundSource>,
    notifier: Option<Arc<dyn Notifier>>,
    digest_columns: DigestColumns,
}

impl Monitor {
    pub fn new(
        config: Config,
        source: Arc<dyn FundSource>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            config,
            source,
            notifier,
            digest_columns: DigestColumns::default(),
        }
    }

    /// Wires the live data source, plus the chat bot when a webhook key is configured.
    pub fn from_config(config: Config) -> Self {
        let source = Arc::new(Jisilu::new(config.lof_url.as_str()));
        let notifier = config
            .wechat_webhook_key
            .as_deref()
            .map(|key| Arc::new(WechatBot::new(&config.webhook_url, key)) as Arc<dyn Notifier>);
        Self::new(config, source, notifier)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn can_push(&self) -> bool {
        self.notifier.is_some()
    }

    pub fn filter_config(&self, params: &QueryParams) -> FilterConfig {
        FilterConfig::new(
            params.dis_limit.unwrap_or(self.config.dis_limit),
            params.pre_limit.unwrap_or(self.config.pre_limit),
            params.max_items.unwrap_or(self.config.max_items),
        )
    }

    pub async fn query(
        &self,
        params: &QueryParams,
    ) -> Result<Vec<FilteredFundRecord>, RetrievalError> {
        let filter = self.filter_config(params);

        let records = match self.source.fetch_records().await {
            Ok(records) => {
                metrics::counter!("lof_fetch_total", "outcome" => "ok").increment(1);
                records
            }
            Err(e) => {
                metrics::counter!("lof_fetch_total", "outcome" => "error").increment(1);
                return Err(e);
            }
        };

        let selected = pipeline::select(&records, &filter, &self.config.content);
        tracing::info!(
            "selected {} of {} funds in [{}, {}] (max {})",
            selected.len(),
            records.len(),
            filter.lower(),
            filter.upper(),
            filter.max_items()
        );
        Ok(selected)
    }

    /// Fetches, renders and sends the chat digest under a timestamped title.
    /// An empty selection sends nothing.
    pub async fn push(
        &self,
        params: &QueryParams,
        now: DateTime<Utc>,
    ) -> Result<PushReport, PushError> {
        let notifier = self.notifier.as_ref().ok_or(PushError::MissingWebhookKey)?;

        let records = self.query(params).await?;
        if records.is_empty() {
            tracing::info!("no matching funds, nothing to push");
            return Ok(PushReport {
                records,
                table: String::new(),
                response: None,
            });
        }

        let table = render::to_table(&records);
        let digest = render::to_chat_digest(&records, &self.digest_columns);
        let content = render::report_title(now) + &digest;

        let response = match notifier.send_markdown(&content).await {
            Ok(response) => response,
            Err(e) => {
                metrics::counter!("lof_push_total", "outcome" => "error").increment(1);
                return Err(e.into());
            }
        };

        let outcome = if response.is_ok() { "ok" } else { "rejected" };
        metrics::counter!("lof_push_total", "outcome" => outcome).increment(1);
        tracing::info!(
            "[{}] pushed {} funds, errcode={}",
            notifier.name(),
            records.len(),
            response.errcode
        );

        Ok(PushReport {
            records,
            table,
            response: Some(response),
        })
    }
}
