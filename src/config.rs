use crate::models::DisplaySchema;
use crate::notify::wechat::DEFAULT_WEBHOOK_URL;
use crate::source::jisilu::DEFAULT_LIST_URL;
use anyhow::Context;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_port: u16,
    /// Unset means pushing is disabled.
    pub wechat_webhook_key: Option<String>,
    /// Unset means the cron route is open.
    pub cron_secret: Option<String>,
    pub dis_limit: f64,
    pub pre_limit: f64,
    pub max_items: i64,
    pub content: DisplaySchema,
    pub lof_url: String,
    pub webhook_url: String,
    pub push_interval_secs: Option<u64>,
    /// `LOG_FORMAT=json` switches log output to JSON lines.
    pub log_json: bool,
    /// Non-fatal problems found while loading, logged once tracing is up.
    pub warnings: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut warnings = Vec::new();
        let content = match var("LOF_CONTENT") {
            Some(raw) => DisplaySchema::from_json(&raw).unwrap_or_else(|e| {
                warnings.push(format!("Invalid LOF_CONTENT format, using default: {e}"));
                DisplaySchema::default()
            }),
            None => DisplaySchema::default(),
        };

        Ok(Self {
            api_port: parse_or(&var, "API_PORT", 3000)?,
            wechat_webhook_key: var("WECHAT_WEBHOOK_KEY"),
            cron_secret: var("CRON_SECRET"),
            dis_limit: parse_or(&var, "DIS_LIMIT", -5.0)?,
            pre_limit: parse_or(&var, "PRE_LIMIT", 5.0)?,
            max_items: parse_or(&var, "MAX_ITEMS", 20)?,
            content,
            lof_url: var("LOF_URL").unwrap_or_else(|| DEFAULT_LIST_URL.to_string()),
            webhook_url: var("WECHAT_WEBHOOK_URL")
                .unwrap_or_else(|| DEFAULT_WEBHOOK_URL.to_string()),
            push_interval_secs: var("PUSH_INTERVAL_SECS")
                .map(|raw| raw.parse::<u64>())
                .transpose()
                .context("PUSH_INTERVAL_SECS must be a whole number of seconds")?
                .filter(|secs| *secs > 0),
            log_json: var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            warnings,
        })
    }
}

fn parse_or<T, V>(var: &V, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    V: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}
