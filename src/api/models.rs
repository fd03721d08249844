use crate::models::{BotResponse, FilteredFundRecord};
use crate::monitor::QueryParams;
use crate::pipeline::parse_rate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query string for GET /api/lof
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LofQuery {
    pub dis_limit: Option<f64>,
    pub pre_limit: Option<f64>,
    pub max_items: Option<i64>,
}

impl From<LofQuery> for QueryParams {
    fn from(q: LofQuery) -> Self {
        Self {
            dis_limit: q.dis_limit,
            pre_limit: q.pre_limit,
            max_items: q.max_items,
        }
    }
}

/// Optional JSON body for POST /api/lof. Values may be numbers or numeric strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushBody {
    pub dis_limit: Option<Value>,
    pub pre_limit: Option<Value>,
    pub max_items: Option<Value>,
}

impl PushBody {
    /// An empty or non-JSON body means "use the configured defaults".
    pub fn parse(raw: &[u8]) -> Self {
        serde_json::from_slice(raw).unwrap_or_default()
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_rate(s),
        _ => None,
    }
}

/// Whole count: JSON numbers are truncated, strings are read by their leading
/// integer, so `"1e3"` is 1 and `"7.9"` is 7.
fn count(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => parse_count(s),
        _ => None,
    }
}

fn parse_count(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let sign = usize::from(matches!(s.as_bytes().first(), Some(b'+' | b'-')));
    let digits = s.as_bytes()[sign..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    s[..sign + digits].parse().ok()
}

impl From<PushBody> for QueryParams {
    fn from(body: PushBody) -> Self {
        Self {
            dis_limit: body.dis_limit.as_ref().and_then(number),
            pre_limit: body.pre_limit.as_ref().and_then(number),
            max_items: body.max_items.as_ref().and_then(count),
        }
    }
}

/// Response for GET /api/config
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub dis_limit: f64,
    pub pre_limit: f64,
    pub max_items: i64,
}

/// Response for GET and POST /api/lof
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LofResponse {
    pub success: bool,
    pub data: Vec<FilteredFundRecord>,
    pub markdown: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wechat_response: Option<BotResponse>,
}

/// Response for GET /api/cron
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wechat_response: Option<BotResponse>,
}
