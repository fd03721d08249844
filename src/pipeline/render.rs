use super::parse_rate;
use crate::models::FilteredFundRecord;
use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Reports are stamped in China Standard Time.
const REPORT_UTC_OFFSET_SECS: i32 = 8 * 60 * 60;

/// Pipe table for the web page. Headers come from the first record's columns.
/// Cell values are written as-is, pipes included.
pub fn to_table(records: &[FilteredFundRecord]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let headers: Vec<&str> = first.labels().collect();
    let mut lines = Vec::with_capacity(records.len() + 2);

    lines.push(format!("| {} |", headers.join(" | ")));
    lines.push(format!("| {} |", vec![":---:"; headers.len()].join(" | ")));
    for record in records {
        lines.push(format!("| {} |", record.values().collect::<Vec<_>>().join(" | ")));
    }

    lines.join("\n")
}

/// Which display columns the chat digest reads. The defaults match the labels of
/// the default display schema; a schema without these labels renders blanks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestColumns {
    pub code: String,
    pub name: String,
    pub rate: String,
    pub status: String,
    /// Status value shown in the affirmative colour.
    pub open_status: String,
}

impl Default for DigestColumns {
    fn default() -> Self {
        Self {
            code: "代码".to_string(),
            name: "名称".to_string(),
            rate: "折溢价".to_string(),
            status: "申购".to_string(),
            open_status: "开放".to_string(),
        }
    }
}

/// Chat-bot markdown: one quoted line per fund, no tables.
pub fn to_chat_digest(records: &[FilteredFundRecord], columns: &DigestColumns) -> String {
    records
        .iter()
        .map(|record| digest_line(record, columns))
        .collect::<Vec<_>>()
        .join("\n")
}

fn digest_line(record: &FilteredFundRecord, columns: &DigestColumns) -> String {
    let code = record.get(&columns.code).unwrap_or_default();
    let name = record.get(&columns.name).unwrap_or_default();
    let rate = record.get(&columns.rate).unwrap_or_default();

    let rate_color = match parse_rate(rate) {
        Some(v) if v > 0.0 => "info",
        Some(v) if v < 0.0 => "warning",
        _ => "comment",
    };

    let status = record
        .get(&columns.status)
        .filter(|s| !s.is_empty())
        .unwrap_or("-");
    let status_color = if status == columns.open_status {
        "info"
    } else {
        "comment"
    };

    format!(
        r#">{code} **{name}** <font color="{rate_color}">{rate}%</font> <font color="{status_color}">{status}</font>"#
    )
}

/// Bold title line placed above the digest, e.g. `**LOF-监控: 10-19 10:00**`.
pub fn report_title(now: DateTime<Utc>) -> String {
    format!("**LOF-监控: {}**\n", report_time(now))
}

/// `MM-DD HH:MM` at UTC+8.
pub fn report_time(now: DateTime<Utc>) -> String {
    // east offsets below a day are always valid
    let offset = FixedOffset::east_opt(REPORT_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    now.with_timezone(&offset).format("%m-%d %H:%M").to_string()
}
