use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Value the data source puts in `discount_rt` when a fund has no rate.
pub const NOT_APPLICABLE: &str = "-";

/// The raw JSON shape the LOF list endpoint sends back.
#[derive(Debug, Deserialize)]
pub struct LofListResponse {
    #[serde(default)]
    pub rows: Vec<LofRow>,
}

#[derive(Debug, Deserialize)]
pub struct LofRow {
    pub cell: RawFundRecord,
}

impl LofListResponse {
    pub fn into_records(self) -> Vec<RawFundRecord> {
        self.rows.into_iter().map(|row| row.cell).collect()
    }
}

/// One fund as delivered by the data source. Every value is text, numbers included.
/// Fields the source adds later land in `extra` and stay addressable by name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFundRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub fund_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub fund_nm: String,
    #[serde(deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(deserialize_with = "lenient_string")]
    pub increase_rt: String,
    #[serde(deserialize_with = "lenient_string")]
    pub volume: String,
    #[serde(deserialize_with = "lenient_string")]
    pub amount: String,
    #[serde(deserialize_with = "lenient_string")]
    pub fund_nav: String,
    #[serde(deserialize_with = "lenient_string")]
    pub nav_dt: String,
    #[serde(deserialize_with = "lenient_string")]
    pub estimate_value: String,
    /// Premium/discount rate in percent, or [`NOT_APPLICABLE`].
    #[serde(deserialize_with = "lenient_string")]
    pub discount_rt: String,
    #[serde(deserialize_with = "lenient_string")]
    pub apply_fee: String,
    #[serde(deserialize_with = "lenient_string")]
    pub redeem_fee: String,
    #[serde(deserialize_with = "lenient_string")]
    pub fund_company: String,
    #[serde(deserialize_with = "lenient_string")]
    pub apply_status: String,
    #[serde(deserialize_with = "lenient_string")]
    pub redeem_status: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RawFundRecord {
    /// Looks up a field by its source name, known or passthrough.
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let known = match name {
            "fund_id" => &self.fund_id,
            "fund_nm" => &self.fund_nm,
            "price" => &self.price,
            "increase_rt" => &self.increase_rt,
            "volume" => &self.volume,
            "amount" => &self.amount,
            "fund_nav" => &self.fund_nav,
            "nav_dt" => &self.nav_dt,
            "estimate_value" => &self.estimate_value,
            "discount_rt" => &self.discount_rt,
            "apply_fee" => &self.apply_fee,
            "redeem_fee" => &self.redeem_fee,
            "fund_company" => &self.fund_company,
            "apply_status" => &self.apply_status,
            "redeem_status" => &self.redeem_status,
            _ => return self.extra.get(name).map(value_text),
        };
        Some(Cow::Borrowed(known.as_str()))
    }
}

fn value_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}

/// Accepts strings, numbers and null where the source is supposed to send strings.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_text(&value).into_owned())
}

/// Ordered mapping from output column label to source field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySchema {
    columns: Vec<(String, String)>,
}

impl DisplaySchema {
    pub fn new<L, F>(columns: impl IntoIterator<Item = (L, F)>) -> Self
    where
        L: Into<String>,
        F: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(label, field)| (label.into(), field.into()))
                .collect(),
        }
    }

    /// Parses a JSON object such as `{"代码":"fund_id"}`, keeping key order.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// (label, source field) pairs in output order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(|(label, field)| (label.as_str(), field.as_str()))
    }
}

impl Default for DisplaySchema {
    fn default() -> Self {
        Self::new([
            ("代码", "fund_id"),
            ("名称", "fund_nm"),
            ("折溢价", "discount_rt"),
            ("申购", "apply_status"),
        ])
    }
}

impl<'de> Deserialize<'de> for DisplaySchema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = DisplaySchema;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping column labels to field names")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut columns: Vec<(String, String)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((label, field)) = map.next_entry::<String, String>()? {
                    // later duplicates overwrite in place, like a JSON object would
                    match columns.iter_mut().find(|entry| entry.0 == label) {
                        Some(existing) => existing.1 = field,
                        None => columns.push((label, field)),
                    }
                }
                Ok(DisplaySchema { columns })
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}

/// A selected fund projected through a [`DisplaySchema`]. Serializes as a JSON
/// object whose keys keep column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredFundRecord {
    columns: Vec<(String, String)>,
}

impl FilteredFundRecord {
    pub fn project(record: &RawFundRecord, schema: &DisplaySchema) -> Self {
        let columns = schema
            .columns()
            .map(|(label, field)| {
                let value = record.field(field).unwrap_or_default().into_owned();
                (label.to_string(), value)
            })
            .collect();
        Self { columns }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(l, _)| l.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(_, v)| v.as_str())
    }
}

impl<L: Into<String>, V: Into<String>> FromIterator<(L, V)> for FilteredFundRecord {
    fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(l, v)| (l.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for FilteredFundRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (label, value) in &self.columns {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// What the chat webhook answers. `errcode == 0` means delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotResponse {
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl BotResponse {
    pub fn is_ok(&self) -> bool {
        self.errcode == 0
    }
}
