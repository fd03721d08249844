pub mod render;

use crate::models::{DisplaySchema, FilteredFundRecord, NOT_APPLICABLE, RawFundRecord};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;

/// Premium/discount window and result cap for one selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    lower: f64,
    upper: f64,
    max_items: i64,
}

impl FilterConfig {
    /// Bounds given in the wrong order are swapped, never rejected.
    pub fn new(lower: f64, upper: f64, max_items: i64) -> Self {
        let (lower, upper) = if lower > upper {
            (upper, lower)
        } else {
            (lower, upper)
        };
        Self {
            lower,
            upper,
            max_items,
        }
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn max_items(&self) -> i64 {
        self.max_items
    }

    /// Inclusive on both ends.
    pub fn contains(&self, rate: f64) -> bool {
        rate >= self.lower && rate <= self.upper
    }

    /// Zero or negative caps select nothing.
    fn limit(&self) -> usize {
        usize::try_from(self.max_items).unwrap_or(0)
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::new(-100.0, 100.0, 20)
    }
}

/// Parses the leading number of a rate string, so `"3.2%"` reads as 3.2.
/// Returns `None` when the text does not start with a number.
pub fn parse_rate(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let bytes = s.as_bytes();

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Drops rows without a rate, ranks the rest by rate (highest first), keeps the
/// ones inside the window, caps the count and projects each through `schema`.
pub fn select(
    records: &[RawFundRecord],
    config: &FilterConfig,
    schema: &DisplaySchema,
) -> Vec<FilteredFundRecord> {
    let mut ranked: Vec<(f64, &RawFundRecord)> = records
        .iter()
        .filter(|r| r.discount_rt != NOT_APPLICABLE)
        .filter_map(|r| parse_rate(&r.discount_rt).map(|rate| (rate, r)))
        .collect();

    // stable sort: equal rates keep source order
    ranked.sort_by_key(|(rate, _)| Reverse(OrderedFloat(*rate)));

    ranked
        .into_iter()
        .filter(|(rate, _)| config.contains(*rate))
        .take(config.limit())
        .map(|(_, record)| FilteredFundRecord::project(record, schema))
        .collect()
}
