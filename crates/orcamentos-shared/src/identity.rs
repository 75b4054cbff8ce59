//! Deterministic quote identifiers.
//!
//! A quote ID is derived from its business fields so that the same vendor and
//! service submitted again inside the same period produce the same ID. The
//! period is selected by [`IdGrain`]; callers must use one grain consistently
//! for both ID assignment and duplicate detection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::constants::{ID_SEPARATOR, MONTH_ID_COMPONENT_MAX, WHITESPACE_REPLACEMENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdGrain {
    /// Same vendor + service + amount may not repeat within a calendar month.
    Month,
    /// Same vendor + service may not repeat within a calendar day.
    #[default]
    Day,
}

impl IdGrain {
    /// Whether the secondary duplicate scan also compares amounts.
    pub fn compares_amount(self) -> bool {
        matches!(self, IdGrain::Month)
    }
}

/// Derive the quote ID for the given fields.
pub fn quote_id(
    service: &str,
    payee: &str,
    amount: Amount,
    date: NaiveDate,
    grain: IdGrain,
) -> String {
    match grain {
        IdGrain::Month => {
            let limit = Some(MONTH_ID_COMPONENT_MAX);
            [
                normalize_component(service, limit),
                normalize_component(payee, limit),
                amount.to_plain_string(),
                date.format("%Y-%m").to_string(),
            ]
            .join(&ID_SEPARATOR.to_string())
        }
        IdGrain::Day => [
            normalize_component(service, None),
            normalize_component(payee, None),
            date.format("%d/%m/%Y").to_string(),
        ]
        .join(&ID_SEPARATOR.to_string()),
    }
}

/// Lower-case, collapse whitespace, keep only ASCII alphanumerics and the
/// whitespace replacement, then optionally truncate.
pub fn normalize_component(text: &str, max_len: Option<usize>) -> String {
    let lowered = text.to_lowercase();
    let collapsed = lowered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(&WHITESPACE_REPLACEMENT.to_string());

    let sanitized = collapsed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == WHITESPACE_REPLACEMENT);

    match max_len {
        Some(max) => sanitized.take(max).collect(),
        None => sanitized.collect(),
    }
}
