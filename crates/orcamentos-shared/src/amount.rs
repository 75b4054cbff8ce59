//! Exact monetary amounts.
//!
//! Amounts are held as integer cents so that the amount-aware duplicate check
//! can compare them exactly. User input follows Brazilian conventions
//! (`R$ 1.234,56`) but plain decimals (`1234.56`) are accepted as well.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Parse user input such as `"R$ 1.500,50"`, `"1500,5"` or `"1500.50"`.
    ///
    /// Only positive amounts are accepted.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidAmount(input.to_string());

        let cleaned: String = input
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
            .collect();
        if !cleaned.chars().any(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let (integer, fraction) = split_decimal(&cleaned);
        if integer.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let mut units: i64 = 0;
        for digit in integer.bytes() {
            units = units
                .checked_mul(10)
                .and_then(|v| v.checked_add(i64::from(digit - b'0')))
                .ok_or_else(invalid)?;
        }

        let cents = fraction_to_cents(&fraction);
        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(invalid)?;

        if total <= 0 {
            return Err(ValidationError::NonPositiveAmount);
        }
        Ok(Self(total))
    }

    /// Plain rendering with a dot and two decimals (`1500.50`), used in IDs.
    pub fn to_plain_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }

    /// pt-BR currency rendering (`R$ 1.500,50`).
    pub fn format_brl(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = (abs / 100).to_string();

        let mut grouped = String::with_capacity(units.len() + units.len() / 3);
        for (i, ch) in units.chars().enumerate() {
            if i > 0 && (units.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        format!("{sign}R$ {grouped},{:02}", abs % 100)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_plain_string())
    }
}

/// Split a cleaned numeric string into integer digits and fraction digits.
///
/// A comma is always the decimal separator. Without a comma, a single dot
/// followed by one or two digits is decimal; any other dot groups thousands.
fn split_decimal(cleaned: &str) -> (String, String) {
    let digits = |s: &str| s.chars().filter(char::is_ascii_digit).collect::<String>();

    if let Some(pos) = cleaned.rfind(',') {
        return (digits(&cleaned[..pos]), digits(&cleaned[pos + 1..]));
    }

    if cleaned.matches('.').count() == 1 {
        if let Some(pos) = cleaned.find('.') {
            let tail = &cleaned[pos + 1..];
            if (1..=2).contains(&tail.len()) {
                return (digits(&cleaned[..pos]), digits(tail));
            }
        }
    }

    (digits(cleaned), String::new())
}

// Rounds half-up to two decimals.
fn fraction_to_cents(fraction: &str) -> i64 {
    let bytes = fraction.as_bytes();
    let digit = |i: usize| bytes.get(i).map(|b| i64::from(b - b'0')).unwrap_or(0);
    let cents = digit(0) * 10 + digit(1);
    if digit(2) >= 5 {
        cents + 1
    } else {
        cents
    }
}
