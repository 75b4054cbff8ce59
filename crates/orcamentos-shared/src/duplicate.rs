//! Two-tier duplicate detection.
//!
//! The deterministic ID catches repeats that normalize to the same ID; the
//! same-day full-text scan catches submissions whose IDs differ (for example
//! after truncation) but whose trimmed, case-insensitive text is identical.

use chrono::NaiveDate;

use crate::amount::Amount;
use crate::identity::{quote_id, IdGrain};
use crate::types::{NewQuote, Quote};

/// The fields of a submission that take part in duplicate detection.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub service: &'a str,
    pub payee: &'a str,
    pub amount: Amount,
    pub date: NaiveDate,
}

impl<'a> From<&'a NewQuote> for Candidate<'a> {
    fn from(quote: &'a NewQuote) -> Self {
        Self {
            service: &quote.service,
            payee: &quote.payee,
            amount: quote.amount,
            date: quote.submitted_on,
        }
    }
}

impl Candidate<'_> {
    pub fn id(&self, grain: IdGrain) -> String {
        quote_id(self.service, self.payee, self.amount, self.date, grain)
    }
}

/// Return the first existing record that conflicts with `candidate`.
pub fn find_duplicate<'q>(
    existing: &'q [Quote],
    candidate: &Candidate<'_>,
    grain: IdGrain,
) -> Option<&'q Quote> {
    let candidate_id = candidate.id(grain);
    if let Some(same_id) = existing.iter().find(|quote| quote.id == candidate_id) {
        return Some(same_id);
    }

    let service = normalize_text(candidate.service);
    let payee = normalize_text(candidate.payee);

    existing.iter().find(|quote| {
        quote.submitted_on == candidate.date
            && normalize_text(&quote.service) == service
            && normalize_text(&quote.payee) == payee
            && (!grain.compares_amount() || quote.amount == candidate.amount)
    })
}

fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}
