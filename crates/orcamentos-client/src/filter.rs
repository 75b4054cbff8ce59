//! Live filters applied to the quote list.

use chrono::NaiveDate;
use orcamentos_shared::{Quote, QuoteStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteFilter {
    /// Inclusive lower bound on the submission date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the submission date.
    pub to: Option<NaiveDate>,
    pub status: Option<QuoteStatus>,
    /// Case-insensitive substring of the payee name.
    pub payee_contains: Option<String>,
}

impl QuoteFilter {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        if self.from.is_some_and(|from| quote.submitted_on < from) {
            return false;
        }
        if self.to.is_some_and(|to| quote.submitted_on > to) {
            return false;
        }
        if self.status.is_some_and(|status| quote.status != status) {
            return false;
        }
        match self.payee_contains.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => quote
                .payee
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }

    pub fn apply<'q>(&self, quotes: &'q [Quote]) -> Vec<&'q Quote> {
        quotes.iter().filter(|q| self.matches(q)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orcamentos_shared::{Amount, NewQuote};

    fn quote(id: &str, payee: &str, day: u32, status: QuoteStatus) -> Quote {
        Quote::new(
            id.into(),
            NewQuote {
                folder_id: None,
                site: None,
                requester: String::new(),
                service: "Pintura".into(),
                payee: payee.into(),
                phone: String::new(),
                tax_id: String::new(),
                bank: String::new(),
                branch: String::new(),
                account: String::new(),
                pix_key: String::new(),
                amount: Amount::from_cents(100),
                amount_display: String::new(),
                attachments: vec![],
                submitted_on: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
                status,
            },
        )
    }

    fn ids(found: Vec<&Quote>) -> Vec<&str> {
        found.into_iter().map(|q| q.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let quotes = [quote("a", "João", 1, QuoteStatus::Pending)];
        let filter = QuoteFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&quotes).len(), 1);
    }

    #[test]
    fn combines_date_range_status_and_payee() {
        let quotes = [
            quote("a", "João Silva", 1, QuoteStatus::Pending),
            quote("b", "Maria Souza", 10, QuoteStatus::Approved),
            quote("c", "joão pereira", 12, QuoteStatus::Approved),
            quote("d", "João Lima", 20, QuoteStatus::Approved),
        ];

        let filter = QuoteFilter {
            from: NaiveDate::from_ymd_opt(2024, 3, 10),
            to: NaiveDate::from_ymd_opt(2024, 3, 12),
            status: Some(QuoteStatus::Approved),
            payee_contains: None,
        };
        assert_eq!(ids(filter.apply(&quotes)), ["b", "c"]);

        let filter = QuoteFilter {
            payee_contains: Some(" JOÃO ".into()),
            ..filter
        };
        assert_eq!(ids(filter.apply(&quotes)), ["c"]);
    }
}
