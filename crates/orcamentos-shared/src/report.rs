//! Content of the printable quote document.
//!
//! [`QuoteReport`] is a pure function of the quote fields, the stored
//! attachments and the optional quote ID. Turning it into PDF bytes is the job
//! of a [`ReportRenderer`] supplied by the embedding application.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::COMPANY_NAME;
use crate::types::{NewQuote, StoredAttachment};

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportHeader {
    pub company: String,
    pub title: String,
    pub generated_at: String,
    pub quote_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportAttachment {
    /// Images are embedded inline.
    Inline { name: String, data_url: String },
    /// Other files get a metadata line.
    Metadata {
        name: String,
        mime_type: String,
        size_kb: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteReport {
    pub header: ReportHeader,
    /// `(field, value)` rows in display order.
    pub rows: Vec<(String, String)>,
    pub attachments: Vec<ReportAttachment>,
    pub file_name: String,
}

impl QuoteReport {
    pub fn build(
        quote: &NewQuote,
        attachments: &[StoredAttachment],
        quote_id: Option<&str>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let or_na = |value: &str| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                trimmed.to_string()
            }
        };

        let amount = if quote.amount_display.trim().is_empty() {
            quote.amount.format_brl()
        } else {
            quote.amount_display.clone()
        };

        let rows = vec![
            ("IP4", or_na(quote.site.as_deref().unwrap_or(""))),
            ("Solicitante", or_na(&quote.requester)),
            ("Serviço", quote.service.clone()),
            ("Favorecido", quote.payee.clone()),
            ("Telefone", or_na(&quote.phone)),
            ("CPF/CNPJ", or_na(&quote.tax_id)),
            ("Banco", or_na(&quote.bank)),
            ("Agência", or_na(&quote.branch)),
            ("Conta", or_na(&quote.account)),
            ("PIX", or_na(&quote.pix_key)),
            ("Valor", amount),
            ("Data de envio", quote.submitted_on.format("%d/%m/%Y").to_string()),
            ("Status", quote.status.label().to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let attachments = attachments
            .iter()
            .map(|a| match (&a.preview, a.is_image()) {
                (Some(preview), true) => ReportAttachment::Inline {
                    name: a.name.clone(),
                    data_url: preview.clone(),
                },
                _ => ReportAttachment::Metadata {
                    name: a.name.clone(),
                    mime_type: a.mime_type.clone(),
                    size_kb: format!("{:.2} KB", a.size as f64 / 1024.0),
                },
            })
            .collect();

        Self {
            header: ReportHeader {
                company: COMPANY_NAME.to_uppercase(),
                title: "ORÇAMENTO".to_string(),
                generated_at: generated_at.format("%d/%m/%Y %H:%M:%S").to_string(),
                quote_id: quote_id.map(str::to_string),
            },
            rows,
            attachments,
            file_name: report_file_name(quote),
        }
    }
}

/// `orcamento-<payee>-<dd-mm-yyyy>.pdf`
pub fn report_file_name(quote: &NewQuote) -> String {
    format!(
        "orcamento-{}-{}.pdf",
        quote.payee.trim(),
        quote.submitted_on.format("%d-%m-%Y")
    )
}

/// Turns report content into document bytes.
pub trait ReportRenderer {
    type Error: std::error::Error;

    fn render(&self, report: &QuoteReport) -> Result<Vec<u8>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::types::QuoteStatus;
    use chrono::{NaiveDate, TimeZone};

    fn quote() -> NewQuote {
        NewQuote {
            folder_id: None,
            site: None,
            requester: "  ".into(),
            service: "Pintura externa".into(),
            payee: "João Silva".into(),
            phone: "92 99999-0000".into(),
            tax_id: String::new(),
            bank: String::new(),
            branch: String::new(),
            account: String::new(),
            pix_key: String::new(),
            amount: Amount::from_cents(150_050),
            amount_display: String::new(),
            attachments: vec!["foto.png".into(), "nota.pdf".into()],
            submitted_on: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            status: QuoteStatus::Pending,
        }
    }

    fn attachment(name: &str, mime: &str, preview: bool) -> StoredAttachment {
        StoredAttachment {
            id: None,
            quote_id: "q".into(),
            name: name.into(),
            mime_type: mime.into(),
            size: 2048,
            data: "data:x;base64,".into(),
            preview: preview.then(|| "data:image/png;base64,AA==".to_string()),
            created_at: None,
        }
    }

    #[test]
    fn builds_rows_with_defaults() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap();
        let report = QuoteReport::build(&quote(), &[], Some("abc"), at);

        let value = |field: &str| {
            report
                .rows
                .iter()
                .find(|(k, _)| k == field)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(value("IP4"), Some("N/A"));
        assert_eq!(value("Solicitante"), Some("N/A"));
        assert_eq!(value("Telefone"), Some("92 99999-0000"));
        assert_eq!(value("Valor"), Some("R$ 1.500,50"));
        assert_eq!(report.header.quote_id.as_deref(), Some("abc"));
        assert_eq!(report.header.generated_at, "15/03/2024 14:30:00");
        assert_eq!(report.file_name, "orcamento-João Silva-15-03-2024.pdf");
    }

    #[test]
    fn images_inline_and_files_as_metadata() {
        let report = QuoteReport::build(
            &quote(),
            &[
                attachment("foto.png", "image/png", true),
                attachment("nota.pdf", "application/pdf", false),
            ],
            None,
            Utc::now(),
        );
        assert!(matches!(report.attachments[0], ReportAttachment::Inline { .. }));
        assert_eq!(
            report.attachments[1],
            ReportAttachment::Metadata {
                name: "nota.pdf".into(),
                mime_type: "application/pdf".into(),
                size_kb: "2.00 KB".into(),
            }
        );
    }
}
