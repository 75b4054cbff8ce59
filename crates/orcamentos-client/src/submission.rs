//! Quote submission: raw form input to persisted records.

use chrono::NaiveDate;
use orcamentos_shared::attachment::{encode_batch, AttachmentUpload};
use orcamentos_shared::error::ValidationError;
use orcamentos_shared::{Amount, NewQuote, Quote, QuoteStatus};
use orcamentos_store::{DocumentStorage, RecordStore, SubmitError};
use tracing::{info, warn};

/// The quote form as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct QuoteForm {
    pub folder_id: Option<String>,
    pub site: Option<String>,
    pub requester: String,
    pub service: String,
    pub payee: String,
    pub phone: String,
    pub tax_id: String,
    pub bank: String,
    pub branch: String,
    pub account: String,
    pub pix_key: String,
    /// Amount as typed, e.g. `"R$ 1.500,50"`.
    pub amount: String,
    /// Submission date; `None` means today.
    pub submitted_on: Option<NaiveDate>,
    pub attachments: Vec<AttachmentUpload>,
}

impl QuoteForm {
    /// Check required fields and build the record to persist.
    pub fn validate(&self, today: NaiveDate) -> Result<NewQuote, ValidationError> {
        let service = required(&self.service, "serviço")?;
        let payee = required(&self.payee, "favorecido")?;
        if self.amount.trim().is_empty() {
            return Err(ValidationError::MissingField("valor"));
        }
        let amount = Amount::parse(&self.amount)?;

        Ok(NewQuote {
            folder_id: self.folder_id.clone().filter(|id| !id.trim().is_empty()),
            site: self
                .site
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            requester: self.requester.trim().to_string(),
            service,
            payee,
            phone: self.phone.trim().to_string(),
            tax_id: self.tax_id.trim().to_string(),
            bank: self.bank.trim().to_string(),
            branch: self.branch.trim().to_string(),
            account: self.account.trim().to_string(),
            pix_key: self.pix_key.trim().to_string(),
            amount,
            amount_display: amount.format_brl(),
            attachments: self.attachments.iter().map(|a| a.name.clone()).collect(),
            submitted_on: self.submitted_on.unwrap_or(today),
            status: QuoteStatus::Pending,
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Outcome of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub quote: Quote,
    pub attachments_stored: usize,
    /// One message per attachment that could not be stored.
    pub attachment_errors: Vec<String>,
}

impl SubmissionReceipt {
    pub fn is_complete(&self) -> bool {
        self.attachment_errors.is_empty()
    }
}

/// Validate the form and persist it with its attachments in the local store.
///
/// Attachment failures never undo the saved quote; they are reported in the
/// receipt.
pub fn submit_local<S: DocumentStorage>(
    store: &RecordStore<S>,
    form: &QuoteForm,
    today: NaiveDate,
) -> Result<SubmissionReceipt, SubmitError> {
    let fields = form.validate(today)?;
    let quote = store.insert_quote(fields)?;

    let (encoded, failed) = encode_batch(&quote.id, &form.attachments);
    let mut attachment_errors: Vec<String> = failed.iter().map(ToString::to_string).collect();

    let mut attachments_stored = encoded.len();
    if let Err(e) = store.store_attachments(&quote.id, encoded) {
        warn!(id = %quote.id, error = %e, "Failed to store attachments");
        attachment_errors.push(e.to_string());
        attachments_stored = 0;
    }

    info!(
        id = %quote.id,
        attachments = attachments_stored,
        failed = attachment_errors.len(),
        "Quote submitted"
    );
    Ok(SubmissionReceipt {
        quote,
        attachments_stored,
        attachment_errors,
    })
}
