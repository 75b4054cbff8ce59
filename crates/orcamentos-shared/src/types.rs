use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// Records that can be located in a view by their identifier.
pub trait Keyed {
    fn key(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Quote
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuoteStatus {
    #[default]
    #[serde(rename = "Pendente")]
    Pending,
    #[serde(rename = "Em análise")]
    UnderReview,
    #[serde(rename = "Aprovado")]
    Approved,
    #[serde(rename = "Rejeitado")]
    Rejected,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 4] = [
        QuoteStatus::Pending,
        QuoteStatus::UnderReview,
        QuoteStatus::Approved,
        QuoteStatus::Rejected,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QuoteStatus::Pending => "Pendente",
            QuoteStatus::UnderReview => "Em análise",
            QuoteStatus::Approved => "Aprovado",
            QuoteStatus::Rejected => "Rejeitado",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Business fields of a quote, as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuote {
    #[serde(default)]
    pub folder_id: Option<String>,
    /// Unit label the quote belongs to (e.g. "IP4 Barcelos").
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub requester: String,
    pub service: String,
    pub payee: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub tax_id: String,
    #[serde(default)]
    pub bank: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub pix_key: String,
    #[serde(rename = "amount_cents")]
    pub amount: Amount,
    #[serde(default)]
    pub amount_display: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub submitted_on: NaiveDate,
    #[serde(default)]
    pub status: QuoteStatus,
}

/// A persisted quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    #[serde(flatten)]
    pub fields: NewQuote,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Quote {
    pub fn new(id: String, fields: NewQuote) -> Self {
        Self {
            id,
            fields,
            created_at: None,
            updated_at: None,
        }
    }
}

impl std::ops::Deref for Quote {
    type Target = NewQuote;

    fn deref(&self) -> &NewQuote {
        &self.fields
    }
}

impl Keyed for Quote {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Partial quote update. `None` leaves a field untouched; for `folder_id`
/// the outer `Option` selects whether the reference changes at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pix_key: Option<String>,
    #[serde(
        default,
        rename = "amount_cents",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<QuoteStatus>,
}

impl QuoteUpdate {
    pub fn status(status: QuoteStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn folder(folder_id: Option<String>) -> Self {
        Self {
            folder_id: Some(folder_id),
            ..Self::default()
        }
    }

    /// Apply the present fields to `quote`.
    pub fn apply_to(&self, quote: &mut NewQuote) {
        if let Some(folder_id) = &self.folder_id {
            quote.folder_id = folder_id.clone();
        }
        if let Some(site) = &self.site {
            quote.site = site.clone();
        }
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(value) = &self.$field {
                    quote.$field = value.clone();
                })*
            };
        }
        set!(requester, service, payee, phone, tax_id, bank, branch, account, pix_key, amount_display);
        if let Some(amount) = self.amount {
            quote.amount = amount;
        }
        if let Some(status) = self.status {
            quote.status = status;
        }
    }
}

// ---------------------------------------------------------------------------
// Folder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFolder {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A user-defined grouping of quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Folder {
    /// Case-insensitive comparison used by the unique-name rule.
    pub fn has_name(&self, name: &str) -> bool {
        normalize_folder_name(&self.name) == normalize_folder_name(name)
    }
}

impl Keyed for Folder {
    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

pub fn normalize_folder_name(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Stored attachment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAttachment {
    /// Server-assigned row ID; absent in the local store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub quote_id: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    /// `data:<mime>;base64,<payload>`
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl StoredAttachment {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActiveUser {
    pub name: String,
    pub color: String,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub current_page: Option<String>,
    #[serde(default)]
    pub editing_quote_id: Option<String>,
}

/// Ephemeral record of a session that is currently open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveUser {
    pub id: String,
    pub name: String,
    pub color: String,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub current_page: Option<String>,
    #[serde(default)]
    pub editing_quote_id: Option<String>,
}

impl ActiveUser {
    pub fn is_stale(&self, now: DateTime<Utc>, stale_after: chrono::Duration) -> bool {
        self.last_activity < now - stale_after
    }
}

impl Keyed for ActiveUser {
    fn key(&self) -> &str {
        &self.id
    }
}
