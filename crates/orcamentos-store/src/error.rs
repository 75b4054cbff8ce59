use chrono::NaiveDate;
use orcamentos_shared::error::ValidationError;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The storage backend refused the operation.
    #[error("Armazenamento indisponível: {0}")]
    Unavailable(String),

    #[error("Limite de armazenamento excedido ao gravar {key}")]
    QuotaExceeded { key: String },

    /// A stored document could not be parsed. It is never overwritten.
    #[error("Documento {key} corrompido: {source}")]
    Corrupted {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} não encontrado: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Nome da pasta é obrigatório")]
    BlankFolderName,

    #[error("Já existe uma pasta com o nome \"{0}\"")]
    DuplicateFolderName(String),

    #[error("A pasta \"{name}\" contém {count} orçamento(s) e não pode ser excluída")]
    FolderNotEmpty { name: String, count: usize },
}

impl StoreError {
    pub(crate) fn quote_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "Orçamento",
            id: id.to_string(),
        }
    }

    pub(crate) fn folder_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "Pasta",
            id: id.to_string(),
        }
    }
}

/// Why a quote submission did not produce a record.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(
        "Orçamento duplicado: já existe o registro {id} enviado em {}",
        submitted_on.format("%d/%m/%Y")
    )]
    Duplicate { id: String, submitted_on: NaiveDate },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
