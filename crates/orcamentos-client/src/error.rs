use chrono::NaiveDate;
use orcamentos_net::{ConfigError, NetError};
use orcamentos_shared::error::ValidationError;
use orcamentos_store::{StoreError, SubmitError};
use thiserror::Error;

/// Errors surfaced to the user by a session.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(
        "Orçamento duplicado: já existe o registro {id} enviado em {}",
        submitted_on.format("%d/%m/%Y")
    )]
    Duplicate { id: String, submitted_on: NaiveDate },

    /// A read that guards a write failed, so the write was not attempted.
    #[error("Não foi possível verificar {what}: {source}")]
    CheckFailed {
        what: &'static str,
        #[source]
        source: NetError,
    },

    /// The backend did not accept a write; details are in the log.
    #[error("Não foi possível {0}")]
    RemoteWriteFailed(&'static str),

    #[error("Nome da pasta é obrigatório")]
    BlankFolderName,

    #[error("Já existe uma pasta com o nome \"{0}\"")]
    DuplicateFolderName(String),

    #[error("A pasta \"{name}\" contém {count} orçamento(s) e não pode ser excluída")]
    FolderNotEmpty { name: String, count: usize },
}

impl From<SubmitError> for ClientError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Validation(e) => Self::Validation(e),
            SubmitError::Duplicate { id, submitted_on } => Self::Duplicate { id, submitted_on },
            SubmitError::Storage(e) => Self::Store(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
