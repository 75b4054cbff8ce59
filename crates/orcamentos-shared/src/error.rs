use thiserror::Error;

/// Reasons a quote submission is rejected before anything is persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Campo obrigatório não preenchido: {0}")]
    MissingField(&'static str),

    #[error("Valor inválido: {0:?}")]
    InvalidAmount(String),

    #[error("Valor deve ser maior que zero")]
    NonPositiveAmount,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("Arquivo sem nome")]
    MissingName,

    #[error("Arquivo vazio: {0}")]
    Empty(String),

    #[error("Arquivo {name} excede o limite de {max} bytes ({size} bytes)")]
    TooLarge { name: String, size: u64, max: u64 },

    #[error("Tipo de arquivo não suportado para {name}: {mime_type}")]
    UnsupportedType { name: String, mime_type: String },

    #[error("Dados do arquivo {0} estão corrompidos")]
    MalformedData(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Tabela desconhecida: {0}")]
pub struct UnknownTable(pub String);
