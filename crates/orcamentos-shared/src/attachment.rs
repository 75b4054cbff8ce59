//! Attachment encoding.
//!
//! Payloads are stored as self-describing data URLs
//! (`data:<mime>;base64,<payload>`) so that a stored attachment can be
//! decoded without any side information. Each file in a batch is encoded
//! independently; a failing file never aborts the rest.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::constants::MAX_ATTACHMENT_SIZE;
use crate::error::AttachmentError;
use crate::types::StoredAttachment;

const DEFAULT_MIME: &str = "application/octet-stream";

/// A file picked by the user, before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Only images and PDF documents are accepted.
pub fn is_accepted_type(mime_type: &str) -> bool {
    mime_type.starts_with("image/") || mime_type == "application/pdf"
}

pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    let mime = if mime_type.is_empty() {
        DEFAULT_MIME
    } else {
        mime_type
    };
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Split a data URL into its MIME type and decoded bytes.
pub fn from_data_url(data_url: &str) -> Option<(String, Vec<u8>)> {
    let rest = data_url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };
    Some((mime.to_string(), bytes))
}

pub fn encode(
    quote_id: &str,
    upload: &AttachmentUpload,
) -> Result<StoredAttachment, AttachmentError> {
    let name = upload.name.trim();
    if name.is_empty() {
        return Err(AttachmentError::MissingName);
    }
    if upload.bytes.is_empty() {
        return Err(AttachmentError::Empty(name.to_string()));
    }

    let size = upload.bytes.len() as u64;
    if size > MAX_ATTACHMENT_SIZE {
        return Err(AttachmentError::TooLarge {
            name: name.to_string(),
            size,
            max: MAX_ATTACHMENT_SIZE,
        });
    }
    if !is_accepted_type(&upload.mime_type) {
        return Err(AttachmentError::UnsupportedType {
            name: name.to_string(),
            mime_type: upload.mime_type.clone(),
        });
    }

    let data = to_data_url(&upload.mime_type, &upload.bytes);
    let preview = upload
        .mime_type
        .starts_with("image/")
        .then(|| data.clone());

    Ok(StoredAttachment {
        id: None,
        quote_id: quote_id.to_string(),
        name: name.to_string(),
        mime_type: upload.mime_type.clone(),
        size,
        data,
        preview,
        created_at: None,
    })
}

/// Encode every upload, collecting failures separately.
pub fn encode_batch(
    quote_id: &str,
    uploads: &[AttachmentUpload],
) -> (Vec<StoredAttachment>, Vec<AttachmentError>) {
    let mut stored = Vec::with_capacity(uploads.len());
    let mut failed = Vec::new();
    for upload in uploads {
        match encode(quote_id, upload) {
            Ok(attachment) => stored.push(attachment),
            Err(e) => failed.push(e),
        }
    }
    (stored, failed)
}

/// Decode the original bytes of a stored attachment.
pub fn decode(attachment: &StoredAttachment) -> Result<Vec<u8>, AttachmentError> {
    from_data_url(&attachment.data)
        .map(|(_, bytes)| bytes)
        .ok_or_else(|| AttachmentError::MalformedData(attachment.name.clone()))
}
