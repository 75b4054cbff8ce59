use orcamentos_shared::constants::attachments_document;
use orcamentos_shared::StoredAttachment;

use crate::error::Result;
use crate::records::RecordStore;
use crate::storage::DocumentStorage;

impl<S: DocumentStorage> RecordStore<S> {
    /// Append attachments to the collection of `quote_id`.
    pub fn store_attachments(&self, quote_id: &str, new: Vec<StoredAttachment>) -> Result<()> {
        if new.is_empty() {
            return Ok(());
        }
        let key = attachments_document(quote_id);
        let mut stored: Vec<StoredAttachment> = self.load(&key)?;
        stored.extend(new);
        self.save(&key, &stored)
    }

    pub fn attachments(&self, quote_id: &str) -> Vec<StoredAttachment> {
        self.load_or_empty(&attachments_document(quote_id))
    }

    pub fn delete_attachments(&self, quote_id: &str) -> Result<()> {
        self.storage().remove(&attachments_document(quote_id))
    }
}
