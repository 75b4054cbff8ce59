use std::collections::HashMap;

use chrono::Utc;
use orcamentos_shared::constants::{FOLDERS_DOCUMENT, QUOTES_DOCUMENT};
use orcamentos_shared::{find_duplicate, Candidate, Folder, NewQuote, Quote, QuoteStatus, QuoteUpdate};

use crate::error::{Result, StoreError, SubmitError};
use crate::records::RecordStore;
use crate::storage::DocumentStorage;

impl<S: DocumentStorage> RecordStore<S> {
    pub fn list_quotes(&self) -> Vec<Quote> {
        self.load_or_empty(QUOTES_DOCUMENT)
    }

    pub fn get_quote(&self, id: &str) -> Option<Quote> {
        self.list_quotes().into_iter().find(|q| q.id == id)
    }

    /// Quotes filed under `folder_id`; `None` selects the unfiled ones.
    pub fn quotes_in_folder(&self, folder_id: Option<&str>) -> Vec<Quote> {
        self.list_quotes()
            .into_iter()
            .filter(|q| q.folder_id.as_deref() == folder_id)
            .collect()
    }

    /// Number of quotes per folder ID. Unfiled quotes are not counted.
    pub fn folder_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for quote in self.list_quotes() {
            if let Some(folder_id) = quote.fields.folder_id {
                *counts.entry(folder_id).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Persist a new quote under its deterministic ID.
    ///
    /// Fails with [`SubmitError::Duplicate`] when the duplicate detector finds
    /// a conflicting record; nothing is written in that case.
    pub fn insert_quote(&self, fields: NewQuote) -> std::result::Result<Quote, SubmitError> {
        let mut quotes: Vec<Quote> = self.load(QUOTES_DOCUMENT)?;

        let candidate = Candidate::from(&fields);
        if let Some(existing) = find_duplicate(&quotes, &candidate, self.grain()) {
            tracing::info!(id = %existing.id, "duplicate quote rejected");
            return Err(SubmitError::Duplicate {
                id: existing.id.clone(),
                submitted_on: existing.submitted_on,
            });
        }

        let mut quote = Quote::new(candidate.id(self.grain()), fields);
        quote.created_at = Some(Utc::now());
        quotes.push(quote.clone());
        self.save(QUOTES_DOCUMENT, &quotes)?;

        tracing::info!(id = %quote.id, "quote saved");
        Ok(quote)
    }

    pub fn update_status(&self, id: &str, status: QuoteStatus) -> Result<Quote> {
        self.update_quote(id, &QuoteUpdate::status(status))
    }

    /// Apply a partial update. A new folder reference must name an existing
    /// folder.
    pub fn update_quote(&self, id: &str, update: &QuoteUpdate) -> Result<Quote> {
        if let Some(Some(folder_id)) = &update.folder_id {
            let folders: Vec<Folder> = self.load(FOLDERS_DOCUMENT)?;
            if !folders.iter().any(|f| &f.id == folder_id) {
                return Err(StoreError::folder_not_found(folder_id));
            }
        }

        let mut quotes: Vec<Quote> = self.load(QUOTES_DOCUMENT)?;
        let quote = quotes
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| StoreError::quote_not_found(id))?;

        update.apply_to(&mut quote.fields);
        quote.updated_at = Some(Utc::now());
        let updated = quote.clone();

        self.save(QUOTES_DOCUMENT, &quotes)?;
        Ok(updated)
    }

    /// File a quote under another folder, or unfile it with `None`.
    pub fn move_to_folder(&self, id: &str, folder_id: Option<&str>) -> Result<Quote> {
        self.update_quote(id, &QuoteUpdate::folder(folder_id.map(str::to_string)))
    }

    /// Delete a quote and its attachments. Returns `false` if no such quote.
    ///
    /// Attachments go first: if they cannot be removed the quote is kept.
    pub fn delete_quote(&self, id: &str) -> Result<bool> {
        let mut quotes: Vec<Quote> = self.load(QUOTES_DOCUMENT)?;
        let before = quotes.len();
        quotes.retain(|q| q.id != id);
        if quotes.len() == before {
            return Ok(false);
        }

        self.delete_attachments(id)?;
        self.save(QUOTES_DOCUMENT, &quotes)?;

        tracing::info!(id, "quote deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use orcamentos_shared::{Amount, IdGrain};

    use super::*;
    use crate::records::fixtures::{date, folder, quote};
    use crate::storage::MemoryStorage;

    fn store() -> RecordStore<MemoryStorage> {
        RecordStore::new(MemoryStorage::new())
    }

    #[test]
    fn insert_assigns_day_grain_id() {
        let store = store();
        let saved = store
            .insert_quote(quote("Pintura externa", "João Silva", date(2024, 3, 15)))
            .unwrap();
        assert_eq!(saved.id, "pintura_externa-joo_silva-15/03/2024");
        assert!(saved.created_at.is_some());
        assert_eq!(store.get_quote(&saved.id).unwrap().payee, "João Silva");
    }

    #[test]
    fn repeat_submission_scenario() {
        let store = store();
        let a = store
            .insert_quote(quote("Pintura externa", "João Silva", date(2024, 3, 15)))
            .unwrap();

        let err = store
            .insert_quote(quote("Pintura externa", "João Silva", date(2024, 3, 15)))
            .unwrap_err();
        match &err {
            SubmitError::Duplicate { id, submitted_on } => {
                assert_eq!(id, &a.id);
                assert_eq!(*submitted_on, date(2024, 3, 15));
            }
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        assert!(message.contains(&a.id));
        assert!(message.contains("15/03/2024"));
        assert_eq!(store.list_quotes().len(), 1);

        store
            .insert_quote(quote("Pintura externa", "João Silva", date(2024, 4, 1)))
            .unwrap();
        assert_eq!(store.list_quotes().len(), 2);
    }

    #[test]
    fn month_grain_store_allows_other_amounts() {
        let store = store().with_grain(IdGrain::Month);
        let first = store
            .insert_quote(quote("Limpeza", "Pedro", date(2024, 3, 1)))
            .unwrap();
        assert_eq!(first.id, "limpeza-pedro-1500.00-2024-03");

        let mut cheaper = quote("Limpeza", "Pedro", date(2024, 3, 20));
        cheaper.amount = Amount::from_cents(90_000);
        store.insert_quote(cheaper).unwrap();

        let same = quote("Limpeza", "Pedro", date(2024, 3, 20));
        assert!(matches!(
            store.insert_quote(same),
            Err(SubmitError::Duplicate { .. })
        ));
    }

    #[test]
    fn update_and_status() {
        let store = store();
        let saved = store
            .insert_quote(quote("Poda", "Rui", date(2024, 5, 2)))
            .unwrap();

        let updated = store.update_status(&saved.id, QuoteStatus::Approved).unwrap();
        assert_eq!(updated.status, QuoteStatus::Approved);
        assert_eq!(updated.id, saved.id);
        assert!(updated.updated_at.is_some());

        let missing = store.update_status("nope", QuoteStatus::Rejected);
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn move_requires_existing_folder() {
        let store = store();
        let q = store
            .insert_quote(quote("Poda", "Rui", date(2024, 5, 2)))
            .unwrap();

        assert!(matches!(
            store.move_to_folder(&q.id, Some("ghost")),
            Err(StoreError::NotFound { .. })
        ));

        let f = store.create_folder(folder("Obras")).unwrap();
        store.move_to_folder(&q.id, Some(&f.id)).unwrap();
        assert_eq!(store.quotes_in_folder(Some(&f.id)).len(), 1);
        assert!(store.quotes_in_folder(None).is_empty());
        assert_eq!(store.folder_counts().get(&f.id), Some(&1));
    }

    #[test]
    fn update_rejects_unknown_folder() {
        let store = store();
        let q = store
            .insert_quote(quote("Poda", "Rui", date(2024, 5, 2)))
            .unwrap();

        let err = store
            .update_quote(&q.id, &QuoteUpdate::folder(Some("ghost".into())))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "Pasta", .. }));
        assert_eq!(store.get_quote(&q.id).unwrap().folder_id, None);

        assert!(store.update_quote(&q.id, &QuoteUpdate::folder(None)).is_ok());
    }

    #[test]
    fn unavailable_storage_reads_empty_and_rejects_writes() {
        let store = store();
        store.storage().set_unavailable(true);

        assert!(store.list_quotes().is_empty());
        let err = store
            .insert_quote(quote("Poda", "Rui", date(2024, 5, 2)))
            .unwrap_err();
        assert!(matches!(err, SubmitError::Storage(StoreError::Unavailable(_))));
    }

    #[test]
    fn corrupted_collection_is_not_overwritten() {
        let store = store();
        store.storage().insert_raw(QUOTES_DOCUMENT, "{not json").unwrap();

        assert!(store.list_quotes().is_empty());
        let err = store
            .insert_quote(quote("Poda", "Rui", date(2024, 5, 2)))
            .unwrap_err();
        assert!(matches!(err, SubmitError::Storage(StoreError::Corrupted { .. })));
        assert_eq!(
            store.storage().read(QUOTES_DOCUMENT).unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn quota_failure_leaves_previous_records() {
        let store = store();
        store
            .insert_quote(quote("Poda", "Rui", date(2024, 5, 2)))
            .unwrap();
        store.storage().set_quota(Some(16)).unwrap();

        let err = store
            .insert_quote(quote("Poda", "Rui", date(2024, 5, 3)))
            .unwrap_err();
        assert!(matches!(err, SubmitError::Storage(StoreError::QuotaExceeded { .. })));
        assert_eq!(store.list_quotes().len(), 1);
    }
}
