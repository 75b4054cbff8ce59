//! Typed CRUD over the shared backend.
//!
//! Every operation issues a single request. Failures are logged and turned
//! into a benign value: reads give an empty list, creates give `None` and
//! other writes give `false`. Nothing is retried.
//!
//! Callers that must not mistake a failed read for an empty table, such as
//! guards that check before writing, use the `try_list_*` reads instead.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use orcamentos_shared::{
    ActiveUser, Folder, FolderUpdate, NewActiveUser, NewFolder, NewQuote, Quote, QuoteUpdate,
    StoredAttachment, Table,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::backend::{Backend, Filter, Order};
use crate::error::Result;

#[derive(Clone)]
pub struct RemoteRecordService {
    backend: Arc<dyn Backend>,
}

impl RemoteRecordService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    // -- Folders ------------------------------------------------------------

    pub async fn list_folders(&self) -> Vec<Folder> {
        self.list(Table::Folders, &[], Order::desc("created_at")).await
    }

    pub async fn try_list_folders(&self) -> Result<Vec<Folder>> {
        self.try_list(Table::Folders, &[], Order::desc("created_at"))
            .await
    }

    pub async fn create_folder(&self, folder: &NewFolder) -> Option<Folder> {
        self.create(Table::Folders, folder).await
    }

    pub async fn update_folder(&self, id: &str, update: &FolderUpdate) -> bool {
        self.patch(Table::Folders, id, update).await
    }

    pub async fn delete_folder(&self, id: &str) -> bool {
        self.remove(Table::Folders, &[Filter::eq("id", id)]).await
    }

    // -- Quotes -------------------------------------------------------------

    /// All quotes, or only those filed under `folder_id`.
    pub async fn list_quotes(&self, folder_id: Option<&str>) -> Vec<Quote> {
        self.list(Table::Quotes, &folder_filter(folder_id), Order::desc("created_at"))
            .await
    }

    pub async fn try_list_quotes(&self, folder_id: Option<&str>) -> Result<Vec<Quote>> {
        self.try_list(Table::Quotes, &folder_filter(folder_id), Order::desc("created_at"))
            .await
    }

    pub async fn create_quote(&self, quote: &NewQuote) -> Option<Quote> {
        self.create(Table::Quotes, quote).await
    }

    pub async fn update_quote(&self, id: &str, update: &QuoteUpdate) -> bool {
        self.patch(Table::Quotes, id, update).await
    }

    pub async fn delete_quote(&self, id: &str) -> bool {
        self.remove(Table::Quotes, &[Filter::eq("id", id)]).await
    }

    // -- Attachments --------------------------------------------------------

    pub async fn list_attachments(&self, quote_id: &str) -> Vec<StoredAttachment> {
        self.list(
            Table::Attachments,
            &[Filter::eq("quote_id", quote_id)],
            Order::asc("created_at"),
        )
        .await
    }

    pub async fn create_attachment(&self, attachment: &StoredAttachment) -> Option<StoredAttachment> {
        self.create(Table::Attachments, attachment).await
    }

    pub async fn delete_attachments(&self, quote_id: &str) -> bool {
        self.remove(Table::Attachments, &[Filter::eq("quote_id", quote_id)])
            .await
    }

    // -- Active users -------------------------------------------------------

    pub async fn list_active_users(&self) -> Vec<ActiveUser> {
        self.list(Table::ActiveUsers, &[], Order::desc("last_activity"))
            .await
    }

    pub async fn insert_active_user(&self, user: &NewActiveUser) -> Option<ActiveUser> {
        self.create(Table::ActiveUsers, user).await
    }

    /// Refresh `last_activity` and record what the user is looking at.
    pub async fn touch_active_user(
        &self,
        id: &str,
        current_page: Option<&str>,
        editing_quote_id: Option<&str>,
    ) -> bool {
        let patch = json!({
            "last_activity": timestamp(Utc::now()),
            "current_page": current_page,
            "editing_quote_id": editing_quote_id,
        });
        self.patch(Table::ActiveUsers, id, &patch).await
    }

    pub async fn delete_active_user(&self, id: &str) -> bool {
        self.remove(Table::ActiveUsers, &[Filter::eq("id", id)]).await
    }

    /// Delete every presence record last active before `cutoff`.
    pub async fn delete_stale_users(&self, cutoff: DateTime<Utc>) -> bool {
        self.remove(
            Table::ActiveUsers,
            &[Filter::lt("last_activity", timestamp(cutoff))],
        )
        .await
    }

    // -- Helpers ------------------------------------------------------------

    async fn try_list<T: DeserializeOwned>(
        &self,
        table: Table,
        filters: &[Filter],
        order: Order,
    ) -> Result<Vec<T>> {
        let rows = self
            .backend
            .select(table, filters, Some(&order))
            .await
            .and_then(decode_rows)?;
        debug!(%table, count = rows.len(), "Listed rows");
        Ok(rows)
    }

    async fn list<T: DeserializeOwned>(&self, table: Table, filters: &[Filter], order: Order) -> Vec<T> {
        match self.try_list(table, filters, order).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(%table, error = %e, "Failed to list rows");
                Vec::new()
            }
        }
    }

    async fn create<B: Serialize, T: DeserializeOwned>(&self, table: Table, row: &B) -> Option<T> {
        let result: Result<T> = async {
            let row = serde_json::to_value(row)?;
            let stored = self.backend.insert(table, row).await?;
            Ok(serde_json::from_value(stored)?)
        }
        .await;
        match result {
            Ok(created) => Some(created),
            Err(e) => {
                error!(%table, error = %e, "Failed to create row");
                None
            }
        }
    }

    async fn patch<B: Serialize>(&self, table: Table, id: &str, patch: &B) -> bool {
        let result: Result<Vec<Value>> = async {
            let patch = serde_json::to_value(patch)?;
            self.backend
                .update(table, &[Filter::eq("id", id)], patch)
                .await
        }
        .await;
        match result {
            Ok(_) => true,
            Err(e) => {
                error!(%table, id, error = %e, "Failed to update row");
                false
            }
        }
    }

    async fn remove(&self, table: Table, filters: &[Filter]) -> bool {
        match self.backend.delete(table, filters).await {
            Ok(rows) => {
                debug!(%table, count = rows.len(), "Deleted rows");
                true
            }
            Err(e) => {
                error!(%table, error = %e, "Failed to delete rows");
                false
            }
        }
    }
}

fn folder_filter(folder_id: Option<&str>) -> Vec<Filter> {
    folder_id
        .map(|id| Filter::eq("folder_id", id))
        .into_iter()
        .collect()
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
        .collect()
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
