//! In-memory tables with change broadcasting.
//!
//! Each table keeps its rows in insertion order behind a tokio mutex and owns
//! a broadcast channel. Every successful write publishes one
//! [`ChangeEvent`] per affected row, in the order the writes were applied.

use std::collections::{BTreeMap, HashMap};

use chrono::{SecondsFormat, Utc};
use orcamentos_shared::{ChangeEvent, Table};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServerError;
use crate::query::{RowFilter, RowQuery};

/// Capacity of each table's change channel. Slow subscribers that fall
/// further behind lose events.
const EVENT_BUFFER: usize = 256;

/// Columns the server owns; clients cannot patch them.
const SERVER_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

type Row = Map<String, Value>;

struct TableData {
    rows: Mutex<Vec<Row>>,
    events: broadcast::Sender<ChangeEvent<Value>>,
}

pub struct TableStore {
    tables: HashMap<Table, TableData>,
}

impl Default for TableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TableStore {
    pub fn new() -> Self {
        let tables = Table::ALL
            .into_iter()
            .map(|table| {
                let (events, _) = broadcast::channel(EVENT_BUFFER);
                let data = TableData {
                    rows: Mutex::new(Vec::new()),
                    events,
                };
                (table, data)
            })
            .collect();
        Self { tables }
    }

    fn data(&self, table: Table) -> Result<&TableData, ServerError> {
        self.tables
            .get(&table)
            .ok_or_else(|| ServerError::Internal(format!("table {table} not initialised")))
    }

    pub async fn select(&self, table: Table, query: &RowQuery) -> Result<Vec<Value>, ServerError> {
        let rows = self.data(table)?.rows.lock().await;
        let matching: Vec<Row> = rows.iter().filter(|r| query.matches(r)).cloned().collect();
        drop(rows);

        Ok(query.arrange(matching).into_iter().map(Value::Object).collect())
    }

    /// Insert one row, assigning `id` (unless supplied) and timestamps.
    pub async fn insert(&self, table: Table, row: Value) -> Result<Value, ServerError> {
        let Value::Object(mut row) = row else {
            return Err(ServerError::BadRequest("Row must be a JSON object".into()));
        };

        let now = Value::String(now());
        row.insert("created_at".into(), now.clone());
        if table.tracks_updates() {
            row.insert("updated_at".into(), now);
        }

        let data = self.data(table)?;
        let mut rows = data.rows.lock().await;

        let id = match row.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        if rows.iter().any(|r| r.get("id").and_then(Value::as_str) == Some(id.as_str())) {
            return Err(ServerError::Conflict(format!("{table} row {id} already exists")));
        }
        row.insert("id".into(), Value::String(id.clone()));

        rows.push(row.clone());
        let stored = Value::Object(row);
        publish(data, ChangeEvent::Insert { new: stored.clone() });
        drop(rows);

        info!(%table, %id, "Row inserted");
        Ok(stored)
    }

    /// Patch every row matching `filters`.
    pub async fn update(
        &self,
        table: Table,
        filters: &[RowFilter],
        patch: Value,
    ) -> Result<Vec<Value>, ServerError> {
        require_filters(filters)?;
        let Value::Object(mut patch) = patch else {
            return Err(ServerError::BadRequest("Patch must be a JSON object".into()));
        };
        for column in SERVER_COLUMNS {
            patch.remove(column);
        }

        let data = self.data(table)?;
        let mut rows = data.rows.lock().await;
        let now = now();
        let mut updated = Vec::new();

        for row in rows.iter_mut().filter(|r| filters.iter().all(|f| f.matches(r))) {
            let old = Value::Object(row.clone());
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
            if table.tracks_updates() {
                row.insert("updated_at".into(), Value::String(now.clone()));
            }
            let new = Value::Object(row.clone());
            publish(
                data,
                ChangeEvent::Update {
                    new: new.clone(),
                    old: Some(old),
                },
            );
            updated.push(new);
        }
        drop(rows);

        debug!(%table, count = updated.len(), "Rows updated");
        Ok(updated)
    }

    /// Delete every row matching `filters`.
    pub async fn delete(&self, table: Table, filters: &[RowFilter]) -> Result<Vec<Value>, ServerError> {
        require_filters(filters)?;

        let data = self.data(table)?;
        let mut rows = data.rows.lock().await;
        let (removed, kept): (Vec<Row>, Vec<Row>) = rows
            .drain(..)
            .partition(|r| filters.iter().all(|f| f.matches(r)));
        *rows = kept;

        let removed: Vec<Value> = removed.into_iter().map(Value::Object).collect();
        for old in &removed {
            publish(data, ChangeEvent::Delete { old: old.clone() });
        }
        drop(rows);

        debug!(%table, count = removed.len(), "Rows deleted");
        Ok(removed)
    }

    pub fn subscribe(&self, table: Table) -> Result<broadcast::Receiver<ChangeEvent<Value>>, ServerError> {
        Ok(self.data(table)?.events.subscribe())
    }

    /// Row count per table name.
    pub async fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (table, data) in &self.tables {
            counts.insert(table.as_str(), data.rows.lock().await.len());
        }
        counts
    }
}

fn publish(data: &TableData, event: ChangeEvent<Value>) {
    // No subscribers is not an error.
    let _ = data.events.send(event);
}

fn require_filters(filters: &[RowFilter]) -> Result<(), ServerError> {
    if filters.is_empty() {
        return Err(ServerError::BadRequest(
            "Refusing to modify a whole table; add a filter".into(),
        ));
    }
    Ok(())
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
