//! Session writes against a backend whose reads or deletes fail on demand.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use orcamentos_client::{ClientError, ConnectivityFlag, PresenceConfig, QuoteForm, Session};
use orcamentos_net::{Backend, ChangeFeed, Filter, NetError, Order, RemoteRecordService, Result};
use orcamentos_shared::{ChangeEvent, NewFolder, Table};
use serde_json::{json, Value};
use tokio::sync::mpsc;

#[derive(Default)]
struct FlakyBackend {
    failing_selects: Vec<Table>,
    failing_deletes: Vec<Table>,
    folders: Vec<Value>,
    writes: Mutex<Vec<String>>,
}

impl FlakyBackend {
    fn record(&self, write: String) {
        self.writes.lock().unwrap().push(write);
    }

    fn wrote(&self, write: &str) -> bool {
        self.writes.lock().unwrap().iter().any(|w| w == write)
    }
}

fn unavailable() -> NetError {
    NetError::Status {
        status: 503,
        message: "indisponível".into(),
    }
}

#[async_trait]
impl Backend for FlakyBackend {
    async fn select(&self, table: Table, _filters: &[Filter], _order: Option<&Order>) -> Result<Vec<Value>> {
        if self.failing_selects.contains(&table) {
            return Err(unavailable());
        }
        match table {
            Table::Folders => Ok(self.folders.clone()),
            _ => Ok(vec![]),
        }
    }

    async fn insert(&self, table: Table, mut row: Value) -> Result<Value> {
        self.record(format!("insert {table}"));
        row["id"] = json!(format!("{table}-1"));
        Ok(row)
    }

    async fn update(&self, table: Table, _filters: &[Filter], _patch: Value) -> Result<Vec<Value>> {
        self.record(format!("update {table}"));
        Ok(vec![])
    }

    async fn delete(&self, table: Table, _filters: &[Filter]) -> Result<Vec<Value>> {
        if self.failing_deletes.contains(&table) {
            return Err(unavailable());
        }
        self.record(format!("delete {table}"));
        Ok(vec![])
    }
}

/// A feed that never delivers anything.
struct SilentFeed;

#[async_trait]
impl ChangeFeed for SilentFeed {
    async fn open(&self, _table: Table) -> Result<mpsc::Receiver<ChangeEvent<Value>>> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }
}

fn occupied_folder() -> Value {
    json!({
        "id": "f1",
        "name": "IP4 Barcelos",
        "color": "bg-blue-100 text-blue-800 border-blue-200",
        "description": null,
        "created_at": "2024-03-15T10:00:00Z",
    })
}

async fn open(backend: Arc<FlakyBackend>) -> Session {
    Session::open(
        RemoteRecordService::new(backend),
        Arc::new(SilentFeed),
        Arc::new(ConnectivityFlag::default()),
        PresenceConfig::default(),
    )
    .await
}

#[tokio::test]
async fn folder_is_kept_when_its_quotes_cannot_be_read() {
    let backend = Arc::new(FlakyBackend {
        failing_selects: vec![Table::Quotes],
        folders: vec![occupied_folder()],
        ..FlakyBackend::default()
    });
    let session = open(backend.clone()).await;

    let err = session.delete_folder("f1").await.unwrap_err();
    assert!(matches!(err, ClientError::CheckFailed { .. }));
    assert!(!backend.wrote("delete folders"));

    session.close().await;
}

#[tokio::test]
async fn submission_is_refused_when_duplicates_cannot_be_checked() {
    let backend = Arc::new(FlakyBackend {
        failing_selects: vec![Table::Quotes],
        ..FlakyBackend::default()
    });
    let session = open(backend.clone()).await;
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

    let form = QuoteForm {
        service: "Pintura externa".into(),
        payee: "João Silva".into(),
        amount: "1500".into(),
        ..QuoteForm::default()
    };
    let err = session.submit_quote(&form, today).await.unwrap_err();
    assert!(matches!(err, ClientError::CheckFailed { .. }));
    assert!(!backend.wrote("insert quotes"));

    session.close().await;
}

#[tokio::test]
async fn unreadable_folders_are_not_reported_missing() {
    let backend = Arc::new(FlakyBackend {
        failing_selects: vec![Table::Folders],
        ..FlakyBackend::default()
    });
    let session = open(backend.clone()).await;

    let err = session.delete_folder("f1").await.unwrap_err();
    assert!(matches!(err, ClientError::CheckFailed { .. }));

    let err = session
        .create_folder(NewFolder {
            name: "Obras".into(),
            color: String::new(),
            description: None,
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("pastas"));
    assert!(!backend.wrote("insert folders"));

    session.close().await;
}

#[tokio::test]
async fn quote_is_kept_when_attachments_cannot_be_deleted() {
    let backend = Arc::new(FlakyBackend {
        failing_deletes: vec![Table::Attachments],
        ..FlakyBackend::default()
    });
    let session = open(backend.clone()).await;

    let err = session.delete_quote("q1").await.unwrap_err();
    assert!(matches!(err, ClientError::RemoteWriteFailed(_)));
    assert!(!backend.wrote("delete quotes"));

    session.close().await;
}
