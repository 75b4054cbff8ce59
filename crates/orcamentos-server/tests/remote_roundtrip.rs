//! Drives the backend over real HTTP through the client-side transport.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use orcamentos_net::{
    Backend, NetError, RealtimeHub, RemoteConfig, RemoteRecordService, RestBackend, SseFeed,
    Stream,
};
use orcamentos_server::{run, AppState, ServerConfig};
use orcamentos_shared::{
    Amount, ChangeEvent, NewActiveUser, NewFolder, NewQuote, Quote, QuoteStatus, QuoteUpdate,
    StoredAttachment, Table,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

const KEY: &str = "chave-de-teste";

async fn spawn_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(ServerConfig {
        api_key: Some(KEY.into()),
        ..ServerConfig::default()
    });
    tokio::spawn(run(listener, state));
    format!("http://{addr}")
}

fn service(url: &str) -> RemoteRecordService {
    let config = RemoteConfig::new(url, KEY).unwrap();
    RemoteRecordService::new(Arc::new(RestBackend::new(config).unwrap()))
}

fn quote(service: &str, folder_id: Option<&str>) -> NewQuote {
    NewQuote {
        folder_id: folder_id.map(str::to_string),
        site: Some("IP4 Barcelos".into()),
        requester: "Ana".into(),
        service: service.into(),
        payee: "João Silva".into(),
        phone: String::new(),
        tax_id: String::new(),
        bank: String::new(),
        branch: String::new(),
        account: String::new(),
        pix_key: "joao@example.com".into(),
        amount: Amount::from_cents(150_000),
        amount_display: "R$ 1.500,00".into(),
        attachments: vec![],
        submitted_on: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        status: QuoteStatus::Pending,
    }
}

fn folder(name: &str) -> NewFolder {
    NewFolder {
        name: name.into(),
        color: "bg-blue-100 text-blue-800 border-blue-200".into(),
        description: None,
    }
}

#[tokio::test]
async fn folders_and_quotes_crud() {
    let url = spawn_backend().await;
    let remote = service(&url);

    let first = remote.create_folder(&folder("Obras")).await.unwrap();
    let second = remote.create_folder(&folder("Manutenção")).await.unwrap();
    let names: Vec<_> = remote.list_folders().await.into_iter().map(|f| f.name).collect();
    assert_eq!(names, ["Manutenção", "Obras"]);

    let filed = remote
        .create_quote(&quote("Pintura externa", Some(&first.id)))
        .await
        .unwrap();
    let loose = remote.create_quote(&quote("Poda", None)).await.unwrap();
    assert!(filed.created_at.is_some());

    let in_first = remote.list_quotes(Some(&first.id)).await;
    assert_eq!(in_first.iter().map(|q| &q.id).collect::<Vec<_>>(), [&filed.id]);
    assert_eq!(remote.list_quotes(None).await.len(), 2);

    assert!(
        remote
            .update_quote(&loose.id, &QuoteUpdate::folder(Some(second.id.clone())))
            .await
    );
    assert!(
        remote
            .update_quote(&loose.id, &QuoteUpdate::status(QuoteStatus::Approved))
            .await
    );
    let moved: Vec<Quote> = remote.list_quotes(Some(&second.id)).await;
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].status, QuoteStatus::Approved);

    assert!(remote.delete_quote(&loose.id).await);
    assert!(remote.delete_folder(&second.id).await);
    assert_eq!(remote.list_folders().await.len(), 1);
}

#[tokio::test]
async fn attachments_are_listed_oldest_first() {
    let url = spawn_backend().await;
    let remote = service(&url);

    for name in ["a.pdf", "b.pdf"] {
        let attachment = StoredAttachment {
            id: None,
            quote_id: "q1".into(),
            name: name.into(),
            mime_type: "application/pdf".into(),
            size: 3,
            data: "data:application/pdf;base64,JVBE".into(),
            preview: None,
            created_at: None,
        };
        let stored = remote.create_attachment(&attachment).await.unwrap();
        assert!(stored.id.is_some());
    }

    let names: Vec<_> = remote
        .list_attachments("q1")
        .await
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, ["a.pdf", "b.pdf"]);

    assert!(remote.delete_attachments("q1").await);
    assert!(remote.list_attachments("q1").await.is_empty());
}

#[tokio::test]
async fn stale_presence_is_swept() {
    let url = spawn_backend().await;
    let remote = service(&url);
    let now = Utc::now();

    let fresh = remote
        .insert_active_user(&NewActiveUser {
            name: "Usuário 1".into(),
            color: "bg-red-100".into(),
            last_activity: now,
            current_page: Some("/".into()),
            editing_quote_id: None,
        })
        .await
        .unwrap();
    remote
        .insert_active_user(&NewActiveUser {
            name: "Usuário 2".into(),
            color: "bg-teal-100".into(),
            last_activity: now - chrono::Duration::minutes(5),
            current_page: None,
            editing_quote_id: None,
        })
        .await
        .unwrap();

    assert!(remote.delete_stale_users(now - chrono::Duration::minutes(2)).await);
    let users = remote.list_active_users().await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, fresh.id);

    assert!(remote.touch_active_user(&fresh.id, Some("/orcamentos"), Some("q1")).await);
    let users = remote.list_active_users().await;
    assert_eq!(users[0].current_page.as_deref(), Some("/orcamentos"));
    assert_eq!(users[0].editing_quote_id.as_deref(), Some("q1"));
}

#[tokio::test]
async fn wrong_key_is_rejected() {
    let url = spawn_backend().await;
    let config = RemoteConfig::new(&url, "errada").unwrap();
    let backend = RestBackend::new(config).unwrap();

    let err = backend.select(Table::Quotes, &[], None).await.unwrap_err();
    assert!(matches!(err, NetError::Status { status: 401, .. }));

    let remote = RemoteRecordService::new(Arc::new(backend));
    assert!(remote.list_quotes(None).await.is_empty());
    assert!(remote.create_folder(&folder("Obras")).await.is_none());
}

async fn next_event<T>(rx: &mut mpsc::UnboundedReceiver<ChangeEvent<T>>) -> ChangeEvent<T> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("change event in time")
        .expect("subscription open")
}

#[tokio::test]
async fn realtime_changes_reach_subscribers() {
    let url = spawn_backend().await;
    let remote = service(&url);
    let feed = SseFeed::new(RemoteConfig::new(&url, KEY).unwrap()).unwrap();
    let hub = RealtimeHub::new(Arc::new(feed));

    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.subscribe::<Quote, _>(Stream::Quotes, move |event| {
        let _ = tx.send(event);
    })
    .await
    .unwrap();

    let created = remote.create_quote(&quote("Pintura externa", None)).await.unwrap();
    assert!(
        remote
            .update_quote(&created.id, &QuoteUpdate::status(QuoteStatus::UnderReview))
            .await
    );
    assert!(remote.delete_quote(&created.id).await);

    let mut view: Vec<Quote> = Vec::new();

    let inserted = next_event(&mut rx).await;
    assert!(matches!(&inserted, ChangeEvent::Insert { new } if new.id == created.id));
    inserted.apply(&mut view);
    assert_eq!(view.len(), 1);

    let updated = next_event(&mut rx).await;
    match &updated {
        ChangeEvent::Update { new, old } => {
            assert_eq!(new.status, QuoteStatus::UnderReview);
            assert_eq!(old.as_ref().map(|q| q.status), Some(QuoteStatus::Pending));
        }
        other => panic!("expected update, got {}", other.kind()),
    }
    updated.apply(&mut view);
    assert_eq!(view[0].status, QuoteStatus::UnderReview);

    let deleted = next_event(&mut rx).await;
    assert_eq!(deleted.kind(), "DELETE");
    deleted.apply(&mut view);
    assert!(view.is_empty());

    hub.unsubscribe_all();
}
