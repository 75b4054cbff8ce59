//! Realtime subscriptions.
//!
//! The hub owns one background task per subscribed stream. Each task reads
//! the table's change feed, decodes events into the caller's record type and
//! hands them to the callback in delivery order.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use orcamentos_shared::{ChangeEvent, Table};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::feed::ChangeFeed;

/// Named subscription streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Quotes,
    Folders,
    ActiveUsers,
}

impl Stream {
    pub const ALL: [Stream; 3] = [Stream::Quotes, Stream::Folders, Stream::ActiveUsers];

    pub fn table(self) -> Table {
        match self {
            Stream::Quotes => Table::Quotes,
            Stream::Folders => Table::Folders,
            Stream::ActiveUsers => Table::ActiveUsers,
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table().as_str())
    }
}

pub struct RealtimeHub {
    feed: Arc<dyn ChangeFeed>,
    tasks: Mutex<HashMap<Stream, JoinHandle<()>>>,
}

impl RealtimeHub {
    pub fn new(feed: Arc<dyn ChangeFeed>) -> Self {
        Self {
            feed,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Deliver every change on `stream` to `callback`. Subscribing again to
    /// the same stream replaces the previous subscription.
    pub async fn subscribe<T, F>(&self, stream: Stream, mut callback: F) -> Result<()>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnMut(ChangeEvent<T>) + Send + 'static,
    {
        let mut events = self.feed.open(stream.table()).await?;

        let handle = tokio::spawn(async move {
            while let Some(raw) = events.recv().await {
                match raw.decode::<T>() {
                    Ok(event) => callback(event),
                    Err(e) => warn!(%stream, error = %e, "Dropping undecodable change event"),
                }
            }
            debug!(%stream, "Subscription ended");
        });

        if let Some(previous) = self.tasks().insert(stream, handle) {
            previous.abort();
        }
        info!(%stream, "Subscribed");
        Ok(())
    }

    /// Stop `stream`. Other subscriptions keep running.
    pub fn unsubscribe(&self, stream: Stream) -> bool {
        match self.tasks().remove(&stream) {
            Some(handle) => {
                handle.abort();
                info!(%stream, "Unsubscribed");
                true
            }
            None => false,
        }
    }

    pub fn unsubscribe_all(&self) {
        for (stream, handle) in self.tasks().drain() {
            handle.abort();
            debug!(%stream, "Unsubscribed");
        }
    }

    pub fn is_subscribed(&self, stream: Stream) -> bool {
        self.tasks()
            .get(&stream)
            .is_some_and(|handle| !handle.is_finished())
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<Stream, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for RealtimeHub {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use orcamentos_shared::Keyed;
    use serde::Deserialize;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    use super::*;

    #[derive(Debug, Clone, Deserialize)]
    struct Row {
        id: String,
    }

    impl Keyed for Row {
        fn key(&self) -> &str {
            &self.id
        }
    }

    /// Feed whose senders are kept by the test.
    #[derive(Default)]
    struct ManualFeed {
        senders: Mutex<HashMap<Table, mpsc::Sender<ChangeEvent<Value>>>>,
    }

    impl ManualFeed {
        async fn emit(&self, table: Table, event: ChangeEvent<Value>) -> bool {
            let sender = self.senders.lock().unwrap().get(&table).cloned();
            match sender {
                Some(tx) => tx.send(event).await.is_ok(),
                None => false,
            }
        }
    }

    #[async_trait]
    impl ChangeFeed for ManualFeed {
        async fn open(&self, table: Table) -> Result<mpsc::Receiver<ChangeEvent<Value>>> {
            let (tx, rx) = mpsc::channel(8);
            self.senders.lock().unwrap().insert(table, tx);
            Ok(rx)
        }
    }

    fn insert(id: &str) -> ChangeEvent<Value> {
        ChangeEvent::Insert {
            new: json!({ "id": id }),
        }
    }

    #[tokio::test]
    async fn events_reach_the_view_in_order() {
        let feed = Arc::new(ManualFeed::default());
        let hub = RealtimeHub::new(feed.clone());

        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.subscribe::<Row, _>(Stream::Quotes, move |event| {
            let _ = tx.send(event);
        })
        .await
        .unwrap();

        assert!(feed.emit(Table::Quotes, insert("a")).await);
        assert!(feed.emit(Table::Quotes, insert("b")).await);
        assert!(
            feed.emit(Table::Quotes, ChangeEvent::Delete { old: json!({ "id": "a" }) })
                .await
        );

        let mut view: Vec<Row> = Vec::new();
        for _ in 0..3 {
            let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            event.apply(&mut view);
        }
        let ids: Vec<_> = view.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b"]);
    }

    #[tokio::test]
    async fn unsubscribe_stops_only_that_stream() {
        let feed = Arc::new(ManualFeed::default());
        let hub = RealtimeHub::new(feed.clone());

        hub.subscribe::<Row, _>(Stream::Quotes, |_| {}).await.unwrap();
        hub.subscribe::<Row, _>(Stream::Folders, |_| {}).await.unwrap();

        assert!(hub.unsubscribe(Stream::Quotes));
        assert!(!hub.unsubscribe(Stream::Quotes));
        assert!(!hub.is_subscribed(Stream::Quotes));
        assert!(hub.is_subscribed(Stream::Folders));

        // The aborted task drops its receiver.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!feed.emit(Table::Quotes, insert("x")).await);
        assert!(feed.emit(Table::Folders, insert("y")).await);

        hub.unsubscribe_all();
        assert!(!hub.is_subscribed(Stream::Folders));
    }
}
