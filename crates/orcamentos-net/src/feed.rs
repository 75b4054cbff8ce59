//! Change notifications over server-sent events.
//!
//! The backend publishes one `text/event-stream` per table at
//! `{url}/realtime/v1/{table}`. Each event carries a JSON-encoded
//! [`ChangeEvent`] in its `data:` lines.

use async_trait::async_trait;
use futures::StreamExt;
use orcamentos_shared::{ChangeEvent, Table};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::check_status;
use crate::config::RemoteConfig;
use crate::error::Result;

const FEED_BUFFER: usize = 64;

/// Source of row-change notifications for a table.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Start listening to `table`. The receiver closes when the feed ends;
    /// dropping it stops the feed.
    async fn open(&self, table: Table) -> Result<mpsc::Receiver<ChangeEvent<Value>>>;
}

#[derive(Debug, Clone)]
pub struct SseFeed {
    client: Client,
    config: RemoteConfig,
}

impl SseFeed {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ChangeFeed for SseFeed {
    async fn open(&self, table: Table) -> Result<mpsc::Receiver<ChangeEvent<Value>>> {
        let url = format!("{}/realtime/v1/{}", self.config.url, table);
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(response).await?;

        info!(%table, "Change feed opened");

        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        tokio::spawn(read_events(table, response, tx));
        Ok(rx)
    }
}

async fn read_events(table: Table, response: Response, tx: mpsc::Sender<ChangeEvent<Value>>) {
    let mut body = std::pin::pin!(response.bytes_stream());
    let mut parser = EventParser::default();

    loop {
        let chunk = tokio::select! {
            _ = tx.closed() => break,
            chunk = body.next() => chunk,
        };

        let bytes = match chunk {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                warn!(%table, error = %e, "Change feed read failed");
                break;
            }
            None => break,
        };

        for data in parser.push(&bytes) {
            match serde_json::from_str::<ChangeEvent<Value>>(&data) {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!(%table, error = %e, "Skipping malformed change event"),
            }
        }
    }

    debug!(%table, "Change feed closed");
}

/// Incremental `text/event-stream` parser yielding the data of each event.
#[derive(Debug, Default)]
pub(crate) struct EventParser {
    buffer: Vec<u8>,
}

impl EventParser {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let block = String::from_utf8_lossy(&block);

            let data: Vec<&str> = block
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|d| d.strip_prefix(' ').unwrap_or(d))
                .collect();
            if !data.is_empty() {
                events.push(data.join("\n"));
            }
        }
        events
    }
}
