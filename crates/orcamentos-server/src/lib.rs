//! # orcamentos-server
//!
//! Shared backend for the Orçamentos clients.
//!
//! This crate provides:
//! - **In-memory tables** (`folders`, `quotes`, `attachments`,
//!   `active_users`) with server-assigned IDs and timestamps
//! - **REST API** (axum) with a PostgREST-style query subset
//! - **Change streams** as server-sent events, one per table
//! - Health and instance info endpoints

pub mod api;
pub mod config;
pub mod error;
pub mod query;
pub mod tables;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

pub use api::{build_router, AppState};
pub use config::ServerConfig;
pub use error::ServerError;
pub use tables::TableStore;

/// Bind `addr` and serve until the listener fails.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    run(listener, state).await
}

/// Serve on an already bound listener.
pub async fn run(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %listener.local_addr()?, "Starting HTTP API server");

    axum::serve(listener, app).await?;
    Ok(())
}
