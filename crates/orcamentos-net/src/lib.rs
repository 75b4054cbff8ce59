//! Shared-backend access: a PostgREST-style REST client, a server-sent-events
//! change feed and the realtime subscription hub built on it.

pub mod backend;
pub mod config;
pub mod feed;
pub mod realtime;
pub mod service;

mod error;

pub use backend::{Backend, Filter, FilterOp, Order, RestBackend};
pub use config::RemoteConfig;
pub use error::{ConfigError, NetError, Result};
pub use feed::{ChangeFeed, SseFeed};
pub use realtime::{RealtimeHub, Stream};
pub use service::RemoteRecordService;
