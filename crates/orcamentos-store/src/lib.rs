//! # orcamentos-store
//!
//! Local persistence for quotes, folders and attachments.
//!
//! Records are kept as whole JSON documents behind the [`DocumentStorage`]
//! capability. [`Database`] stores those documents in SQLite; the
//! [`MemoryStorage`] double keeps them in process. [`RecordStore`] layers the
//! quote, folder and attachment operations on top of either.

pub mod attachments;
pub mod database;
pub mod folders;
pub mod migrations;
pub mod quotes;
pub mod records;
pub mod storage;

mod error;

pub use database::Database;
pub use error::{Result, StoreError, SubmitError};
pub use records::RecordStore;
pub use storage::{DocumentStorage, MemoryStorage};
