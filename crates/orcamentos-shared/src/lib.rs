//! # orcamentos-shared
//!
//! Domain types and pure logic shared by every Orçamentos crate: quote and
//! folder models, deterministic quote IDs, duplicate detection, attachment
//! encoding, change notifications and report content.

pub mod amount;
pub mod attachment;
pub mod constants;
pub mod duplicate;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod report;
pub mod types;

pub use amount::Amount;
pub use duplicate::{find_duplicate, Candidate};
pub use identity::{quote_id, IdGrain};
pub use protocol::{ChangeEvent, Table};
pub use types::*;
