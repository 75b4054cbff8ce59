//! Client side of the quote workflow: form submission, list filters,
//! presence and the session context that ties the remote services together.

pub mod connectivity;
pub mod filter;
pub mod presence;
pub mod session;
pub mod submission;

mod error;

pub use connectivity::{Connectivity, ConnectivityFlag};
pub use error::{ClientError, Result};
pub use filter::QuoteFilter;
pub use presence::{PresenceConfig, PresenceManager};
pub use session::Session;
pub use submission::{submit_local, QuoteForm, SubmissionReceipt};
