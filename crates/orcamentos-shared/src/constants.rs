/// Application name
pub const APP_NAME: &str = "Orçamentos";

/// Company name printed on the report header and footer
pub const COMPANY_NAME: &str = "Antonelly Construções e Serviços";

/// Maximum length of each text component in a month-grain quote ID
pub const MONTH_ID_COMPONENT_MAX: usize = 20;

/// Separator between the components of a quote ID
pub const ID_SEPARATOR: char = '-';

/// Replacement for whitespace runs inside an ID component
pub const WHITESPACE_REPLACEMENT: char = '_';

/// Maximum size of a single attachment in bytes (10 MiB)
pub const MAX_ATTACHMENT_SIZE: u64 = 10 * 1024 * 1024;

/// Presence heartbeat interval in seconds
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Interval between presence cleanup sweeps in seconds
pub const CLEANUP_INTERVAL_SECS: u64 = 60;

/// A presence record older than this is considered stale (2 minutes)
pub const PRESENCE_STALE_AFTER_SECS: i64 = 120;

/// Local document keys
pub const QUOTES_DOCUMENT: &str = "quotes";
pub const FOLDERS_DOCUMENT: &str = "folders";
pub const ATTACHMENTS_DOCUMENT_PREFIX: &str = "attachments:";

/// Color tags offered for folders and assigned to active users.
pub const COLOR_PALETTE: &[&str] = &[
    "bg-green-100 text-green-800 border-green-200",
    "bg-blue-100 text-blue-800 border-blue-200",
    "bg-purple-100 text-purple-800 border-purple-200",
    "bg-pink-100 text-pink-800 border-pink-200",
    "bg-yellow-100 text-yellow-800 border-yellow-200",
    "bg-orange-100 text-orange-800 border-orange-200",
    "bg-red-100 text-red-800 border-red-200",
    "bg-indigo-100 text-indigo-800 border-indigo-200",
    "bg-teal-100 text-teal-800 border-teal-200",
    "bg-gray-100 text-gray-800 border-gray-200",
];

/// Document key holding the attachments of one quote.
pub fn attachments_document(quote_id: &str) -> String {
    format!("{ATTACHMENTS_DOCUMENT_PREFIX}{quote_id}")
}
