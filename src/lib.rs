pub mod config;
pub mod error;
pub mod offline;
pub mod server;

pub use error::{OfflineError, Result};
pub use offline::{initialize_index, search, DatasetEntry, OfflineIndex};
