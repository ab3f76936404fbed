pub mod cli;
pub mod collection;
pub mod error;
pub mod github;
pub mod logger;
pub mod models;
pub mod notion;
pub mod syncer;
pub mod types;

pub use error::{ErrorKind, Result, SyncError};
pub use syncer::{SyncOptions, SyncPhase, SyncReport, Syncer};
