// Public modules
pub mod backup;
pub mod config;
pub mod db;
pub mod deploy;
pub mod error;
pub mod executor;
pub mod layout;
pub mod release;
pub mod server;
pub mod settings;
pub mod shared;
pub mod source;
pub mod ssh;
pub mod task;

// Internal modules - not part of public API
pub(crate) mod paths;

// Public modules for CLI access
pub mod defaults;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
