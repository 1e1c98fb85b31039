// Public modules
pub mod config_files;
pub mod env_file;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod registry;
pub mod solution;
pub mod steps;
pub mod templates;
pub mod tools;

// Public modules for CLI access
pub mod defaults;
pub mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
