//! Core engine for xrel
//!
//! - **config**: xrel.toml parsing, the Section → Destination table and runtime settings
//! - **context**: Run context built once in main and passed by reference
//! - **error**: Error types with contextual help messages and exit codes
//! - **vcs**: Git operations (SystemGit) behind the `Repository` trait

pub mod config;
pub mod context;
pub mod error;
pub mod vcs;
