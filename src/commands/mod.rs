//! CLI commands for xrel
//!
//! - **release**: run the release pipeline over every requested module
//!
//! Commands take `&RunContext` so configuration is loaded once.

pub mod release;

pub use release::run_release;
