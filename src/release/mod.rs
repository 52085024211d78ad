//! Module release pipeline and orchestration
//!
//! # Stages (per module)
//!
//! 1. **section**: remote URL → Section → Destination
//! 2. **build**: autotools or meson, producing `<name>-<version>.tar.*`
//! 3. **gates**: clean tree, version bump, pushed, tag consistency; creates the tag
//! 4. **publish**: sign, dedup against the host, upload, push the tag
//! 5. **announce**: mail draft with shortlog and checksums (best-effort)
//! 6. **moduleset**: jhbuild moduleset entry (best-effort, `--moduleset`)
//!
//! The **orchestrator** runs the pipeline for every [`task::ModuleTask`] in
//! order and records failures.
//!
//! # Guarantees
//!
//! - Nothing is uploaded unless every gate passed and every tarball is signed
//! - The tag is pushed only after a successful upload
//! - An existing tag is never moved
//! - Published tarballs are never overwritten without `--force`

pub mod announce;
pub mod build;
pub mod gates;
pub mod moduleset;
pub mod orchestrator;
pub mod pipeline;
pub mod publish;
pub mod section;
pub mod task;

#[cfg(test)]
pub mod testing;

pub use orchestrator::{RunSummary, run_all};
pub use pipeline::{Collaborators, run_module};
pub use task::{ModuleTask, collect_tasks};
