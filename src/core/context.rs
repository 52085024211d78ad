//! Run context - build once, pass everywhere
//!
//! ```text
//! main.rs:
//!   RunContext::build() -> &RunContext
//!   |
//!   v
//! commands/release.rs -> release::pipeline (per module)
//! ```

use crate::core::config::{RelConfig, ReleaseSettings};
use crate::core::error::RelResult;
use std::path::{Path, PathBuf};

/// Process-wide, read-only state shared by every module pipeline.
pub struct RunContext {
  /// Directory xrel was invoked from; announcements are written here
  pub top_src: PathBuf,

  /// xrel.toml (or built-in defaults)
  pub config: RelConfig,

  /// Command-line options
  pub settings: ReleaseSettings,
}

impl RunContext {
  /// Build the context, loading and validating configuration.
  ///
  /// Any error here is a configuration error and aborts the run before a
  /// module is touched.
  pub fn build(top_src: &Path, settings: ReleaseSettings) -> RelResult<Self> {
    let config = RelConfig::load(top_src)?;
    Ok(Self {
      top_src: top_src.to_path_buf(),
      config,
      settings,
    })
  }

  /// Root directory for isolated autotools workspaces
  pub fn build_root(&self) -> PathBuf {
    self.config.build.root(&self.top_src)
  }
}
