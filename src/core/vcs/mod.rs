pub mod system_git;
mod system_git_ops;

use crate::core::error::RelResult;
use std::path::Path;

pub use system_git::SystemGit;

/// Upstream of the checked-out branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracking {
  /// Remote name, e.g. `origin`
  pub remote: String,
  /// Branch name on the remote, e.g. `master`
  pub branch: String,
}

impl Tracking {
  /// Local remote-tracking ref for the upstream branch
  pub fn remote_ref(&self) -> String {
    format!("refs/remotes/{}/{}", self.remote, self.branch)
  }
}

/// Repository queries and mutations the release pipeline needs.
///
/// Reads are expected to reflect one consistent snapshot; concurrent
/// mutation of the repository by another process is not handled.
pub trait Repository {
  /// Root of the module checkout
  fn work_tree(&self) -> &Path;

  /// Name of the checked-out branch (`HEAD` when detached)
  fn current_branch(&self) -> RelResult<String>;

  /// Remote and remote branch the given branch tracks
  fn tracking(&self, branch: &str) -> RelResult<Tracking>;

  /// Configured URL of a remote
  fn remote_url(&self, remote: &str) -> RelResult<String>;

  /// True when the work tree and index match HEAD
  fn is_clean(&self) -> RelResult<bool>;

  /// Unified diff of HEAD against its first parent
  fn top_commit_diff(&self) -> RelResult<String>;

  /// One-line description of HEAD for error messages
  fn top_commit_summary(&self) -> RelResult<String>;

  /// SHA of HEAD
  fn head_commit(&self) -> RelResult<String>;

  /// Commit a revision points to, `None` if it does not exist
  fn resolve_commit(&self, rev: &str) -> RelResult<Option<String>>;

  /// Create a signed, annotated tag on HEAD
  fn create_signed_tag(&self, tag: &str, key: Option<&str>) -> RelResult<()>;

  /// Push a tag to a remote
  fn push_tag(&self, remote: &str, tag: &str) -> RelResult<()>;

  /// Check out HEAD, detached, into `dir`
  fn add_worktree(&self, dir: &Path) -> RelResult<()>;

  /// Nearest annotated tag reachable from the parent of `rev`
  fn previous_tag(&self, rev: &str) -> RelResult<Option<String>>;

  /// `git shortlog` of non-merge commits in `range`
  fn shortlog(&self, range: &str) -> RelResult<String>;
}
