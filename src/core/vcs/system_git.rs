//! System git backend
//!
//! Every operation is one `git` subprocess with an isolated environment.

use crate::core::error::{GitError, RelError, RelResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Environment passed through to git. Signing and pushing need the agent sockets.
const PASSTHROUGH_ENV: &[&str] = &["PATH", "HOME", "GNUPGHOME", "GPG_TTY", "SSH_AUTH_SOCK", "LANG"];

/// Git backend using system git
pub struct SystemGit {
  /// Path the repository was opened from
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  pub fn open(path: &Path) -> RelResult<Self> {
    if !path.is_dir() {
      return Err(RelError::Git(GitError::RepoNotFound {
        path: path.to_path_buf(),
      }));
    }

    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(RelError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(RelError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
    })
  }

  /// Run git and return its raw output, whatever the exit status
  pub(crate) fn output(&self, args: &[&str]) -> RelResult<Output> {
    tracing::debug!(repo = %self.repo_path.display(), "git {}", args.join(" "));
    let output = self
      .git_cmd()
      .args(args)
      .stdin(Stdio::null())
      .output()
      .with_context(|| format!("Failed to execute git {}", args.join(" ")))?;
    tracing::trace!(status = ?output.status.code(), "git {} finished", args.first().unwrap_or(&""));
    Ok(output)
  }

  /// Run git, requiring success, and return trimmed stdout
  pub(crate) fn run(&self, args: &[&str]) -> RelResult<String> {
    let output = self.output(args)?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RelError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: stderr.to_string(),
      }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables except the passthrough list
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    cmd.env_clear();
    for key in PASSTHROUGH_ENV {
      if let Ok(value) = std::env::var(key) {
        cmd.env(key, value);
      }
    }

    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");
    cmd.arg("-c").arg("color.ui=false");

    cmd
  }
}
