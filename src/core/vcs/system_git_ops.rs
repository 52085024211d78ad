//! Repository operations for SystemGit (branch config, gates, tags, history)

use super::system_git::SystemGit;
use super::{Repository, Tracking};
use crate::core::error::{GitError, RelError, RelResult};
use std::path::Path;

impl SystemGit {
  /// `git config --get <key>`, `None` when unset
  fn config_value(&self, key: &str) -> RelResult<Option<String>> {
    let output = self.output(&["config", "--get", key])?;
    match output.status.code() {
      Some(0) => Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string())),
      Some(1) => Ok(None),
      _ => Err(RelError::Git(GitError::CommandFailed {
        command: format!("git config --get {}", key),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      })),
    }
  }
}

impl Repository for SystemGit {
  fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  fn current_branch(&self) -> RelResult<String> {
    let output = self.output(&["rev-parse", "--abbrev-ref", "HEAD"])?;

    if !output.status.success() {
      return Ok("HEAD".to_string()); // Detached HEAD
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  fn tracking(&self, branch: &str) -> RelResult<Tracking> {
    let remote = self.config_value(&format!("branch.{}.remote", branch))?;
    let merge = self.config_value(&format!("branch.{}.merge", branch))?;

    match (remote, merge) {
      (Some(remote), Some(merge)) => {
        let branch = merge.strip_prefix("refs/heads/").unwrap_or(&merge).to_string();
        Ok(Tracking { remote, branch })
      }
      _ => Err(RelError::Git(GitError::NotTracking {
        branch: branch.to_string(),
      })),
    }
  }

  fn remote_url(&self, remote: &str) -> RelResult<String> {
    self
      .config_value(&format!("remote.{}.url", remote))?
      .ok_or_else(|| {
        RelError::Git(GitError::NoRemoteUrl {
          remote: remote.to_string(),
        })
      })
  }

  fn is_clean(&self) -> RelResult<bool> {
    let output = self.output(&["diff", "--quiet", "HEAD", "--"])?;
    match output.status.code() {
      Some(0) => Ok(true),
      Some(1) => Ok(false),
      _ => Err(RelError::Git(GitError::CommandFailed {
        command: "git diff --quiet HEAD".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      })),
    }
  }

  fn top_commit_diff(&self) -> RelResult<String> {
    self.run(&["diff", "--unified=0", "HEAD^", "HEAD"])
  }

  fn top_commit_summary(&self) -> RelResult<String> {
    self.run(&["log", "--oneline", "-1", "HEAD"])
  }

  fn head_commit(&self) -> RelResult<String> {
    self.run(&["rev-list", "--max-count=1", "HEAD"])
  }

  fn resolve_commit(&self, rev: &str) -> RelResult<Option<String>> {
    let spec = format!("{}^{{commit}}", rev);
    let output = self.output(&["rev-parse", "--verify", "--quiet", &spec])?;

    if !output.status.success() {
      return Ok(None);
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(if sha.is_empty() { None } else { Some(sha) })
  }

  fn create_signed_tag(&self, tag: &str, key: Option<&str>) -> RelResult<()> {
    let mut args = vec!["tag", "-s"];
    if let Some(key) = key {
      args.extend(["-u", key]);
    }
    args.extend(["-m", tag, tag]);
    self.run(&args).map(|_| ())
  }

  fn push_tag(&self, remote: &str, tag: &str) -> RelResult<()> {
    let output = self.output(&["push", remote, tag])?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RelError::Git(GitError::PushFailed {
        remote: remote.to_string(),
        refspec: tag.to_string(),
        reason: stderr.to_string(),
      }));
    }

    Ok(())
  }

  fn add_worktree(&self, dir: &Path) -> RelResult<()> {
    let dir = dir.to_string_lossy();
    self.run(&["worktree", "add", "--detach", &dir, "HEAD"]).map(|_| ())
  }

  fn previous_tag(&self, rev: &str) -> RelResult<Option<String>> {
    let parent = format!("{}^", rev);
    let output = self.output(&["describe", "--abbrev=0", &parent])?;

    if !output.status.success() {
      // No annotated tag before this commit: first release on the branch
      return Ok(None);
    }

    let tag = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(if tag.is_empty() { None } else { Some(tag) })
  }

  fn shortlog(&self, range: &str) -> RelResult<String> {
    self.run(&["shortlog", "--no-merges", range])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::process::Command;
  use tempfile::TempDir;

  fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git").arg("-C").arg(dir).args(args).status().unwrap();
    assert!(status.success(), "git {} failed", args.join(" "));
  }

  fn commit(dir: &Path, file: &str, content: &str, message: &str) {
    std::fs::write(dir.join(file), content).unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-q", "-m", message]);
  }

  fn init_repo() -> (TempDir, SystemGit) {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q", "--initial-branch=master"]);
    git(dir.path(), &["config", "user.name", "Jane Doe"]);
    git(dir.path(), &["config", "user.email", "jane@example.com"]);
    git(dir.path(), &["config", "commit.gpgsign", "false"]);
    commit(dir.path(), "configure.ac", "AC_INIT([libXfoo], [1.2.2])\n", "Initial import");
    let repo = SystemGit::open(dir.path()).unwrap();
    (dir, repo)
  }

  #[test]
  fn test_tracking_reads_branch_config() {
    let (dir, repo) = init_repo();
    assert!(matches!(
      repo.tracking("master"),
      Err(RelError::Git(GitError::NotTracking { .. }))
    ));

    git(dir.path(), &["remote", "add", "origin", "https://gitlab.freedesktop.org/xorg/lib/libXfoo.git"]);
    git(dir.path(), &["config", "branch.master.remote", "origin"]);
    git(dir.path(), &["config", "branch.master.merge", "refs/heads/master"]);

    assert_eq!(repo.current_branch().unwrap(), "master");
    let tracking = repo.tracking("master").unwrap();
    assert_eq!(tracking.remote, "origin");
    assert_eq!(tracking.branch, "master");
    assert_eq!(
      repo.remote_url("origin").unwrap(),
      "https://gitlab.freedesktop.org/xorg/lib/libXfoo.git"
    );
    assert!(matches!(
      repo.remote_url("upstream"),
      Err(RelError::Git(GitError::NoRemoteUrl { .. }))
    ));
  }

  #[test]
  fn test_clean_tree_and_top_commit_diff() {
    let (dir, repo) = init_repo();
    commit(dir.path(), "configure.ac", "AC_INIT([libXfoo], [1.2.3])\n", "libXfoo 1.2.3");

    assert!(repo.is_clean().unwrap());
    let diff = repo.top_commit_diff().unwrap();
    assert!(diff.contains("+AC_INIT([libXfoo], [1.2.3])"));
    assert!(repo.top_commit_summary().unwrap().ends_with("libXfoo 1.2.3"));

    std::fs::write(dir.path().join("configure.ac"), "dirty\n").unwrap();
    assert!(!repo.is_clean().unwrap());
  }

  #[test]
  fn test_resolve_commit_and_previous_tag() {
    let (dir, repo) = init_repo();
    git(dir.path(), &["tag", "-a", "-m", "libXfoo-1.2.2", "libXfoo-1.2.2"]);
    let first = repo.head_commit().unwrap();
    commit(dir.path(), "configure.ac", "AC_INIT([libXfoo], [1.2.3])\n", "libXfoo 1.2.3");
    let head = repo.head_commit().unwrap();

    // annotated tags peel to their commit
    assert_eq!(repo.resolve_commit("refs/tags/libXfoo-1.2.2").unwrap(), Some(first));
    assert_eq!(repo.resolve_commit("refs/tags/libXfoo-9.9.9").unwrap(), None);
    assert_eq!(repo.previous_tag(&head).unwrap().as_deref(), Some("libXfoo-1.2.2"));

    let log = repo.shortlog(&format!("libXfoo-1.2.2..{}", head)).unwrap();
    assert!(log.contains("Jane Doe (1)"));
    assert!(log.contains("libXfoo 1.2.3"));
  }

  #[test]
  fn test_previous_tag_absent_on_first_release() {
    let (_dir, repo) = init_repo();
    let head = repo.head_commit().unwrap();
    assert_eq!(repo.previous_tag(&head).unwrap(), None);
  }

  #[test]
  fn test_add_worktree_checks_out_head() {
    let (_dir, repo) = init_repo();
    let build = TempDir::new().unwrap();
    let target = build.path().join("libXfoo");

    repo.add_worktree(&target).unwrap();
    assert!(target.join("configure.ac").is_file());
  }
}
