//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A directory xrel is invoked from, holding module checkouts
pub struct TestTree {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestTree {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    Ok(Self { _root: root, path })
  }

  /// Create a module checkout whose `main` tracks `origin/main` at `url`.
  ///
  /// The remote-tracking ref is written locally; nothing is fetched.
  pub fn add_module(&self, name: &str, url: &str) -> Result<PathBuf> {
    let path = self.path.join(name);
    std::fs::create_dir_all(&path)?;

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;

    std::fs::write(path.join("README"), format!("{}\n", name))?;
    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial import"])?;

    git(&path, &["remote", "add", "origin", url])?;
    git(&path, &["config", "branch.main.remote", "origin"])?;
    git(&path, &["config", "branch.main.merge", "refs/heads/main"])?;
    git(&path, &["update-ref", "refs/remotes/origin/main", "HEAD"])?;

    Ok(path)
  }

  /// Create a module checkout with no upstream configured
  pub fn add_untracked_module(&self, name: &str) -> Result<PathBuf> {
    let path = self.path.join(name);
    std::fs::create_dir_all(&path)?;

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;
    std::fs::write(path.join("README"), format!("{}\n", name))?;
    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial import"])?;

    Ok(path)
  }

  pub fn write(&self, file: &str, content: &str) -> Result<()> {
    std::fs::write(self.path.join(file), content)?;
    Ok(())
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run xrel; the exit status is left to the caller
pub fn run_xrel(cwd: &Path, args: &[&str]) -> Result<Output> {
  let xrel_bin = env!("CARGO_BIN_EXE_xrel");

  Command::new(xrel_bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("RUST_LOG")
    .output()
    .context("Failed to run xrel")
}

/// Parse the `--json` run summary from stdout
pub fn summary(output: &Output) -> Result<serde_json::Value> {
  serde_json::from_slice(&output.stdout).with_context(|| {
    format!(
      "stdout is not a JSON summary:\n{}\nstderr:\n{}",
      String::from_utf8_lossy(&output.stdout),
      String::from_utf8_lossy(&output.stderr)
    )
  })
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}
