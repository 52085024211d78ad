//! Per-module failures and the run summary.
//!
//! None of these modules can be built, so nothing reaches the tag or upload
//! steps; the runs stay local even without `--dry-run`.

use crate::helpers::{TestTree, run_xrel, stderr, summary};
use anyhow::Result;

const LIB_URL: &str = "https://gitlab.freedesktop.org/xorg/lib/libXfoo.git";
const APP_URL: &str = "https://gitlab.freedesktop.org/xorg/app/xfoo.git";

#[test]
fn test_no_quit_attempts_every_module() -> Result<()> {
  let tree = TestTree::new()?;
  tree.add_module("libXfoo", LIB_URL)?;
  tree.add_module("xfoo", APP_URL)?;

  let output = run_xrel(&tree.path, &["--dry-run", "--no-quit", "--json", "libXfoo", "xfoo"])?;
  assert_eq!(output.status.code(), Some(3));

  let json = summary(&output)?;
  assert_eq!(json["status"], "partial_completion");
  assert_eq!(json["failed"], serde_json::json!(["libXfoo", "xfoo"]));
  assert_eq!(json["skipped"], serde_json::json!([]));
  assert!(stderr(&output).contains("No supported build system"));

  Ok(())
}

#[test]
fn test_first_failure_stops_the_run() -> Result<()> {
  let tree = TestTree::new()?;
  tree.add_module("libXfoo", LIB_URL)?;
  tree.add_module("xfoo", APP_URL)?;

  let output = run_xrel(&tree.path, &["--dry-run", "--json", "libXfoo", "xfoo"])?;
  assert_eq!(output.status.code(), Some(3));

  let json = summary(&output)?;
  assert_eq!(json["status"], "stopped_on_error");
  assert_eq!(json["failed"], serde_json::json!(["libXfoo"]));
  assert_eq!(json["skipped"], serde_json::json!(["xfoo"]));

  Ok(())
}

#[test]
fn test_modfile_order_is_kept() -> Result<()> {
  let tree = TestTree::new()?;
  tree.add_module("libXfoo", LIB_URL)?;
  tree.add_module("xfoo", APP_URL)?;
  tree.write("modules.txt", "# apps first\nxfoo\n\nlibXfoo\n")?;

  let output = run_xrel(&tree.path, &["--dry-run", "--no-quit", "--json", "--modfile", "modules.txt"])?;
  let json = summary(&output)?;
  assert_eq!(json["failed"], serde_json::json!(["xfoo", "libXfoo"]));

  Ok(())
}

#[test]
fn test_unknown_remote_is_a_module_failure() -> Result<()> {
  let tree = TestTree::new()?;
  tree.add_module("foo", "https://github.com/someone/foo.git")?;

  let output = run_xrel(&tree.path, &["--dry-run", "--json", "foo"])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("Unable to determine the release section"));

  let json = summary(&output)?;
  assert_eq!(json["failed"], serde_json::json!(["foo"]));

  Ok(())
}

#[test]
fn test_missing_checkout_is_a_module_failure() -> Result<()> {
  let tree = TestTree::new()?;
  std::fs::create_dir_all(tree.path.join("not-a-repo"))?;

  let output = run_xrel(&tree.path, &["--dry-run", "not-a-repo"])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("Git repository not found"));

  Ok(())
}

#[test]
fn test_untracked_branch_is_a_module_failure() -> Result<()> {
  let tree = TestTree::new()?;
  tree.add_untracked_module("libXfoo")?;

  let output = run_xrel(&tree.path, &["--dry-run", "libXfoo"])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("is not tracking a remote branch"));

  Ok(())
}

#[test]
fn test_human_summary_lists_failures() -> Result<()> {
  let tree = TestTree::new()?;
  tree.add_module("libXfoo", LIB_URL)?;

  let output = run_xrel(&tree.path, &["--dry-run", "libXfoo"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Releasing libXfoo"));
  assert!(stdout.contains("Stopped on the first failure"));
  assert!(stdout.contains("- libXfoo"));

  Ok(())
}
