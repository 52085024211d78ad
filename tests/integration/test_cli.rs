//! Argument and configuration errors: the run aborts before any module

use crate::helpers::{TestTree, run_xrel, stderr};
use anyhow::Result;

const XORG_LIB: &str = "https://gitlab.freedesktop.org/xorg/lib/libXfoo.git";

#[test]
fn test_modfile_conflicts_with_module_paths() -> Result<()> {
  let tree = TestTree::new()?;
  tree.write("modules.txt", "libXfoo\n")?;

  let output = run_xrel(&tree.path, &["--modfile", "modules.txt", "libXfoo"])?;
  assert!(!output.status.success());
  assert!(stderr(&output).contains("--modfile"));

  Ok(())
}

#[test]
fn test_no_modules_is_a_user_error() -> Result<()> {
  let tree = TestTree::new()?;

  let output = run_xrel(&tree.path, &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("No modules to release"));

  Ok(())
}

#[test]
fn test_unreadable_module_list() -> Result<()> {
  let tree = TestTree::new()?;

  let output = run_xrel(&tree.path, &["--modfile", "missing.txt"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Unable to read module list"));

  Ok(())
}

#[test]
fn test_unknown_section_in_config_aborts_before_modules() -> Result<()> {
  let tree = TestTree::new()?;
  tree.add_module("libXfoo", XORG_LIB)?;
  tree.write(
    "xrel.toml",
    r#"
[destinations."Not A Section"]
host = "example.org"
path = "/srv/releases"
url = "https://example.org/releases"
to = "announce@example.org"
"#,
  )?;

  let output = run_xrel(&tree.path, &["--dry-run", "libXfoo"])?;
  assert_eq!(output.status.code(), Some(1));

  let err = stderr(&output);
  assert!(err.contains("Invalid configuration") || err.contains("Unknown section"));
  assert!(!String::from_utf8_lossy(&output.stdout).contains("Releasing"));

  Ok(())
}

#[test]
fn test_version_flag() -> Result<()> {
  let tree = TestTree::new()?;

  let output = run_xrel(&tree.path, &["--version"])?;
  assert!(output.status.success());
  assert!(String::from_utf8_lossy(&output.stdout).starts_with("xrel "));

  Ok(())
}
