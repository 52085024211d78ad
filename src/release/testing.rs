//! In-memory collaborators for pipeline tests

use crate::core::error::{BuildError, GitError, PublishError, RelError, RelResult};
use crate::core::vcs::{Repository, Tracking};
use crate::release::build::Toolchain;
use crate::release::publish::{RemoteTarget, Signer, Transfer, signature_path};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const LOCAL_SHA: &str = "1111111111111111111111111111111111111111";
pub const OTHER_SHA: &str = "2222222222222222222222222222222222222222";

/// Repository double with a pushed, version-bumping top commit by default
pub struct FakeRepo {
  pub root: PathBuf,
  pub url: String,
  pub tracking: Option<Tracking>,
  pub clean: bool,
  pub diff: String,
  pub head: String,
  pub remote_head: Option<String>,
  pub previous: Option<String>,
  pub push_fails: bool,
  tags: RefCell<HashMap<String, String>>,
  created: RefCell<Vec<String>>,
  pushed: RefCell<Vec<String>>,
  worktrees: RefCell<Vec<PathBuf>>,
}

impl FakeRepo {
  pub fn new(root: &Path) -> Self {
    Self {
      root: root.to_path_buf(),
      url: "git@ssh.gitlab.freedesktop.org:xorg/lib/libXfoo.git".to_string(),
      tracking: Some(Tracking {
        remote: "origin".to_string(),
        branch: "master".to_string(),
      }),
      clean: true,
      diff: "-AC_INIT([libXfoo], [1.2.2])\n+AC_INIT([libXfoo], [1.2.3])\n".to_string(),
      head: LOCAL_SHA.to_string(),
      remote_head: Some(LOCAL_SHA.to_string()),
      previous: Some("libXfoo-1.2.2".to_string()),
      push_fails: false,
      tags: RefCell::new(HashMap::new()),
      created: RefCell::new(Vec::new()),
      pushed: RefCell::new(Vec::new()),
      worktrees: RefCell::new(Vec::new()),
    }
  }

  pub fn with_tag(self, tag: &str, target: &str) -> Self {
    self.tags.borrow_mut().insert(tag.to_string(), target.to_string());
    self
  }

  pub fn tag_target(&self, tag: &str) -> Option<String> {
    self.tags.borrow().get(tag).cloned()
  }

  pub fn created_tags(&self) -> Vec<String> {
    self.created.borrow().clone()
  }

  pub fn pushed_tags(&self) -> Vec<String> {
    self.pushed.borrow().clone()
  }

  pub fn worktrees(&self) -> Vec<PathBuf> {
    self.worktrees.borrow().clone()
  }
}

impl Repository for FakeRepo {
  fn work_tree(&self) -> &Path {
    &self.root
  }

  fn current_branch(&self) -> RelResult<String> {
    Ok("master".to_string())
  }

  fn tracking(&self, branch: &str) -> RelResult<Tracking> {
    self.tracking.clone().ok_or_else(|| {
      RelError::Git(GitError::NotTracking {
        branch: branch.to_string(),
      })
    })
  }

  fn remote_url(&self, _remote: &str) -> RelResult<String> {
    Ok(self.url.clone())
  }

  fn is_clean(&self) -> RelResult<bool> {
    Ok(self.clean)
  }

  fn top_commit_diff(&self) -> RelResult<String> {
    Ok(self.diff.clone())
  }

  fn top_commit_summary(&self) -> RelResult<String> {
    Ok("1111111 Some unrelated change".to_string())
  }

  fn head_commit(&self) -> RelResult<String> {
    Ok(self.head.clone())
  }

  fn resolve_commit(&self, rev: &str) -> RelResult<Option<String>> {
    if let Some(tracking) = &self.tracking
      && rev == tracking.remote_ref()
    {
      return Ok(self.remote_head.clone());
    }
    let tag = rev.strip_prefix("refs/tags/").unwrap_or(rev);
    Ok(self.tags.borrow().get(tag).cloned())
  }

  fn create_signed_tag(&self, tag: &str, _key: Option<&str>) -> RelResult<()> {
    self.tags.borrow_mut().insert(tag.to_string(), self.head.clone());
    self.created.borrow_mut().push(tag.to_string());
    Ok(())
  }

  fn push_tag(&self, remote: &str, tag: &str) -> RelResult<()> {
    if self.push_fails {
      return Err(RelError::Git(GitError::PushFailed {
        remote: remote.to_string(),
        refspec: tag.to_string(),
        reason: "remote rejected".to_string(),
      }));
    }
    self.pushed.borrow_mut().push(tag.to_string());
    Ok(())
  }

  fn add_worktree(&self, dir: &Path) -> RelResult<()> {
    self.worktrees.borrow_mut().push(dir.to_path_buf());
    Ok(())
  }

  fn previous_tag(&self, _rev: &str) -> RelResult<Option<String>> {
    Ok(self.previous.clone())
  }

  fn shortlog(&self, range: &str) -> RelResult<String> {
    Ok(format!("Jane Doe (1):\n      Release {}", range))
  }
}

/// Toolchain double: every program exists and succeeds unless told otherwise
#[derive(Default)]
pub struct FakeTools {
  missing: Vec<String>,
  failing: Vec<String>,
  outputs: Vec<(String, String)>,
  calls: RefCell<Vec<String>>,
}

impl FakeTools {
  pub fn without(programs: &[&str]) -> Self {
    Self {
      missing: programs.iter().map(|p| p.to_string()).collect(),
      ..Default::default()
    }
  }

  pub fn failing(mut self, program: &str) -> Self {
    self.failing.push(program.to_string());
    self
  }

  /// Stdout returned when the first argument equals `first_arg`
  pub fn with_output(mut self, first_arg: &str, stdout: &str) -> Self {
    self.outputs.push((first_arg.to_string(), stdout.to_string()));
    self
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.borrow().clone()
  }
}

impl Toolchain for FakeTools {
  fn has_program(&self, program: &str) -> bool {
    !self.missing.iter().any(|p| p == program)
  }

  fn run(&self, _dir: &Path, program: &str, args: &[&str]) -> RelResult<String> {
    let step = format!("{} {}", program, args.join(" ")).trim_end().to_string();
    self.calls.borrow_mut().push(step.clone());

    if self.failing.iter().any(|p| p == program) {
      return Err(RelError::Build(BuildError::StepFailed {
        step,
        stderr: "error: simulated failure".to_string(),
      }));
    }

    let first = args.first().copied().unwrap_or_default();
    Ok(
      self
        .outputs
        .iter()
        .find(|(arg, _)| arg == first)
        .map(|(_, out)| out.clone())
        .unwrap_or_default(),
    )
  }
}

/// Signer double; fails for artifacts whose name ends with a listed suffix
#[derive(Default)]
pub struct FakeSigner {
  fail_suffixes: Vec<String>,
  attempts: RefCell<Vec<PathBuf>>,
}

impl FakeSigner {
  pub fn failing_for(suffixes: &[&str]) -> Self {
    Self {
      fail_suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
      ..Default::default()
    }
  }

  pub fn attempts(&self) -> Vec<PathBuf> {
    self.attempts.borrow().clone()
  }
}

impl Signer for FakeSigner {
  fn sign(&self, artifact: &Path, _key: Option<&str>) -> RelResult<PathBuf> {
    self.attempts.borrow_mut().push(artifact.to_path_buf());
    let name = artifact.to_string_lossy();
    if self.fail_suffixes.iter().any(|s| name.ends_with(s.as_str())) {
      return Err(RelError::message("gpg: signing failed: No secret key"));
    }
    Ok(signature_path(artifact))
  }
}

/// Transfer double holding a set of remote paths
pub struct FakeTransfer {
  remote: RefCell<Vec<String>>,
  pub copy_fails: bool,
  copies: RefCell<Vec<Vec<PathBuf>>>,
}

impl FakeTransfer {
  /// Remote where only the given directories exist
  pub fn with_dirs(dirs: &[&str]) -> Self {
    Self {
      remote: RefCell::new(dirs.iter().map(|d| d.to_string()).collect()),
      copy_fails: false,
      copies: RefCell::new(Vec::new()),
    }
  }

  pub fn with_file(self, path: &str) -> Self {
    self.remote.borrow_mut().push(path.to_string());
    self
  }

  pub fn copies(&self) -> Vec<Vec<PathBuf>> {
    self.copies.borrow().clone()
  }
}

impl Transfer for FakeTransfer {
  fn path_exists(&self, _target: &RemoteTarget, path: &str) -> RelResult<bool> {
    Ok(self.remote.borrow().iter().any(|p| p == path))
  }

  fn copy(&self, files: &[PathBuf], target: &RemoteTarget) -> RelResult<()> {
    if self.copy_fails {
      return Err(RelError::Publish(PublishError::TransferFailed {
        host: target.host.clone(),
        reason: "lost connection".to_string(),
      }));
    }
    self.copies.borrow_mut().push(files.to_vec());
    for file in files {
      if let Some(name) = file.file_name() {
        self
          .remote
          .borrow_mut()
          .push(format!("{}/{}", target.path, name.to_string_lossy()));
      }
    }
    Ok(())
  }
}
