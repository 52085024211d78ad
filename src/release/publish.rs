//! Publication: sign, check the destination, upload, push the tag
//!
//! Ordering matters. Nothing leaves the machine until every artifact is
//! signed and the destination is known not to hold the release already.
//! The tag is pushed only after the upload succeeded, so a failed upload
//! never advertises a release that cannot be downloaded.

use crate::core::config::{Destination, ReleaseSettings};
use crate::core::error::{GitError, PublishError, RelError, RelResult, ResultExt};
use crate::core::vcs::{Repository, Tracking};
use crate::release::gates::ReleaseTag;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// ssh exits with this status when the connection itself failed
const SSH_CONNECTION_ERROR: i32 = 255;

/// Detached signature creation
pub trait Signer {
  /// Sign `artifact`, returning the signature path
  fn sign(&self, artifact: &Path, key: Option<&str>) -> RelResult<PathBuf>;
}

/// Remote file checks and batch copy
pub trait Transfer {
  /// Whether `path` exists on the target host
  fn path_exists(&self, target: &RemoteTarget, path: &str) -> RelResult<bool>;

  /// Copy every file into the target directory in one batch
  fn copy(&self, files: &[PathBuf], target: &RemoteTarget) -> RelResult<()>;
}

/// `<artifact>.sig`
pub fn signature_path(artifact: &Path) -> PathBuf {
  let mut name = artifact.as_os_str().to_owned();
  name.push(".sig");
  PathBuf::from(name)
}

/// gpg detached signatures
pub struct GpgSigner;

impl Signer for GpgSigner {
  fn sign(&self, artifact: &Path, key: Option<&str>) -> RelResult<PathBuf> {
    let sig = signature_path(artifact);

    let mut cmd = Command::new("gpg");
    cmd.arg("--detach-sign");
    if let Some(key) = key {
      cmd.args(["--local-user", key]);
    }
    cmd.arg("--yes").arg("--output").arg(&sig).arg(artifact);

    tracing::debug!(artifact = %artifact.display(), "signing");
    let output = cmd.output().context("Failed to execute gpg")?;
    if !output.status.success() {
      return Err(RelError::message(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }

    Ok(sig)
  }
}

/// Where on a host the tarballs go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
  pub host: String,
  /// `[user@]host`
  pub login: String,
  pub path: String,
}

impl RemoteTarget {
  pub fn new(dest: &Destination, settings: &ReleaseSettings) -> Self {
    Self {
      host: dest.host.clone(),
      login: settings.login(&dest.host),
      path: dest.path.clone(),
    }
  }

  /// Remote path of a file placed in the target directory
  pub fn file_path(&self, file: &Path) -> String {
    format!("{}/{}", self.path.trim_end_matches('/'), file_name(file))
  }
}

fn file_name(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_default()
}

/// ssh/scp transfer channel
pub struct SshTransfer;

impl Transfer for SshTransfer {
  fn path_exists(&self, target: &RemoteTarget, path: &str) -> RelResult<bool> {
    tracing::debug!(login = %target.login, path, "checking remote path");
    let output = Command::new("ssh")
      .arg(&target.login)
      .arg("ls")
      .arg(path)
      .stdin(Stdio::null())
      .output()
      .context("Failed to execute ssh")?;

    if output.status.code() == Some(SSH_CONNECTION_ERROR) {
      return Err(RelError::Publish(PublishError::TransferFailed {
        host: target.host.clone(),
        reason: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(output.status.success())
  }

  fn copy(&self, files: &[PathBuf], target: &RemoteTarget) -> RelResult<()> {
    let destination = format!("{}:{}", target.login, target.path);
    tracing::debug!(destination = %destination, count = files.len(), "copying");

    let output = Command::new("scp")
      .args(files)
      .arg(&destination)
      .stdin(Stdio::null())
      .output()
      .context("Failed to execute scp")?;

    if !output.status.success() {
      return Err(RelError::Publish(PublishError::TransferFailed {
        host: target.host.clone(),
        reason: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(())
  }
}

/// Sign every artifact; any failure fails the whole set, all reported at once
pub fn sign_artifacts(signer: &dyn Signer, artifacts: &[PathBuf], key: Option<&str>) -> RelResult<Vec<PathBuf>> {
  let mut signatures = Vec::new();
  let mut failures = Vec::new();

  for artifact in artifacts {
    match signer.sign(artifact, key) {
      Ok(sig) => signatures.push(sig),
      Err(err) => failures.push((artifact.clone(), err.to_string())),
    }
  }

  if !failures.is_empty() {
    return Err(RelError::Publish(PublishError::SigningFailed { failures }));
  }

  Ok(signatures)
}

/// Check the destination directory exists and does not hold the release yet.
///
/// A missing directory only warns in dry-run. An already-published artifact
/// fails unless `force` is set, dry-run included.
pub fn check_destination(
  transfer: &dyn Transfer,
  target: &RemoteTarget,
  artifacts: &[PathBuf],
  settings: &ReleaseSettings,
) -> RelResult<()> {
  if !transfer.path_exists(target, &target.path)? {
    if settings.dry_run {
      crate::status!("   ⚠️  {}:{} does not exist", target.host, target.path);
      return Ok(());
    }
    return Err(RelError::Publish(PublishError::RemotePathMissing {
      host: target.host.clone(),
      path: target.path.clone(),
    }));
  }

  for artifact in artifacts {
    if !transfer.path_exists(target, &target.file_path(artifact))? {
      continue;
    }
    if !settings.force {
      return Err(RelError::Publish(PublishError::AlreadyPublished {
        artifact: file_name(artifact),
        host: target.host.clone(),
        path: target.path.clone(),
      }));
    }
    crate::status!("   ⚠️  Overwriting {} on {}", file_name(artifact), target.host);
  }

  Ok(())
}

/// Push the release tag; failure here needs a human, never a re-run
pub fn push_tag(repo: &dyn Repository, tracking: &Tracking, tag: &ReleaseTag) -> RelResult<()> {
  repo.push_tag(&tracking.remote, &tag.name).map_err(|err| {
    let reason = match err {
      RelError::Git(GitError::PushFailed { reason, .. }) => reason,
      other => other.to_string(),
    };
    RelError::Publish(PublishError::TagPushFailed {
      tag: tag.name.clone(),
      remote: tracking.remote.clone(),
      reason,
    })
  })
}

/// Collaborators and inputs of the publish step
pub struct PublishRequest<'a> {
  pub repo: &'a dyn Repository,
  pub tracking: &'a Tracking,
  pub tag: &'a ReleaseTag,
  pub artifacts: &'a [PathBuf],
  pub destination: &'a Destination,
  pub settings: &'a ReleaseSettings,
}

/// Sign, check, upload and push. Returns the signature paths.
pub fn publish(req: &PublishRequest<'_>, signer: &dyn Signer, transfer: &dyn Transfer) -> RelResult<Vec<PathBuf>> {
  let settings = req.settings;
  let signatures = sign_artifacts(signer, req.artifacts, settings.gpg_key.as_deref())?;
  crate::status!("   ✅ Signed {} artifact(s)", signatures.len());

  let target = RemoteTarget::new(req.destination, settings);
  check_destination(transfer, &target, req.artifacts, settings)?;

  let files: Vec<PathBuf> = req.artifacts.iter().chain(signatures.iter()).cloned().collect();

  if settings.dry_run {
    crate::status!("   Would upload {} file(s) to {}:{}", files.len(), target.login, target.path);
    crate::status!("   Would push tag '{}' to '{}'", req.tag.name, req.tracking.remote);
    return Ok(signatures);
  }

  transfer.copy(&files, &target)?;
  crate::status!("   📤 Uploaded {} file(s) to {}:{}", files.len(), target.host, target.path);

  push_tag(req.repo, req.tracking, req.tag)?;
  crate::status!("   ✅ Pushed tag '{}' to '{}'", req.tag.name, req.tracking.remote);

  Ok(signatures)
}
