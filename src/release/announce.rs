//! Release announcement: a mail draft with changes, download URLs and checksums
//!
//! Written to `<invocation dir>/<name>-<version>.announce` for the
//! maintainer to review and send.

use crate::core::config::Destination;
use crate::core::error::{RelResult, ResultExt};
use crate::core::vcs::Repository;
use crate::release::build::BuildResult;
use crate::release::gates::ReleaseTag;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

const READ_BUFFER: usize = 64 * 1024;

/// Hex digests of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksums {
  pub sha256: String,
  pub sha512: String,
}

impl Checksums {
  /// Hash a file in one pass
  pub fn compute(path: &Path) -> RelResult<Self> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut sha256 = Sha256::new();
    let mut sha512 = Sha512::new();
    let mut buf = vec![0u8; READ_BUFFER];

    loop {
      let n = file
        .read(&mut buf)
        .with_context(|| format!("Failed to read {}", path.display()))?;
      if n == 0 {
        break;
      }
      sha256.update(&buf[..n]);
      sha512.update(&buf[..n]);
    }

    Ok(Self {
      sha256: format!("{:x}", sha256.finalize()),
      sha512: format!("{:x}", sha512.finalize()),
    })
  }
}

/// One downloadable tarball in the announcement
#[derive(Debug, Clone)]
pub struct AnnouncedArtifact {
  pub file_name: String,
  pub url: String,
  pub checksums: Checksums,
}

/// Announcement mail
#[derive(Debug, Clone)]
pub struct Announcement {
  pub subject: String,
  pub to: String,
  pub cc: Option<String>,
  pub shortlog: String,
  pub tag: String,
  pub artifacts: Vec<AnnouncedArtifact>,
}

impl Announcement {
  pub fn render(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for Announcement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Subject: [ANNOUNCE] {}", self.subject)?;
    writeln!(f, "To: {}", self.to)?;
    if let Some(cc) = &self.cc {
      writeln!(f, "Cc: {}", cc)?;
    }
    writeln!(f)?;

    let shortlog = self.shortlog.trim_end();
    if !shortlog.is_empty() {
      writeln!(f, "{}\n", shortlog)?;
    }

    writeln!(f, "git tag: {}", self.tag)?;

    for artifact in &self.artifacts {
      writeln!(f)?;
      writeln!(f, "{}", artifact.url)?;
      writeln!(f, "SHA256: {}  {}", artifact.checksums.sha256, artifact.file_name)?;
      writeln!(f, "SHA512: {}  {}", artifact.checksums.sha512, artifact.file_name)?;
      writeln!(f, "PGP:  {}.sig", artifact.url)?;
    }

    Ok(())
  }
}

/// Revision range of the release: from the previous tag up to the released commit
pub fn history_range(previous: Option<&str>, end: &str) -> String {
  match previous {
    Some(prev) => format!("{}..{}", prev, end),
    None => end.to_string(),
  }
}

/// Gather everything the announcement needs
pub fn compose(
  repo: &dyn Repository,
  build: &BuildResult,
  tag: &ReleaseTag,
  dest: &Destination,
) -> RelResult<Announcement> {
  let previous = repo.previous_tag(&tag.target)?;
  let range = history_range(previous.as_deref(), &tag.target);
  tracing::debug!(range = %range, "collecting shortlog");
  let shortlog = repo.shortlog(&range)?;

  let base_url = dest.url.trim_end_matches('/');
  let artifacts = build
    .artifacts
    .iter()
    .map(|path| {
      let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
      Ok(AnnouncedArtifact {
        url: format!("{}/{}", base_url, file_name),
        checksums: Checksums::compute(path)?,
        file_name,
      })
    })
    .collect::<RelResult<Vec<_>>>()?;

  Ok(Announcement {
    subject: format!("{} {}", build.name, build.version),
    to: dest.to.clone(),
    cc: dest.cc.clone(),
    shortlog,
    tag: tag.name.clone(),
    artifacts,
  })
}

/// Compose and write `<out_dir>/<name>-<version>.announce`
pub fn write_announcement(
  repo: &dyn Repository,
  build: &BuildResult,
  tag: &ReleaseTag,
  dest: &Destination,
  out_dir: &Path,
) -> RelResult<PathBuf> {
  let announcement = compose(repo, build, tag, dest)?;
  let path = out_dir.join(format!("{}.announce", build.tar_name()));
  fs::write(&path, announcement.render()).with_context(|| format!("Failed to write {}", path.display()))?;
  Ok(path)
}
