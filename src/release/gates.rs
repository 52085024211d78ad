//! Release gates: pre-publication checks on a built module
//!
//! Gates run in a fixed order and the first failure stops the module:
//!
//! 1. clean tree
//! 2. top commit is a version bump
//! 3. local top commit equals the tracked remote's
//! 4. release tag absent, or already on that commit
//!
//! When every gate passes and the tag is absent, a signed tag is created
//! (skipped in dry-run).

use crate::core::config::ReleaseSettings;
use crate::core::error::{GateError, RelResult};
use crate::core::vcs::{Repository, Tracking};
use crate::release::build::BuildResult;
use crate::release::section::{Section, TagStyle};
use serde::Serialize;

/// Diff markers of split version components (`MAJOR_VERSION`, `version_minor`, ...)
const VERSION_COMPONENT_MARKERS: &[&str] = &[
  "major_version",
  "minor_version",
  "micro_version",
  "patch_version",
  "version_major",
  "version_minor",
  "version_micro",
  "version_patch",
];

/// Release tag of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseTag {
  pub name: String,
  /// Commit the tag points to
  pub target: String,
}

/// Name of the release tag for a package, per its Section's tag style
pub fn tag_name(section: &Section, name: &str, version: &str) -> String {
  match section.tag_style() {
    TagStyle::NameVersion => format!("{}-{}", name, version),
    TagStyle::BareVersion => version.to_string(),
    TagStyle::VPrefixed => format!("v{}", version),
  }
}

/// State of the release tag relative to the commit being released
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagState {
  Absent,
  /// Exists and points at the expected commit
  Consistent,
  /// Exists and points elsewhere
  Inconsistent { tagged: String },
}

impl TagState {
  pub fn classify(existing: Option<&str>, expected: &str) -> Self {
    match existing {
      None => TagState::Absent,
      Some(sha) if sha == expected => TagState::Consistent,
      Some(sha) => TagState::Inconsistent {
        tagged: sha.to_string(),
      },
    }
  }
}

/// The four gates, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
  CleanTree,
  VersionBump,
  RemoteConvergence,
  TagConsistency,
}

impl Gate {
  pub fn describe(self) -> &'static str {
    match self {
      Gate::CleanTree => "working tree is clean",
      Gate::VersionBump => "top commit bumps the version",
      Gate::RemoteConvergence => "top commit is pushed",
      Gate::TagConsistency => "release tag is consistent",
    }
  }
}

/// Whether a unified diff looks like it changes the package version.
///
/// The literal version anywhere in the diff is enough. Otherwise an added or
/// removed line must mention a split version component.
pub fn is_version_bump(diff: &str, version: &str) -> bool {
  if !version.is_empty() && diff.contains(version) {
    return true;
  }

  diff
    .lines()
    .filter(|line| {
      (line.starts_with('+') && !line.starts_with("+++")) || (line.starts_with('-') && !line.starts_with("---"))
    })
    .any(|line| {
      let lower = line.to_ascii_lowercase();
      VERSION_COMPONENT_MARKERS.iter().any(|marker| lower.contains(marker))
    })
}

/// Local and remote top commits must be identical
pub fn check_convergence(local: &str, remote: Option<&str>, remote_ref: &str) -> Result<(), GateError> {
  match remote {
    Some(sha) if sha == local => Ok(()),
    _ => Err(GateError::Unpushed {
      local: local.to_string(),
      remote: remote.map(str::to_string),
      remote_ref: remote_ref.to_string(),
    }),
  }
}

/// An existing tag must already point at the commit being released
pub fn check_tag(tag: &str, state: &TagState, expected: &str) -> Result<(), GateError> {
  match state {
    TagState::Absent | TagState::Consistent => Ok(()),
    TagState::Inconsistent { tagged } => Err(GateError::TagMismatch {
      tag: tag.to_string(),
      tagged: tagged.clone(),
      expected: expected.to_string(),
    }),
  }
}

fn pass(gate: Gate, result: Result<(), GateError>) -> RelResult<()> {
  match result {
    Ok(()) => {
      crate::status!("   ✅ {}", gate.describe());
      Ok(())
    }
    Err(err) => {
      tracing::debug!(gate = ?gate, "gate failed");
      Err(err.into())
    }
  }
}

/// Run every gate against a built module and create the release tag.
///
/// Returns the tag, which points at the converged top commit.
pub fn validate(
  repo: &dyn Repository,
  tracking: &Tracking,
  section: &Section,
  build: &BuildResult,
  settings: &ReleaseSettings,
) -> RelResult<ReleaseTag> {
  let clean = repo.is_clean()?;
  pass(Gate::CleanTree, if clean { Ok(()) } else { Err(GateError::DirtyTree) })?;

  let diff = repo.top_commit_diff()?;
  let bump = if is_version_bump(&diff, &build.version) {
    Ok(())
  } else {
    Err(GateError::NotVersionBump {
      version: build.version.clone(),
      top_commit: repo
        .top_commit_summary()
        .unwrap_or_else(|_| "unknown".to_string()),
    })
  };
  pass(Gate::VersionBump, bump)?;

  let local = repo.head_commit()?;
  let remote_ref = tracking.remote_ref();
  let remote = repo.resolve_commit(&remote_ref)?;
  pass(
    Gate::RemoteConvergence,
    check_convergence(&local, remote.as_deref(), &remote_ref),
  )?;

  let tag = tag_name(section, &build.name, &build.version);
  let existing = repo.resolve_commit(&format!("refs/tags/{}", tag))?;
  let state = TagState::classify(existing.as_deref(), &local);
  pass(Gate::TagConsistency, check_tag(&tag, &state, &local))?;

  match state {
    TagState::Absent if settings.dry_run => crate::status!("   Would create signed tag '{}'", tag),
    TagState::Absent => {
      repo.create_signed_tag(&tag, settings.gpg_key.as_deref())?;
      crate::status!("   🏷️  Created signed tag '{}'", tag);
    }
    _ => crate::status!("   Tag '{}' already points at {}", tag, local),
  }

  Ok(ReleaseTag { name: tag, target: local })
}
