//! Per-module release pipeline
//!
//! ```text
//! tracking ─► section ─► destination ─► build ─► gates/tag ─► publish
//!                                                                │
//!                                      announcement (best-effort)◄┘
//!                                      moduleset    (best-effort)
//! ```
//!
//! Any error before the announcement is fatal for the module and returned
//! to the orchestrator. Nothing is rolled back.

use crate::core::context::RunContext;
use crate::core::error::RelResult;
use crate::core::vcs::Repository;
use crate::release::announce;
use crate::release::build::{self, BuildKind, BuildRequest, Toolchain};
use crate::release::gates::{self, ReleaseTag};
use crate::release::moduleset;
use crate::release::publish::{self, PublishRequest, Signer, Transfer};
use crate::release::section::{Section, resolve_section};
use std::path::PathBuf;

/// External tools used by the pipeline, besides the repository
pub struct Collaborators<'a> {
  pub tools: &'a dyn Toolchain,
  pub signer: &'a dyn Signer,
  pub transfer: &'a dyn Transfer,
}

/// What a successful pipeline produced
#[derive(Debug, Clone)]
pub struct ModuleRelease {
  pub name: String,
  pub version: String,
  pub section: Section,
  pub tag: ReleaseTag,
  pub signatures: Vec<PathBuf>,
  pub announcement: Option<PathBuf>,
}

/// Release the module checked out in `repo`
pub fn run_module(repo: &dyn Repository, ctx: &RunContext, collab: &Collaborators<'_>) -> RelResult<ModuleRelease> {
  let settings = &ctx.settings;

  let branch = repo.current_branch()?;
  let tracking = repo.tracking(&branch)?;
  let url = repo.remote_url(&tracking.remote)?;
  tracing::debug!(branch = %branch, remote = %tracking.remote, url = %url, "tracking");

  let section = resolve_section(&url)?;
  let destination = ctx.config.destination(&section);
  crate::status!("   Section '{}' → {}:{}", section, destination.host, destination.path);

  let kind = BuildKind::detect(repo.work_tree(), collab.tools)?;
  crate::status!("   🔨 Building with {}", kind.name());
  let request = BuildRequest {
    repo,
    section: &section,
    dist_mode: settings.dist_mode,
    build_root: ctx.build_root(),
    meson_dir: ctx.config.build.meson_dir(),
  };
  let built = build::build(kind, &request, collab.tools)?;
  crate::status!(
    "   ✅ Built {} ({} tarball(s) in {})",
    built.tar_name(),
    built.artifacts.len(),
    built.root.display()
  );

  let tag = gates::validate(repo, &tracking, &section, &built, settings)?;

  let signatures = publish::publish(
    &PublishRequest {
      repo,
      tracking: &tracking,
      tag: &tag,
      artifacts: &built.artifacts,
      destination: &destination,
      settings,
    },
    collab.signer,
    collab.transfer,
  )?;

  let announcement = match announce::write_announcement(repo, &built, &tag, &destination, &ctx.top_src) {
    Ok(path) => {
      crate::status!("   📝 Announcement written to {}", path.display());
      Some(path)
    }
    Err(err) => {
      tracing::warn!(error = %err, "announcement failed");
      crate::status!("   ⚠️  Unable to write the announcement: {}", err);
      None
    }
  };

  if let Some(path) = &settings.moduleset {
    if settings.dry_run {
      crate::status!("   Would update moduleset {}", path.display());
    } else if let Err(err) = moduleset::update_moduleset(path, &built) {
      tracing::warn!(error = %err, "moduleset update failed");
      crate::status!("   ⚠️  Unable to update moduleset: {}", err);
    } else {
      crate::status!("   ✅ Updated moduleset {}", path.display());
    }
  }

  Ok(ModuleRelease {
    name: built.name,
    version: built.version,
    section,
    tag,
    signatures,
    announcement,
  })
}
