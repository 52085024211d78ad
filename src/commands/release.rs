//! Release command implementation
//!
//! Wires the real collaborators (system git, build tools, gpg, ssh) into the
//! per-module pipeline and prints the run summary.

use crate::core::context::RunContext;
use crate::core::error::RelResult;
use crate::core::vcs::SystemGit;
use crate::release::build::SystemToolchain;
use crate::release::publish::{GpgSigner, SshTransfer};
use crate::release::{Collaborators, ModuleTask, RunSummary, run_all, run_module};

/// Release every module, honouring the continue-on-error policy
pub fn run_release(ctx: &RunContext, tasks: &[ModuleTask]) -> RelResult<RunSummary> {
  let tools = SystemToolchain;
  let signer = GpgSigner;
  let transfer = SshTransfer;
  let collab = Collaborators {
    tools: &tools,
    signer: &signer,
    transfer: &transfer,
  };

  if ctx.settings.dry_run {
    crate::status!("🔍 Dry-run mode: nothing is tagged, uploaded or pushed");
  }

  let summary = run_all(tasks, ctx.settings.continue_on_error, |task| {
    let repo = SystemGit::open(&ctx.top_src.join(&task.path))?;
    let released = run_module(&repo, ctx, &collab)?;
    tracing::debug!(
      name = %released.name,
      version = %released.version,
      section = %released.section,
      tag = %released.tag.name,
      signatures = released.signatures.len(),
      announcement = ?released.announcement,
      "module released"
    );
    Ok(())
  });

  if ctx.settings.json {
    println!("{}", serde_json::to_string_pretty(&summary)?);
  } else {
    summary.print();
  }

  Ok(summary)
}
