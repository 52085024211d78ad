//! Module orchestrator: run the pipeline per module, in input order
//!
//! One module finishes, successfully or not, before the next starts. A
//! failure is recorded in the [`FailureLedger`]; unless continue-on-error is
//! set the run stops there and the remaining modules are skipped.

use crate::core::error::{ExitCode, RelResult, print_error};
use crate::release::task::ModuleTask;
use serde::Serialize;

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  AllSucceeded,
  /// A module failed and the rest were skipped
  StoppedOnError,
  /// Some modules failed; every module was attempted
  PartialCompletion,
}

/// Identifiers of failed modules, in the order they failed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FailureLedger(Vec<String>);

impl FailureLedger {
  pub fn record(&mut self, id: String) {
    self.0.push(id);
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn ids(&self) -> &[String] {
    &self.0
  }
}

/// End-of-run report
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
  pub status: RunStatus,
  pub failed: FailureLedger,
  pub succeeded: Vec<String>,
  /// Modules never attempted because the run stopped early
  pub skipped: Vec<String>,
}

impl RunSummary {
  /// `None` when every module was released
  pub fn exit_code(&self) -> Option<ExitCode> {
    match self.status {
      RunStatus::AllSucceeded => None,
      RunStatus::StoppedOnError | RunStatus::PartialCompletion => Some(ExitCode::Release),
    }
  }

  pub fn print(&self) {
    println!();
    match self.status {
      RunStatus::AllSucceeded => {
        println!("✅ Released {} module(s)", self.succeeded.len());
        return;
      }
      RunStatus::StoppedOnError => println!("❌ Stopped on the first failure"),
      RunStatus::PartialCompletion => println!(
        "⚠️  Partial completion: {} of {} module(s) failed",
        self.failed.ids().len(),
        self.failed.ids().len() + self.succeeded.len()
      ),
    }

    println!("   Failed:");
    for id in self.failed.ids() {
      println!("     - {}", id);
    }
    if !self.skipped.is_empty() {
      println!("   Not attempted:");
      for id in &self.skipped {
        println!("     - {}", id);
      }
    }
  }
}

/// Release every task with `release`, honouring the continue-on-error policy
pub fn run_all<F>(tasks: &[ModuleTask], continue_on_error: bool, mut release: F) -> RunSummary
where
  F: FnMut(&ModuleTask) -> RelResult<()>,
{
  let mut failed = FailureLedger::default();
  let mut succeeded = Vec::new();
  let mut skipped = Vec::new();

  for (index, task) in tasks.iter().enumerate() {
    let id = task.id();
    crate::status!("\n📦 Releasing {}", id);

    match release(task) {
      Ok(()) => {
        crate::status!("✅ {} released", id);
        succeeded.push(id);
      }
      Err(err) => {
        tracing::debug!(module = %id, error = ?err, "module failed");
        print_error(&err);
        failed.record(id);
        if !continue_on_error {
          skipped = tasks[index + 1..].iter().map(ModuleTask::id).collect();
          break;
        }
      }
    }
  }

  let status = if failed.is_empty() {
    RunStatus::AllSucceeded
  } else if continue_on_error {
    RunStatus::PartialCompletion
  } else {
    RunStatus::StoppedOnError
  };

  RunSummary {
    status,
    failed,
    succeeded,
    skipped,
  }
}
