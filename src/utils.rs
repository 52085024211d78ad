//! Small helpers shared by the collaborator implementations

use std::sync::atomic::{AtomicBool, Ordering};

static MACHINE_OUTPUT: AtomicBool = AtomicBool::new(false);

/// Route progress output to stderr so stdout carries only the JSON summary
pub fn set_machine_output(enabled: bool) {
  MACHINE_OUTPUT.store(enabled, Ordering::Relaxed);
}

pub fn machine_output() -> bool {
  MACHINE_OUTPUT.load(Ordering::Relaxed)
}

/// Operator-facing progress line; stdout unless `--json` was given
#[macro_export]
macro_rules! status {
  ($($arg:tt)*) => {
    if $crate::utils::machine_output() {
      eprintln!($($arg)*);
    } else {
      println!($($arg)*);
    }
  };
}

/// Last `n` lines of a tool's output, for error messages
///
/// Build tools are chatty; the failure is almost always at the end.
pub fn tail_lines(text: &str, n: usize) -> String {
  let lines: Vec<&str> = text.lines().collect();
  let start = lines.len().saturating_sub(n);
  lines[start..].join("\n")
}
