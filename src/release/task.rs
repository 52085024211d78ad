//! Module tasks: what to release, from the command line or a module list file

use crate::core::error::{ConfigError, RelError, RelResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One module checkout to release. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleTask {
  pub path: PathBuf,
}

impl ModuleTask {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Identifier used in progress output and the failure summary
  pub fn id(&self) -> String {
    self.path.display().to_string()
  }
}

/// Parse a module list: one path per line, blank lines and `#` comments ignored
pub fn parse_module_list(text: &str) -> Vec<ModuleTask> {
  text
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty() && !line.starts_with('#'))
    .map(ModuleTask::new)
    .collect()
}

/// Read and parse a module list file
pub fn load_module_list(path: &Path) -> RelResult<Vec<ModuleTask>> {
  let text = fs::read_to_string(path).map_err(|e| {
    RelError::Config(ConfigError::ModuleListUnreadable {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })
  })?;
  Ok(parse_module_list(&text))
}

/// Collect tasks from either positional paths or a module list, never both
pub fn collect_tasks(paths: &[PathBuf], modfile: Option<&Path>) -> RelResult<Vec<ModuleTask>> {
  let tasks = match modfile {
    Some(_) if !paths.is_empty() => return Err(RelError::Config(ConfigError::ConflictingModuleInputs)),
    Some(file) => load_module_list(file)?,
    None => paths.iter().cloned().map(ModuleTask::new).collect(),
  };

  if tasks.is_empty() {
    return Err(RelError::Config(ConfigError::NoModules));
  }

  Ok(tasks)
}
