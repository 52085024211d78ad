//! Build adapter: turn a module checkout into release tarballs
//!
//! Two build systems are supported, probed in priority order:
//!
//! - **Legacy** (`configure.ac`): bootstrap + configure + `make distcheck`
//!   inside an isolated git worktree under `<build root>/<section>/`.
//! - **Meson** (`meson.build`): `meson dist` in the module's build
//!   directory, metadata from `meson introspect`.
//!
//! Both converge on a [`BuildResult`]. Failed builds are left on disk for
//! inspection.

use crate::core::config::DistMode;
use crate::core::error::{BuildError, RelError, RelResult, ResultExt};
use crate::core::vcs::Repository;
use crate::release::section::Section;
use crate::utils::tail_lines;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const LEGACY_MARKER: &str = "configure.ac";
pub const MESON_MARKER: &str = "meson.build";
/// Needed to read project metadata from a meson build
pub const INTROSPECTION_TOOL: &str = "meson";

/// Lines of tool output kept in error messages
const ERROR_TAIL: usize = 40;

/// External build tooling
pub trait Toolchain {
  /// Whether a program is installed
  fn has_program(&self, program: &str) -> bool;

  /// Run a program in `dir`; non-zero exit is a [`BuildError::StepFailed`]
  fn run(&self, dir: &Path, program: &str, args: &[&str]) -> RelResult<String>;
}

/// Toolchain backed by real processes
pub struct SystemToolchain;

impl Toolchain for SystemToolchain {
  fn has_program(&self, program: &str) -> bool {
    which::which(program).is_ok()
  }

  fn run(&self, dir: &Path, program: &str, args: &[&str]) -> RelResult<String> {
    let step = format!("{} {}", program, args.join(" ")).trim_end().to_string();
    tracing::debug!(dir = %dir.display(), "running {}", step);

    let output = Command::new(program)
      .args(args)
      .current_dir(dir)
      .stdin(Stdio::null())
      .output()
      .with_context(|| format!("Failed to execute {}", step))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RelError::Build(BuildError::StepFailed {
        step,
        stderr: format!("{}\n{}", tail_lines(&stdout, ERROR_TAIL), tail_lines(&stderr, ERROR_TAIL)),
      }));
    }

    Ok(stdout)
  }
}

/// Build system of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildKind {
  Legacy,
  Meson,
}

impl BuildKind {
  /// Probe the module root for build markers, legacy first.
  pub fn detect(root: &Path, tools: &dyn Toolchain) -> RelResult<Self> {
    if root.join(LEGACY_MARKER).is_file() {
      return Ok(BuildKind::Legacy);
    }

    if root.join(MESON_MARKER).is_file() {
      if !tools.has_program(INTROSPECTION_TOOL) {
        return Err(RelError::Build(BuildError::MissingTool {
          tool: INTROSPECTION_TOOL.to_string(),
        }));
      }
      return Ok(BuildKind::Meson);
    }

    Err(RelError::Build(BuildError::NoBuildSystem {
      path: root.to_path_buf(),
    }))
  }

  pub fn name(self) -> &'static str {
    match self {
      BuildKind::Legacy => "autotools",
      BuildKind::Meson => "meson",
    }
  }
}

/// Compressed tarball formats, in scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
  Gzip,
  Bzip2,
  Xz,
}

impl ArchiveFormat {
  pub const ALL: [ArchiveFormat; 3] = [ArchiveFormat::Gzip, ArchiveFormat::Bzip2, ArchiveFormat::Xz];

  pub fn extension(self) -> &'static str {
    match self {
      ArchiveFormat::Gzip => "tar.gz",
      ArchiveFormat::Bzip2 => "tar.bz2",
      ArchiveFormat::Xz => "tar.xz",
    }
  }
}

/// Package metadata and the tarballs produced for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
  pub name: String,
  pub version: String,
  /// Existing tarballs, gz/bz2/xz order
  pub artifacts: Vec<PathBuf>,
  /// Directory the tarballs were found in
  pub root: PathBuf,
}

impl BuildResult {
  /// Scan `root` for `<name>-<version>.tar.{gz,bz2,xz}`; at least one must exist
  pub fn collect(name: &str, version: &str, root: &Path) -> RelResult<Self> {
    let tar_name = format!("{}-{}", name, version);
    let artifacts: Vec<PathBuf> = ArchiveFormat::ALL
      .iter()
      .map(|format| root.join(format!("{}.{}", tar_name, format.extension())))
      .filter(|path| path.is_file())
      .collect();

    if artifacts.is_empty() {
      return Err(RelError::Build(BuildError::NoArtifacts {
        root: root.to_path_buf(),
        tar_name,
      }));
    }

    Ok(Self {
      name: name.to_string(),
      version: version.to_string(),
      artifacts,
      root: root.to_path_buf(),
    })
  }

  /// `<name>-<version>`
  pub fn tar_name(&self) -> String {
    format!("{}-{}", self.name, self.version)
  }

  /// Best-compressed tarball available (xz, then bz2, then gz)
  pub fn preferred_artifact(&self) -> Option<&Path> {
    self.artifacts.last().map(PathBuf::as_path)
  }
}

/// Everything a build needs besides the toolchain
pub struct BuildRequest<'a> {
  pub repo: &'a dyn Repository,
  pub section: &'a Section,
  pub dist_mode: DistMode,
  /// Root for isolated legacy workspaces
  pub build_root: PathBuf,
  /// Meson build directory relative to the module
  pub meson_dir: &'a str,
}

/// Run the build for the detected kind
pub fn build(kind: BuildKind, req: &BuildRequest<'_>, tools: &dyn Toolchain) -> RelResult<BuildResult> {
  match kind {
    BuildKind::Legacy => build_legacy(req, tools),
    BuildKind::Meson => build_meson(req, tools),
  }
}

fn build_legacy(req: &BuildRequest<'_>, tools: &dyn Toolchain) -> RelResult<BuildResult> {
  let workspace = legacy_workspace(&req.build_root, req.section, req.repo.work_tree())?;
  crate::status!("   Building in {}", workspace.display());

  req.repo.add_worktree(&workspace)?;

  let autogen = workspace.join("autogen.sh");
  if autogen.is_file() {
    tools.run(&workspace, &autogen.to_string_lossy(), &[])?;
  } else {
    tools.run(&workspace, "autoreconf", &["-fi"])?;
    tools.run(&workspace, &workspace.join("configure").to_string_lossy(), &[])?;
  }

  let target = match req.dist_mode {
    DistMode::Distcheck => "distcheck",
    DistMode::Dist => "dist",
  };
  tools.run(&workspace, "make", &[target])?;

  let makefile = fs::read_to_string(workspace.join("Makefile"))
    .map_err(|e| BuildError::Metadata {
      reason: format!("cannot read generated Makefile: {}", e),
    })?;
  let (name, version) = parse_makefile_metadata(&makefile)?;

  BuildResult::collect(&name, &version, &workspace)
}

/// Create `<root>/<section>/<module>-<timestamp>-XXXXXX`, kept after the run
fn legacy_workspace(build_root: &Path, section: &Section, module_root: &Path) -> RelResult<PathBuf> {
  let section_dir = build_root.join(section.key());
  fs::create_dir_all(&section_dir)
    .with_context(|| format!("Failed to create build directory {}", section_dir.display()))?;

  let module = module_root
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_else(|| "module".to_string());
  let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");

  let dir = tempfile::Builder::new()
    .prefix(&format!("{}-{}-", module, stamp))
    .tempdir_in(&section_dir)
    .with_context(|| format!("Failed to create build workspace in {}", section_dir.display()))?;

  Ok(dir.keep())
}

fn build_meson(req: &BuildRequest<'_>, tools: &dyn Toolchain) -> RelResult<BuildResult> {
  let module_root = req.repo.work_tree();
  let build_dir = module_root.join(req.meson_dir);

  if !build_dir.join("meson-private").is_dir() {
    tools.run(module_root, "meson", &["setup", req.meson_dir])?;
  }

  let mut dist_args = vec!["dist", "-C", req.meson_dir];
  if req.dist_mode == DistMode::Dist {
    dist_args.push("--no-tests");
  }
  tools.run(module_root, "meson", &dist_args)?;

  let info = tools.run(module_root, INTROSPECTION_TOOL, &["introspect", req.meson_dir, "--projectinfo"])?;
  let (name, version) = parse_projectinfo(&info)?;

  BuildResult::collect(&name, &version, &build_dir.join("meson-dist"))
}

/// Read `PACKAGE = ...` and `VERSION = ...` from a generated Makefile
pub fn parse_makefile_metadata(makefile: &str) -> RelResult<(String, String)> {
  let value = |var: &str| {
    let prefix = format!("{} = ", var);
    makefile
      .lines()
      .find_map(|line| line.strip_prefix(&prefix))
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty())
      .ok_or_else(|| BuildError::Metadata {
        reason: format!("no {} in Makefile", var),
      })
  };

  Ok((value("PACKAGE")?, value("VERSION")?))
}

#[derive(Deserialize)]
struct ProjectInfo {
  descriptive_name: String,
  version: String,
}

/// Read name and version from `meson introspect --projectinfo` JSON
pub fn parse_projectinfo(json: &str) -> RelResult<(String, String)> {
  let info: ProjectInfo = serde_json::from_str(json).map_err(|e| BuildError::Metadata {
    reason: format!("unexpected meson introspection output: {}", e),
  })?;
  Ok((info.descriptive_name, info.version))
}
