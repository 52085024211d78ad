//! Error types for xrel with contextual messages and exit codes
//!
//! Errors fall in two classes. Configuration errors abort the whole run before
//! any module is touched. Everything else is scoped to the module being
//! released and is recorded by the orchestrator.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for xrel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, I/O) outside of a module pipeline
  System = 2,
  /// One or more modules failed to release
  Release = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for xrel
#[derive(Debug)]
pub enum RelError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Release gate failures (clean tree, version bump, convergence, tags)
  Gate(GateError),

  /// Build adapter failures
  Build(BuildError),

  /// Signing, transfer and tag push failures
  Publish(PublishError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl RelError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    RelError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RelError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  ///
  /// Categorised errors keep their category; an I/O error becomes a message so
  /// the context is not lost.
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      RelError::Message { message, context, help } => RelError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      RelError::Io(err) => RelError::Message {
        message: ctx_str,
        context: Some(format!("I/O error: {}", err)),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      RelError::Config(_) => ExitCode::User,
      RelError::Git(_) | RelError::Io(_) => ExitCode::System,
      RelError::Gate(_) | RelError::Build(_) | RelError::Publish(_) => ExitCode::Release,
      RelError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      RelError::Config(e) => e.help_message(),
      RelError::Git(e) => e.help_message(),
      RelError::Gate(e) => e.help_message(),
      RelError::Build(e) => e.help_message(),
      RelError::Publish(e) => e.help_message(),
      RelError::Message { help, .. } => help.clone(),
      RelError::Io(_) => None,
    }
  }
}

impl fmt::Display for RelError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RelError::Config(e) => write!(f, "{}", e),
      RelError::Git(e) => write!(f, "{}", e),
      RelError::Gate(e) => write!(f, "{}", e),
      RelError::Build(e) => write!(f, "{}", e),
      RelError::Publish(e) => write!(f, "{}", e),
      RelError::Io(e) => write!(f, "I/O error: {}", e),
      RelError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for RelError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RelError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for RelError {
  fn from(err: io::Error) -> Self {
    RelError::Io(err)
  }
}

impl From<String> for RelError {
  fn from(msg: String) -> Self {
    RelError::message(msg)
  }
}

impl From<&str> for RelError {
  fn from(msg: &str) -> Self {
    RelError::message(msg)
  }
}

impl From<ConfigError> for RelError {
  fn from(err: ConfigError) -> Self {
    RelError::Config(err)
  }
}

impl From<GitError> for RelError {
  fn from(err: GitError) -> Self {
    RelError::Git(err)
  }
}

impl From<GateError> for RelError {
  fn from(err: GateError) -> Self {
    RelError::Gate(err)
  }
}

impl From<BuildError> for RelError {
  fn from(err: BuildError) -> Self {
    RelError::Build(err)
  }
}

impl From<PublishError> for RelError {
  fn from(err: PublishError) -> Self {
    RelError::Publish(err)
  }
}

impl From<toml_edit::de::Error> for RelError {
  fn from(err: toml_edit::de::Error) -> Self {
    RelError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for RelError {
  fn from(err: serde_json::Error) -> Self {
    RelError::message(format!("JSON error: {}", err))
  }
}

/// Configuration-related errors. These abort the run before any module work.
#[derive(Debug)]
pub enum ConfigError {
  /// Both a module list file and positional modules were given
  ConflictingModuleInputs,

  /// Nothing to release
  NoModules,

  /// Module list file could not be read
  ModuleListUnreadable { path: PathBuf, reason: String },

  /// xrel.toml could not be parsed
  Invalid { path: PathBuf, reason: String },

  /// A destination table key that does not name a Section
  UnknownSection { key: String },

  /// Two Sections share a host and path but disagree on the rest
  ConflictingDestinations { first: String, second: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::ConflictingModuleInputs => {
        Some("Pass module paths either on the command line or with --modfile, not both.".to_string())
      }
      ConfigError::NoModules => Some("Give at least one module path, or a list of them with --modfile.".to_string()),
      ConfigError::UnknownSection { .. } => {
        Some("Section keys are lower-case names such as `lib`, `driver`, `libdrm` or `mesa`.".to_string())
      }
      ConfigError::ConflictingDestinations { .. } => {
        Some("Give each Section its own path, or make the mailing lists identical.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::ConflictingModuleInputs => write!(f, "--modfile cannot be combined with module paths"),
      ConfigError::NoModules => write!(f, "No modules to release"),
      ConfigError::ModuleListUnreadable { path, reason } => {
        write!(f, "Unable to read module list {}: {}", path.display(), reason)
      }
      ConfigError::Invalid { path, reason } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), reason)
      }
      ConfigError::UnknownSection { key } => write!(f, "Unknown section '{}' in destination table", key),
      ConfigError::ConflictingDestinations { first, second } => write!(
        f,
        "Sections '{}' and '{}' upload to the same place with different announcement lists",
        first, second
      ),
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// The checked-out branch has no upstream configured
  NotTracking { branch: String },

  /// No URL configured for the tracked remote
  NoRemoteUrl { remote: String },

  /// Push failed
  PushFailed {
    remote: String,
    refspec: String,
    reason: String,
  },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RepoNotFound { path } => Some(format!(
        "Check that {} is a git checkout of the module to release.",
        path.display()
      )),
      GitError::NotTracking { branch } => Some(format!(
        "Set an upstream with: git branch --set-upstream-to=origin/{} {}",
        branch, branch
      )),
      GitError::PushFailed { reason, .. } => {
        if reason.contains("permission denied") || reason.contains("403") {
          Some("Check your SSH key and push access to the remote.".to_string())
        } else {
          None
        }
      }
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr.trim_end())
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::NotTracking { branch } => {
        write!(f, "Branch '{}' is not tracking a remote branch", branch)
      }
      GitError::NoRemoteUrl { remote } => {
        write!(f, "Unable to obtain the URL of remote '{}'", remote)
      }
      GitError::PushFailed { remote, refspec, reason } => {
        write!(f, "Push of {} to {} failed: {}", refspec, remote, reason.trim_end())
      }
    }
  }
}

/// Release gate failures, each fatal for the current module
#[derive(Debug)]
pub enum GateError {
  /// No namespace rule matched the remote URL
  UnresolvableSection { url: String },

  /// A container namespace held a sub-project outside its allow-list
  UnsupportedSection { container: String, section: String },

  /// Uncommitted changes in the module checkout
  DirtyTree,

  /// The top commit does not touch the package version
  NotVersionBump { version: String, top_commit: String },

  /// Local top commit is not what the tracked remote has
  Unpushed {
    local: String,
    remote: Option<String>,
    remote_ref: String,
  },

  /// An existing tag with the release name points elsewhere
  TagMismatch {
    tag: String,
    tagged: String,
    expected: String,
  },
}

impl GateError {
  fn help_message(&self) -> Option<String> {
    match self {
      GateError::DirtyTree => Some("Commit or stash local changes before releasing.".to_string()),
      GateError::NotVersionBump { .. } => {
        Some("Make the version bump the last commit on the branch, then re-run.".to_string())
      }
      GateError::Unpushed { remote_ref, .. } => Some(format!(
        "Push the branch (and fetch) so that {} matches HEAD. Unpushed work is never released.",
        remote_ref
      )),
      GateError::TagMismatch { tag, .. } => Some(format!(
        "The version behind '{}' may already have been released from another commit. \
         Inspect the tag and bump the version rather than re-tagging.",
        tag
      )),
      _ => None,
    }
  }
}

impl fmt::Display for GateError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GateError::UnresolvableSection { url } => {
        write!(f, "Unable to determine the release section from remote URL \"{}\"", url)
      }
      GateError::UnsupportedSection { container, section } => {
        write!(f, "Section '{}' is not supported in the '{}' namespace", section, container)
      }
      GateError::DirtyTree => write!(f, "The working tree has uncommitted changes"),
      GateError::NotVersionBump { version, top_commit } => write!(
        f,
        "The top commit does not look like a version bump: its diff does not contain \"{}\"\n  top commit: {}",
        version, top_commit
      ),
      GateError::Unpushed {
        local,
        remote,
        remote_ref,
      } => write!(
        f,
        "Local top commit {} does not match {} ({})",
        local,
        remote_ref,
        remote.as_deref().unwrap_or("unknown")
      ),
      GateError::TagMismatch { tag, tagged, expected } => write!(
        f,
        "Tag '{}' already exists and points to {} instead of the top commit {}",
        tag, tagged, expected
      ),
    }
  }
}

/// Build adapter failures
#[derive(Debug)]
pub enum BuildError {
  /// Neither build marker present in the module root
  NoBuildSystem { path: PathBuf },

  /// A required program is not on PATH
  MissingTool { tool: String },

  /// An external build step exited non-zero
  StepFailed { step: String, stderr: String },

  /// Package name or version could not be read
  Metadata { reason: String },

  /// The package step produced no tarball
  NoArtifacts { root: PathBuf, tar_name: String },
}

impl BuildError {
  fn help_message(&self) -> Option<String> {
    match self {
      BuildError::NoBuildSystem { .. } => {
        Some("Modules need either configure.ac (autotools) or meson.build at their root.".to_string())
      }
      BuildError::MissingTool { tool } => Some(format!("Install '{}' and make sure it is on PATH.", tool)),
      BuildError::StepFailed { .. } => {
        Some("Build artifacts were left in place for inspection; fix the build and re-run.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::NoBuildSystem { path } => write!(f, "No supported build system found in {}", path.display()),
      BuildError::MissingTool { tool } => write!(f, "Missing required tool: {}", tool),
      BuildError::StepFailed { step, stderr } => write!(f, "Build step failed: {}\n{}", step, stderr.trim_end()),
      BuildError::Metadata { reason } => write!(f, "Unable to read package metadata: {}", reason),
      BuildError::NoArtifacts { root, tar_name } => {
        write!(f, "No {}.tar.{{gz,bz2,xz}} found in {}", tar_name, root.display())
      }
    }
  }
}

/// Signing, upload and tag push failures
#[derive(Debug)]
pub enum PublishError {
  /// One or more artifacts could not be signed
  SigningFailed { failures: Vec<(PathBuf, String)> },

  /// The destination directory does not exist on the host
  RemotePathMissing { host: String, path: String },

  /// A tarball with the same name is already published
  AlreadyPublished { artifact: String, host: String, path: String },

  /// The batch copy failed
  TransferFailed { host: String, reason: String },

  /// The release tag could not be pushed after a successful upload
  TagPushFailed { tag: String, remote: String, reason: String },
}

impl PublishError {
  fn help_message(&self) -> Option<String> {
    match self {
      PublishError::SigningFailed { .. } => Some("Check that gpg can sign with the selected key.".to_string()),
      PublishError::RemotePathMissing { .. } => {
        Some("Ask the host administrators to create the directory, or check --user.".to_string())
      }
      PublishError::AlreadyPublished { .. } => {
        Some("Use --force to overwrite the published tarballs, or bump the version.".to_string())
      }
      PublishError::TransferFailed { .. } => Some(
        "The release tag is already created locally. Finish the upload by hand; \
         re-running may be unsafe."
          .to_string(),
      ),
      PublishError::TagPushFailed { tag, remote, .. } => Some(format!(
        "Tarballs are uploaded and '{}' exists locally. Push it manually with \
         `git push {} {}` instead of re-running the release.",
        tag, remote, tag
      )),
    }
  }
}

impl fmt::Display for PublishError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishError::SigningFailed { failures } => {
        write!(f, "Unable to sign {} artifact(s):", failures.len())?;
        for (path, reason) in failures {
          write!(f, "\n  {}: {}", path.display(), reason.trim_end())?;
        }
        Ok(())
      }
      PublishError::RemotePathMissing { host, path } => {
        write!(f, "Remote path {}:{} does not exist", host, path)
      }
      PublishError::AlreadyPublished { artifact, host, path } => {
        write!(f, "{} already exists at {}:{}", artifact, host, path)
      }
      PublishError::TransferFailed { host, reason } => {
        write!(f, "Upload to {} failed: {}", host, reason.trim_end())
      }
      PublishError::TagPushFailed { tag, remote, reason } => write!(
        f,
        "Unable to push tag '{}' to '{}': {}\nManual intervention required.",
        tag,
        remote,
        reason.trim_end()
      ),
    }
  }
}

/// Result type alias for xrel
pub type RelResult<T> = Result<T, RelError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> RelResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> RelResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<RelError>,
{
  fn context(self, ctx: impl Into<String>) -> RelResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> RelResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &RelError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
