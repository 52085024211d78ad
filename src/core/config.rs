use crate::core::error::{ConfigError, RelError, RelResult};
use crate::release::section::Section;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the Section key in destination templates
const SECTION_PLACEHOLDER: &str = "{section}";

/// Configuration for xrel
/// Searched in order: xrel.toml, .xrel.toml, .config/xrel.toml
///
/// Every field has a built-in default, so running without a file releases to
/// the standard hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelConfig {
  /// Destination used for Sections without a table entry
  #[serde(default = "default_fallback")]
  pub fallback: DestinationConfig,

  /// Per-Section overrides, merged over the built-in table
  #[serde(default)]
  pub destinations: BTreeMap<String, DestinationConfig>,

  #[serde(default)]
  pub build: BuildConfig,
}

/// Where a Section's tarballs go and who hears about it.
/// `path` and `url` may contain `{section}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
  pub host: String,
  pub path: String,
  pub url: String,
  pub to: String,
  #[serde(default)]
  pub cc: Option<String>,
}

/// Resolved publication target for one Section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
  pub host: String,
  /// Directory on `host` receiving the tarballs
  pub path: String,
  /// Public URL of `path`, used in announcements
  pub url: String,
  pub to: String,
  pub cc: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
  /// Root for isolated autotools workspaces (default: `<invocation dir>/.xrel-build`)
  #[serde(default)]
  pub root: Option<PathBuf>,

  /// Meson build directory, relative to the module (default: `build`)
  #[serde(default)]
  pub meson_dir: Option<String>,
}

impl BuildConfig {
  pub fn root(&self, top_src: &Path) -> PathBuf {
    self.root.clone().unwrap_or_else(|| top_src.join(".xrel-build"))
  }

  pub fn meson_dir(&self) -> &str {
    self.meson_dir.as_deref().unwrap_or("build")
  }
}

impl DestinationConfig {
  fn new(host: &str, path: &str, url: &str, to: &str, cc: Option<&str>) -> Self {
    Self {
      host: host.to_string(),
      path: path.to_string(),
      url: url.to_string(),
      to: to.to_string(),
      cc: cc.map(str::to_string),
    }
  }

  /// Fill in the `{section}` placeholders
  pub fn render(&self, section_key: &str) -> Destination {
    Destination {
      host: self.host.clone(),
      path: self.path.replace(SECTION_PLACEHOLDER, section_key),
      url: self.url.replace(SECTION_PLACEHOLDER, section_key),
      to: self.to.clone(),
      cc: self.cc.clone(),
    }
  }
}

fn default_fallback() -> DestinationConfig {
  DestinationConfig::new(
    "xorg.freedesktop.org",
    "/srv/xorg.freedesktop.org/archive/individual/{section}",
    "https://www.x.org/releases/individual/{section}",
    "xorg-announce@lists.x.org",
    Some("xorg@lists.x.org"),
  )
}

/// Built-in Section → Destination table
fn builtin_destinations() -> BTreeMap<String, DestinationConfig> {
  let mut table = BTreeMap::new();
  table.insert(
    "libdrm".to_string(),
    DestinationConfig::new(
      "dri.freedesktop.org",
      "/srv/dri.freedesktop.org/www/libdrm",
      "https://dri.freedesktop.org/libdrm",
      "dri-devel@lists.freedesktop.org",
      None,
    ),
  );
  table.insert(
    "mesa".to_string(),
    DestinationConfig::new(
      "mesa.freedesktop.org",
      "/srv/mesa.freedesktop.org/www/archive",
      "https://archive.mesa3d.org",
      "mesa-announce@lists.freedesktop.org",
      Some("mesa-dev@lists.freedesktop.org"),
    ),
  );
  table.insert(
    "wayland".to_string(),
    DestinationConfig::new(
      "wayland.freedesktop.org",
      "/srv/wayland.freedesktop.org/www/releases",
      "https://wayland.freedesktop.org/releases",
      "wayland-devel@lists.freedesktop.org",
      None,
    ),
  );
  table.insert(
    "libinput".to_string(),
    DestinationConfig::new(
      "www.freedesktop.org",
      "/srv/www.freedesktop.org/www/software/libinput",
      "https://www.freedesktop.org/software/libinput",
      "wayland-devel@lists.freedesktop.org",
      Some("input-tools@lists.freedesktop.org"),
    ),
  );
  table.insert(
    "evemu".to_string(),
    DestinationConfig::new(
      "www.freedesktop.org",
      "/srv/www.freedesktop.org/www/software/evemu",
      "https://www.freedesktop.org/software/evemu",
      "input-tools@lists.freedesktop.org",
      None,
    ),
  );
  table
}

impl Default for RelConfig {
  fn default() -> Self {
    Self {
      fallback: default_fallback(),
      destinations: BTreeMap::new(),
      build: BuildConfig::default(),
    }
  }
}

impl RelConfig {
  /// Find config file in search order: xrel.toml, .xrel.toml, .config/xrel.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("xrel.toml"),
      path.join(".xrel.toml"),
      path.join(".config").join("xrel.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from the invocation directory, falling back to defaults
  pub fn load(path: &Path) -> RelResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      tracing::debug!(dir = %path.display(), "no xrel.toml found, using built-in destinations");
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path).map_err(|e| {
      RelError::Config(ConfigError::Invalid {
        path: config_path.clone(),
        reason: e.to_string(),
      })
    })?;
    let config = Self::parse(&content).map_err(|e| {
      RelError::Config(ConfigError::Invalid {
        path: config_path.clone(),
        reason: e.to_string(),
      })
    })?;

    config.validate()?;
    tracing::debug!(path = %config_path.display(), "loaded configuration");
    Ok(config)
  }

  /// Parse configuration text without validating it
  pub fn parse(content: &str) -> RelResult<Self> {
    Ok(toml_edit::de::from_str(content)?)
  }

  /// Merged Section table: built-ins overridden by file entries
  pub fn table(&self) -> BTreeMap<String, DestinationConfig> {
    let mut table = builtin_destinations();
    table.extend(self.destinations.clone());
    table
  }

  /// Look up the Destination of a Section. Pure: same Section, same answer.
  pub fn destination(&self, section: &Section) -> Destination {
    let key = section.key();
    match self.destinations.get(key) {
      Some(entry) => entry.render(key),
      None => match builtin_destinations().get(key) {
        Some(entry) => entry.render(key),
        None => self.fallback.render(key),
      },
    }
  }

  /// Reject unknown Section keys and Destinations that contradict each other
  pub fn validate(&self) -> RelResult<()> {
    for key in self.destinations.keys() {
      if Section::parse_key(key).is_none() {
        return Err(RelError::Config(ConfigError::UnknownSection { key: key.clone() }));
      }
    }

    let rendered: Vec<(String, Destination)> = self
      .table()
      .iter()
      .map(|(key, entry)| (key.clone(), entry.render(key)))
      .collect();

    for (i, (first_key, first)) in rendered.iter().enumerate() {
      for (second_key, second) in &rendered[i + 1..] {
        let same_place = first.host == second.host && first.path == second.path;
        let same_lists = first.to == second.to && first.cc == second.cc && first.url == second.url;
        if same_place && !same_lists {
          return Err(RelError::Config(ConfigError::ConflictingDestinations {
            first: first_key.clone(),
            second: second_key.clone(),
          }));
        }
      }
    }

    Ok(())
  }
}

/// Packaging strictness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistMode {
  /// Rebuild from the tarball and verify it is self-contained
  #[default]
  Distcheck,
  /// Only produce the tarball
  Dist,
}

/// Runtime options collected from the command line
#[derive(Debug, Clone, Default)]
pub struct ReleaseSettings {
  pub dist_mode: DistMode,
  /// Perform local steps only; skip tag creation, upload and tag push
  pub dry_run: bool,
  /// Overwrite tarballs already present on the host
  pub force: bool,
  /// Record module failures and keep going
  pub continue_on_error: bool,
  pub gpg_key: Option<String>,
  /// Login for the transfer channel (`user@host`)
  pub user: Option<String>,
  /// jhbuild moduleset to update after each release
  pub moduleset: Option<PathBuf>,
  pub json: bool,
}

impl ReleaseSettings {
  /// `[user@]host` for ssh/scp
  pub fn login(&self, host: &str) -> String {
    match &self.user {
      Some(user) => format!("{}@{}", user, host),
      None => host.to_string(),
    }
  }
}
