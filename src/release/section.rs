//! Section resolution: remote URL → publication Section
//!
//! The remote URL is matched against an ordered rule table of namespace
//! markers, first match wins. The matched relative path (`lib/libX11`,
//! `mesa/drm`, ...) yields the Section from its first segment, or from its
//! second when the first names a container namespace.

use crate::core::error::{GateError, RelResult};
use serde::Serialize;
use std::fmt;

/// Classification of a module controlling where it is published and who is
/// told about it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Section {
  Driver,
  Data,
  Libdrm,
  Mesa,
  Wayland,
  Libinput,
  Evemu,
  /// Any other X.Org subdirectory (`lib`, `app`, `proto`, ...) or unknown project
  Generic(String),
}

/// How a Section names its release tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStyle {
  /// `<name>-<version>`
  NameVersion,
  /// `<version>`
  BareVersion,
  /// `v<version>`
  VPrefixed,
}

impl Section {
  /// Parse a Section key; `None` if the key is not a plausible directory name
  pub fn parse_key(key: &str) -> Option<Self> {
    let valid = !key.is_empty()
      && key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !valid {
      return None;
    }

    Some(match key {
      "driver" => Section::Driver,
      "data" => Section::Data,
      "drm" | "libdrm" => Section::Libdrm,
      "mesa" => Section::Mesa,
      "wayland" => Section::Wayland,
      "libinput" => Section::Libinput,
      "evemu" => Section::Evemu,
      other => Section::Generic(other.to_string()),
    })
  }

  /// Key used in the destination table and build workspace layout
  pub fn key(&self) -> &str {
    match self {
      Section::Driver => "driver",
      Section::Data => "data",
      Section::Libdrm => "libdrm",
      Section::Mesa => "mesa",
      Section::Wayland => "wayland",
      Section::Libinput => "libinput",
      Section::Evemu => "evemu",
      Section::Generic(name) => name,
    }
  }

  pub fn tag_style(&self) -> TagStyle {
    match self {
      Section::Wayland | Section::Libinput => TagStyle::BareVersion,
      Section::Evemu => TagStyle::VPrefixed,
      _ => TagStyle::NameVersion,
    }
  }
}

impl fmt::Display for Section {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.key())
  }
}

impl From<Section> for String {
  fn from(section: Section) -> Self {
    section.key().to_string()
  }
}

/// One entry of the namespace rule table
struct NamespaceRule {
  /// Path segment marking the namespace
  marker: &'static str,
  /// Whether the marker itself starts the relative path
  keep_marker: bool,
}

/// Primary namespace first, then known alternates
const NAMESPACE_RULES: &[NamespaceRule] = &[
  NamespaceRule {
    marker: "xorg",
    keep_marker: false,
  },
  NamespaceRule {
    marker: "mesa",
    keep_marker: true,
  },
  NamespaceRule {
    marker: "wayland",
    keep_marker: true,
  },
  NamespaceRule {
    marker: "libinput",
    keep_marker: true,
  },
  NamespaceRule {
    marker: "libevdev",
    keep_marker: true,
  },
];

/// Namespaces grouping several sub-projects
enum Container {
  /// Second segment must be one of these
  AllowList(&'static [&'static str]),
  /// Second segment taken as-is
  Unconditional,
}

fn container(first_segment: &str) -> Option<Container> {
  match first_segment {
    "mesa" => Some(Container::AllowList(&["drm", "mesa"])),
    "wayland" | "libevdev" => Some(Container::Unconditional),
    _ => None,
  }
}

/// Path segments of a remote URL, without host and repository suffix.
///
/// Handles `scheme://host/a/b.git`, `user@host:a/b.git` and local paths.
fn url_segments(url: &str) -> Vec<&str> {
  let trimmed = url.trim().trim_end_matches('/');
  let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

  let path = if let Some((_, rest)) = trimmed.split_once("://") {
    rest.split_once('/').map_or("", |(_host, path)| path)
  } else if trimmed.starts_with('/') || trimmed.starts_with('.') {
    trimmed
  } else {
    match trimmed.split_once(':') {
      Some((host, path)) if !host.contains('/') => path,
      _ => trimmed,
    }
  };

  path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Relative path (up to two segments) under the first matching namespace
fn relative_path<'a>(segments: &[&'a str]) -> Option<Vec<&'a str>> {
  NAMESPACE_RULES.iter().find_map(|rule| {
    let pos = segments.iter().position(|s| *s == rule.marker)?;
    let start = if rule.keep_marker { pos } else { pos + 1 };
    let rel: Vec<&str> = segments[start..].iter().take(2).copied().collect();
    if rel.is_empty() { None } else { Some(rel) }
  })
}

/// Resolve the Section of a module from its tracked remote URL.
pub fn resolve_section(url: &str) -> RelResult<Section> {
  let unresolvable = || GateError::UnresolvableSection { url: url.to_string() };

  let segments = url_segments(url);
  let rel = relative_path(&segments).ok_or_else(unresolvable)?;
  let candidate = rel[0];

  let key = match container(candidate) {
    None => candidate,
    Some(kind) => {
      let second = *rel.get(1).ok_or_else(unresolvable)?;
      if let Container::AllowList(allowed) = kind
        && !allowed.contains(&second)
      {
        return Err(
          GateError::UnsupportedSection {
            container: candidate.to_string(),
            section: second.to_string(),
          }
          .into(),
        );
      }
      second
    }
  };

  let key = key.to_ascii_lowercase();
  Section::parse_key(&key).ok_or_else(|| unresolvable().into())
}
