//! jhbuild moduleset update
//!
//! Points the moduleset entry of a package at the freshly published tarball:
//!
//! ```text
//! <branch module="lib/libXfoo-1.2.2.tar.xz" version="1.2.2"
//!         hash="sha256:…"/>
//! ```
//!
//! The entry is the element whose `module` attribute names
//! `<name>-<digit>…`. Its `module`, `version` and `hash` attributes are
//! rewritten in place; everything else is left untouched.

use crate::core::error::{RelError, RelResult, ResultExt};
use crate::release::announce::Checksums;
use crate::release::build::BuildResult;
use std::fs;
use std::path::Path;

/// Byte span of an attribute's value within a line
fn attr_span(line: &str, attr: &str) -> Option<(usize, usize)> {
  let needle = format!("{}=\"", attr);
  let mut from = 0;

  while let Some(pos) = line[from..].find(&needle) {
    let start = from + pos;
    let value_start = start + needle.len();
    let at_boundary = line[..start].chars().next_back().is_none_or(char::is_whitespace);
    if at_boundary {
      let len = line[value_start..].find('"')?;
      return Some((value_start, value_start + len));
    }
    from = value_start;
  }

  None
}

fn replace_attr(line: &str, attr: &str, value: &str) -> Option<String> {
  let (start, end) = attr_span(line, attr)?;
  Some(format!("{}{}{}", &line[..start], value, &line[end..]))
}

/// Whether a `module` attribute value refers to a tarball of `name`
fn refers_to(module: &str, name: &str) -> bool {
  let file = module.rsplit('/').next().unwrap_or(module);
  file
    .strip_prefix(name)
    .and_then(|rest| rest.strip_prefix('-'))
    .and_then(|rest| rest.chars().next())
    .is_some_and(|c| c.is_ascii_digit())
}

/// Rewrite the entry of `name`; `None` if the moduleset has no such entry
pub fn rewrite(text: &str, name: &str, version: &str, tarball: &str, sha256: &str) -> Option<String> {
  let mut lines: Vec<String> = text.lines().map(str::to_string).collect();

  let start = lines.iter().position(|line| {
    attr_span(line, "module").is_some_and(|(s, e)| refers_to(&line[s..e], name))
  })?;
  // element ends on the first line closing a tag
  let end = (start..lines.len())
    .find(|&i| lines[i].contains('>'))
    .unwrap_or(lines.len() - 1);

  for line in &mut lines[start..=end] {
    if let Some((s, e)) = attr_span(line, "module") {
      let current = &line[s..e];
      let module = match current.rfind('/') {
        Some(slash) => format!("{}/{}", &current[..slash], tarball),
        None => tarball.to_string(),
      };
      *line = format!("{}{}{}", &line[..s], module, &line[e..]);
    }
    if let Some(updated) = replace_attr(line, "version", version) {
      *line = updated;
    }
    if let Some((s, e)) = attr_span(line, "hash")
      && line[s..e].starts_with("sha256:")
    {
      *line = format!("{}sha256:{}{}", &line[..s], sha256, &line[e..]);
    }
  }

  let mut out = lines.join("\n");
  if text.ends_with('\n') {
    out.push('\n');
  }
  Some(out)
}

/// Update the moduleset file for a published build
pub fn update_moduleset(path: &Path, build: &BuildResult) -> RelResult<()> {
  let artifact = build
    .preferred_artifact()
    .ok_or_else(|| RelError::message(format!("No tarball to record for {}", build.tar_name())))?;
  let tarball = artifact
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_default();
  let sha256 = Checksums::compute(artifact)?.sha256;

  let text = fs::read_to_string(path).with_context(|| format!("Failed to read moduleset {}", path.display()))?;
  let updated = rewrite(&text, &build.name, &build.version, &tarball, &sha256).ok_or_else(|| {
    RelError::with_help(
      format!("No entry for {} in moduleset {}", build.name, path.display()),
      format!("Add a module=\"…/{}-<version>.tar.xz\" entry by hand.", build.name),
    )
  })?;

  fs::write(path, updated).with_context(|| format!("Failed to write moduleset {}", path.display()))?;
  tracing::debug!(moduleset = %path.display(), tarball = %tarball, "updated moduleset");
  Ok(())
}
