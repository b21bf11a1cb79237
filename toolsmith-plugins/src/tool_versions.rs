//! The `.tool-versions` pin file: one `<name> <version>` line per tool.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{PluginError, Result};

pub const TOOL_VERSIONS_FILE: &str = ".tool-versions";

/// Tool name to pinned version, kept sorted by name.
pub type ToolVersions = BTreeMap<String, String>;

/// Parse pin file content. Blank and `#` lines are skipped and the last
/// entry for a tool wins.
pub fn parse(content: &str) -> Result<ToolVersions> {
    parse_named(content, TOOL_VERSIONS_FILE)
}

enum Line<'a> {
    Blank,
    Pin(&'a str, &'a str),
    Invalid,
}

fn classify(raw: &str) -> Line<'_> {
    let line = raw.split('#').next().unwrap_or_default().trim();
    if line.is_empty() {
        return Line::Blank;
    }
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(name), Some(version)) => Line::Pin(name, version),
        _ => Line::Invalid,
    }
}

fn parse_named(content: &str, origin: &str) -> Result<ToolVersions> {
    let mut pins = ToolVersions::new();
    for (index, raw) in content.lines().enumerate() {
        match classify(raw) {
            Line::Blank => {}
            Line::Pin(name, version) => {
                pins.insert(name.to_string(), version.to_string());
            }
            Line::Invalid => {
                return Err(PluginError::InvalidPinLine {
                    path: origin.to_string(),
                    line: index + 1,
                    content: raw.to_string(),
                })
            }
        }
    }
    Ok(pins)
}

/// Like [`parse`], but lines that are not `<name> <version>` are logged and
/// skipped.
pub fn parse_lenient(content: &str, origin: &str) -> ToolVersions {
    let mut pins = ToolVersions::new();
    for (index, raw) in content.lines().enumerate() {
        match classify(raw) {
            Line::Blank => {}
            Line::Pin(name, version) => {
                pins.insert(name.to_string(), version.to_string());
            }
            Line::Invalid => {
                tracing::warn!("Skipping invalid entry in {} at line {}: '{}'", origin, index + 1, raw);
            }
        }
    }
    pins
}

/// Read a pin file; a missing file is an empty set of pins.
pub fn read(path: &Path) -> Result<ToolVersions> {
    match fs::read_to_string(path) {
        Ok(content) => parse_named(&content, &path.display().to_string()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ToolVersions::new()),
        Err(e) => Err(e.into()),
    }
}

/// Read a pin file, skipping malformed lines.
pub fn read_lenient(path: &Path) -> Result<ToolVersions> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(parse_lenient(&content, &path.display().to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ToolVersions::new()),
        Err(e) => Err(e.into()),
    }
}

pub fn render(pins: &ToolVersions) -> String {
    pins.iter()
        .map(|(name, version)| format!("{name} {version}\n"))
        .collect()
}

/// Replace the file at `path` with `pins` in one rename.
pub fn write(path: &Path, pins: &ToolVersions) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::Builder::new()
        .prefix(".tool-versions-")
        .tempfile_in(parent)?;
    temp_file.write_all(render(pins).as_bytes())?;
    temp_file.as_file_mut().sync_all()?;
    temp_file.persist(path).map_err(|e| PluginError::Io(e.error))?;

    tracing::debug!("Wrote {} pins to {}", pins.len(), path.display());
    Ok(())
}

/// Pin `name` to `version`, returning the previous pin.
pub fn set(pins: &mut ToolVersions, name: &str, version: &str) -> Option<String> {
    pins.insert(name.to_string(), version.to_string())
}

pub fn remove(pins: &mut ToolVersions, name: &str) -> Option<String> {
    pins.remove(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let content = "# managed by toolsmith\n\nnodejs 20.1.0\ngolang 1.21.0 # current\n\n  python 3.11.4 3.10.0\nnodejs 18.17.1\n";
        let pins = parse(content).unwrap();
        assert_eq!(pins.len(), 3);
        assert_eq!(pins["nodejs"], "18.17.1");
        assert_eq!(pins["golang"], "1.21.0");
        assert_eq!(pins["python"], "3.11.4");
    }

    #[test]
    fn test_parse_rejects_name_without_version() {
        let err = parse("golang 1.21.0\nnodejs\n").unwrap_err();
        match err {
            PluginError::InvalidPinLine { line, content, .. } => {
                assert_eq!(line, 2);
                assert_eq!(content, "nodejs");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_lenient_skips_invalid_lines() {
        let pins = parse_lenient("golang 1.20.0\nnodejs\n# note\nzig 0.11.0\n", "pins");
        assert_eq!(pins.len(), 2);
        assert_eq!(pins["golang"], "1.20.0");
        assert_eq!(pins["zig"], "0.11.0");
    }

    #[test]
    fn test_round_trip_is_sorted_and_deduplicated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(TOOL_VERSIONS_FILE);
        fs::write(
            &path,
            "# comment\nzig 0.11.0\n\ngolang 1.20.0\ngolang 1.21.0\nawscli 2.13.0\n",
        )
        .unwrap();

        let pins = read(&path).unwrap();
        write(&path, &pins).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "awscli 2.13.0\ngolang 1.21.0\nzig 0.11.0\n"
        );
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        assert!(read(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_set_and_remove() {
        let mut pins = ToolVersions::new();
        assert_eq!(set(&mut pins, "golang", "1.20.0"), None);
        assert_eq!(set(&mut pins, "golang", "1.21.0").as_deref(), Some("1.20.0"));
        assert_eq!(render(&pins), "golang 1.21.0\n");
        assert_eq!(remove(&mut pins, "golang").as_deref(), Some("1.21.0"));
        assert_eq!(remove(&mut pins, "golang"), None);
        assert_eq!(render(&pins), "");
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/.tool-versions");
        let mut pins = ToolVersions::new();
        set(&mut pins, "ripgrep", "14.0.0");
        write(&path, &pins).unwrap();

        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec![".tool-versions"]);
    }
}
