use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Find the first regular file called `name` under `dir`.
///
/// The walk is sorted by file name so the match is deterministic.
pub fn find_file_named(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() && entry.file_name().to_str() == Some(name) {
            return Ok(Some(entry.into_path()));
        }
    }
    Ok(None)
}

/// Make a file executable (Unix only)
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(windows)]
pub fn make_executable(_path: &Path) -> Result<()> {
    // No-op on Windows
    Ok(())
}

/// Calculate SHA256 hash of a file as lowercase hex
pub fn calculate_sha256(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// True when `path` is a file larger than `min_len` bytes.
pub fn is_plausible_file(path: &Path, min_len: u64) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > min_len)
        .unwrap_or(false)
}
