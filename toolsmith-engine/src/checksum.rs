//! Trust-on-first-use checksum ledger.
//!
//! The ledger is one text file with a two-line comment header followed by
//! `<name> <version> sha256:<hex>` records, sorted by name then version.
//! Reads take a shared advisory lock on the file and writes an exclusive one,
//! so concurrent installer processes never interleave a read and a write.
//! A download with no recorded hash passes verification and is recorded.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use sha2::{Digest, Sha256};

use crate::archive::ArchiveType;
use crate::error::{Error, Result};
use crate::utils::calculate_sha256;
use crate::version;

const HEADER: &str = "# toolsmith checksum ledger: <name> <version> sha256:<hex>\n\
                      # generated on download, do not edit by hand\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumRecord {
    pub name: String,
    pub version: String,
    pub hash: String,
}

/// Holds an advisory lock for as long as it lives.
struct LockGuard<'a> {
    file: &'a File,
}

impl<'a> LockGuard<'a> {
    fn shared(file: &'a File) -> io::Result<Self> {
        FileExt::lock_shared(file)?;
        Ok(Self { file })
    }

    fn exclusive(file: &'a File) -> io::Result<Self> {
        FileExt::lock_exclusive(file)?;
        Ok(Self { file })
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(self.file) {
            tracing::warn!("Failed to release checksum ledger lock: {}", e);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChecksumLedger {
    path: PathBuf,
}

impl ChecksumLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, sorted. A missing ledger file is an empty ledger.
    pub fn entries(&self) -> Result<Vec<ChecksumRecord>> {
        let records = self.read_shared()?;
        Ok(sorted(records))
    }

    pub fn lookup(&self, name: &str, version: &str) -> Result<Option<String>> {
        let mut records = self.read_shared()?;
        Ok(records.remove(&(name.to_string(), version.to_string())))
    }

    /// Hash `download_dir` and compare with any recorded hash.
    ///
    /// Returns the computed hash. No record means the check passes.
    pub fn verify(&self, name: &str, version: &str, download_dir: &Path) -> Result<String> {
        let actual = hash_download_dir(download_dir)?;

        match self.lookup(name, version)? {
            None => {
                tracing::debug!(
                    "No recorded checksum for {} {}, trusting first download",
                    name,
                    version
                );
                Ok(actual)
            }
            Some(expected) if expected == actual => {
                tracing::info!("Checksum verified for {} {}", name, version);
                Ok(actual)
            }
            Some(expected) => {
                tracing::error!(
                    "Checksum mismatch for {} {}: expected {}, got {}",
                    name,
                    version,
                    expected,
                    actual
                );
                Err(Error::ChecksumMismatch {
                    name: name.to_string(),
                    version: version.to_string(),
                    expected,
                    actual,
                })
            }
        }
    }

    /// Hash `download_dir` and upsert the record.
    pub fn record(&self, name: &str, version: &str, download_dir: &Path) -> Result<String> {
        let hash = hash_download_dir(download_dir)?;
        self.record_hash(name, version, &hash)?;
        Ok(hash)
    }

    /// Upsert a record and rewrite the ledger under an exclusive lock.
    pub fn record_hash(&self, name: &str, version: &str, hash: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        let _guard = LockGuard::exclusive(&file)?;

        let mut content = String::new();
        (&file).read_to_string(&mut content)?;
        let mut records = parse(&content);
        records.insert((name.to_string(), version.to_string()), hash.to_string());

        let rendered = render(&sorted(records));
        (&file).seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        (&file).write_all(rendered.as_bytes())?;
        file.sync_all()?;

        tracing::debug!("Recorded {} {} {} in {}", name, version, hash, self.path.display());
        Ok(())
    }

    fn read_shared(&self) -> Result<HashMap<(String, String), String>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        let _guard = LockGuard::shared(&file)?;

        let mut content = String::new();
        (&file).read_to_string(&mut content)?;
        Ok(parse(&content))
    }
}

/// Verify against the ledger, then record. Recording problems only warn.
pub fn verify_and_record(
    ledger: &ChecksumLedger,
    name: &str,
    version: &str,
    download_dir: &Path,
) -> Result<()> {
    let hash = ledger.verify(name, version, download_dir)?;
    if let Err(e) = ledger.record_hash(name, version, &hash) {
        tracing::warn!("Failed to record checksum for {} {}: {}", name, version, e);
    }
    Ok(())
}

fn parse(content: &str) -> HashMap<(String, String), String> {
    let mut records = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [name, version, hash] => {
                records.insert((name.to_string(), version.to_string()), hash.to_string());
            }
            _ => tracing::warn!("Ignoring malformed checksum ledger line: {}", line),
        }
    }
    records
}

fn sorted(records: HashMap<(String, String), String>) -> Vec<ChecksumRecord> {
    let mut list: Vec<ChecksumRecord> = records
        .into_iter()
        .map(|((name, version), hash)| ChecksumRecord {
            name,
            version,
            hash,
        })
        .collect();
    list.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| version::compare(&a.version, &b.version))
            .then_with(|| a.version.cmp(&b.version))
    });
    list
}

fn render(records: &[ChecksumRecord]) -> String {
    let mut out = String::from(HEADER);
    for record in records {
        out.push_str(&format!("{} {} {}\n", record.name, record.version, record.hash));
    }
    out
}

/// Content hash of a download directory as `sha256:<hex>`.
///
/// A directory holding exactly one recognised archive is hashed as that file.
/// Otherwise every regular file and symlink is folded into one digest in
/// sorted walk order, keyed by its relative path.
pub fn hash_download_dir(dir: &Path) -> Result<String> {
    let mut archives = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_file = entry.file_type()?.is_file();
        let name = entry.file_name();
        if is_file && name.to_str().and_then(ArchiveType::detect).is_some() {
            archives.push(entry.path());
        }
    }
    if let [archive] = archives.as_slice() {
        return Ok(format!("sha256:{}", calculate_sha256(archive)?));
    }

    let mut hasher = Sha256::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            hasher.update(b"L\0");
            hasher.update(relative.as_bytes());
            hasher.update(b"\0");
            hasher.update(target.to_string_lossy().as_bytes());
            hasher.update(b"\0");
        } else if file_type.is_file() {
            hasher.update(b"F\0");
            hasher.update(relative.as_bytes());
            hasher.update(b"\0");
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, &mut hasher)?;
            hasher.update(b"\0");
        }
    }
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}
