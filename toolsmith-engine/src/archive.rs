//! Archive extraction with path-traversal and decompression-size guards.
//!
//! Every entry path is joined onto the destination and lexically cleaned;
//! anything that lands outside the destination is rejected with
//! [`Error::InvalidFilePath`]. File contents are streamed through a
//! [`BoundedWriter`] that enforces a per-file and a per-archive byte cap.
//!
//! Symlink *targets* are written verbatim and are not bounds-checked; only the
//! location of the link itself is. Already-written entries are not removed
//! when a later entry fails, so callers that need atomicity extract into a
//! scratch directory.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use flate2::read::GzDecoder;
use tar::EntryType;

use crate::error::{Error, Result, SizeLimit};

/// Largest decompressed size accepted for a single entry.
pub const MAX_FILE_SIZE: u64 = 512 * 1024 * 1024;

/// Largest cumulative decompressed size accepted for one archive.
pub const MAX_TOTAL_SIZE: u64 = 1024 * 1024 * 1024;

/// Longest symlink target read from a zip entry.
const MAX_LINK_TARGET: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    TarGz,
    TarXz,
    Zip,
    Gz,
}

impl ArchiveType {
    /// Guess the archive type from a filename suffix.
    pub fn detect(filename: &str) -> Option<Self> {
        let name = filename.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".gz") {
            Some(Self::Gz)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::TarXz => "tar.xz",
            Self::Zip => "zip",
            Self::Gz => "gz",
        }
    }
}

impl FromStr for ArchiveType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "tar.gz" | "tgz" => Ok(Self::TarGz),
            "tar.xz" | "txz" => Ok(Self::TarXz),
            "zip" => Ok(Self::Zip),
            "gz" => Ok(Self::Gz),
            _ => Err(Error::UnsupportedArchiveType {
                archive_type: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Raised through `io::Error` by [`BoundedWriter`] when a cap is reached.
#[derive(Debug, Clone, Copy)]
pub struct LimitExceeded {
    pub limit: SizeLimit,
    pub max: u64,
}

impl fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} size limit of {} bytes exceeded", self.limit, self.max)
    }
}

impl std::error::Error for LimitExceeded {}

/// Writer that accepts at most `file_limit` bytes, and at most
/// `total_limit` bytes summed over every writer sharing `total`.
///
/// A write that would cross a cap is shortened to the remaining allowance;
/// the next write then fails with a [`LimitExceeded`] error, so `write_all`
/// and `io::copy` observe the partial write followed by the error.
pub struct BoundedWriter<'a, W> {
    inner: W,
    written: u64,
    file_limit: u64,
    total: &'a mut u64,
    total_limit: u64,
}

impl<'a, W: Write> BoundedWriter<'a, W> {
    pub fn new(inner: W, file_limit: u64, total: &'a mut u64, total_limit: u64) -> Self {
        Self {
            inner,
            written: 0,
            file_limit,
            total,
            total_limit,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl<W: Write> Write for BoundedWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let file_room = self.file_limit.saturating_sub(self.written);
        let total_room = self.total_limit.saturating_sub(*self.total);
        let room = file_room.min(total_room);
        if room == 0 {
            let exceeded = if file_room == 0 {
                LimitExceeded {
                    limit: SizeLimit::PerFile,
                    max: self.file_limit,
                }
            } else {
                LimitExceeded {
                    limit: SizeLimit::Total,
                    max: self.total_limit,
                }
            };
            return Err(io::Error::other(exceeded));
        }

        let take = (buf.len() as u64).min(room) as usize;
        let n = self.inner.write(&buf[..take])?;
        self.written += n as u64;
        *self.total += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    per_file: u64,
    total: u64,
}

/// Archive extractor carrying the engine-wide size caps.
#[derive(Debug, Clone)]
pub struct Extractor {
    limits: Limits,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            limits: Limits {
                per_file: MAX_FILE_SIZE,
                total: MAX_TOTAL_SIZE,
            },
        }
    }
}

impl Extractor {
    #[cfg(test)]
    pub(crate) fn with_limits(per_file: u64, total: u64) -> Self {
        Self {
            limits: Limits { per_file, total },
        }
    }

    /// Extract by type. For [`ArchiveType::Gz`] `dest` is the output file,
    /// otherwise it is the destination directory.
    pub fn extract(&self, archive_type: ArchiveType, archive: &Path, dest: &Path) -> Result<()> {
        match archive_type {
            ArchiveType::TarGz => self.extract_tar_gz(archive, dest),
            ArchiveType::TarXz => self.extract_tar_xz(archive, dest),
            ArchiveType::Zip => self.extract_zip(archive, dest),
            ArchiveType::Gz => self.extract_gz(archive, dest),
        }
    }

    pub fn extract_tar_gz(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        let file = File::open(archive)?;
        self.unpack_tar(GzDecoder::new(file), archive, dest_dir)
    }

    pub fn extract_tar_xz(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        let file = File::open(archive)?;
        self.unpack_tar(xz2::read::XzDecoder::new(file), archive, dest_dir)
    }

    pub fn extract_zip(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        let file = File::open(archive)?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| corrupt(archive, e))?;

        fs::create_dir_all(dest_dir)?;
        let root = extraction_root(dest_dir)?;
        let mut total = 0u64;

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(|e| corrupt(archive, e))?;
            let name = PathBuf::from(entry.name());
            let target = contained_path(&root, &name)?;
            let mode = entry.unix_mode();

            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                set_mode(&target, mode)?;
            } else if entry.is_symlink() {
                let link = read_link_target(&mut entry, archive, &name)?;
                create_symlink(Path::new(&link), &target)?;
            } else {
                self.check_declared_size(&name, entry.size())?;
                self.write_entry(&mut entry, archive, &name, &target, &mut total)?;
                set_mode(&target, mode)?;
            }
        }

        tracing::debug!("Extracted {} zip entries from {}", zip.len(), archive.display());
        Ok(())
    }

    /// Decompress a single gzip stream straight into `dest_file`.
    pub fn extract_gz(&self, archive: &Path, dest_file: &Path) -> Result<()> {
        let file = File::open(archive)?;
        let mut decoder = GzDecoder::new(file);

        if let Some(parent) = dest_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut total = 0u64;
        self.write_entry(&mut decoder, archive, dest_file, dest_file, &mut total)
    }

    fn unpack_tar<R: Read>(&self, reader: R, archive: &Path, dest_dir: &Path) -> Result<()> {
        fs::create_dir_all(dest_dir)?;
        let root = extraction_root(dest_dir)?;
        let mut tarball = tar::Archive::new(reader);
        let mut total = 0u64;
        let mut count = 0usize;

        for entry in tarball.entries().map_err(|e| corrupt(archive, e))? {
            let mut entry = entry.map_err(|e| corrupt(archive, e))?;
            let name = entry.path().map_err(|e| corrupt(archive, e))?.into_owned();
            let target = contained_path(&root, &name)?;
            let entry_type = entry.header().entry_type();
            let mode = entry.header().mode().ok();

            match entry_type {
                EntryType::Directory => {
                    fs::create_dir_all(&target)?;
                    set_mode(&target, mode)?;
                }
                EntryType::Regular | EntryType::Continuous => {
                    self.check_declared_size(&name, entry.size())?;
                    self.write_entry(&mut entry, archive, &name, &target, &mut total)?;
                    set_mode(&target, mode)?;
                }
                EntryType::Symlink => {
                    let link = entry
                        .link_name()
                        .map_err(|e| corrupt(archive, e))?
                        .ok_or_else(|| Error::ArchiveExtraction {
                            file: archive.display().to_string(),
                            reason: format!("symlink {} has no target", name.display()),
                        })?
                        .into_owned();
                    create_symlink(&link, &target)?;
                }
                other => {
                    tracing::debug!("Skipping {:?} entry {}", other, name.display());
                    continue;
                }
            }
            count += 1;
        }

        tracing::debug!("Extracted {} tar entries from {}", count, archive.display());
        Ok(())
    }

    fn check_declared_size(&self, name: &Path, size: u64) -> Result<()> {
        if size > self.limits.per_file {
            return Err(Error::SizeLimitExceeded {
                path: name.display().to_string(),
                limit: SizeLimit::PerFile,
                max: self.limits.per_file,
            });
        }
        Ok(())
    }

    fn write_entry<R: Read>(
        &self,
        reader: &mut R,
        archive: &Path,
        name: &Path,
        target: &Path,
        total: &mut u64,
    ) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(target)?;
        let mut writer =
            BoundedWriter::new(&mut file, self.limits.per_file, total, self.limits.total);
        io::copy(reader, &mut writer).map_err(|e| self.copy_error(e, name, archive))?;
        writer.flush()?;
        Ok(())
    }

    fn copy_error(&self, err: io::Error, name: &Path, archive: &Path) -> Error {
        if let Some(exceeded) = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<LimitExceeded>())
        {
            return Error::SizeLimitExceeded {
                path: name.display().to_string(),
                limit: exceeded.limit,
                max: exceeded.max,
            };
        }
        match err.kind() {
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                corrupt(archive, err)
            }
            _ => Error::Io(err),
        }
    }
}

pub fn extract_tar_gz(archive: &Path, dest_dir: &Path) -> Result<()> {
    Extractor::default().extract_tar_gz(archive, dest_dir)
}

pub fn extract_tar_xz(archive: &Path, dest_dir: &Path) -> Result<()> {
    Extractor::default().extract_tar_xz(archive, dest_dir)
}

pub fn extract_zip(archive: &Path, dest_dir: &Path) -> Result<()> {
    Extractor::default().extract_zip(archive, dest_dir)
}

pub fn extract_gz(archive: &Path, dest_file: &Path) -> Result<()> {
    Extractor::default().extract_gz(archive, dest_file)
}

fn corrupt(archive: &Path, err: impl fmt::Display) -> Error {
    Error::ArchiveExtraction {
        file: archive.display().to_string(),
        reason: err.to_string(),
    }
}

fn read_link_target<R: Read>(entry: &mut R, archive: &Path, name: &Path) -> Result<String> {
    let mut link = String::new();
    entry
        .take(MAX_LINK_TARGET + 1)
        .read_to_string(&mut link)
        .map_err(|e| corrupt(archive, e))?;
    if link.len() as u64 > MAX_LINK_TARGET {
        return Err(Error::ArchiveExtraction {
            file: archive.display().to_string(),
            reason: format!(
                "symlink {} target is longer than {} bytes",
                name.display(),
                MAX_LINK_TARGET
            ),
        });
    }
    Ok(link)
}

/// Absolute, cleaned form of the destination directory.
fn extraction_root(dest_dir: &Path) -> Result<PathBuf> {
    Ok(lexical_clean(&std::path::absolute(dest_dir)?))
}

/// Resolve `.` and `..` components without touching the filesystem.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Join an archive entry name onto `root`, rejecting anything that escapes it.
/// Absolute entry names are re-rooted under `root`.
pub(crate) fn contained_path(root: &Path, entry_name: &Path) -> Result<PathBuf> {
    let mut joined = root.to_path_buf();
    for component in lexical_clean(entry_name).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {}
            other => joined.push(other.as_os_str()),
        }
    }

    let target = lexical_clean(&joined);
    let escapes = root.as_os_str().is_empty()
        || target
            .components()
            .any(|component| component == Component::ParentDir);
    if !escapes && target.starts_with(root) {
        Ok(target)
    } else {
        Err(Error::InvalidFilePath {
            path: entry_name.display().to_string(),
        })
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode {
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn create_symlink(link_target: &Path, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::symlink_metadata(path).is_ok() {
        fs::remove_file(path)?;
    }
    std::os::unix::fs::symlink(link_target, path)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_symlink(link_target: &Path, path: &Path) -> Result<()> {
    tracing::warn!(
        "Skipping symlink {} -> {}: not supported on this platform",
        path.display(),
        link_target.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::tempdir;

    const CONTENT: &[u8] = b"file content";

    fn append_sample<W: Write>(builder: &mut tar::Builder<W>) {
        let mut dir = tar::Header::new_gnu();
        dir.set_entry_type(EntryType::Directory);
        dir.set_mode(0o755);
        dir.set_size(0);
        builder.append_data(&mut dir, "test/", io::empty()).unwrap();

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(CONTENT.len() as u64);
        builder
            .append_data(&mut header, "test/file.txt", CONTENT)
            .unwrap();
    }

    fn append_raw_name<W: Write>(builder: &mut tar::Builder<W>, name: &str, data: &[u8]) {
        // append_data refuses `..`, so write the name bytes directly.
        let mut header = tar::Header::new_gnu();
        let gnu = header.as_gnu_mut().unwrap();
        gnu.name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_entry_type(EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(data.len() as u64);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }

    fn write_tar_gz(path: &Path, fill: impl FnOnce(&mut tar::Builder<GzEncoder<File>>)) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        fill(&mut builder);
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extract_tar_gz() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("sample.tar.gz");
        write_tar_gz(&archive, |b| append_sample(b));

        let dest = dir.path().join("out");
        extract_tar_gz(&archive, &dest).unwrap();
        assert_eq!(fs::read(dest.join("test/file.txt")).unwrap(), CONTENT);
    }

    #[test]
    fn test_extract_tar_xz() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("sample.tar.xz");
        let encoder = xz2::write::XzEncoder::new(File::create(&archive).unwrap(), 6);
        let mut builder = tar::Builder::new(encoder);
        append_sample(&mut builder);
        builder.into_inner().unwrap().finish().unwrap();

        let dest = dir.path().join("out");
        extract_tar_xz(&archive, &dest).unwrap();
        assert_eq!(fs::read(dest.join("test/file.txt")).unwrap(), CONTENT);
    }

    #[test]
    fn test_extract_zip() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("sample.zip");
        write_zip(&archive, &[("test/file.txt", CONTENT)]);

        let dest = dir.path().join("out");
        extract_zip(&archive, &dest).unwrap();
        assert_eq!(fs::read(dest.join("test/file.txt")).unwrap(), CONTENT);
    }

    #[test]
    fn test_extract_gz() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("file.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&archive).unwrap(), Compression::default());
        encoder.write_all(CONTENT).unwrap();
        encoder.finish().unwrap();

        let dest = dir.path().join("out/test/file.txt");
        extract_gz(&archive, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), CONTENT);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_target_is_kept_verbatim() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("links.tar.gz");
        write_tar_gz(&archive, |b| {
            append_sample(b);
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            b.append_link(&mut header, "test/link", "file.txt").unwrap();
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            b.append_link(&mut header, "test/shared", "../../shared/lib")
                .unwrap();
        });

        let dest = dir.path().join("out");
        extract_tar_gz(&archive, &dest).unwrap();
        assert_eq!(
            fs::read_link(dest.join("test/link")).unwrap(),
            PathBuf::from("file.txt")
        );
        assert_eq!(
            fs::read_link(dest.join("test/shared")).unwrap(),
            PathBuf::from("../../shared/lib")
        );
        assert_eq!(fs::read(dest.join("test/link")).unwrap(), CONTENT);
    }

    #[test]
    fn test_tar_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("evil.tar.gz");
        write_tar_gz(&archive, |b| {
            append_raw_name(b, "../../../etc/malicious.txt", b"owned")
        });

        let dest = dir.path().join("a/b/c");
        let err = extract_tar_gz(&archive, &dest).unwrap_err();
        assert!(matches!(err, Error::InvalidFilePath { .. }));
        assert!(err.to_string().contains("invalid file path"));
        assert!(!dir.path().join("etc/malicious.txt").exists());
    }

    #[test]
    fn test_zip_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        write_zip(&archive, &[("../../../etc/malicious.txt", b"owned")]);

        let dest = dir.path().join("a/b/c");
        let err = extract_zip(&archive, &dest).unwrap_err();
        assert!(matches!(err, Error::InvalidFilePath { .. }));
        assert!(!dir.path().join("etc/malicious.txt").exists());
    }

    #[test]
    fn test_contained_path() {
        let root = Path::new("/data/out");
        assert_eq!(
            contained_path(root, Path::new("bin/tool")).unwrap(),
            PathBuf::from("/data/out/bin/tool")
        );
        assert_eq!(
            contained_path(root, Path::new("./a/../b")).unwrap(),
            PathBuf::from("/data/out/b")
        );
        assert_eq!(
            contained_path(root, Path::new("/etc/passwd")).unwrap(),
            PathBuf::from("/data/out/etc/passwd")
        );
        assert_eq!(contained_path(root, Path::new(".")).unwrap(), root);
        assert!(contained_path(root, Path::new("a/../../escape")).is_err());
        assert!(contained_path(root, Path::new("../out2/file")).is_err());
    }

    #[test]
    fn test_relative_destination_is_still_bounded() {
        for dest in [".", "sub/..", "a/b/../../.."] {
            let root = extraction_root(Path::new(dest)).unwrap();
            assert!(root.is_absolute(), "{dest:?} gave {root:?}");
            assert!(contained_path(&root, Path::new("../x")).is_err());
            assert!(contained_path(&root, Path::new("a/../../x")).is_err());
            assert_eq!(
                contained_path(&root, Path::new("bin/tool")).unwrap(),
                root.join("bin/tool")
            );
        }
        assert!(contained_path(Path::new(""), Path::new("x")).is_err());
        assert!(contained_path(Path::new("../up"), Path::new("x")).is_err());
    }

    #[test]
    fn test_tar_rejects_traversal_into_current_dir() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("evil.tar.gz");
        write_tar_gz(&archive, |b| {
            append_raw_name(b, "../toolsmith_escape_check.txt", b"owned")
        });

        let err = extract_tar_gz(&archive, Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::InvalidFilePath { .. }));
        assert!(!Path::new("../toolsmith_escape_check.txt").exists());

        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let err = extract_tar_gz(&archive, &sub.join("..")).unwrap_err();
        assert!(matches!(err, Error::InvalidFilePath { .. }));
        assert!(!dir.path().parent().unwrap().join("toolsmith_escape_check.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_zip_symlink_target_is_kept_verbatim() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("links.zip");
        let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("test/file.txt", options).unwrap();
        zip.write_all(CONTENT).unwrap();
        zip.add_symlink("test/link", "file.txt", options).unwrap();
        zip.add_symlink("test/shared", "../../shared/lib", options)
            .unwrap();
        zip.finish().unwrap();

        let dest = dir.path().join("out");
        extract_zip(&archive, &dest).unwrap();
        assert_eq!(
            fs::read_link(dest.join("test/link")).unwrap(),
            PathBuf::from("file.txt")
        );
        assert_eq!(
            fs::read_link(dest.join("test/shared")).unwrap(),
            PathBuf::from("../../shared/lib")
        );
        assert_eq!(fs::read(dest.join("test/link")).unwrap(), CONTENT);
    }

    #[test]
    fn test_oversized_link_target_is_rejected() {
        let long = "a".repeat(MAX_LINK_TARGET as usize + 10);
        let err = read_link_target(&mut long.as_bytes(), Path::new("x.zip"), Path::new("l"))
            .unwrap_err();
        assert!(matches!(err, Error::ArchiveExtraction { .. }));

        let ok = read_link_target(&mut "../lib".as_bytes(), Path::new("x.zip"), Path::new("l"))
            .unwrap();
        assert_eq!(ok, "../lib");
    }

    #[test]
    fn test_bounded_writer_file_limit() {
        let mut out = Vec::new();
        let mut total = 0u64;
        let mut writer = BoundedWriter::new(&mut out, 10, &mut total, 100);
        assert_eq!(writer.write(&[7u8; 15]).unwrap(), 10);
        let err = writer.write(&[7u8; 1]).unwrap_err();
        assert!(err.get_ref().unwrap().is::<LimitExceeded>());
        drop(writer);
        assert_eq!(out.len(), 10);
        assert_eq!(total, 10);
    }

    #[test]
    fn test_bounded_writer_total_limit_is_shared() {
        let mut total = 0u64;
        let mut first = Vec::new();
        let mut second = Vec::new();
        {
            let mut writer = BoundedWriter::new(&mut first, 100, &mut total, 12);
            writer.write_all(&[1u8; 8]).unwrap();
        }
        {
            let mut writer = BoundedWriter::new(&mut second, 100, &mut total, 12);
            assert!(writer.write_all(&[1u8; 8]).is_err());
            assert_eq!(writer.written(), 4);
        }
        assert_eq!(second.len(), 4);
        assert_eq!(total, 12);
    }

    #[test]
    fn test_bounded_writer_exact_limit() {
        let mut out = Vec::new();
        let mut total = 0u64;
        let mut writer = BoundedWriter::new(&mut out, 16, &mut total, 16);
        writer.write_all(&[3u8; 16]).unwrap();
        assert_eq!(writer.written(), 16);
    }

    #[test]
    fn test_per_file_limit_rejects_before_writing() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("big.zip");
        write_zip(&archive, &[("test/file.txt", CONTENT)]);

        let dest = dir.path().join("out");
        let err = Extractor::with_limits(8, 100)
            .extract_zip(&archive, &dest)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::SizeLimitExceeded {
                limit: SizeLimit::PerFile,
                max: 8,
                ..
            }
        ));
        assert!(!dest.join("test/file.txt").exists());
    }

    #[test]
    fn test_total_limit_spans_entries() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("many.tar.gz");
        write_tar_gz(&archive, |b| {
            for name in ["one.txt", "two.txt"] {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(6);
                b.append_data(&mut header, name, &b"sixsix"[..]).unwrap();
            }
        });

        let dest = dir.path().join("out");
        let err = Extractor::with_limits(10, 10)
            .extract_tar_gz(&archive, &dest)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::SizeLimitExceeded {
                limit: SizeLimit::Total,
                ..
            }
        ));
        assert_eq!(fs::read(dest.join("one.txt")).unwrap(), b"sixsix");
    }

    #[test]
    fn test_gz_limit() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("tool.gz");
        let mut encoder = GzEncoder::new(File::create(&archive).unwrap(), Compression::default());
        encoder.write_all(&[0u8; 64]).unwrap();
        encoder.finish().unwrap();

        let err = Extractor::with_limits(32, 1024)
            .extract_gz(&archive, &dir.path().join("tool"))
            .unwrap_err();
        assert!(matches!(err, Error::SizeLimitExceeded { .. }));
    }

    #[test]
    fn test_corrupt_archive() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("broken.tar.gz");
        fs::write(&archive, b"this is not gzip data at all").unwrap();
        assert!(extract_tar_gz(&archive, &dir.path().join("out")).is_err());

        let archive = dir.path().join("broken.zip");
        fs::write(&archive, b"PK but not really").unwrap();
        assert!(matches!(
            extract_zip(&archive, &dir.path().join("out")),
            Err(Error::ArchiveExtraction { .. })
        ));
    }

    #[test]
    fn test_archive_type_parsing() {
        assert_eq!("tar.gz".parse::<ArchiveType>().unwrap(), ArchiveType::TarGz);
        assert_eq!("tgz".parse::<ArchiveType>().unwrap(), ArchiveType::TarGz);
        assert_eq!(".tar.xz".parse::<ArchiveType>().unwrap(), ArchiveType::TarXz);
        assert_eq!("ZIP".parse::<ArchiveType>().unwrap(), ArchiveType::Zip);
        assert_eq!("gz".parse::<ArchiveType>().unwrap(), ArchiveType::Gz);
        assert!(matches!(
            "tar.bz2".parse::<ArchiveType>(),
            Err(Error::UnsupportedArchiveType { .. })
        ));

        assert_eq!(ArchiveType::detect("tool-1.0.tar.gz"), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::detect("tool.tgz"), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::detect("tool.TAR.XZ"), Some(ArchiveType::TarXz));
        assert_eq!(ArchiveType::detect("tool.zip"), Some(ArchiveType::Zip));
        assert_eq!(ArchiveType::detect("tool.gz"), Some(ArchiveType::Gz));
        assert_eq!(ArchiveType::detect("tool"), None);
    }
}
