//! Zip archive unpacking.
//!
//! e-Fatura portals export invoices as a zip per batch, and frequently wrap
//! each individual invoice in a zip of its own. [`ArchiveExtractor`] unpacks
//! an archive into the run's scratch workspace and then unpacks archives
//! found inside it, up to a configurable depth.

mod workspace;

pub use workspace::ScratchWorkspace;

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::core::{FaturaError, Result};

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOC: u64 = 1 << 20;

/// Unpacks archives into per-archive directories under a workspace root.
#[derive(Debug)]
pub struct ArchiveExtractor {
    root: PathBuf,
    max_depth: usize,
    used_names: HashSet<String>,
}

impl ArchiveExtractor {
    /// Extract below `root`, unwrapping one level of nested archives.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_depth: 1,
            used_names: HashSet::new(),
        }
    }

    /// How many levels of archives-inside-archives to unpack. Zero leaves
    /// nested archives untouched.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unpack `archive_path` and return the directory it was unpacked into.
    ///
    /// Fails only when the archive itself cannot be read, in which case no
    /// directory is left behind. Broken nested archives are logged and
    /// skipped.
    pub fn extract(&mut self, archive_path: &Path) -> Result<PathBuf> {
        let mut archive = open_archive(archive_path)?;
        debug!(
            archive = %archive_path.display(),
            entries = ?archive.file_names().collect::<Vec<_>>(),
            "opened archive"
        );

        let dest = self.destination_for(archive_path);
        fs::create_dir_all(&dest)?;

        let written = match unpack(&mut archive, &dest) {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&dest) {
                    warn!(dir = %dest.display(), error = %cleanup, "could not remove partial extraction");
                }
                return Err(e);
            }
        };

        self.unpack_nested(&written, 1);
        Ok(dest)
    }

    /// A directory named after the archive's stem, suffixed when an earlier
    /// archive of this extractor already claimed that name.
    fn destination_for(&mut self, archive_path: &Path) -> PathBuf {
        let stem = archive_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "archive".to_string());

        let mut name = stem.clone();
        let mut n = 2;
        while !self.used_names.insert(name.clone()) {
            name = format!("{stem}_{n}");
            n += 1;
        }
        self.root.join(name)
    }

    fn unpack_nested(&self, files: &[PathBuf], level: usize) {
        if level > self.max_depth {
            return;
        }

        for nested in files.iter().filter(|p| is_zip_path(p)) {
            let Some(stem) = nested.file_stem() else {
                continue;
            };
            let target = nested.with_file_name(stem);
            debug!(archive = %nested.display(), "found nested archive");

            let mut archive = match open_archive(nested) {
                Ok(archive) => archive,
                Err(e) => {
                    warn!(archive = %nested.display(), error = %e, "skipping nested archive");
                    continue;
                }
            };
            let created = !target.exists();
            if let Err(e) = fs::create_dir_all(&target) {
                warn!(dir = %target.display(), error = %e, "skipping nested archive");
                continue;
            }
            match unpack(&mut archive, &target) {
                Ok(inner) => {
                    debug!(archive = %nested.display(), files = inner.len(), "nested archive unpacked");
                    self.unpack_nested(&inner, level + 1);
                }
                Err(e) => {
                    warn!(archive = %nested.display(), error = %e, "skipping nested archive");
                    if created {
                        let _ = fs::remove_dir_all(&target);
                    }
                }
            }
        }
    }
}

/// Whether `path` carries a `.zip` extension, in any case.
pub fn is_zip_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Read the first `.xml` entry of the archive at `path` into memory.
pub fn read_first_xml(path: &Path) -> Result<Vec<u8>> {
    let mut archive = open_archive(path)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_file() && entry.name().to_ascii_lowercase().ends_with(".xml") {
            let mut buf = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
            entry.read_to_end(&mut buf)?;
            return Ok(buf);
        }
    }
    Err(FaturaError::Archive(format!(
        "{}: no XML document inside",
        path.display()
    )))
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path)
        .map_err(|e| FaturaError::Archive(format!("{}: {e}", path.display())))?;
    ZipArchive::new(file).map_err(|e| FaturaError::Archive(format!("{}: {e}", path.display())))
}

/// Write every entry of `archive` below `dest` and return the files written.
fn unpack<R: Read + Seek>(archive: &mut ZipArchive<R>, dest: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping entry that escapes the extraction directory");
            continue;
        };
        let out = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&out)?;
        io::copy(&mut entry, &mut file)?;
        written.push(out);
    }
    Ok(written)
}
