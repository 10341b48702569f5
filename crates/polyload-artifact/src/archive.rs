//! Archive extraction
//!
//! Archive-backed artifacts keep their binaries as entries of an
//! [`ArchiveSource`]. Matching entries are extracted into the artifact's
//! destination the first time the artifact is enumerated; later runs reuse
//! the files already on disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::artifact::Artifact;

/// Entries that can be listed and read by name
pub trait ArchiveSource: Send + Sync {
    /// Human-readable origin of the archive (file, binary, ...)
    fn origin(&self) -> String;

    /// Entry names, `/` separated
    fn entries(&self) -> Vec<String>;

    fn read(&self, entry: &str) -> io::Result<Vec<u8>>;
}

/// Archive compiled into the running binary
pub struct EmbeddedArchive {
    origin: String,
    entries: Vec<(&'static str, &'static [u8])>,
}

impl EmbeddedArchive {
    pub fn new(origin: impl Into<String>, entries: Vec<(&'static str, &'static [u8])>) -> Self {
        EmbeddedArchive {
            origin: origin.into(),
            entries,
        }
    }
}

impl ArchiveSource for EmbeddedArchive {
    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn entries(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| (*name).to_string()).collect()
    }

    fn read(&self, entry: &str) -> io::Result<Vec<u8>> {
        self.entries
            .iter()
            .find(|(name, _)| *name == entry)
            .map(|(_, bytes)| bytes.to_vec())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no entry {entry}")))
    }
}

/// Extract every entry the artifact keeps into its destination
///
/// Entries whose file already exists are reused. On any I/O failure the
/// destination is removed, a warning is logged and nothing is returned.
pub fn extract(source: &dyn ArchiveSource, artifact: &Artifact) -> Vec<PathBuf> {
    tracing::debug!(artifact = %artifact, origin = %source.origin(), "loading archive artifact");

    let mut destination: Option<PathBuf> = None;
    match extract_entries(source, artifact, &mut destination) {
        Ok(files) => files,
        Err(e) => {
            if let Some(dir) = destination {
                let _ = fs::remove_dir_all(&dir);
            }
            tracing::warn!(
                artifact = %artifact,
                origin = %source.origin(),
                error = %e,
                "failed to extract artifact, application may not function properly"
            );
            Vec::new()
        }
    }
}

fn extract_entries(
    source: &dyn ArchiveSource,
    artifact: &Artifact,
    destination: &mut Option<PathBuf>,
) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in source.entries() {
        if entry.ends_with('/') || !artifact.keep(&entry) {
            continue;
        }

        let dir = match destination.clone() {
            Some(dir) => dir,
            None => {
                let dir = artifact.destination(&entry);
                fs::create_dir_all(&dir)?;
                if artifact.is_temp() {
                    register_cleanup(&dir);
                }
                *destination = Some(dir.clone());
                dir
            }
        };

        let file_name = entry.rsplit('/').next().unwrap_or(&entry);
        let target = dir.join(file_name);
        if target.exists() {
            tracing::info!(file = %target.display(), "library already extracted");
        } else {
            let bytes = source.read(&entry)?;
            if artifact.is_temp() {
                register_cleanup(&target);
            }
            tracing::info!(file = %target.display(), "extracting library");
            fs::write(&target, bytes)?;
        }
        files.push(target);
    }

    Ok(files)
}

static CLEANUP: Mutex<Vec<PathBuf>> = parking_lot::const_mutex(Vec::new());

/// Schedule a path for removal by [`run_exit_cleanup`]
pub fn register_cleanup(path: &Path) {
    let mut pending = CLEANUP.lock();
    if !pending.iter().any(|p| p == path) {
        pending.push(path.to_path_buf());
    }
}

/// Paths scheduled for removal
pub fn pending_cleanup() -> Vec<PathBuf> {
    CLEANUP.lock().clone()
}

/// Remove every scheduled path, newest first; returns how many were removed
///
/// Best effort: paths that are already gone or cannot be removed are
/// skipped. Call this on orderly shutdown.
pub fn run_exit_cleanup() -> usize {
    let pending: Vec<PathBuf> = std::mem::take(&mut *CLEANUP.lock());
    let mut removed = 0;

    for path in pending.iter().rev() {
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "cleanup skipped"),
        }
    }

    removed
}
