//! Scratch directories

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Temp directory laid out like an artifact root, removed on drop
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn new(prefix: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("polyload-{prefix}-"))
            .tempdir()?;
        Ok(ScratchDir { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `relative`, creating parent directories
    pub fn file(&self, relative: impl AsRef<Path>, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Placeholder binary `file_name` under `dir`
    pub fn binary(&self, dir: impl AsRef<Path>, file_name: &str) -> io::Result<PathBuf> {
        self.file(dir.as_ref().join(file_name), b"\0polyload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_dir_is_unique_and_removed() {
        let a = ScratchDir::new("scratch").unwrap();
        let b = ScratchDir::new("scratch").unwrap();
        assert_ne!(a.path(), b.path());

        let file = a.file("x/y.bin", b"1").unwrap();
        assert!(file.is_file());
        assert!(a.binary("libs", "g.plugin").unwrap().is_file());

        let root = a.path().to_path_buf();
        drop(a);
        assert!(!root.exists());
    }
}
