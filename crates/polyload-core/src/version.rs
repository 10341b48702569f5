//! Version provenance of artifacts, callers and results

use std::path::{Path, PathBuf};

use crate::paths::{join_path, version_label};

/// Placeholder for any missing name, label or version
pub const UNKNOWN_VALUE: &str = "unknown";

/// Anything that can report which library version it came from
pub trait Versioned {
    fn name(&self) -> &str;

    fn label(&self) -> &str;

    fn version(&self) -> &str;

    /// `label/version`, or `unknown`
    fn path(&self) -> String;

    fn dir(&self) -> PathBuf;
}

/// Name, label and version of a library
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VersionInfo {
    name: String,
    label: String,
    version: String,
    dir: Option<PathBuf>,
}

impl VersionInfo {
    pub fn new(label: impl Into<String>, version: impl Into<String>) -> Self {
        VersionInfo {
            name: UNKNOWN_VALUE.to_string(),
            label: non_blank(label.into()),
            version: non_blank(version.into()),
            dir: None,
        }
    }

    pub fn unknown() -> Self {
        VersionInfo::new(UNKNOWN_VALUE, UNKNOWN_VALUE)
    }

    /// Derive label and version from a `.../<label>/<version>` directory
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let label = dir.parent().map(version_label).unwrap_or_default();
        VersionInfo::new(label, version_label(dir)).with_dir(dir)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_blank(name.into());
        self
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn is_unknown(&self) -> bool {
        self.label == UNKNOWN_VALUE && self.version == UNKNOWN_VALUE
    }

    /// Directory this version was derived from, if any
    pub fn source_dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

impl Default for VersionInfo {
    fn default() -> Self {
        VersionInfo::unknown()
    }
}

impl Versioned for VersionInfo {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn path(&self) -> String {
        if self.is_unknown() {
            return UNKNOWN_VALUE.to_string();
        }
        join_path(&self.label, &self.version)
    }

    fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

fn non_blank(value: String) -> String {
    if value.trim().is_empty() {
        UNKNOWN_VALUE.to_string()
    } else {
        value
    }
}
