//! Artifact model
//!
//! An artifact is immutable once built. Its fallback is an owned handle to
//! an artifact built before it, so a fallback chain is always finite.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use polyload_core::{archive_path, PolyloadConfig, VersionInfo, Versioned, UNKNOWN_VALUE};

use crate::archive::{extract, ArchiveSource};
use crate::dir::{enumerate_dir, keep_predicate};

/// Source of binary locations
pub trait BinaryEnumerator: Send + Sync {
    /// Ordered binary locations; empty when nothing is available
    fn enumerate_binaries(&self) -> Vec<PathBuf>;
}

/// Decides whether a path or archive entry belongs to an artifact
pub type KeepPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// How an artifact finds its binaries
#[derive(Clone)]
pub enum ArtifactSource {
    /// Files under `<base_dir>/<root>/<name>`
    Dir,
    /// Entries extracted from an archive
    Archive(Arc<dyn ArchiveSource>),
    /// Delegated to a custom enumerator
    Custom(Arc<dyn BinaryEnumerator>),
    /// Never yields anything
    Unknown,
}

impl ArtifactSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ArtifactSource::Dir => "dir",
            ArtifactSource::Archive(_) => "archive",
            ArtifactSource::Custom(_) => "custom",
            ArtifactSource::Unknown => "unknown",
        }
    }
}

/// A named, versioned unit of loadable code
#[derive(Clone)]
pub struct Artifact {
    root: String,
    name: String,
    version: VersionInfo,
    extensions: BTreeSet<String>,
    predicate: KeepPredicate,
    destination: PathBuf,
    base_dir: PathBuf,
    fallback: Option<Arc<Artifact>>,
    uses_system_domain: bool,
    force_include: Vec<String>,
    temp: bool,
    source: ArtifactSource,
}

impl Artifact {
    /// Directory-backed artifact
    pub fn dir() -> ArtifactBuilder {
        ArtifactBuilder::new(ArtifactSource::Dir)
    }

    /// Archive-backed artifact
    pub fn archive(source: Arc<dyn ArchiveSource>) -> ArtifactBuilder {
        ArtifactBuilder::new(ArtifactSource::Archive(source))
    }

    /// Artifact delegating enumeration to `enumerator`
    pub fn custom(enumerator: Arc<dyn BinaryEnumerator>) -> ArtifactBuilder {
        ArtifactBuilder::new(ArtifactSource::Custom(enumerator))
    }

    /// Shared artifact that enumerates nothing
    pub fn unknown() -> Arc<Artifact> {
        static UNKNOWN: OnceLock<Arc<Artifact>> = OnceLock::new();
        Arc::clone(UNKNOWN.get_or_init(|| {
            ArtifactBuilder::new(ArtifactSource::Unknown)
                .root("/")
                .name(UNKNOWN_VALUE)
                .build()
        }))
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Artifact name; the identity of its domain
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version_info(&self) -> &VersionInfo {
        &self.version
    }

    /// Accepted binary extensions, lowercase without the dot
    pub fn extensions(&self) -> &BTreeSet<String> {
        &self.extensions
    }

    /// `<root>/<name>`, or just the root when the name is unknown
    pub fn location(&self) -> PathBuf {
        if self.name.trim().is_empty() || self.name.eq_ignore_ascii_case(UNKNOWN_VALUE) {
            PathBuf::from(&self.root)
        } else {
            Path::new(&self.root).join(&self.name)
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory that extracted binaries are written to
    pub fn destination(&self, _entry: &str) -> PathBuf {
        self.destination.clone()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn fallback(&self) -> Option<&Arc<Artifact>> {
        self.fallback.as_ref()
    }

    /// Whether the domain built for this artifact delegates to the system domain
    pub fn uses_system_domain(&self) -> bool {
        self.uses_system_domain
    }

    /// Type names whose defining libraries are always added to the domain
    pub fn force_include(&self) -> &[String] {
        &self.force_include
    }

    /// Whether extracted files are removed by the exit cleanup
    pub fn is_temp(&self) -> bool {
        self.temp
    }

    pub fn source(&self) -> &ArtifactSource {
        &self.source
    }

    /// Apply the keep predicate to a path or archive entry
    pub fn keep(&self, input: &str) -> bool {
        (self.predicate)(input)
    }
}

impl BinaryEnumerator for Artifact {
    fn enumerate_binaries(&self) -> Vec<PathBuf> {
        match &self.source {
            ArtifactSource::Dir => enumerate_dir(self),
            ArtifactSource::Archive(archive) => extract(archive.as_ref(), self),
            ArtifactSource::Custom(enumerator) => enumerator.enumerate_binaries(),
            ArtifactSource::Unknown => Vec::new(),
        }
    }
}

impl Versioned for Artifact {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        self.version.label()
    }

    fn version(&self) -> &str {
        self.version.version()
    }

    fn path(&self) -> String {
        self.version.path()
    }

    fn dir(&self) -> PathBuf {
        self.base_dir.join(self.location())
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("root", &self.root)
            .field("name", &self.name)
            .field("extensions", &self.extensions)
            .field("destination", &self.destination)
            .field("source", &self.source.kind())
            .field("fallback", &self.fallback.as_ref().map(|a| a.name().to_string()))
            .finish()
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.source.kind())
    }
}

/// Builder for an [`Artifact`]
pub struct ArtifactBuilder {
    source: ArtifactSource,
    root: Option<String>,
    name: Option<String>,
    version: VersionInfo,
    extensions: Option<BTreeSet<String>>,
    predicate: Option<KeepPredicate>,
    destination: Option<PathBuf>,
    config: PolyloadConfig,
    fallback: Option<Arc<Artifact>>,
    uses_system_domain: bool,
    force_include: Vec<String>,
    temp: bool,
}

impl ArtifactBuilder {
    fn new(source: ArtifactSource) -> Self {
        ArtifactBuilder {
            source,
            root: None,
            name: None,
            version: VersionInfo::unknown(),
            extensions: None,
            predicate: None,
            destination: None,
            config: PolyloadConfig::default(),
            fallback: None,
            uses_system_domain: true,
            force_include: Vec::new(),
            temp: true,
        }
    }

    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn version_info(mut self, version: VersionInfo) -> Self {
        self.version = version;
        self
    }

    /// Version derived from a `<root>/<label>/<version>` directory
    pub fn version_dir(self, dir: impl AsRef<Path>) -> Self {
        self.version_info(VersionInfo::from_dir(dir))
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = Some(extensions.into_iter().map(|e| normalize_ext(e.as_ref())).collect());
        self
    }

    /// Replace the default keep predicate
    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn config(mut self, config: PolyloadConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = base_dir.into();
        self
    }

    pub fn fallback(mut self, fallback: Arc<Artifact>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn uses_system_domain(mut self, uses: bool) -> Self {
        self.uses_system_domain = uses;
        self
    }

    pub fn force_include(mut self, type_name: impl Into<String>) -> Self {
        self.force_include.push(type_name.into());
        self
    }

    pub fn temp(mut self, temp: bool) -> Self {
        self.temp = temp;
        self
    }

    pub fn build(self) -> Arc<Artifact> {
        let explicit_name = self.name.filter(|n| !n.trim().is_empty());
        let name_defaulted = explicit_name.is_none();
        let name = explicit_name.unwrap_or_else(|| self.version.path());

        let root = self
            .root
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| default_root(&self.version, name_defaulted));

        let extensions = self
            .extensions
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| BTreeSet::from([normalize_ext(&self.config.default_extension)]));

        let predicate = self
            .predicate
            .unwrap_or_else(|| keep_predicate(&root, &name, &extensions));

        let destination = self
            .destination
            .unwrap_or_else(|| self.config.temp_root.join(archive_path(&self.version)));

        Arc::new(Artifact {
            root,
            name,
            version: self.version,
            extensions,
            predicate,
            destination,
            base_dir: self.config.base_dir,
            fallback: self.fallback,
            uses_system_domain: self.uses_system_domain,
            force_include: self.force_include,
            temp: self.temp,
            source: self.source,
        })
    }
}

/// Root implied by a version directory: its grandparent when the name is
/// the `label/version` path, the directory itself otherwise
fn default_root(version: &VersionInfo, name_defaulted: bool) -> String {
    let Some(dir) = version.source_dir() else {
        return String::new();
    };
    let root = if name_defaulted {
        dir.parent().and_then(Path::parent).unwrap_or(dir)
    } else {
        dir
    };
    root.to_string_lossy().into_owned()
}

fn normalize_ext(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}
