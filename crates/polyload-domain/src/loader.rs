//! Module loaders: binary location -> library

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use polyload_core::Library;

/// Opens libraries from binary locations
pub trait ModuleLoader: Send + Sync {
    /// Library behind a binary location, `None` if the location is not recognised
    fn open(&self, location: &Path) -> Option<Arc<Library>>;

    /// Location of the library that defines `type_name`
    fn locate(&self, type_name: &str) -> Option<PathBuf>;
}

/// Loader over libraries linked into the process, keyed by file name
///
/// A binary location selects the library registered under its file name;
/// the directory it was found in does not matter.
pub struct StaticModuleLoader {
    home: PathBuf,
    modules: RwLock<BTreeMap<String, Arc<Library>>>,
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::with_home("modules")
    }

    /// Loader whose `locate` answers with paths under `home`
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        StaticModuleLoader {
            home: home.into(),
            modules: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn register(&self, file_name: impl Into<String>, library: Arc<Library>) {
        let file_name = file_name.into();
        tracing::debug!(file = %file_name, library = ?library, "registering module");
        self.modules.write().insert(file_name, library);
    }

    pub fn with_module(self, file_name: impl Into<String>, library: Arc<Library>) -> Self {
        self.register(file_name, library);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }
}

impl Default for StaticModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn open(&self, location: &Path) -> Option<Arc<Library>> {
        let file_name = location.file_name()?.to_str()?;
        self.modules.read().get(file_name).cloned()
    }

    fn locate(&self, type_name: &str) -> Option<PathBuf> {
        self.modules
            .read()
            .iter()
            .find(|(_, library)| library.defines(type_name))
            .map(|(file_name, _)| self.home.join(file_name))
    }
}
