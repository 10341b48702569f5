//! Domain registry
//!
//! Maps artifact names to their domains. A domain is built lazily on first
//! request and at most once per name, even when several threads ask for it
//! at the same time: readers check the map under a read lock, and builders
//! serialize on a construction lock and re-check before building.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use polyload_artifact::{Artifact, BinaryEnumerator};
use polyload_core::Library;

use crate::domain::Domain;
use crate::loader::ModuleLoader;

/// Cache of one domain per artifact name
pub struct DomainRegistry {
    domains: RwLock<HashMap<String, Arc<Domain>>>,
    build_lock: Mutex<()>,
    loader: Arc<dyn ModuleLoader>,
    system: Arc<Domain>,
}

impl DomainRegistry {
    /// Registry with an empty system domain
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self::with_system_libraries(loader, Vec::new())
    }

    /// Registry whose system domain holds `libraries`
    pub fn with_system_libraries(loader: Arc<dyn ModuleLoader>, libraries: Vec<Arc<Library>>) -> Self {
        DomainRegistry {
            domains: RwLock::new(HashMap::new()),
            build_lock: Mutex::new(()),
            loader,
            system: Arc::new(Domain::system(libraries)),
        }
    }

    /// Domain for `artifact`, built on first request
    pub fn get(&self, artifact: &Artifact) -> Arc<Domain> {
        if let Some(domain) = self.domains.read().get(artifact.name()) {
            return Arc::clone(domain);
        }

        let _building = self.build_lock.lock();
        if let Some(domain) = self.domains.read().get(artifact.name()) {
            return Arc::clone(domain);
        }

        let domain = Arc::new(self.build(artifact));
        self.domains
            .write()
            .insert(artifact.name().to_string(), Arc::clone(&domain));
        domain
    }

    /// Whether a domain for `name` has been built
    pub fn contains(&self, name: &str) -> bool {
        !name.trim().is_empty() && self.domains.read().contains_key(name)
    }

    /// Drop every cached domain; domains already handed out stay usable
    pub fn reset_all(&self) {
        let _building = self.build_lock.lock();
        let dropped = {
            let mut domains = self.domains.write();
            let count = domains.len();
            domains.clear();
            count
        };
        tracing::debug!(dropped, "domain registry reset");
    }

    pub fn len(&self) -> usize {
        self.domains.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.read().is_empty()
    }

    pub fn system_domain(&self) -> &Arc<Domain> {
        &self.system
    }

    pub fn loader(&self) -> &Arc<dyn ModuleLoader> {
        &self.loader
    }

    fn build(&self, artifact: &Artifact) -> Domain {
        let mut trail = Vec::new();
        let mut current = artifact;
        let mut locations = current.enumerate_binaries();

        while locations.is_empty() {
            let Some(next) = current.fallback() else {
                break;
            };
            tracing::info!(artifact = %current, fallback = %next, "no binaries found, falling back");
            trail.push(next.name().to_string());
            current = next.as_ref();
            locations = current.enumerate_binaries();
        }

        for type_name in artifact.force_include() {
            match self.loader.locate(type_name) {
                Some(location) if !locations.contains(&location) => locations.push(location),
                Some(_) => {}
                None => tracing::warn!(
                    artifact = %artifact,
                    type_name = %type_name,
                    "no library defines force-included type"
                ),
            }
        }

        if locations.is_empty() {
            tracing::warn!(
                artifact = %artifact,
                "did not find any binaries, application may not function properly"
            );
        }

        let libraries = self.open_all(&locations);
        let parent = artifact
            .uses_system_domain()
            .then(|| Arc::clone(&self.system));

        tracing::debug!(
            artifact = %artifact,
            locations = locations.len(),
            libraries = libraries.len(),
            system = parent.is_some(),
            "domain built"
        );

        Domain::new(artifact.name(), locations, libraries, parent).with_fallback_trail(trail)
    }

    fn open_all(&self, locations: &[PathBuf]) -> Vec<Arc<Library>> {
        let mut libraries: Vec<Arc<Library>> = Vec::new();
        for location in locations {
            match self.loader.open(location) {
                Some(library) => {
                    if !libraries.iter().any(|l| Arc::ptr_eq(l, &library)) {
                        libraries.push(library);
                    }
                }
                None => tracing::warn!(location = %location.display(), "unrecognised binary location"),
            }
        }
        libraries
    }
}
