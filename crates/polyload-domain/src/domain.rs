//! Isolated loading domains

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use polyload_core::{FailureKind, Library, PolyloadError, PolyloadResult, TypeDef, Versioned};

/// Name of the shared parent domain
pub const SYSTEM_DOMAIN: &str = "system";

/// The libraries one artifact resolved to
///
/// Type lookup is parent-first: the system domain (when attached) is asked
/// before the domain's own libraries, which are searched in enumeration
/// order.
pub struct Domain {
    name: String,
    locations: Vec<PathBuf>,
    libraries: Vec<Arc<Library>>,
    parent: Option<Arc<Domain>>,
    fallback_trail: Vec<String>,
}

impl Domain {
    pub fn new(
        name: impl Into<String>,
        locations: Vec<PathBuf>,
        libraries: Vec<Arc<Library>>,
        parent: Option<Arc<Domain>>,
    ) -> Self {
        Domain {
            name: name.into(),
            locations,
            libraries,
            parent,
            fallback_trail: Vec::new(),
        }
    }

    /// Parentless domain over process-wide libraries
    pub fn system(libraries: Vec<Arc<Library>>) -> Self {
        Domain::new(SYSTEM_DOMAIN, Vec::new(), libraries, None)
    }

    /// Record the artifacts fallen back to while building this domain
    pub fn with_fallback_trail(mut self, trail: Vec<String>) -> Self {
        self.fallback_trail = trail;
        self
    }

    /// Name of the artifact this domain was built for
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    pub fn libraries(&self) -> &[Arc<Library>] {
        &self.libraries
    }

    pub fn parent(&self) -> Option<&Arc<Domain>> {
        self.parent.as_ref()
    }

    /// Names of the fallback artifacts used, in order
    pub fn fallback_trail(&self) -> &[String] {
        &self.fallback_trail
    }

    /// No libraries of its own
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    pub fn find_type(&self, type_name: &str) -> Option<Arc<TypeDef>> {
        if let Some(ty) = self.parent.as_ref().and_then(|p| p.find_type(type_name)) {
            return Some(ty);
        }
        self.libraries.iter().find_map(|lib| lib.find_type(type_name))
    }

    /// Like [`find_type`](Self::find_type), failing with `TypeNotFound`
    pub fn load_type(&self, type_name: &str) -> PolyloadResult<Arc<TypeDef>> {
        self.find_type(type_name).ok_or_else(|| {
            PolyloadError::new(
                type_name,
                self.name.as_str(),
                FailureKind::TypeNotFound {
                    type_name: type_name.to_string(),
                    domain: self.name.clone(),
                },
            )
        })
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let libraries: Vec<String> = self.libraries.iter().map(|l| l.info().path()).collect();
        f.debug_struct("Domain")
            .field("name", &self.name)
            .field("libraries", &libraries)
            .field("parent", &self.parent.as_ref().map(|p| p.name().to_string()))
            .field("fallback_trail", &self.fallback_trail)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyload_core::{Value, VersionInfo};

    fn library(label: &str, version: &str, types: &[&str]) -> Arc<Library> {
        let mut builder = Library::builder(label, version);
        for name in types {
            builder = builder.with_type(
                TypeDef::class(*name).static_method("version", [], |inv| {
                    Ok(Value::from(inv.type_def().provenance().version().to_string()))
                }),
            );
        }
        builder.build()
    }

    #[test]
    fn test_parent_first_lookup() {
        let system = Arc::new(Domain::system(vec![library("shared", "9.0", &["shared::Clock"])]));
        let local = library("shared", "1.0", &["shared::Clock", "app::Greeter"]);
        let domain = Domain::new("app", Vec::new(), vec![local], Some(system));

        let clock = domain.find_type("shared::Clock").unwrap();
        assert_eq!(clock.provenance(), &VersionInfo::new("shared", "9.0"));
        assert!(domain.find_type("app::Greeter").is_some());
    }

    #[test]
    fn test_isolated_domain_sees_only_its_libraries() {
        let domain = Domain::new("app", Vec::new(), vec![library("shared", "1.0", &["shared::Clock"])], None);
        let clock = domain.load_type("shared::Clock").unwrap();
        assert_eq!(clock.provenance().version(), "1.0");

        let err = domain.load_type("other::Thing").unwrap_err();
        assert!(matches!(err.kind(), FailureKind::TypeNotFound { .. }));
        assert_eq!(err.label(), "app");
    }

    #[test]
    fn test_empty_domain() {
        let domain = Domain::new("nothing", Vec::new(), Vec::new(), None);
        assert!(domain.is_empty());
        assert!(domain.find_type("x::Y").is_none());
        assert!(domain.fallback_trail().is_empty());
    }
}
