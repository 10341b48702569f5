//! Versioned libraries
//!
//! A library is one version of a unit of loadable code: a named set of
//! [`TypeDef`]s that all report the library's [`VersionInfo`] as their
//! provenance. Two versions of the same library are two distinct values.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::typedef::{TypeBuilder, TypeDef};
use crate::version::{VersionInfo, Versioned};

/// A named, versioned set of types
pub struct Library {
    info: VersionInfo,
    types: BTreeMap<String, Arc<TypeDef>>,
}

impl Library {
    pub fn builder(label: impl Into<String>, version: impl Into<String>) -> LibraryBuilder {
        LibraryBuilder {
            info: VersionInfo::new(label, version),
            types: Vec::new(),
        }
    }

    pub fn info(&self) -> &VersionInfo {
        &self.info
    }

    pub fn find_type(&self, name: &str) -> Option<Arc<TypeDef>> {
        self.types.get(name).cloned()
    }

    pub fn defines(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Qualified names of every type, sorted
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("path", &self.info.path())
            .field("types", &self.types.len())
            .finish()
    }
}

/// Builder for a [`Library`]
pub struct LibraryBuilder {
    info: VersionInfo,
    types: Vec<TypeBuilder>,
}

impl LibraryBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.info = self.info.with_name(name);
        self
    }

    pub fn dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.info = self.info.with_dir(dir);
        self
    }

    pub fn with_type(mut self, ty: TypeBuilder) -> Self {
        self.types.push(ty);
        self
    }

    /// Build the library; every type is stamped with its provenance
    pub fn build(self) -> Arc<Library> {
        let info = self.info;
        let types = self
            .types
            .into_iter()
            .map(|builder| {
                let ty = builder.provenance(info.clone()).build();
                (ty.name().to_string(), ty)
            })
            .collect();
        Arc::new(Library { info, types })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_types_carry_library_provenance() {
        let lib = Library::builder("greeter", "2.0")
            .with_type(TypeDef::class("greeter::Greeter").method("hello", [], |_| {
                Ok(Value::from("hi"))
            }))
            .build();

        let ty = lib.find_type("greeter::Greeter").unwrap();
        assert_eq!(ty.provenance().version(), "2.0");
        assert_eq!(ty.provenance().label(), "greeter");
        assert!(lib.defines("greeter::Greeter"));
        assert!(!lib.defines("greeter::Missing"));
        assert_eq!(lib.type_names().collect::<Vec<_>>(), vec!["greeter::Greeter"]);
    }
}
