//! Type references used in capability signatures
//!
//! A signature is an ordered list of [`TypeRef`]s. Scalars exist in two
//! forms: the primitive form a capability usually declares, and the boxed
//! form inferred from runtime arguments. Lookup falls back from boxed to
//! primitive once (see [`unbox_all`]).

use std::fmt;

/// Well-known named types
pub const STRING_TYPE: &str = "String";
pub const PATH_TYPE: &str = "Path";
pub const LIST_TYPE: &str = "List";
pub const MAP_TYPE: &str = "Map";
pub const OBJECT_TYPE: &str = "Object";

/// Scalar kinds with a primitive and a boxed form
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Bool,
    Int,
    Long,
    Double,
}

impl Primitive {
    /// Name of the primitive form
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int => "i32",
            Primitive::Long => "i64",
            Primitive::Double => "f64",
        }
    }

    /// Name of the boxed form
    pub fn boxed_name(self) -> &'static str {
        match self {
            Primitive::Bool => "Boolean",
            Primitive::Int => "Integer",
            Primitive::Long => "Long",
            Primitive::Double => "Double",
        }
    }
}

/// A parameter or value type, identified by name
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(Primitive),
    Boxed(Primitive),
    Named(String),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn string() -> Self {
        TypeRef::named(STRING_TYPE)
    }

    pub fn path() -> Self {
        TypeRef::named(PATH_TYPE)
    }

    pub fn list() -> Self {
        TypeRef::named(LIST_TYPE)
    }

    pub fn map() -> Self {
        TypeRef::named(MAP_TYPE)
    }

    pub fn object() -> Self {
        TypeRef::named(OBJECT_TYPE)
    }

    /// Identity name used for signature comparison
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Primitive(p) => p.name(),
            TypeRef::Boxed(p) => p.boxed_name(),
            TypeRef::Named(name) => name,
        }
    }

    pub fn is_boxed(&self) -> bool {
        matches!(self, TypeRef::Boxed(_))
    }

    /// Primitive counterpart of a boxed type; other types are unchanged
    pub fn unboxed(&self) -> TypeRef {
        match self {
            TypeRef::Boxed(p) => TypeRef::Primitive(*p),
            other => other.clone(),
        }
    }

    /// Boxed counterpart of a primitive type; other types are unchanged
    pub fn boxed(&self) -> TypeRef {
        match self {
            TypeRef::Primitive(p) => TypeRef::Boxed(*p),
            other => other.clone(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Replace every boxed type in a signature by its primitive counterpart
pub fn unbox_all(signature: &[TypeRef]) -> Vec<TypeRef> {
    signature.iter().map(TypeRef::unboxed).collect()
}

/// Replace every primitive type in a signature by its boxed counterpart
pub fn box_all(signature: &[TypeRef]) -> Vec<TypeRef> {
    signature.iter().map(TypeRef::boxed).collect()
}

/// Signatures to retry after an exact lookup misses: all-primitive, then
/// all-boxed, skipping any equal to the original or to an earlier retry
pub fn coerced_signatures(signature: &[TypeRef]) -> Vec<Vec<TypeRef>> {
    let mut retries: Vec<Vec<TypeRef>> = Vec::with_capacity(2);
    for candidate in [unbox_all(signature), box_all(signature)] {
        if candidate.as_slice() != signature && !retries.contains(&candidate) {
            retries.push(candidate);
        }
    }
    retries
}

/// `name/T1/T2/...` rendering of a capability and its signature
pub fn signature_name(name: &str, signature: &[TypeRef]) -> String {
    let mut full = String::from(name);
    for ty in signature {
        full.push('/');
        full.push_str(ty.name());
    }
    full
}
