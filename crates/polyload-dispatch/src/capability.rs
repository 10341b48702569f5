//! Capability descriptors
//!
//! A descriptor names an operation and the parameter types it is looked up
//! with. Two descriptors are equal when their names and static flags match
//! and their parameter types are equal as sets of the same length; argument
//! values never take part in equality.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use polyload_core::{
    signature_name, signature_of, unbox_all, values_of, Arg, PolyloadError, PolyloadResult,
    TypeRef, Value,
};

/// Build a `Vec<Arg>` from heterogeneous values
///
/// ```
/// use polyload_dispatch::args;
/// let args = args![1i64, "two", true];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::from($arg)),+]
    };
}

/// Name and parameter types of a dynamic call
#[derive(Clone, Debug)]
pub struct Capability {
    name: String,
    signature: Vec<TypeRef>,
    args: Vec<Value>,
    is_static: bool,
    push_domain: bool,
}

impl Capability {
    /// Instance capability whose signature is inferred from `args`
    pub fn method(name: &str, args: impl IntoIterator<Item = Arg>) -> PolyloadResult<Self> {
        Capability::builder(name).args(args).build()
    }

    /// Static capability whose signature is inferred from `args`
    pub fn static_method(name: &str, args: impl IntoIterator<Item = Arg>) -> PolyloadResult<Self> {
        Capability::builder(name).args(args).static_call(true).build()
    }

    pub fn builder(name: &str) -> CapabilityBuilder {
        CapabilityBuilder {
            name: name.to_string(),
            args: Vec::new(),
            signature: None,
            is_static: false,
            push_domain: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &[TypeRef] {
        &self.signature
    }

    /// Snapshot of the argument values
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether calls make the target's domain ambient
    pub fn pushes_domain(&self) -> bool {
        self.push_domain
    }

    /// `name/T1/T2/...`
    pub fn full_name(&self) -> String {
        signature_name(&self.name, &self.signature)
    }

    /// Same name, signature and flags with new argument values
    pub fn with_args(&self, args: impl IntoIterator<Item = Arg>) -> Self {
        Capability {
            args: args.into_iter().map(Arg::into_value).collect(),
            ..self.clone()
        }
    }

    /// Signature with every boxed type replaced by its primitive
    pub fn unboxed_signature(&self) -> Vec<TypeRef> {
        unbox_all(&self.signature)
    }

    fn type_names(&self) -> BTreeSet<&str> {
        self.signature.iter().map(TypeRef::name).collect()
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.is_static == other.is_static
            && self.signature.len() == other.signature.len()
            && self.type_names() == other.type_names()
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.is_static.hash(state);
        self.signature.len().hash(state);
        for name in self.type_names() {
            name.hash(state);
        }
    }
}

/// Builder for a [`Capability`]
#[derive(Clone, Debug)]
pub struct CapabilityBuilder {
    name: String,
    args: Vec<Arg>,
    signature: Option<Vec<TypeRef>>,
    is_static: bool,
    push_domain: bool,
}

impl CapabilityBuilder {
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = Arg>) -> Self {
        self.args.extend(args);
        self
    }

    /// Pin the parameter types instead of inferring them from the arguments
    pub fn signature(mut self, signature: impl IntoIterator<Item = TypeRef>) -> Self {
        self.signature = Some(signature.into_iter().collect());
        self
    }

    pub fn static_call(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn push_domain(mut self, push: bool) -> Self {
        self.push_domain = push;
        self
    }

    pub fn build(self) -> PolyloadResult<Capability> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(PolyloadError::configuration(
                "capability",
                "",
                "capability name must not be blank",
            ));
        }

        let signature = match self.signature {
            Some(pinned) => {
                if !self.args.is_empty() && pinned.len() != self.args.len() {
                    return Err(PolyloadError::configuration(
                        signature_name(&name, &pinned),
                        "",
                        format!("{} arguments for {} parameters", self.args.len(), pinned.len()),
                    ));
                }
                pinned
            }
            None => signature_of(&self.args),
        };

        Ok(Capability {
            name,
            signature,
            args: values_of(&self.args),
            is_static: self.is_static,
            push_domain: self.push_domain,
        })
    }
}
