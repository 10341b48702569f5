//! Type dispatch tables
//!
//! Rust has no runtime introspection, so every loadable type registers its
//! constructors, capabilities and enum constants up front. Lookup is by
//! capability name plus the exact, ordered parameter-type list.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::BoxError;
use crate::types::{signature_name, Primitive, TypeRef};
use crate::value::{Object, ObjectState, Value};
use crate::version::VersionInfo;

/// Body of a capability
pub type MethodFn = Arc<dyn Fn(&Invocation<'_>) -> Result<Value, BoxError> + Send + Sync>;

/// Body of a constructor
pub type ConstructorFn = Arc<dyn Fn(&Invocation<'_>) -> Result<ObjectState, BoxError> + Send + Sync>;

/// Value equality hook for objects of one type
pub type EqFn = Arc<dyn Fn(&Object, &Object) -> bool + Send + Sync>;

/// What a type is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
}

/// State of an enum constant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumConstant {
    pub name: String,
    pub ordinal: i64,
}

/// Arguments of one dispatched call
pub struct Invocation<'a> {
    ty: &'a Arc<TypeDef>,
    receiver: Option<&'a Value>,
    args: &'a [Value],
}

impl<'a> Invocation<'a> {
    pub fn new(ty: &'a Arc<TypeDef>, receiver: Option<&'a Value>, args: &'a [Value]) -> Self {
        Invocation { ty, receiver, args }
    }

    /// Type declaring the capability being run
    pub fn type_def(&self) -> &Arc<TypeDef> {
        self.ty
    }

    /// Bound instance, `None` for static dispatch
    pub fn receiver(&self) -> Option<&Value> {
        self.receiver
    }

    pub fn args(&self) -> &[Value] {
        self.args
    }

    pub fn arg(&self, index: usize) -> Result<&Value, BoxError> {
        self.args
            .get(index)
            .ok_or_else(|| format!("missing argument {index}").into())
    }

    pub fn i64_arg(&self, index: usize) -> Result<i64, BoxError> {
        self.arg(index)?
            .as_i64()
            .ok_or_else(|| format!("argument {index} is not numeric").into())
    }

    pub fn bool_arg(&self, index: usize) -> Result<bool, BoxError> {
        self.arg(index)?
            .as_bool()
            .ok_or_else(|| format!("argument {index} is not a boolean").into())
    }

    pub fn str_arg(&self, index: usize) -> Result<&str, BoxError> {
        self.arg(index)?
            .as_str()
            .ok_or_else(|| format!("argument {index} is not a string").into())
    }

    /// Downcast the receiver's object state
    pub fn state<T: Any>(&self) -> Result<&T, BoxError> {
        let receiver = self.receiver.ok_or("capability requires an instance")?;
        receiver
            .as_object()
            .and_then(|obj| obj.downcast::<T>())
            .ok_or_else(|| format!("receiver is not a {}", self.ty.name()).into())
    }

    /// New instance of the declaring type
    pub fn new_object<T: Any + Send + Sync>(&self, state: T) -> Value {
        Value::Object(Object::new(Arc::clone(self.ty), state))
    }
}

/// One named capability of a type
pub struct MethodDef {
    name: String,
    signature: Vec<TypeRef>,
    is_static: bool,
    body: Option<MethodFn>,
}

impl MethodDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &[TypeRef] {
        &self.signature
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Declared without a body (interface operation)
    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    pub fn full_name(&self) -> String {
        signature_name(&self.name, &self.signature)
    }

    pub fn invoke(&self, invocation: &Invocation<'_>) -> Result<Value, BoxError> {
        match &self.body {
            Some(body) => body(invocation),
            None => Err(format!("{} has no body", self.full_name()).into()),
        }
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.full_name())
            .field("static", &self.is_static)
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

/// One constructor of a type
pub struct ConstructorDef {
    signature: Vec<TypeRef>,
    body: ConstructorFn,
}

impl ConstructorDef {
    pub fn signature(&self) -> &[TypeRef] {
        &self.signature
    }

    pub fn construct(&self, invocation: &Invocation<'_>) -> Result<ObjectState, BoxError> {
        (self.body)(invocation)
    }
}

/// Dispatch table of a loadable type
pub struct TypeDef {
    name: String,
    kind: TypeKind,
    methods: Vec<Arc<MethodDef>>,
    constructors: Vec<ConstructorDef>,
    constants: Vec<EnumConstant>,
    constant_states: Vec<ObjectState>,
    provenance: VersionInfo,
    equality: Option<EqFn>,
    /// Interface this type was synthesized from
    implements: Option<Arc<TypeDef>>,
    /// Lookup counter, incremented on every method/constructor search
    lookups: AtomicUsize,
}

impl TypeDef {
    pub fn class(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name, TypeKind::Class)
    }

    pub fn interface(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name, TypeKind::Interface)
    }

    pub fn enumeration(name: impl Into<String>, constants: &[&str]) -> TypeBuilder {
        let mut builder = TypeBuilder::new(name, TypeKind::Enum);
        builder.constants = constants
            .iter()
            .enumerate()
            .map(|(i, c)| EnumConstant {
                name: (*c).to_string(),
                ordinal: i as i64,
            })
            .collect();
        builder
            .method("name", [], |inv| {
                Ok(Value::from(inv.state::<EnumConstant>()?.name.clone()))
            })
            .method("ordinal", [], |inv| {
                Ok(Value::from(inv.state::<EnumConstant>()?.ordinal))
            })
            .method("to_string", [], |inv| {
                Ok(Value::from(inv.state::<EnumConstant>()?.name.clone()))
            })
    }

    /// Fully qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last path segment of the qualified name
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    /// Library version that defines this type
    pub fn provenance(&self) -> &VersionInfo {
        &self.provenance
    }

    /// Exact lookup by name and ordered signature
    pub fn find_method(&self, name: &str, signature: &[TypeRef]) -> Option<Arc<MethodDef>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.methods
            .iter()
            .find(|m| m.name == name && m.signature == signature)
            .cloned()
    }

    /// Exact constructor lookup by ordered signature
    pub fn find_constructor(&self, signature: &[TypeRef]) -> Option<&ConstructorDef> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.constructors.iter().find(|c| c.signature == signature)
    }

    /// Interface this type was synthesized from, if any
    pub fn implements(&self) -> Option<&Arc<TypeDef>> {
        self.implements.as_ref()
    }

    /// Same type as `other`, or synthesized from it
    pub fn is_or_implements(&self, other: &Arc<TypeDef>) -> bool {
        std::ptr::eq(self, Arc::as_ptr(other))
            || self.implements.as_ref().is_some_and(|i| Arc::ptr_eq(i, other))
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &Arc<MethodDef>> {
        self.methods.iter()
    }

    /// Number of lookups performed so far
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Enum constants as objects of this type, in declaration order
    pub fn constants(self: &Arc<Self>) -> Vec<Object> {
        self.constant_states
            .iter()
            .map(|state| Object::from_state(Arc::clone(self), Arc::clone(state)))
            .collect()
    }

    pub(crate) fn values_equal(&self, a: &Object, b: &Object) -> bool {
        match &self.equality {
            Some(eq) => eq(a, b),
            None => false,
        }
    }

    /// Built-in dispatch table for non-object values
    pub fn intrinsic(value: &Value) -> Option<Arc<TypeDef>> {
        static STRING: OnceLock<Arc<TypeDef>> = OnceLock::new();
        static BOOL: OnceLock<Arc<TypeDef>> = OnceLock::new();
        static INT: OnceLock<Arc<TypeDef>> = OnceLock::new();
        static LONG: OnceLock<Arc<TypeDef>> = OnceLock::new();
        static DOUBLE: OnceLock<Arc<TypeDef>> = OnceLock::new();
        static PATH: OnceLock<Arc<TypeDef>> = OnceLock::new();
        static LIST: OnceLock<Arc<TypeDef>> = OnceLock::new();
        static MAP: OnceLock<Arc<TypeDef>> = OnceLock::new();

        let (cell, name, sized) = match value {
            Value::Null | Value::Object(_) => return None,
            Value::Str(_) => (&STRING, crate::types::STRING_TYPE, true),
            Value::Bool(_) => (&BOOL, Primitive::Bool.boxed_name(), false),
            Value::Int(_) => (&INT, Primitive::Int.boxed_name(), false),
            Value::Long(_) => (&LONG, Primitive::Long.boxed_name(), false),
            Value::Double(_) => (&DOUBLE, Primitive::Double.boxed_name(), false),
            Value::Path(_) => (&PATH, crate::types::PATH_TYPE, false),
            Value::List(_) => (&LIST, crate::types::LIST_TYPE, true),
            Value::Map(_) => (&MAP, crate::types::MAP_TYPE, true),
        };

        Some(Arc::clone(cell.get_or_init(|| intrinsic_type(name, sized))))
    }
}

fn intrinsic_type(name: &str, sized: bool) -> Arc<TypeDef> {
    let builder = TypeDef::class(name).method("to_string", [], |inv| {
        Ok(Value::from(
            inv.receiver().map(ToString::to_string).unwrap_or_default(),
        ))
    });
    if !sized {
        return builder.build();
    }
    builder
        .method("len", [], |inv| {
            let len = match inv.receiver() {
                Some(Value::Str(s)) => s.chars().count(),
                Some(Value::List(l)) => l.len(),
                Some(Value::Map(m)) => m.len(),
                _ => 0,
            };
            Ok(Value::Long(len as i64))
        })
        .build()
}

/// Last `::` or `.` separated segment of a qualified name
pub fn simple_name(name: &str) -> &str {
    let after_colons = name.rsplit("::").next().unwrap_or(name);
    after_colons.rsplit('.').next().unwrap_or(after_colons)
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("methods", &self.methods.len())
            .field("constructors", &self.constructors.len())
            .field("provenance", &self.provenance)
            .finish()
    }
}

/// Builder for a [`TypeDef`]
pub struct TypeBuilder {
    name: String,
    kind: TypeKind,
    methods: Vec<Arc<MethodDef>>,
    constructors: Vec<ConstructorDef>,
    constants: Vec<EnumConstant>,
    provenance: VersionInfo,
    equality: Option<EqFn>,
    implements: Option<Arc<TypeDef>>,
}

impl TypeBuilder {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        TypeBuilder {
            name: name.into(),
            kind,
            methods: Vec::new(),
            constructors: Vec::new(),
            constants: Vec::new(),
            provenance: VersionInfo::unknown(),
            equality: None,
            implements: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn push_method<F>(mut self, name: &str, signature: Vec<TypeRef>, is_static: bool, body: Option<F>) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.methods.push(Arc::new(MethodDef {
            name: name.to_string(),
            signature,
            is_static,
            body: body.map(|b| Arc::new(b) as MethodFn),
        }));
        self
    }

    /// Instance capability
    pub fn method<S, F>(self, name: &str, signature: S, body: F) -> Self
    where
        S: IntoIterator<Item = TypeRef>,
        F: Fn(&Invocation<'_>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.push_method(name, signature.into_iter().collect(), false, Some(body))
    }

    /// Capability dispatched without an instance
    pub fn static_method<S, F>(self, name: &str, signature: S, body: F) -> Self
    where
        S: IntoIterator<Item = TypeRef>,
        F: Fn(&Invocation<'_>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.push_method(name, signature.into_iter().collect(), true, Some(body))
    }

    /// Operation without a body, served by an invocation handler
    pub fn operation<S>(self, name: &str, signature: S) -> Self
    where
        S: IntoIterator<Item = TypeRef>,
    {
        type NoBody = fn(&Invocation<'_>) -> Result<Value, BoxError>;
        self.push_method::<NoBody>(name, signature.into_iter().collect(), false, None)
    }

    pub fn constructor<S, T, F>(mut self, signature: S, body: F) -> Self
    where
        S: IntoIterator<Item = TypeRef>,
        T: Any + Send + Sync,
        F: Fn(&Invocation<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.constructors.push(ConstructorDef {
            signature: signature.into_iter().collect(),
            body: Arc::new(move |inv: &Invocation<'_>| {
                body(inv).map(|state| Arc::new(state) as ObjectState)
            }),
        });
        self
    }

    /// Value equality between two distinct instances
    pub fn equality<F>(mut self, eq: F) -> Self
    where
        F: Fn(&Object, &Object) -> bool + Send + Sync + 'static,
    {
        self.equality = Some(Arc::new(eq));
        self
    }

    pub fn provenance(mut self, provenance: VersionInfo) -> Self {
        self.provenance = provenance;
        self
    }

    /// Mark the type as an implementation of `interface`
    pub fn implementing(mut self, interface: &Arc<TypeDef>) -> Self {
        self.implements = Some(Arc::clone(interface));
        self
    }

    pub fn build(self) -> Arc<TypeDef> {
        let constant_states = self
            .constants
            .iter()
            .map(|c| Arc::new(c.clone()) as ObjectState)
            .collect();
        Arc::new(TypeDef {
            name: self.name,
            kind: self.kind,
            methods: self.methods,
            constructors: self.constructors,
            constants: self.constants,
            constant_states,
            provenance: self.provenance,
            equality: self.equality,
            implements: self.implements,
            lookups: AtomicUsize::new(0),
        })
    }
}

impl TypeDef {
    /// Declared enum constants
    pub fn constant_names(&self) -> impl Iterator<Item = &str> {
        self.constants.iter().map(|c| c.name.as_str())
    }
}
