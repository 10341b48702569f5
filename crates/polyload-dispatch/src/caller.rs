//! Callers and the invocation engine
//!
//! A [`Caller`] binds an instance (or, for static callers, just a type) to
//! the artifact and domain it was loaded from. Every named call resolves a
//! [`Capability`] against the caller's type:
//!
//! 1. the caller's private cache
//! 2. an exact lookup on name and ordered signature
//! 3. a second lookup with boxed scalars replaced by primitives
//!
//! The resolved capability is then dispatched, optionally with the domain
//! made ambient, and the outcome is wrapped in a [`CallResult`].

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use polyload_artifact::Artifact;
use polyload_core::{
    coerced_signatures, signature_name, Arg, FailureKind, Invocation, MethodDef, PolyloadError,
    PolyloadResult, TypeDef, TypeRef, Value, VersionInfo, Versioned,
};
use polyload_domain::{push_domain, Domain};

use crate::capability::Capability;
use crate::result::CallResult;

static NULL: Value = Value::Null;

/// What a caller dispatches on
#[derive(Clone, Debug)]
enum Target {
    /// A bound value; `Value::Null` for a null caller
    Bound(Value),
    /// No instance; only static capabilities
    Static,
}

struct CallerInner {
    target: Target,
    ty: Option<Arc<TypeDef>>,
    artifact: Arc<Artifact>,
    domain: Option<Arc<Domain>>,
    data: HashMap<String, CallResult>,
    cache: Mutex<HashMap<Capability, Arc<MethodDef>>>,
}

/// A bound instance or type that capabilities are invoked on
///
/// Cloning is cheap and clones share the resolution cache.
#[derive(Clone)]
pub struct Caller {
    inner: Arc<CallerInner>,
}

impl Caller {
    fn new(
        target: Target,
        ty: Option<Arc<TypeDef>>,
        artifact: Arc<Artifact>,
        domain: Option<Arc<Domain>>,
        data: HashMap<String, CallResult>,
    ) -> Self {
        Caller {
            inner: Arc::new(CallerInner {
                target,
                ty,
                artifact,
                domain,
                data,
                cache: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Caller bound to `value`
    ///
    /// Objects dispatch on their own type, other values on the built-in
    /// table for their kind, and `Value::Null` gives a null caller.
    pub fn wrap(value: Value, artifact: Arc<Artifact>, domain: Option<Arc<Domain>>) -> Self {
        let ty = match &value {
            Value::Object(obj) => Some(Arc::clone(obj.type_def())),
            other => TypeDef::intrinsic(other),
        };
        Caller::new(Target::Bound(value), ty, artifact, domain, HashMap::new())
    }

    /// Caller dispatching static capabilities of `ty`
    pub fn for_type(ty: Arc<TypeDef>, artifact: Arc<Artifact>, domain: Option<Arc<Domain>>) -> Self {
        Caller::new(Target::Static, Some(ty), artifact, domain, HashMap::new())
    }

    /// Caller with nothing bound
    pub fn null(artifact: Arc<Artifact>) -> Self {
        Caller::new(Target::Bound(Value::Null), None, artifact, None, HashMap::new())
    }

    /// First handler argument as a caller; a static caller without a type
    /// when there are no arguments
    pub fn take_first(args: &[Value], artifact: Arc<Artifact>) -> Self {
        match args.first() {
            Some(first) => Caller::wrap(first.clone(), artifact, None),
            None => Caller::new(Target::Static, None, artifact, None, HashMap::new()),
        }
    }

    /// Same binding with a named-data side table
    pub(crate) fn with_data(self, data: HashMap<String, CallResult>) -> Self {
        if data.is_empty() {
            return self;
        }
        let inner = &self.inner;
        Caller::new(
            inner.target.clone(),
            inner.ty.clone(),
            Arc::clone(&inner.artifact),
            inner.domain.clone(),
            data,
        )
    }

    /// Bound value, `Value::Null` for null and static callers
    pub fn see(&self) -> &Value {
        match &self.inner.target {
            Target::Bound(value) => value,
            Target::Static => &NULL,
        }
    }

    pub fn is_null(&self) -> bool {
        self.see().is_null()
    }

    pub fn is_static(&self) -> bool {
        matches!(self.inner.target, Target::Static)
    }

    /// Type capabilities are resolved against
    pub fn type_def(&self) -> Option<&Arc<TypeDef>> {
        self.inner.ty.as_ref()
    }

    pub fn artifact(&self) -> &Arc<Artifact> {
        &self.inner.artifact
    }

    pub fn domain(&self) -> Option<&Arc<Domain>> {
        self.inner.domain.as_ref()
    }

    /// Display label used in failures: the simple type name, or `null`
    pub fn label(&self) -> String {
        match &self.inner.ty {
            Some(ty) => ty.simple_name().to_string(),
            None => "null".to_string(),
        }
    }

    /// Library version the bound type comes from, or the artifact's
    pub fn provenance(&self) -> VersionInfo {
        match &self.inner.ty {
            Some(ty) if !ty.provenance().is_unknown() => ty.provenance().clone(),
            _ => self.inner.artifact.version_info().clone(),
        }
    }

    /// Pre-bound named data, a null result when absent
    pub fn data(&self, name: &str) -> CallResult {
        self.inner
            .data
            .get(name)
            .cloned()
            .unwrap_or_else(CallResult::null)
    }

    /// Whether the bound value is of the named type
    ///
    /// Simple names compare case-insensitively with the type's simple name.
    /// Qualified names are loaded from the caller's domain and compared by
    /// identity.
    pub fn is_instance_of(&self, name: &str) -> bool {
        let Some(ty) = &self.inner.ty else {
            return false;
        };
        if !name.contains("::") && !name.contains('.') {
            return ty.simple_name().eq_ignore_ascii_case(name);
        }
        self.inner
            .domain
            .as_ref()
            .and_then(|domain| domain.find_type(name))
            .map(|named| ty.is_or_implements(&named))
            .unwrap_or(false)
    }

    /// Number of resolved capabilities cached by this caller
    pub fn cached_capabilities(&self) -> usize {
        self.inner.cache.lock().len()
    }

    /// Call a capability without arguments
    pub fn call(&self, name: &str) -> PolyloadResult<CallResult> {
        self.call_with(name, Vec::new())
    }

    /// Call an instance capability, inferring its signature from `args`
    pub fn call_with(&self, name: &str, args: Vec<Arg>) -> PolyloadResult<CallResult> {
        let capability = Capability::method(name, args).map_err(|e| self.relabel(e))?;
        self.call_descriptor(&capability)
    }

    /// Call a static capability, inferring its signature from `args`
    pub fn call_static(&self, name: &str, args: Vec<Arg>) -> PolyloadResult<CallResult> {
        let capability = Capability::static_method(name, args).map_err(|e| self.relabel(e))?;
        self.call_descriptor(&capability)
    }

    /// Re-issue `capability` with new argument values
    pub fn call_as(&self, capability: &Capability, args: Vec<Arg>) -> PolyloadResult<CallResult> {
        self.call_descriptor(&capability.with_args(args))
    }

    pub fn call_descriptor(&self, capability: &Capability) -> PolyloadResult<CallResult> {
        let value = self.invoke(capability)?;
        Ok(CallResult::new(Some(capability.clone()), Some(self.clone()), value))
    }

    fn invoke(&self, capability: &Capability) -> PolyloadResult<Value> {
        let ty = self.inner.ty.as_ref().ok_or_else(|| {
            self.failure(capability, FailureKind::NoInstance(capability.full_name()))
        })?;
        let method = self.resolve(ty, capability)?;

        let _ambient = match (&self.inner.domain, capability.pushes_domain()) {
            (Some(domain), true) => Some(push_domain(Arc::clone(domain))),
            _ => None,
        };

        let receiver = match &self.inner.target {
            _ if capability.is_static() => None,
            Target::Bound(value) if !value.is_null() => Some(value),
            _ if method.is_static() => None,
            _ => {
                return Err(self.failure(capability, FailureKind::NoInstance(capability.full_name())));
            }
        };

        let invocation = Invocation::new(ty, receiver, capability.args());
        method
            .invoke(&invocation)
            .map_err(|e| self.failure(capability, FailureKind::Invocation(e)))
    }

    fn resolve(&self, ty: &TypeDef, capability: &Capability) -> PolyloadResult<Arc<MethodDef>> {
        if let Some(method) = self.inner.cache.lock().get(capability) {
            return Ok(Arc::clone(method));
        }

        let found = ty
            .find_method(capability.name(), capability.signature())
            .or_else(|| {
                coerced_signatures(capability.signature())
                    .into_iter()
                    .find_map(|signature| {
                        tracing::debug!(
                            capability = %capability.full_name(),
                            target = %ty.name(),
                            retry = %signature_name(capability.name(), &signature),
                            "exact lookup missed, retrying with coerced types"
                        );
                        ty.find_method(capability.name(), &signature)
                    })
            });

        match found {
            Some(method) => {
                self.inner
                    .cache
                    .lock()
                    .insert(capability.clone(), Arc::clone(&method));
                Ok(method)
            }
            None => Err(self.failure(
                capability,
                FailureKind::CapabilityNotFound(format!("{} on {}", capability.full_name(), ty.name())),
            )),
        }
    }

    fn failure(&self, capability: &Capability, kind: FailureKind) -> PolyloadError {
        PolyloadError::new(capability.full_name(), self.label(), kind)
    }

    fn relabel(&self, err: PolyloadError) -> PolyloadError {
        let origin = err.origin().to_string();
        PolyloadError::new(origin, self.label(), err.into_kind())
    }
}

impl Versioned for Caller {
    fn name(&self) -> &str {
        self.inner.artifact.name()
    }

    fn label(&self) -> &str {
        self.inner
            .ty
            .as_ref()
            .map(|ty| ty.provenance().label())
            .filter(|label| !label.eq_ignore_ascii_case(polyload_core::UNKNOWN_VALUE))
            .unwrap_or_else(|| self.inner.artifact.version_info().label())
    }

    fn version(&self) -> &str {
        self.inner
            .ty
            .as_ref()
            .map(|ty| ty.provenance().version())
            .filter(|version| !version.eq_ignore_ascii_case(polyload_core::UNKNOWN_VALUE))
            .unwrap_or_else(|| self.inner.artifact.version_info().version())
    }

    fn path(&self) -> String {
        self.provenance().path()
    }

    fn dir(&self) -> PathBuf {
        Versioned::dir(self.inner.artifact.as_ref())
    }
}

impl From<&Caller> for Arg {
    /// The bound value, declared with the caller's resolved type
    fn from(caller: &Caller) -> Self {
        let value = caller.see().clone();
        match (&value, caller.type_def()) {
            (Value::Object(_), Some(ty)) | (Value::Null, Some(ty)) => {
                Arg::new(value, TypeRef::named(ty.name()))
            }
            _ => Arg::of(value),
        }
    }
}

impl From<Caller> for Arg {
    fn from(caller: Caller) -> Self {
        Arg::from(&caller)
    }
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caller")
            .field("target", &self.inner.target)
            .field("type", &self.inner.ty.as_ref().map(|t| t.name().to_string()))
            .field("artifact", &self.inner.artifact.name())
            .field("domain", &self.inner.domain.as_ref().map(|d| d.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use polyload_core::{BoxError, Primitive};
    use polyload_domain::ambient_domain;

    struct Account {
        balance: i64,
    }

    fn account_type() -> Arc<TypeDef> {
        TypeDef::class("bank::Account")
            .method("balance", [], |inv| Ok(Value::from(inv.state::<Account>()?.balance)))
            .method(
                "deposit",
                [TypeRef::Primitive(Primitive::Long)],
                |inv| Ok(Value::from(inv.state::<Account>()?.balance + inv.i64_arg(0)?)),
            )
            .method("label", [TypeRef::string(), TypeRef::Boxed(Primitive::Long)], |inv| {
                Ok(Value::from(format!("{}-{}", inv.str_arg(0)?, inv.i64_arg(1)?)))
            })
            .method("twice", [TypeRef::Boxed(Primitive::Long)], |inv| Ok(Value::from(inv.i64_arg(0)? * 2)))
            .method("fail", [], |_| Err(BoxError::from("account locked")))
            .method("ambient", [], |_| {
                Ok(Value::from(ambient_domain().map(|d| d.name().to_string())))
            })
            .static_method("bank_code", [], |_| Ok(Value::from("PL01")))
            .build()
    }

    fn domain() -> Arc<Domain> {
        Arc::new(Domain::new("bank", Vec::new(), Vec::new(), None))
    }

    fn account(balance: i64) -> Caller {
        let ty = account_type();
        let obj = polyload_core::Object::new(ty, Account { balance });
        Caller::wrap(Value::Object(obj), Artifact::unknown(), Some(domain()))
    }

    #[test]
    fn test_boxed_arguments_coerce_to_primitive() {
        let caller = account(10);
        let result = caller.call_with("deposit", args![5i64]).unwrap();
        assert_eq!(result.as_long(), 15);
        assert_eq!(caller.cached_capabilities(), 1);
    }

    #[test]
    fn test_primitive_signature_coerces_to_boxed() {
        let caller = account(0);
        let ty = Arc::clone(caller.type_def().unwrap());
        let pinned = Capability::builder("twice")
            .arg(3i64)
            .signature([TypeRef::Primitive(Primitive::Long)])
            .build()
            .unwrap();

        let before = ty.lookup_count();
        assert_eq!(caller.call_descriptor(&pinned).unwrap().as_long(), 6);
        assert_eq!(ty.lookup_count() - before, 2);

        let before = ty.lookup_count();
        assert_eq!(caller.call_as(&pinned, args![21i64]).unwrap().as_long(), 42);
        assert_eq!(ty.lookup_count(), before);
        assert_eq!(caller.cached_capabilities(), 1);
    }

    #[test]
    fn test_second_call_served_from_cache() {
        let caller = account(10);
        let ty = Arc::clone(caller.type_def().unwrap());

        caller.call_with("deposit", args![1i64]).unwrap();
        let after_first = ty.lookup_count();
        caller.call_with("deposit", args![2i64]).unwrap();
        assert_eq!(ty.lookup_count(), after_first);
    }

    #[test]
    fn test_exact_match_needs_no_coercion() {
        let caller = account(0);
        let result = caller.call_with("label", args!["acct", 7i64]).unwrap();
        assert_eq!(result.as_string(), "acct-7");
    }

    #[test]
    fn test_missing_capability_names_descriptor_and_label() {
        let caller = account(0);
        let err = caller.call_with("withdraw", args![1i64]).unwrap_err();
        assert!(matches!(err.kind(), FailureKind::CapabilityNotFound(_)));
        assert_eq!(err.origin(), "withdraw/Long");
        assert_eq!(err.label(), "Account");
        assert!(err.to_string().contains("with label Account"));
    }

    #[test]
    fn test_body_failure_is_invocation_error() {
        let err = account(0).call("fail").unwrap_err();
        assert!(matches!(err.kind(), FailureKind::Invocation(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_push_domain_is_scoped_to_the_call() {
        let caller = account(0);
        let plain = caller.call("ambient").unwrap();
        assert!(plain.is_null());

        let pushing = Capability::builder("ambient").push_domain(true).build().unwrap();
        let inside = caller.call_descriptor(&pushing).unwrap();
        assert_eq!(inside.as_string(), "bank");
        assert!(ambient_domain().is_none());
    }

    #[test]
    fn test_static_caller_rejects_instance_capabilities() {
        let caller = Caller::for_type(account_type(), Artifact::unknown(), None);
        assert!(caller.is_null());
        assert_eq!(caller.call_static("bank_code", args![]).unwrap().as_string(), "PL01");
        assert_eq!(caller.call("bank_code").unwrap().as_string(), "PL01");

        let err = caller.call("balance").unwrap_err();
        assert!(matches!(err.kind(), FailureKind::NoInstance(_)));
    }

    #[test]
    fn test_null_caller() {
        let caller = Caller::null(Artifact::unknown());
        assert!(caller.is_null());
        assert_eq!(caller.label(), "null");
        assert!(caller.call("anything").unwrap_err().is_resolution());
        assert!(!caller.is_instance_of("Account"));
    }

    #[test]
    fn test_is_instance_of_simple_name() {
        let caller = account(0);
        assert!(caller.is_instance_of("account"));
        assert!(!caller.is_instance_of("Ledger"));
        // not loadable from the caller's (empty) domain
        assert!(!caller.is_instance_of("bank::Account"));
    }

    #[test]
    fn test_take_first() {
        let first = Caller::take_first(&[Value::from("x"), Value::from(1i64)], Artifact::unknown());
        assert_eq!(first.see(), &Value::from("x"));
        assert_eq!(first.call("len").unwrap().as_long(), 1);

        let none = Caller::take_first(&[], Artifact::unknown());
        assert!(none.is_null());
        assert!(none.is_static());
    }

    #[test]
    fn test_caller_as_argument_keeps_type() {
        let caller = account(3);
        let arg = Arg::from(&caller);
        assert_eq!(arg.ty(), &TypeRef::named("bank::Account"));
    }

    #[test]
    fn test_callers_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Caller>();
        assert_send_sync::<CallResult>();
    }
}
