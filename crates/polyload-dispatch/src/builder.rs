//! Instance builder
//!
//! Resolves a type from an artifact's domain and turns it into a [`Caller`]:
//! - interface types become proxies served by an [`InvocationHandler`]
//! - a factory method is called statically and its result bound
//! - static builds bind the type without an instance
//! - otherwise the constructor matching the parameters is run
//!
//! Post-construction capabilities then run in order on the new caller.

use std::collections::HashMap;
use std::sync::Arc;

use polyload_artifact::Artifact;
use polyload_core::{
    coerced_signatures, signature_of, values_of, Arg, FailureKind, Invocation, Object, PolyloadError,
    PolyloadResult, TypeDef, TypeRef, Value,
};
use polyload_domain::{push_domain, Domain, DomainRegistry};

use crate::caller::Caller;
use crate::capability::Capability;
use crate::enumeration::EnumTable;
use crate::handler::{new_proxy, InvocationHandler};
use crate::result::CallResult;

const BUILDER_ORIGIN: &str = "instance builder";

/// Builds callers from an artifact and a type name
pub struct InstanceBuilder {
    registry: Arc<DomainRegistry>,
    package: Option<String>,
    class_name: Option<String>,
    interface_name: Option<String>,
    params: Vec<Arg>,
    artifact: Option<Arc<Artifact>>,
    factory_method: Option<String>,
    handler: Option<Arc<dyn InvocationHandler>>,
    capabilities: Vec<Capability>,
    data: HashMap<String, CallResult>,
    static_object: bool,
    push_domain: bool,
}

impl InstanceBuilder {
    pub fn new(registry: Arc<DomainRegistry>) -> Self {
        InstanceBuilder {
            registry,
            package: None,
            class_name: None,
            interface_name: None,
            params: Vec::new(),
            artifact: None,
            factory_method: None,
            handler: None,
            capabilities: Vec::new(),
            data: HashMap::new(),
            static_object: false,
            push_domain: false,
        }
    }

    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Build a class instance; clears any interface name
    pub fn class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self.interface_name = None;
        self
    }

    /// Build an interface proxy; clears any class name
    pub fn interface_name(mut self, name: impl Into<String>) -> Self {
        self.interface_name = Some(name.into());
        self.class_name = None;
        self
    }

    /// Constructor or factory argument
    pub fn param(mut self, param: impl Into<Arg>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = Arg>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn artifact(mut self, artifact: Arc<Artifact>) -> Self {
        self.artifact = Some(artifact);
        self
    }

    /// Static method producing the instance, called with the params
    pub fn factory_method(mut self, name: impl Into<String>) -> Self {
        self.factory_method = Some(name.into());
        self
    }

    pub fn handler(mut self, handler: impl InvocationHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn shared_handler(mut self, handler: Arc<dyn InvocationHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Capability to run after construction
    pub fn call(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Named data readable through [`Caller::data`]
    pub fn data(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(name.into(), CallResult::detached(value));
        self
    }

    pub fn data_result(mut self, name: impl Into<String>, result: CallResult) -> Self {
        self.data.insert(name.into(), result);
        self
    }

    /// Bind the type itself instead of an instance
    pub fn static_object(mut self, is_static: bool) -> Self {
        self.static_object = is_static;
        self
    }

    /// Make the artifact's domain ambient while building
    pub fn push_domain(mut self, push: bool) -> Self {
        self.push_domain = push;
        self
    }

    /// `package::Name` of the type to build
    pub fn qualified_name(&self) -> PolyloadResult<String> {
        let name = match (&self.class_name, &self.interface_name) {
            (Some(_), Some(_)) => {
                return Err(self.configuration("class and interface names are both set"));
            }
            (Some(name), None) | (None, Some(name)) if !name.trim().is_empty() => name.trim(),
            _ => return Err(self.configuration("a class or interface name is required")),
        };

        match self.package.as_deref().map(str::trim) {
            Some(package) if !package.is_empty() => Ok(format!("{package}::{name}")),
            _ => Ok(name.to_string()),
        }
    }

    /// Load the named type from the artifact's domain
    pub fn load_type(&self) -> PolyloadResult<Arc<TypeDef>> {
        let artifact = self.require_artifact()?;
        let domain = self.registry.get(&artifact);
        domain.load_type(&self.qualified_name()?)
    }

    pub fn build(&self) -> PolyloadResult<Caller> {
        self.build_with_results().map(|(caller, _)| caller)
    }

    /// Build and return the results of the post-construction capabilities
    pub fn build_with_results(&self) -> PolyloadResult<(Caller, Vec<CallResult>)> {
        let artifact = self.require_artifact()?;
        let qualified = self.qualified_name()?;
        let domain = self.registry.get(&artifact);
        let _ambient = self.push_domain.then(|| push_domain(Arc::clone(&domain)));

        let ty = domain.load_type(&qualified)?;
        let caller = self
            .construct(&ty, &artifact, &domain)?
            .with_data(self.data.clone());

        let mut results = Vec::with_capacity(self.capabilities.len());
        for capability in &self.capabilities {
            results.push(caller.call_descriptor(capability)?);
        }

        tracing::debug!(
            type_name = %qualified,
            artifact = %artifact,
            calls = results.len(),
            "instance built"
        );
        Ok((caller, results))
    }

    /// Constants of the named enum type, keyed case-insensitively
    pub fn build_enum(&self) -> PolyloadResult<EnumTable> {
        let artifact = self.require_artifact()?;
        let domain = self.registry.get(&artifact);
        let ty = domain.load_type(&self.qualified_name()?)?;
        if !ty.is_enum() {
            return Err(PolyloadError::configuration(
                ty.name(),
                ty.simple_name(),
                "not an enum type",
            ));
        }

        let mut table = EnumTable::new(ty.name());
        let names: Vec<String> = ty.constant_names().map(str::to_string).collect();
        for (name, constant) in names.iter().zip(ty.constants()) {
            let caller = Caller::wrap(
                Value::Object(constant),
                Arc::clone(&artifact),
                Some(Arc::clone(&domain)),
            );
            table.insert(name, caller);
        }
        Ok(table)
    }

    fn construct(
        &self,
        ty: &Arc<TypeDef>,
        artifact: &Arc<Artifact>,
        domain: &Arc<Domain>,
    ) -> PolyloadResult<Caller> {
        if self.interface_name.is_some() || ty.is_interface() {
            let handler = self.handler.clone().ok_or_else(|| {
                PolyloadError::configuration(
                    ty.name(),
                    ty.simple_name(),
                    "interface proxies need an invocation handler",
                )
            })?;
            let proxy = new_proxy(ty, handler)?;
            return Ok(self.bind(Value::Object(proxy), artifact, domain));
        }

        if let Some(factory) = &self.factory_method {
            let type_caller = Caller::for_type(Arc::clone(ty), Arc::clone(artifact), Some(Arc::clone(domain)));
            let produced = Capability::static_method(factory, self.params.iter().cloned())
                .and_then(|capability| type_caller.call_descriptor(&capability))?;
            return Ok(self.bind(produced.into_value(), artifact, domain));
        }

        if self.static_object {
            return Ok(Caller::for_type(
                Arc::clone(ty),
                Arc::clone(artifact),
                Some(Arc::clone(domain)),
            ));
        }

        let object = self.run_constructor(ty)?;
        Ok(self.bind(Value::Object(object), artifact, domain))
    }

    fn run_constructor(&self, ty: &Arc<TypeDef>) -> PolyloadResult<Object> {
        let signature = signature_of(&self.params);
        let constructor = ty.find_constructor(&signature).or_else(|| {
            coerced_signatures(&signature).into_iter().find_map(|retry| {
                tracing::debug!(type_name = %ty.name(), retry = ?retry, "exact constructor missed, retrying with coerced types");
                ty.find_constructor(&retry)
            })
        });

        let Some(constructor) = constructor else {
            let rendered: Vec<&str> = signature.iter().map(TypeRef::name).collect();
            return Err(PolyloadError::new(
                ty.name(),
                ty.simple_name(),
                FailureKind::ConstructorNotFound(rendered.join(", ")),
            ));
        };

        let args = values_of(&self.params);
        let state = constructor
            .construct(&Invocation::new(ty, None, &args))
            .map_err(|e| PolyloadError::new(ty.name(), ty.simple_name(), FailureKind::Invocation(e)))?;
        Ok(Object::from_state(Arc::clone(ty), state))
    }

    fn bind(&self, value: Value, artifact: &Arc<Artifact>, domain: &Arc<Domain>) -> Caller {
        Caller::wrap(value, Arc::clone(artifact), Some(Arc::clone(domain)))
    }

    fn require_artifact(&self) -> PolyloadResult<Arc<Artifact>> {
        self.artifact
            .clone()
            .ok_or_else(|| self.configuration("an artifact is required"))
    }

    fn configuration(&self, message: &str) -> PolyloadError {
        let label = self
            .class_name
            .as_deref()
            .or(self.interface_name.as_deref())
            .unwrap_or_default();
        PolyloadError::configuration(BUILDER_ORIGIN, label, message)
    }
}

impl From<&InstanceBuilder> for InstanceBuilder {
    /// Copy naming, artifact, factory and handler; nothing else carries over
    fn from(other: &InstanceBuilder) -> Self {
        InstanceBuilder {
            package: other.package.clone(),
            class_name: other.class_name.clone(),
            interface_name: other.interface_name.clone(),
            artifact: other.artifact.clone(),
            factory_method: other.factory_method.clone(),
            handler: other.handler.clone(),
            ..InstanceBuilder::new(Arc::clone(&other.registry))
        }
    }
}
