//! Dynamic proxies over interface types
//!
//! A proxy is an object of a type synthesized from an interface: every
//! operation the interface declares gets a body that forwards to an
//! [`InvocationHandler`]. The proxy is an ordinary object, so loaded code can
//! receive it as an argument and call it like any other instance.

use std::sync::Arc;

use polyload_core::{BoxError, MethodDef, Object, PolyloadError, PolyloadResult, TypeDef, Value};

/// Serves the operations of a proxied interface
pub trait InvocationHandler: Send + Sync {
    fn invoke(&self, operation: &MethodDef, args: &[Value]) -> Result<Value, BoxError>;
}

impl<F> InvocationHandler for F
where
    F: Fn(&MethodDef, &[Value]) -> Result<Value, BoxError> + Send + Sync,
{
    fn invoke(&self, operation: &MethodDef, args: &[Value]) -> Result<Value, BoxError> {
        self(operation, args)
    }
}

/// State behind a proxy object
pub struct ProxyState {
    handler: Arc<dyn InvocationHandler>,
}

impl ProxyState {
    pub fn handler(&self) -> &Arc<dyn InvocationHandler> {
        &self.handler
    }
}

/// New proxy object implementing `interface` through `handler`
///
/// Only the operations declared on the interface are reachable.
pub fn new_proxy(
    interface: &Arc<TypeDef>,
    handler: Arc<dyn InvocationHandler>,
) -> PolyloadResult<Object> {
    if !interface.is_interface() {
        return Err(PolyloadError::configuration(
            interface.name(),
            interface.simple_name(),
            "proxies can only implement interfaces",
        ));
    }

    let mut builder = TypeDef::interface(interface.name())
        .provenance(interface.provenance().clone())
        .implementing(interface);
    for operation in interface.methods().filter(|m| !m.is_static()) {
        let declared = Arc::clone(operation);
        builder = builder.method(
            operation.name(),
            operation.signature().iter().cloned(),
            move |inv| {
                let state = inv.state::<ProxyState>()?;
                state.handler.invoke(&declared, inv.args())
            },
        );
    }

    tracing::debug!(interface = %interface.name(), "proxy type synthesized");
    Ok(Object::new(builder.build(), ProxyState { handler }))
}
