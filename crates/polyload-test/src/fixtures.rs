//! Versioned fixture libraries
//!
//! Every greeter version defines the same types, so two versions loaded
//! side by side only differ in what their capabilities answer.

use std::sync::Arc;

use polyload_core::{
    BoxError, Invocation, Library, Primitive, TypeDef, TypeRef, Value,
};
use polyload_domain::{ambient_domain, StaticModuleLoader};

pub const GREETER_LABEL: &str = "greeter";
pub const GREETER_CLASS: &str = "greet::Greeter";
pub const LISTENER_INTERFACE: &str = "greet::Listener";
pub const TONE_ENUM: &str = "greet::Tone";
pub const SHARED_CLASS: &str = "shared::Clock";

/// File name a greeter version is linked under
pub fn greeter_file(version: &str) -> String {
    format!("{GREETER_LABEL}-{version}.plugin")
}

struct Greeter {
    name: String,
    version: String,
}

/// Greeter library at `version`
///
/// `greet::Greeter` answers `version()`, greets by name, adds primitive
/// longs and notifies a `greet::Listener` passed in by the host. The
/// static `ambient()` answers the name of the ambient domain, if any.
pub fn greeter_library(version: &str) -> Arc<Library> {
    let v = version.to_string();
    let ctor_v = v.clone();
    let named_v = v.clone();
    let factory_v = v.clone();

    Library::builder(GREETER_LABEL, version)
        .with_type(
            TypeDef::class(GREETER_CLASS)
                .constructor([], move |_| {
                    Ok(Greeter {
                        name: "world".to_string(),
                        version: ctor_v.clone(),
                    })
                })
                .constructor([TypeRef::string()], move |inv| {
                    Ok(Greeter {
                        name: inv.str_arg(0)?.to_string(),
                        version: named_v.clone(),
                    })
                })
                .method("version", [], |inv| {
                    Ok(Value::from(inv.state::<Greeter>()?.version.clone()))
                })
                .method("greet", [], |inv| {
                    let g = inv.state::<Greeter>()?;
                    Ok(Value::from(format!("hello {} from {}", g.name, g.version)))
                })
                .method(
                    "add",
                    [TypeRef::Primitive(Primitive::Long), TypeRef::Primitive(Primitive::Long)],
                    |inv| Ok(Value::from(inv.i64_arg(0)? + inv.i64_arg(1)?)),
                )
                .method("notify", [TypeRef::named(LISTENER_INTERFACE)], notify)
                .method("to_string", [], |inv| {
                    let g = inv.state::<Greeter>()?;
                    Ok(Value::from(format!("Greeter({}@{})", g.name, g.version)))
                })
                .static_method("create", [TypeRef::string()], move |inv| {
                    Ok(inv.new_object(Greeter {
                        name: inv.str_arg(0)?.to_uppercase(),
                        version: factory_v.clone(),
                    }))
                })
                .static_method("release", [], move |_| Ok(Value::from(v.clone())))
                .static_method("ambient", [], |_| {
                    Ok(ambient_domain().map_or(Value::Null, |d| Value::from(d.name().to_string())))
                }),
        )
        .with_type(TypeDef::interface(LISTENER_INTERFACE).operation("on_greeting", [TypeRef::string()]))
        .with_type(TypeDef::enumeration(TONE_ENUM, &["Warm", "Formal", "Curt"]))
        .build()
}

/// Calls `on_greeting` on the listener argument and returns its answer
fn notify(inv: &Invocation<'_>) -> Result<Value, BoxError> {
    let greeting = format!("hello from {}", inv.state::<Greeter>()?.version);
    let listener = inv.arg(0)?;
    let Value::Object(object) = listener else {
        return Err("listener must be an object".into());
    };

    let ty = object.type_def();
    let callback = ty
        .find_method("on_greeting", &[TypeRef::string()])
        .ok_or("listener does not implement on_greeting")?;
    let args = [Value::from(greeting)];
    callback.invoke(&Invocation::new(ty, Some(listener), &args))
}

/// Library shared by every domain through the system domain
pub fn shared_library() -> Arc<Library> {
    Library::builder("shared", "0.1")
        .with_type(TypeDef::class(SHARED_CLASS).static_method("now", [], |_| Ok(Value::from(1_700_000_000i64))))
        .build()
}

/// Loader linking greeter 1.0 and 2.0
pub fn fixture_loader() -> StaticModuleLoader {
    StaticModuleLoader::new()
        .with_module(greeter_file("1.0"), greeter_library("1.0"))
        .with_module(greeter_file("2.0"), greeter_library("2.0"))
}
