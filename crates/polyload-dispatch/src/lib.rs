//! Polyload Dispatch - Calling loaded code by name
//!
//! - [`Capability`]: name + parameter types, the key of every dynamic call
//! - [`Caller`]: a bound instance (or type) plus its artifact and domain;
//!   resolves, caches and dispatches capabilities
//! - [`CallResult`]: the outcome of a call with total, chainable projections
//! - [`InstanceBuilder`]: constructs callers from an artifact and a type name
//! - [`InvocationHandler`]: backs dynamic proxies of interface types

pub mod builder;
pub mod caller;
pub mod capability;
pub mod enumeration;
pub mod handler;
pub mod result;

pub use builder::*;
pub use caller::*;
pub use capability::*;
pub use enumeration::*;
pub use handler::*;
pub use result::*;

pub use polyload_core::{Arg, PolyloadError, PolyloadResult, Value};
