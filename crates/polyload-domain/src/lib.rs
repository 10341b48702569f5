//! Polyload Domain - Isolated loading domains
//!
//! A [`Domain`] is the set of libraries one artifact resolved to, optionally
//! delegating to a shared system domain. The [`DomainRegistry`] builds each
//! domain once per artifact name and hands out shared handles. The ambient
//! domain is a per-thread slot swapped by an RAII guard.

pub mod ambient;
pub mod domain;
pub mod loader;
pub mod registry;

pub use ambient::*;
pub use domain::*;
pub use loader::*;
pub use registry::*;
