//! Polyload Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every Polyload layer:
//! - Dynamic values and wrapped call arguments
//! - Type references with boxed/primitive coercion
//! - Type dispatch tables and versioned libraries
//! - Version info and path/version utilities
//! - Configuration and the error type

pub mod config;
pub mod error;
pub mod library;
pub mod paths;
pub mod typedef;
pub mod types;
pub mod value;
pub mod version;

pub use config::*;
pub use error::*;
pub use library::*;
pub use paths::*;
pub use typedef::*;
pub use types::*;
pub use value::*;
pub use version::*;
