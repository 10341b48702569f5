//! Polyload Test Harness - fixtures and end-to-end scenarios
//!
//! This crate provides:
//! - Versioned fixture libraries and a loader linking them
//! - Counting enumerators for domain build assertions
//! - Log capture for asserting on tracing output
//! - Scratch directories laid out like artifact roots
//! - End-to-end scenarios across artifacts, domains and callers

pub mod capture;
pub mod fixtures;
pub mod counting;
pub mod scratch;

#[cfg(test)]
mod scenarios;

pub use capture::*;
pub use fixtures::*;
pub use counting::*;
pub use scratch::*;
