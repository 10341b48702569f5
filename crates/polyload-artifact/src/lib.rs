//! Polyload Artifact - Where versioned code lives
//!
//! An [`Artifact`] names a versioned unit of loadable code and knows how to
//! enumerate its binary locations:
//! - from a directory layout (`<root>/<label>/<version>/*.<ext>`)
//! - from entries of an embedded archive, extracted on first use
//! - from any custom [`BinaryEnumerator`]
//!
//! Artifacts may chain to a fallback artifact that is tried when they yield
//! no binaries.

pub mod archive;
pub mod artifact;
pub mod dir;

pub use archive::*;
pub use artifact::*;
pub use dir::*;
