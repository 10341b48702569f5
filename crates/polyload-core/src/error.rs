//! Error types for Polyload
//!
//! Every fatal failure surfaces as a single [`PolyloadError`] carrying the
//! originating name (capability, type or builder), the caller's display
//! label and the underlying [`FailureKind`]. Degradations (missing binaries,
//! failed extraction) are logged and never reach this type.

use thiserror::Error;

/// Placeholder used when an origin or label is blank
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Boxed error returned by capability bodies
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What went wrong
#[derive(Error, Debug)]
pub enum FailureKind {
    // Resolution failures
    #[error("capability not found: {0}")]
    CapabilityNotFound(String),

    #[error("constructor not found for signature ({0})")]
    ConstructorNotFound(String),

    #[error("type {type_name} not found in domain {domain}")]
    TypeNotFound { type_name: String, domain: String },

    #[error("no bound instance to dispatch {0}")]
    NoInstance(String),

    // Rejected at build time
    #[error("configuration: {0}")]
    Configuration(String),

    // Raised by the capability body itself
    #[error("invocation failed: {0}")]
    Invocation(#[source] BoxError),
}

/// Failure of a dynamic call or of building a caller
#[derive(Error, Debug)]
#[error("failed to invoke {origin} with label {label}: {kind}")]
pub struct PolyloadError {
    origin: String,
    label: String,
    #[source]
    kind: FailureKind,
}

impl PolyloadError {
    pub fn new(origin: impl Into<String>, label: impl Into<String>, kind: FailureKind) -> Self {
        PolyloadError {
            origin: or_unknown(origin.into()),
            label: or_unknown(label.into()),
            kind,
        }
    }

    /// Shorthand for a configuration failure
    pub fn configuration(
        origin: impl Into<String>,
        label: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        PolyloadError::new(origin, label, FailureKind::Configuration(message.into()))
    }

    /// Name of the capability, type or builder that failed
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Display label of the caller the failure happened on
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    pub fn into_kind(self) -> FailureKind {
        self.kind
    }

    /// Re-attribute a failure to an enclosing origin, keeping the kind
    pub fn reattribute(self, origin: impl Into<String>) -> Self {
        PolyloadError::new(origin, self.label, self.kind)
    }

    /// True for every "could not find it" failure
    pub fn is_resolution(&self) -> bool {
        matches!(
            self.kind,
            FailureKind::CapabilityNotFound(_)
                | FailureKind::ConstructorNotFound(_)
                | FailureKind::TypeNotFound { .. }
                | FailureKind::NoInstance(_)
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, FailureKind::Configuration(_))
    }
}

fn or_unknown(value: String) -> String {
    if value.trim().is_empty() {
        UNKNOWN_ORIGIN.to_string()
    } else {
        value
    }
}

/// Result type for Polyload operations
pub type PolyloadResult<T> = Result<T, PolyloadError>;
