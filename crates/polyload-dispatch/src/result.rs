//! Call results
//!
//! Every projection is total: a value of the wrong kind projects to the
//! neutral value of the requested kind instead of failing.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use polyload_artifact::Artifact;
use polyload_core::{Arg, Invocation, PolyloadResult, Value, VersionInfo, Versioned};

use crate::caller::Caller;
use crate::capability::Capability;

/// Outcome of a dynamic call
#[derive(Clone)]
pub struct CallResult {
    origin: Option<Capability>,
    caller: Option<Caller>,
    value: Value,
    provenance: VersionInfo,
}

impl CallResult {
    pub(crate) fn new(origin: Option<Capability>, caller: Option<Caller>, value: Value) -> Self {
        let provenance = match (&caller, &value) {
            (Some(caller), _) => caller.provenance(),
            (None, Value::Object(obj)) => obj.type_def().provenance().clone(),
            _ => VersionInfo::unknown(),
        };
        CallResult {
            origin,
            caller,
            value,
            provenance,
        }
    }

    /// Result of no call, holding `value`
    pub fn detached(value: impl Into<Value>) -> Self {
        CallResult::new(None, None, value.into())
    }

    pub fn null() -> Self {
        CallResult::detached(Value::Null)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Capability that produced this result
    pub fn origin(&self) -> Option<&Capability> {
        self.origin.as_ref()
    }

    /// Caller the capability ran on
    pub fn caller(&self) -> Option<&Caller> {
        self.caller.as_ref()
    }

    /// Artifact of the originating caller, or the unknown artifact
    pub fn artifact(&self) -> Arc<Artifact> {
        match &self.caller {
            Some(caller) => Arc::clone(caller.artifact()),
            None => Artifact::unknown(),
        }
    }

    pub fn provenance(&self) -> &VersionInfo {
        &self.provenance
    }

    /// Integral value, 0 unless numeric
    pub fn as_long(&self) -> i64 {
        self.value.as_i64().unwrap_or(0)
    }

    /// false unless boolean
    pub fn as_bool(&self) -> bool {
        self.value.as_bool().unwrap_or(false)
    }

    /// Text of the value; objects render through their `to_string` capability
    pub fn as_string(&self) -> String {
        render(&self.value)
    }

    /// Path value, `.` unless a path
    pub fn as_file(&self) -> PathBuf {
        self.value
            .as_path()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Map value rendered as text, empty unless a map
    pub fn as_map(&self) -> BTreeMap<String, String> {
        self.value
            .as_map()
            .map(|entries| entries.iter().map(|(k, v)| (render(k), render(v))).collect())
            .unwrap_or_default()
    }

    /// List elements as callers on the same artifact, empty unless a list
    pub fn as_list(&self) -> Vec<Caller> {
        self.value
            .as_list()
            .map(|items| items.iter().map(|item| self.wrap(item.clone())).collect())
            .unwrap_or_default()
    }

    /// Enum constant as a caller on the same artifact
    pub fn as_enum(&self) -> Caller {
        self.wrap(self.value.clone())
    }

    /// Value as a caller on the same artifact; a null caller for null
    pub fn as_proxy(&self) -> Caller {
        self.wrap(self.value.clone())
    }

    /// Null matches null; otherwise values compare equal
    pub fn same_as(&self, other: &Caller) -> bool {
        match (self.value.is_null(), other.see().is_null()) {
            (true, true) => true,
            (true, false) | (false, true) => false,
            (false, false) => &self.value == other.see(),
        }
    }

    /// Re-issue the originating capability on the same caller
    ///
    /// A result without an origin reruns to a null result.
    pub fn rerun(&self, args: Vec<Arg>) -> PolyloadResult<CallResult> {
        match (&self.origin, &self.caller) {
            (Some(origin), Some(caller)) => caller.call_as(origin, args),
            _ => Ok(CallResult::null()),
        }
    }

    fn wrap(&self, value: Value) -> Caller {
        let domain = self.caller.as_ref().and_then(|c| c.domain().cloned());
        Caller::wrap(value, self.artifact(), domain)
    }
}

/// Text of a value, through the object's `to_string` capability when it has one
fn render(value: &Value) -> String {
    let Value::Object(obj) = value else {
        return match value {
            Value::Null => String::new(),
            other => other.to_string(),
        };
    };

    let ty = obj.type_def();
    match ty.find_method("to_string", &[]) {
        Some(method) => match method.invoke(&Invocation::new(ty, Some(value), &[])) {
            Ok(Value::Str(text)) => text,
            Ok(Value::Object(_)) => obj.to_string(),
            Ok(other) => render(&other),
            Err(e) => {
                tracing::debug!(type_name = %ty.name(), error = %e, "to_string failed, using display");
                obj.to_string()
            }
        },
        None => obj.to_string(),
    }
}

impl Versioned for CallResult {
    fn name(&self) -> &str {
        self.provenance.name()
    }

    fn label(&self) -> &str {
        self.provenance.label()
    }

    fn version(&self) -> &str {
        self.provenance.version()
    }

    fn path(&self) -> String {
        self.provenance.path()
    }

    fn dir(&self) -> PathBuf {
        self.provenance.dir()
    }
}

impl From<&CallResult> for Arg {
    fn from(result: &CallResult) -> Self {
        Arg::of(result.value.clone())
    }
}

impl From<CallResult> for Arg {
    fn from(result: CallResult) -> Self {
        Arg::of(result.value)
    }
}

impl fmt::Debug for CallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallResult")
            .field("origin", &self.origin.as_ref().map(Capability::full_name))
            .field("value", &self.value)
            .field("provenance", &self.provenance.path())
            .finish()
    }
}
