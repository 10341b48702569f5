//! Dynamic values passed to and returned from capabilities

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::typedef::TypeDef;
use crate::types::{Primitive, TypeRef};

/// Opaque state behind an object
pub type ObjectState = Arc<dyn Any + Send + Sync>;

/// An instance of a loaded type
///
/// Cloning shares the underlying state; two clones are the same instance.
#[derive(Clone)]
pub struct Object {
    ty: Arc<TypeDef>,
    state: ObjectState,
}

impl Object {
    pub fn new<T: Any + Send + Sync>(ty: Arc<TypeDef>, state: T) -> Self {
        Object {
            ty,
            state: Arc::new(state),
        }
    }

    pub fn from_state(ty: Arc<TypeDef>, state: ObjectState) -> Self {
        Object { ty, state }
    }

    /// Type that created this object
    pub fn type_def(&self) -> &Arc<TypeDef> {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    pub fn state(&self) -> &ObjectState {
        &self.state
    }

    pub fn downcast<T: Any>(&self) -> Option<&T> {
        self.state.downcast_ref::<T>()
    }

    /// Identity comparison on the shared state
    pub fn same_instance(&self, other: &Object) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.state) as *const (),
            Arc::as_ptr(&other.state) as *const (),
        )
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.state) as *const () as usize
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        if self.same_instance(other) {
            return true;
        }
        if self.ty.name() != other.ty.name() {
            return false;
        }
        self.ty.values_equal(self, other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({}@{:x})", self.ty.name(), self.addr())
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.ty.name(), self.addr())
    }
}

/// A dynamically typed value
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(String),
    Path(PathBuf),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Object(Object),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type inferred from the runtime value; scalars infer their boxed form
    pub fn inferred_type(&self) -> TypeRef {
        match self {
            Value::Null => TypeRef::object(),
            Value::Bool(_) => TypeRef::Boxed(Primitive::Bool),
            Value::Int(_) => TypeRef::Boxed(Primitive::Int),
            Value::Long(_) => TypeRef::Boxed(Primitive::Long),
            Value::Double(_) => TypeRef::Boxed(Primitive::Double),
            Value::Str(_) => TypeRef::string(),
            Value::Path(_) => TypeRef::path(),
            Value::List(_) => TypeRef::list(),
            Value::Map(_) => TypeRef::map(),
            Value::Object(obj) => TypeRef::named(obj.type_name()),
        }
    }

    /// Integral view of a numeric value; doubles are truncated
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            Value::Double(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(f64::from(*v)),
            Value::Long(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
            Value::Path(v) => write!(f, "{}", v.display()),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str("}")
            }
            Value::Object(obj) => write!(f, "{obj}"),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => Int,
    i64 => Long,
    f64 => Double,
    String => Str,
    &str => Str,
    PathBuf => Path,
    &Path => Path,
    Vec<Value> => List,
    Object => Object,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A call argument: a raw value paired with its declared type
///
/// Arguments built from plain values carry the inferred (boxed) type;
/// arguments built from callers or results carry the caller's resolved type.
#[derive(Clone, Debug, PartialEq)]
pub struct Arg {
    value: Value,
    ty: TypeRef,
}

impl Arg {
    pub fn new(value: Value, ty: TypeRef) -> Self {
        Arg { value, ty }
    }

    /// Argument whose type is inferred from the value
    pub fn of(value: impl Into<Value>) -> Self {
        let value = value.into();
        let ty = value.inferred_type();
        Arg { value, ty }
    }

    /// A null argument declared with an explicit type
    pub fn null(ty: TypeRef) -> Self {
        Arg {
            value: Value::Null,
            ty,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

macro_rules! arg_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::of(v)
                }
            }
        )*
    };
}

arg_from!(bool, i32, i64, f64, String, &str, PathBuf, &Path, Vec<Value>, Object, Value);

/// Signature of a list of arguments
pub fn signature_of(args: &[Arg]) -> Vec<TypeRef> {
    args.iter().map(|a| a.ty().clone()).collect()
}

/// Raw values of a list of arguments
pub fn values_of(args: &[Arg]) -> Vec<Value> {
    args.iter().map(|a| a.value().clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_infer_boxed_types() {
        assert_eq!(Value::from(7i64).inferred_type(), TypeRef::Boxed(Primitive::Long));
        assert_eq!(Value::from(7i32).inferred_type(), TypeRef::Boxed(Primitive::Int));
        assert_eq!(Value::from(true).inferred_type(), TypeRef::Boxed(Primitive::Bool));
        assert_eq!(Value::from("x").inferred_type(), TypeRef::string());
        assert_eq!(Value::Null.inferred_type(), TypeRef::object());
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Int(3).as_i64(), Some(3));
        assert_eq!(Value::Double(3.9).as_i64(), Some(3));
        assert_eq!(Value::from("3").as_i64(), None);
        assert_eq!(Value::Bool(true).as_i64(), None);
    }

    #[test]
    fn test_display() {
        let map = Value::Map(vec![(Value::from("a"), Value::from(1i64))]);
        assert_eq!(map.to_string(), "{a=1}");

        let list = Value::List(vec![Value::from(1i32), Value::Null, Value::from("b")]);
        assert_eq!(list.to_string(), "[1, null, b]");
    }

    #[test]
    fn test_arg_keeps_declared_type() {
        let arg = Arg::new(Value::from(5i64), TypeRef::Primitive(Primitive::Long));
        assert_eq!(arg.ty(), &TypeRef::Primitive(Primitive::Long));

        let inferred = Arg::from(5i64);
        assert_eq!(inferred.ty(), &TypeRef::Boxed(Primitive::Long));
        assert_eq!(signature_of(&[arg, inferred]).len(), 2);
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("v")), Value::Str("v".into()));
    }
}
