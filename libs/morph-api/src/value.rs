use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::ReflectError;
use crate::reflect::Reflect;
use crate::types::TypeRef;

/// Canonical dynamic value crossing the reflection boundary.
///
/// Strategy by type:
/// - Scalars: stored inline, one variant per primitive width
/// - Collections: recursive, elements converted individually
/// - `Object`: owned reflected struct, read lazily through [`Reflect`]
/// - `Shared`: `Arc<RwLock<T>>`, keeps pointer identity so shared and cyclic
///   graphs survive the trip
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Enum(EnumValue),

    List(Vec<Value>),
    Set(Vec<Value>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),

    Object(ObjectBox),
    Shared(SharedObject),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Runtime class of the value.
    ///
    /// Collection element types are taken from the first element; empty
    /// collections report `Any`. `Null` reports `Any`.
    pub fn runtime_type(&self) -> TypeRef {
        fn first_type(items: &[Value]) -> TypeRef {
            items
                .iter()
                .find(|v| !v.is_null())
                .map(Value::runtime_type)
                .unwrap_or(TypeRef::Any)
        }
        match self {
            Value::Null => TypeRef::Any,
            Value::Bool(_) => TypeRef::Bool,
            Value::Char(_) => TypeRef::Char,
            Value::I8(_) => TypeRef::I8,
            Value::I16(_) => TypeRef::I16,
            Value::I32(_) => TypeRef::I32,
            Value::I64(_) => TypeRef::I64,
            Value::U8(_) => TypeRef::U8,
            Value::U16(_) => TypeRef::U16,
            Value::U32(_) => TypeRef::U32,
            Value::U64(_) => TypeRef::U64,
            Value::F32(_) => TypeRef::F32,
            Value::F64(_) => TypeRef::F64,
            Value::Str(_) => TypeRef::String,
            Value::Enum(e) => e.type_ref(),
            Value::List(items) => TypeRef::list(first_type(items)),
            Value::Set(items) => TypeRef::set(first_type(items)),
            Value::Array(items) => TypeRef::array(first_type(items)),
            Value::Map(entries) => {
                let key = entries
                    .first()
                    .map(|(k, _)| k.runtime_type())
                    .unwrap_or(TypeRef::Any);
                let value = entries
                    .iter()
                    .find(|(_, v)| !v.is_null())
                    .map(|(_, v)| v.runtime_type())
                    .unwrap_or(TypeRef::Any);
                TypeRef::map(key, value)
            }
            Value::Object(o) => o.get().type_ref(),
            Value::Shared(s) => s.type_ref(),
        }
    }

    /// Short description used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Str(_) => "string",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Shared(_) => "shared object",
        }
    }

    /// Elements of a list, set or array.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) | Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_sequence(self) -> Result<Vec<Value>, ReflectError> {
        match self {
            Value::List(items) | Value::Set(items) | Value::Array(items) => Ok(items),
            other => Err(ReflectError::expected("sequence", other.kind_name())),
        }
    }

    /// Integer view of any integer variant.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::I8(v) => Some(v.into()),
            Value::I16(v) => Some(v.into()),
            Value::I32(v) => Some(v.into()),
            Value::I64(v) => Some(v.into()),
            Value::U8(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::U64(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Floating-point view of any numeric variant.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v.into()),
            Value::F64(v) => Some(v),
            _ => self.as_i128().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Run `f` against the reflected object behind `Object` or `Shared`.
    ///
    /// The read lock of a shared object is held only for the duration of `f`.
    pub fn with_object<R>(
        &self,
        f: impl FnOnce(&dyn Reflect) -> Result<R, ReflectError>,
    ) -> Result<R, ReflectError> {
        match self {
            Value::Object(o) => f(o.get()),
            Value::Shared(s) => {
                let guard = s.view.read()?;
                f(&*guard)
            }
            other => Err(ReflectError::expected("object", other.kind_name())),
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Shared(_))
    }

    /// Identity of a composite value, stable while the value is alive.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Object(o) => Some(o.identity()),
            Value::Shared(s) => Some(s.identity()),
            _ => None,
        }
    }

    /// Render a scalar as text. Composite values yield `None`.
    pub fn to_text(&self) -> Option<String> {
        Some(match self {
            Value::Bool(v) => v.to_string(),
            Value::Char(v) => v.to_string(),
            Value::Str(v) => v.clone(),
            Value::Enum(e) => e.variant.to_string(),
            Value::F32(v) => v.to_string(),
            Value::F64(v) => v.to_string(),
            other => other.as_i128()?.to_string(),
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::List(a), Value::List(b))
            | (Value::Set(a), Value::Set(b))
            | (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Shared(a), Value::Shared(b)) => a.identity() == b.identity(),
            (Value::Object(a), Value::Object(b)) => a.structurally_equal(b),
            (a, b) => match (a.as_i128(), b.as_i128()) {
                (Some(x), Some(y)) => x == y && a.kind_name() == b.kind_name(),
                _ => false,
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  EnumValue
// ═══════════════════════════════════════════════════════════════

/// Unit enum variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnumValue {
    pub ty: crate::types::EnumType,
    pub variant: &'static str,
    pub ordinal: usize,
}

impl EnumValue {
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::Enum(self.ty)
    }
}

// ═══════════════════════════════════════════════════════════════
//  ObjectBox
// ═══════════════════════════════════════════════════════════════

/// Owned reflected struct. Cloning deep-clones the object.
pub struct ObjectBox(Box<dyn Reflect>);

impl ObjectBox {
    pub fn new(object: Box<dyn Reflect>) -> Self {
        Self(object)
    }

    pub fn get(&self) -> &dyn Reflect {
        &*self.0
    }

    pub fn get_mut(&mut self) -> &mut dyn Reflect {
        &mut *self.0
    }

    pub fn into_inner(self) -> Box<dyn Reflect> {
        self.0
    }

    pub fn identity(&self) -> usize {
        &*self.0 as *const dyn Reflect as *const () as usize
    }

    fn structurally_equal(&self, other: &ObjectBox) -> bool {
        let (a, b) = (self.get(), other.get());
        if a.type_ref() != b.type_ref() {
            return false;
        }
        crate::access::enumerate_fields(a.descriptor())
            .into_iter()
            .all(|f| match (a.get(f.name), b.get(f.name)) {
                (Ok(x), Ok(y)) => x == y,
                _ => false,
            })
    }
}

impl Clone for ObjectBox {
    fn clone(&self) -> Self {
        Self(self.0.clone_object())
    }
}

impl fmt::Debug for ObjectBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

// ═══════════════════════════════════════════════════════════════
//  SharedObject
// ═══════════════════════════════════════════════════════════════

/// `Arc<RwLock<T>>` seen through two lenses: a reflective view for reading
/// and writing fields, and the original `Arc` for downcasting back to `T`.
/// Both point at the same allocation.
#[derive(Clone)]
pub struct SharedObject {
    view: Arc<RwLock<dyn Reflect>>,
    handle: Arc<dyn Any + Send + Sync>,
}

impl SharedObject {
    pub fn new<T: Reflect>(object: Arc<RwLock<T>>) -> Self {
        let view: Arc<RwLock<dyn Reflect>> = object.clone();
        Self { view, handle: object }
    }

    pub fn view(&self) -> &Arc<RwLock<dyn Reflect>> {
        &self.view
    }

    /// Recover the typed `Arc`, if the shared object holds a `T`.
    pub fn downcast<T: Reflect>(&self) -> Option<Arc<RwLock<T>>> {
        self.handle.clone().downcast::<RwLock<T>>().ok()
    }

    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.view) as *const () as usize
    }

    pub fn type_ref(&self) -> TypeRef {
        match self.view.read() {
            Ok(guard) => TypeRef::shared(guard.type_ref()),
            Err(_) => TypeRef::shared(TypeRef::Any),
        }
    }

    /// Deep copy of the referenced object, detached from the shared cell.
    pub fn snapshot(&self) -> Result<ObjectBox, ReflectError> {
        let guard = self.view.read()?;
        Ok(ObjectBox::new(guard.clone_object()))
    }
}

impl fmt::Debug for SharedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shared@{:#x}", self.identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_type_of_collections() {
        let list = Value::List(vec![Value::Null, Value::I32(1)]);
        assert_eq!(list.runtime_type(), TypeRef::list(TypeRef::I32));
        assert_eq!(Value::Set(Vec::new()).runtime_type(), TypeRef::set(TypeRef::Any));
        let map = Value::Map(vec![(Value::Str("s".into()), Value::I64(1))]);
        assert_eq!(map.runtime_type(), TypeRef::map(TypeRef::String, TypeRef::I64));
    }

    #[test]
    fn test_integer_equality_respects_width() {
        assert_eq!(Value::I32(3), Value::I32(3));
        assert_ne!(Value::I32(3), Value::I64(3));
        assert_ne!(Value::I32(3), Value::Str("3".into()));
    }

    #[test]
    fn test_to_text() {
        assert_eq!(Value::I32(13).to_text().as_deref(), Some("13"));
        assert_eq!(Value::Bool(true).to_text().as_deref(), Some("true"));
        assert_eq!(Value::List(Vec::new()).to_text(), None);
    }
}
