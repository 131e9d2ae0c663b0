use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use crate::access::enumerate_fields;
use crate::error::ReflectError;
use crate::reflect::{Data, Describe};
use crate::types::{EnumDescriptor, EnumType, TypeRef};
use crate::value::{EnumValue, ObjectBox, SharedObject, Value};

// ═══════════════════════════════════════════════════════════════
//  Scalars
// ═══════════════════════════════════════════════════════════════

macro_rules! integer_data {
    ($($ty:ty => $variant:ident / $type_ref:ident),* $(,)?) => {
        $(
            impl Data for $ty {
                fn type_ref() -> TypeRef {
                    TypeRef::$type_ref
                }

                fn to_value(&self) -> Value {
                    Value::$variant(*self as _)
                }

                fn from_value(value: Value) -> Result<Self, ReflectError> {
                    let wide = value
                        .as_i128()
                        .ok_or_else(|| ReflectError::expected(stringify!($ty), value.kind_name()))?;
                    <$ty>::try_from(wide).map_err(|_| {
                        ReflectError::type_mismatch(format!(
                            "{wide} out of range for {}",
                            stringify!($ty)
                        ))
                    })
                }
            }
        )*
    };
}

integer_data! {
    i8 => I8 / I8,
    i16 => I16 / I16,
    i32 => I32 / I32,
    i64 => I64 / I64,
    isize => I64 / I64,
    u8 => U8 / U8,
    u16 => U16 / U16,
    u32 => U32 / U32,
    u64 => U64 / U64,
    usize => U64 / U64,
}

impl Data for f64 {
    fn type_ref() -> TypeRef {
        TypeRef::F64
    }

    fn to_value(&self) -> Value {
        Value::F64(*self)
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        value
            .as_f64()
            .ok_or_else(|| ReflectError::expected("f64", value.kind_name()))
    }
}

impl Data for f32 {
    fn type_ref() -> TypeRef {
        TypeRef::F32
    }

    fn to_value(&self) -> Value {
        Value::F32(*self)
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        match value {
            Value::F32(v) => Ok(v),
            other => {
                let wide = other
                    .as_f64()
                    .ok_or_else(|| ReflectError::expected("f32", other.kind_name()))?;
                let narrow = wide as f32;
                if f64::from(narrow) == wide || wide.is_nan() {
                    Ok(narrow)
                } else {
                    Err(ReflectError::type_mismatch(format!("{wide} is not representable as f32")))
                }
            }
        }
    }
}

impl Data for bool {
    fn type_ref() -> TypeRef {
        TypeRef::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(ReflectError::expected("bool", other.kind_name())),
        }
    }
}

impl Data for char {
    fn type_ref() -> TypeRef {
        TypeRef::Char
    }

    fn to_value(&self) -> Value {
        Value::Char(*self)
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        match value {
            Value::Char(v) => Ok(v),
            other => Err(ReflectError::expected("char", other.kind_name())),
        }
    }
}

impl Data for String {
    fn type_ref() -> TypeRef {
        TypeRef::String
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        match value {
            Value::Str(v) => Ok(v),
            other => Err(ReflectError::expected("String", other.kind_name())),
        }
    }
}

/// A `Value` field holds anything; its declared type is `Any`.
impl Data for Value {
    fn type_ref() -> TypeRef {
        TypeRef::Any
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        Ok(value)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Wrappers
// ═══════════════════════════════════════════════════════════════

impl<T: Data> Data for Option<T> {
    fn type_ref() -> TypeRef {
        TypeRef::optional(T::type_ref())
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Describe> Data for Arc<RwLock<T>> {
    fn type_ref() -> TypeRef {
        TypeRef::shared(<T as Data>::type_ref())
    }

    fn to_value(&self) -> Value {
        Value::Shared(SharedObject::new(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        match value {
            Value::Shared(shared) => match shared.downcast::<T>() {
                Some(typed) => Ok(typed),
                None => {
                    let copy = shared.snapshot()?;
                    T::from_value(Value::Object(copy)).map(|t| Arc::new(RwLock::new(t)))
                }
            },
            Value::Object(_) => T::from_value(value).map(|t| Arc::new(RwLock::new(t))),
            other => Err(ReflectError::expected("shared object", other.kind_name())),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Collections
// ═══════════════════════════════════════════════════════════════

fn elements<T: Data>(value: Value) -> Result<Vec<T>, ReflectError> {
    value
        .into_sequence()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| T::from_value(v).map_err(|e| e.with_context(format!("[{i}]"))))
        .collect()
}

fn entries<K: Data, V: Data>(value: Value) -> Result<Vec<(K, V)>, ReflectError> {
    match value {
        Value::Map(entries) => entries
            .into_iter()
            .map(|(k, v)| {
                let key = K::from_value(k).map_err(|e| e.with_context("key"))?;
                let value = V::from_value(v).map_err(|e| e.with_context("value"))?;
                Ok((key, value))
            })
            .collect(),
        other => Err(ReflectError::expected("map", other.kind_name())),
    }
}

impl<T: Data> Data for Vec<T> {
    fn type_ref() -> TypeRef {
        TypeRef::list(T::type_ref())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Data::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        elements(value)
    }
}

impl<T: Data> Data for VecDeque<T> {
    fn type_ref() -> TypeRef {
        TypeRef::list(T::type_ref())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Data::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        elements(value).map(VecDeque::from)
    }
}

impl<T: Data + Eq + Hash> Data for HashSet<T> {
    fn type_ref() -> TypeRef {
        TypeRef::set(T::type_ref())
    }

    fn to_value(&self) -> Value {
        Value::Set(self.iter().map(Data::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        Ok(elements(value)?.into_iter().collect())
    }
}

impl<T: Data + Ord> Data for BTreeSet<T> {
    fn type_ref() -> TypeRef {
        TypeRef::set(T::type_ref())
    }

    fn to_value(&self) -> Value {
        Value::Set(self.iter().map(Data::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        Ok(elements(value)?.into_iter().collect())
    }
}

impl<T: Data> Data for Box<[T]> {
    fn type_ref() -> TypeRef {
        TypeRef::array(T::type_ref())
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(Data::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        elements(value).map(Vec::into_boxed_slice)
    }
}

impl<T: Data, const N: usize> Data for [T; N] {
    fn type_ref() -> TypeRef {
        TypeRef::array(T::type_ref())
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(Data::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        let items: Vec<T> = elements(value)?;
        let len = items.len();
        items
            .try_into()
            .map_err(|_| ReflectError::type_mismatch(format!("expected {N} elements, got {len}")))
    }
}

impl<K: Data + Eq + Hash, V: Data> Data for HashMap<K, V> {
    fn type_ref() -> TypeRef {
        TypeRef::map(K::type_ref(), V::type_ref())
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        Ok(entries(value)?.into_iter().collect())
    }
}

impl<K: Data + Ord, V: Data> Data for BTreeMap<K, V> {
    fn type_ref() -> TypeRef {
        TypeRef::map(K::type_ref(), V::type_ref())
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        Ok(entries(value)?.into_iter().collect())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Derive support
// ═══════════════════════════════════════════════════════════════

/// Stand-in for a type parameter in erased generic types.
///
/// `Page<T>` is described once through `Page<Erased>`, and the engine builds
/// `Page<Erased>` when it only knows the erased type. The slot keeps whatever
/// value it is given, so a later rebuild into `Page<Dto>` loses nothing.
///
/// Hashing looks at the kind and the text of scalars only; equal values always
/// hash alike. There is no `Ord`, so `BTreeSet<T>` and `BTreeMap<T, _>` fields
/// of generic types do not derive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Erased(pub Value);

impl Eq for Erased {}

impl Hash for Erased {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.kind_name().hash(state);
        self.0.to_text().hash(state);
    }
}

impl Data for Erased {
    fn type_ref() -> TypeRef {
        TypeRef::Any
    }

    fn to_value(&self) -> Value {
        self.0.clone()
    }

    fn from_value(value: Value) -> Result<Self, ReflectError> {
        Ok(Erased(value))
    }
}

/// `Data::from_value` for derived structs.
///
/// Takes the boxed instance when it already is a `T`. Otherwise, when the
/// value holds another monomorph of the same erased type (`Page<Value>` built
/// for a `Page<Dto>` slot), builds a default `T` and copies every field across.
pub fn object_from_value<T: Describe>(value: Value) -> Result<T, ReflectError> {
    let object = match value {
        Value::Object(object) => object,
        Value::Shared(shared) => shared.snapshot()?,
        other => {
            return Err(ReflectError::expected(
                T::type_descriptor().name,
                other.kind_name(),
            ))
        }
    };
    if object.get().as_any().is::<T>() {
        return object
            .into_inner()
            .into_any()
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| ReflectError::type_mismatch("downcast failed"));
    }
    rebuild(object, T::construct()?)
}

fn rebuild<T: Describe>(from: ObjectBox, mut into: T) -> Result<T, ReflectError> {
    let source = from.get();
    let expected = T::type_descriptor().name;
    if source.descriptor().name != expected {
        return Err(ReflectError::expected(expected, source.descriptor().name));
    }
    for field in enumerate_fields(source.descriptor()) {
        let value = source.get(field.name)?;
        into.set(field.name, value)
            .map_err(|e| e.with_context(format!("{expected}.{}", field.name)))?;
    }
    Ok(into)
}

/// `Data::to_value` for derived unit enums.
pub fn enum_to_value(ty: EnumType, variant: &'static str) -> Value {
    let ordinal = ty.descriptor().ordinal(variant).unwrap_or_default();
    Value::Enum(EnumValue { ty, variant, ordinal })
}

/// Variant name carried by an enum or string value, checked against the
/// descriptor.
pub fn enum_variant(
    descriptor: &EnumDescriptor,
    value: &Value,
) -> Result<&'static str, ReflectError> {
    let name = match value {
        Value::Enum(e) => e.variant,
        Value::Str(s) => s.as_str(),
        other => return Err(ReflectError::expected(descriptor.name, other.kind_name())),
    };
    descriptor
        .variants
        .iter()
        .find(|v| **v == name)
        .copied()
        .ok_or_else(|| {
            ReflectError::type_mismatch(format!("{} has no variant '{name}'", descriptor.name))
        })
}
