use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::ReflectError;
use crate::reflect::Reflect;
use crate::value::Value;

/// Lazily resolves a type descriptor. Stored as a function pointer so that
/// self-referential types (`Node { next: Option<Arc<RwLock<Node>>> }`) can be
/// described without recursing at initialization time.
pub type DescriptorFn = fn() -> &'static TypeDescriptor;

pub type EnumDescriptorFn = fn() -> &'static EnumDescriptor;

/// Builds a fresh default instance of a reflected type.
pub type FactoryFn = fn() -> Result<Box<dyn Reflect>, ReflectError>;

/// Converts a single argument value into an instance of the owning type.
pub type ConversionFn = fn(Value) -> Result<Value, ReflectError>;

/// Invokes a conversion method on a source instance.
pub type MethodFn = fn(&dyn Reflect) -> Result<Value, ReflectError>;

// ═══════════════════════════════════════════════════════════════
//  TypeRef
// ═══════════════════════════════════════════════════════════════

/// Declared or runtime type of a value.
///
/// `Param` is an unresolved type parameter of an erased generic descriptor
/// (`Vec<T>` inside `Page<T>`). It is resolved against a binding table by the
/// engine. `Any` is the type of a dynamic [`Value`] field and of collection
/// elements whose type cannot be recovered at runtime.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Any,
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Enum(EnumType),
    Object(ObjectType),
    /// `Arc<RwLock<T>>`: identity-carrying reference to an object.
    Shared(Box<TypeRef>),
    Optional(Box<TypeRef>),
    List(Box<TypeRef>),
    Set(Box<TypeRef>),
    Array(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    Param(&'static str),
}

impl TypeRef {
    pub fn optional(inner: TypeRef) -> Self {
        TypeRef::Optional(Box::new(inner))
    }

    pub fn list(element: TypeRef) -> Self {
        TypeRef::List(Box::new(element))
    }

    pub fn set(element: TypeRef) -> Self {
        TypeRef::Set(Box::new(element))
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        TypeRef::Map(Box::new(key), Box::new(value))
    }

    pub fn shared(inner: TypeRef) -> Self {
        TypeRef::Shared(Box::new(inner))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            TypeRef::I8
                | TypeRef::I16
                | TypeRef::I32
                | TypeRef::I64
                | TypeRef::U8
                | TypeRef::U16
                | TypeRef::U32
                | TypeRef::U64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TypeRef::F32 | TypeRef::F64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Bool, char, numbers, strings and enums.
    pub fn is_scalar(&self) -> bool {
        self.is_numeric()
            || matches!(self, TypeRef::Bool | TypeRef::Char | TypeRef::String | TypeRef::Enum(_))
    }

    /// List or set.
    pub fn is_iterable(&self) -> bool {
        matches!(self, TypeRef::List(_) | TypeRef::Set(_))
    }

    /// Char arrays and char lists, the byte-level counterpart of a string.
    pub fn is_char_sequence(&self) -> bool {
        match self {
            TypeRef::Array(e) | TypeRef::List(e) => **e == TypeRef::Char,
            _ => false,
        }
    }

    /// Strip every `Optional` layer.
    pub fn strip_optional(&self) -> &TypeRef {
        match self {
            TypeRef::Optional(inner) => inner.strip_optional(),
            other => other,
        }
    }

    /// Element type of a list, set or array.
    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::List(e) | TypeRef::Set(e) | TypeRef::Array(e) => Some(e),
            _ => None,
        }
    }

    /// Object type, looking through a `Shared` wrapper.
    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            TypeRef::Object(o) => Some(o),
            TypeRef::Shared(inner) => inner.as_object(),
            _ => None,
        }
    }

    /// Immediate type arguments, in declaration order.
    pub fn type_args(&self) -> Vec<&TypeRef> {
        match self {
            TypeRef::Optional(t)
            | TypeRef::List(t)
            | TypeRef::Set(t)
            | TypeRef::Array(t)
            | TypeRef::Shared(t) => vec![t.as_ref()],
            TypeRef::Map(k, v) => vec![k.as_ref(), v.as_ref()],
            TypeRef::Object(o) => o.args.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Replace the immediate type arguments. Extra or missing arguments leave
    /// the corresponding positions untouched.
    pub fn with_type_args(self, args: Vec<TypeRef>) -> TypeRef {
        let mut args = args.into_iter();
        let mut next = |current: Box<TypeRef>| match args.next() {
            Some(arg) => Box::new(arg),
            None => current,
        };
        match self {
            TypeRef::Optional(t) => TypeRef::Optional(next(t)),
            TypeRef::List(t) => TypeRef::List(next(t)),
            TypeRef::Set(t) => TypeRef::Set(next(t)),
            TypeRef::Array(t) => TypeRef::Array(next(t)),
            TypeRef::Shared(t) => TypeRef::Shared(next(t)),
            TypeRef::Map(k, v) => {
                let k = next(k);
                let v = next(v);
                TypeRef::Map(k, v)
            }
            TypeRef::Object(mut o) => {
                let old = std::mem::take(&mut o.args);
                o.args = old.into_iter().map(|a| *next(Box::new(a))).collect();
                TypeRef::Object(o)
            }
            other => other,
        }
    }

    /// True when neither `Any` nor `Param` occurs anywhere in the type.
    pub fn is_concrete(&self) -> bool {
        match self {
            TypeRef::Any | TypeRef::Param(_) => false,
            other => other.type_args().into_iter().all(TypeRef::is_concrete),
        }
    }

    /// True when a `Param` occurs anywhere in the type.
    pub fn has_params(&self) -> bool {
        match self {
            TypeRef::Param(_) => true,
            other => other.type_args().into_iter().any(TypeRef::has_params),
        }
    }

    /// Display name without type arguments (`"Vec"`, `"Node"`, `"i32"`).
    pub fn simple_name(&self) -> String {
        match self {
            TypeRef::Object(o) => o.name().to_string(),
            TypeRef::Enum(e) => e.name().to_string(),
            TypeRef::Shared(inner) => inner.simple_name(),
            TypeRef::Optional(_) => "Option".into(),
            TypeRef::List(_) => "Vec".into(),
            TypeRef::Set(_) => "Set".into(),
            TypeRef::Array(_) => "Array".into(),
            TypeRef::Map(..) => "Map".into(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Any => f.write_str("any"),
            TypeRef::Bool => f.write_str("bool"),
            TypeRef::Char => f.write_str("char"),
            TypeRef::I8 => f.write_str("i8"),
            TypeRef::I16 => f.write_str("i16"),
            TypeRef::I32 => f.write_str("i32"),
            TypeRef::I64 => f.write_str("i64"),
            TypeRef::U8 => f.write_str("u8"),
            TypeRef::U16 => f.write_str("u16"),
            TypeRef::U32 => f.write_str("u32"),
            TypeRef::U64 => f.write_str("u64"),
            TypeRef::F32 => f.write_str("f32"),
            TypeRef::F64 => f.write_str("f64"),
            TypeRef::String => f.write_str("String"),
            TypeRef::Enum(e) => f.write_str(e.name()),
            TypeRef::Object(o) => write!(f, "{o}"),
            TypeRef::Shared(t) => write!(f, "Shared<{t}>"),
            TypeRef::Optional(t) => write!(f, "Option<{t}>"),
            TypeRef::List(t) => write!(f, "Vec<{t}>"),
            TypeRef::Set(t) => write!(f, "Set<{t}>"),
            TypeRef::Array(t) => write!(f, "[{t}]"),
            TypeRef::Map(k, v) => write!(f, "Map<{k}, {v}>"),
            TypeRef::Param(name) => f.write_str(name),
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// ═══════════════════════════════════════════════════════════════
//  ObjectType / EnumType
// ═══════════════════════════════════════════════════════════════

/// A reflected struct type plus its type arguments.
///
/// `args` are concrete when the type came from a monomorphic context
/// (`<Page<Dto> as Data>::type_ref()`), and `Param`/`Any` when it came from an
/// erased descriptor. `factory` builds an instance of whatever monomorph the
/// type reference was produced by.
#[derive(Clone)]
pub struct ObjectType {
    pub descriptor: DescriptorFn,
    pub args: Vec<TypeRef>,
    pub factory: FactoryFn,
}

impl ObjectType {
    pub fn descriptor(&self) -> &'static TypeDescriptor {
        (self.descriptor)()
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }

    pub fn construct(&self) -> Result<Box<dyn Reflect>, ReflectError> {
        (self.factory)()
    }
}

// Every reflected type owns exactly one static descriptor, shared by all of
// its monomorphs, so the descriptor address identifies the type and the
// arguments identify the monomorph.
impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.descriptor(), other.descriptor()) && self.args == other.args
    }
}

impl Eq for ObjectType {}

impl Hash for ObjectType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.descriptor(), state);
        self.args.hash(state);
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A reflected unit-only enum.
#[derive(Clone, Copy)]
pub struct EnumType {
    pub descriptor: EnumDescriptorFn,
}

impl EnumType {
    pub fn descriptor(&self) -> &'static EnumDescriptor {
        (self.descriptor)()
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.descriptor(), other.descriptor())
    }
}

impl Eq for EnumType {}

impl Hash for EnumType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.descriptor(), state);
    }
}

impl fmt::Debug for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Descriptors
// ═══════════════════════════════════════════════════════════════

/// Per-field source-name override, optionally limited to one source type.
#[derive(Debug, Clone)]
pub struct SourceName {
    pub name: &'static str,
    /// Runtime type name the source must have for this override to apply.
    pub when: Option<&'static str>,
}

/// A single reflected field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub ty: TypeRef,
    /// Converted only when the expandable-fields policy allows it.
    pub expandable: bool,
    /// Belongs to the type rather than the instance; never enumerated as a
    /// destination and never copied.
    pub class_level: bool,
    /// Alternative names under which this field is offered as a source.
    pub aliases: Vec<&'static str>,
    pub sources: Vec<SourceName>,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, ty: TypeRef) -> Self {
        Self {
            name,
            ty,
            expandable: false,
            class_level: false,
            aliases: Vec::new(),
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Getter,
    Setter,
}

/// A getter or setter method exposed to reflection.
#[derive(Debug, Clone)]
pub struct AccessorDescriptor {
    pub method: &'static str,
    pub kind: AccessorKind,
    pub ty: TypeRef,
    pub expandable: bool,
}

impl AccessorDescriptor {
    /// Property name derived from the method name, see [`property_name`].
    pub fn property_name(&self) -> Option<String> {
        property_name(self.method).map(|(_, name)| name)
    }
}

/// Derive the property name of an accessor method.
///
/// `get`/`is` prefixes mark readers, `set` marks writers. The prefix must be
/// followed by `_` or an upper-case letter; one leading `_` is dropped and the
/// first remaining letter is lower-cased:
/// `get_full_name` → `full_name`, `getFullName` → `fullName`, `is_active` →
/// `active`. Returns `None` for names that do not follow the convention.
pub fn property_name(method: &str) -> Option<(AccessorKind, String)> {
    let (kind, rest) = if let Some(rest) = method.strip_prefix("get") {
        (AccessorKind::Getter, rest)
    } else if let Some(rest) = method.strip_prefix("is") {
        (AccessorKind::Getter, rest)
    } else if let Some(rest) = method.strip_prefix("set") {
        (AccessorKind::Setter, rest)
    } else {
        return None;
    };
    let first = rest.chars().next()?;
    if first != '_' && !first.is_uppercase() {
        return None;
    }
    let rest = rest.strip_prefix('_').unwrap_or(rest);
    let mut chars = rest.chars();
    let head = chars.next()?;
    let mut name = String::with_capacity(rest.len());
    name.extend(head.to_lowercase());
    name.push_str(chars.as_str());
    Some((kind, name))
}

/// A constructor or static factory taking one argument.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Path of the function, for diagnostics.
    pub path: &'static str,
    pub arg: TypeRef,
    pub call: ConversionFn,
}

/// A method on the source type producing a value of another type.
#[derive(Debug, Clone)]
pub struct UserMethod {
    pub method: &'static str,
    pub target: TypeRef,
    pub call: MethodFn,
}

/// Embedded parent struct whose members are enumerated after the owner's.
#[derive(Debug, Clone)]
pub struct ParentDescriptor {
    pub field: &'static str,
    pub descriptor: DescriptorFn,
}

/// Erased description of a reflected struct.
///
/// Shared by every monomorph of a generic struct; type parameters occur as
/// [`TypeRef::Param`] in field and accessor types.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: &'static str,
    pub type_params: Vec<&'static str>,
    pub fields: Vec<FieldDescriptor>,
    pub accessors: Vec<AccessorDescriptor>,
    pub parent: Option<ParentDescriptor>,
    pub constructors: Vec<Conversion>,
    pub factories: Vec<Conversion>,
    pub methods: Vec<UserMethod>,
}

impl TypeDescriptor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            type_params: Vec::new(),
            fields: Vec::new(),
            accessors: Vec::new(),
            parent: None,
            constructors: Vec::new(),
            factories: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<&'static TypeDescriptor> {
        self.parent.as_ref().map(|p| (p.descriptor)())
    }
}

/// Erased description of a reflected unit-only enum.
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    pub name: &'static str,
    pub variants: Vec<&'static str>,
}

impl EnumDescriptor {
    pub fn ordinal(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| *v == variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_name_snake_and_camel() {
        assert_eq!(
            property_name("get_full_name"),
            Some((AccessorKind::Getter, "full_name".to_string()))
        );
        assert_eq!(
            property_name("getFullName"),
            Some((AccessorKind::Getter, "fullName".to_string()))
        );
        assert_eq!(
            property_name("is_active"),
            Some((AccessorKind::Getter, "active".to_string()))
        );
        assert_eq!(
            property_name("setCount"),
            Some((AccessorKind::Setter, "count".to_string()))
        );
    }

    #[test]
    fn test_property_name_rejects_non_accessors() {
        assert_eq!(property_name("issue"), None);
        assert_eq!(property_name("settle"), None);
        assert_eq!(property_name("get"), None);
        assert_eq!(property_name("compute"), None);
    }

    #[test]
    fn test_with_type_args_replaces_immediate_args() {
        let ty = TypeRef::map(TypeRef::String, TypeRef::Any);
        let replaced = ty.with_type_args(vec![TypeRef::String, TypeRef::Param("T")]);
        assert_eq!(replaced, TypeRef::map(TypeRef::String, TypeRef::Param("T")));
    }

    #[test]
    fn test_concrete_and_params() {
        assert!(TypeRef::list(TypeRef::I32).is_concrete());
        assert!(!TypeRef::list(TypeRef::Any).is_concrete());
        assert!(TypeRef::optional(TypeRef::list(TypeRef::Param("T"))).has_params());
        assert!(!TypeRef::list(TypeRef::Any).has_params());
    }

    #[test]
    fn test_display() {
        let ty = TypeRef::map(TypeRef::String, TypeRef::list(TypeRef::I64));
        assert_eq!(ty.to_string(), "Map<String, Vec<i64>>");
        assert_eq!(TypeRef::optional(TypeRef::Char).strip_optional(), &TypeRef::Char);
    }
}
