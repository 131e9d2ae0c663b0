use std::any::Any;
use std::fmt;

use crate::error::ReflectError;
use crate::types::{TypeDescriptor, TypeRef};
use crate::value::Value;

/// Object-safe reflective access to a struct instance.
///
/// Implemented by `#[derive(Reflect)]`. Field names are the Rust field names;
/// accessor names are the method names. Members of an embedded
/// `#[reflect(parent)]` struct are reachable through the owner.
pub trait Reflect: Any + Send + Sync + fmt::Debug {
    /// Erased descriptor, shared by every monomorph of a generic type.
    fn descriptor(&self) -> &'static TypeDescriptor;

    /// Runtime type of this instance, with concrete type arguments.
    fn type_ref(&self) -> TypeRef;

    /// Read a field, ignoring visibility.
    fn get(&self, field: &str) -> Result<Value, ReflectError>;

    /// Write a field, ignoring visibility.
    fn set(&mut self, field: &str, value: Value) -> Result<(), ReflectError>;

    fn call_getter(&self, method: &str) -> Result<Value, ReflectError>;

    fn call_setter(&mut self, method: &str, value: Value) -> Result<(), ReflectError>;

    fn clone_object(&self) -> Box<dyn Reflect>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// A statically typed value that can cross into and out of [`Value`].
///
/// Implemented for scalars, `String`, the std collections, `Option`,
/// `Arc<RwLock<T>>`, `Value` itself, and every derived type.
pub trait Data: Sized + Send + Sync + 'static {
    /// Declared type of `Self`.
    fn type_ref() -> TypeRef;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ReflectError>;
}

/// Static side of a derived struct.
pub trait Describe: Reflect + Data {
    fn type_descriptor() -> &'static TypeDescriptor;

    /// Build a default instance. Types marked `#[reflect(no_default)]` fail
    /// with a construct error.
    fn construct() -> Result<Self, ReflectError>;

    /// Type-erased [`Describe::construct`], used as an `ObjectType` factory.
    fn construct_boxed() -> Result<Box<dyn Reflect>, ReflectError> {
        Ok(Box::new(Self::construct()?))
    }
}

/// Static side of a derived unit-only enum.
pub trait DescribeEnum: Data {
    fn enum_descriptor() -> &'static crate::types::EnumDescriptor;
}
