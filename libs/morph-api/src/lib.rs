// Lets `#[derive(Reflect)]` expansions inside this crate's own tests resolve
// `morph_api::...` paths.
extern crate self as morph_api;

pub mod access;
pub mod data;
pub mod error;
pub mod json;
pub mod reflect;
pub mod types;
pub mod value;

pub use error::{ErrorKind, ReflectError};
pub use morph_api_derive::Reflect;
pub use reflect::{Data, Describe, DescribeEnum, Reflect};
pub use types::{
    AccessorDescriptor, AccessorKind, Conversion, EnumDescriptor, EnumType, FieldDescriptor,
    ObjectType, ParentDescriptor, SourceName, TypeDescriptor, TypeRef, UserMethod,
};
pub use value::{EnumValue, ObjectBox, SharedObject, Value};
