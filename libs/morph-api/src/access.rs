//! Reflection capability contract consumed by the conversion engine.
//!
//! Four primitives (get, set, enumerate, construct) and one advanced
//! primitive (resolve a retained generic argument). Enumeration walks the
//! `#[reflect(parent)]` chain, owner before parent.

use crate::error::ReflectError;
use crate::reflect::Reflect;
use crate::types::{AccessorDescriptor, FieldDescriptor, ObjectType, TypeDescriptor, TypeRef};
use crate::value::Value;

pub fn get_field_value(instance: &dyn Reflect, field: &str) -> Result<Value, ReflectError> {
    instance
        .get(field)
        .map_err(|e| e.with_context(instance.descriptor().name))
}

pub fn set_field_value(
    instance: &mut dyn Reflect,
    field: &str,
    value: Value,
) -> Result<(), ReflectError> {
    let owner = instance.descriptor().name;
    instance.set(field, value).map_err(|e| e.with_context(owner))
}

/// Fields of `descriptor` and its parents, owner first. A parent field
/// shadowed by an owner field of the same name is skipped.
pub fn enumerate_fields(descriptor: &'static TypeDescriptor) -> Vec<&'static FieldDescriptor> {
    let mut out: Vec<&'static FieldDescriptor> = Vec::new();
    let mut current = Some(descriptor);
    while let Some(desc) = current {
        for field in &desc.fields {
            if !out.iter().any(|f| f.name == field.name) {
                out.push(field);
            }
        }
        current = desc.parent();
    }
    out
}

/// Getters and setters of `descriptor` and its parents, owner first.
pub fn enumerate_accessors(
    descriptor: &'static TypeDescriptor,
) -> Vec<&'static AccessorDescriptor> {
    let mut out: Vec<&'static AccessorDescriptor> = Vec::new();
    let mut current = Some(descriptor);
    while let Some(desc) = current {
        for accessor in &desc.accessors {
            if !out.iter().any(|a| a.method == accessor.method) {
                out.push(accessor);
            }
        }
        current = desc.parent();
    }
    out
}

/// Look up a field by name through the parent chain.
pub fn find_field(
    descriptor: &'static TypeDescriptor,
    name: &str,
) -> Option<&'static FieldDescriptor> {
    enumerate_fields(descriptor).into_iter().find(|f| f.name == name)
}

/// Build a default instance of `ty`.
pub fn construct(ty: &ObjectType) -> Result<Box<dyn Reflect>, ReflectError> {
    ty.construct().map_err(|e| e.with_context(ty.name()))
}

/// Concrete type argument `index` of a declared type, if retained.
///
/// `Vec<String>` yields `String`; `Vec<T>` from an erased descriptor yields
/// `None`, as does any argument still containing `Any` or a parameter.
/// Absence is not an error: callers fall back to their binding table.
pub fn resolve_generic_argument(ty: &TypeRef, index: usize) -> Option<TypeRef> {
    ty.strip_optional()
        .type_args()
        .get(index)
        .filter(|arg| arg.is_concrete())
        .map(|arg| (*arg).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_generic_argument() {
        let concrete = TypeRef::list(TypeRef::String);
        assert_eq!(resolve_generic_argument(&concrete, 0), Some(TypeRef::String));
        assert_eq!(resolve_generic_argument(&concrete, 1), None);

        let erased = TypeRef::optional(TypeRef::list(TypeRef::Param("T")));
        assert_eq!(resolve_generic_argument(&erased, 0), None);

        let map = TypeRef::map(TypeRef::String, TypeRef::I64);
        assert_eq!(resolve_generic_argument(&map, 1), Some(TypeRef::I64));
    }
}
