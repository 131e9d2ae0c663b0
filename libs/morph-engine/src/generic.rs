//! Type-parameter bindings threaded through recursive conversions.
//!
//! Descriptors of generic structs are erased: `Page<T>` declares `items` as
//! `Vec<T>` whatever `T` is. The concrete argument is known only where the
//! destination type was first named (`convert::<Page<Dto>>`), so every
//! descent into a generic destination records `T = Dto` in a binding table
//! that nested conversions consult.

use std::collections::BTreeMap;
use std::fmt;

use morph_api::TypeRef;

#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct TypeBindings(BTreeMap<&'static str, TypeRef>);

impl TypeBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TypeRef> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn bind(&mut self, name: &'static str, ty: TypeRef) {
        self.0.insert(name, ty);
    }

    /// Copy with one more binding; an existing binding of `name` is shadowed.
    pub fn with(&self, name: &'static str, ty: TypeRef) -> Self {
        let mut copy = self.clone();
        copy.bind(name, ty);
        copy
    }

    /// Bindings carried by a runtime object type: its descriptor's type
    /// parameters zipped with the concrete arguments.
    pub fn of_object(ty: &TypeRef) -> Self {
        let mut bindings = Self::new();
        if let Some(object) = ty.as_object() {
            for (param, arg) in object.descriptor().type_params.iter().zip(&object.args) {
                if arg.is_concrete() {
                    bindings.bind(*param, arg.clone());
                }
            }
        }
        bindings
    }

    /// Substitute bound parameters. Unbound parameters stay in place.
    pub fn resolve(&self, ty: &TypeRef) -> TypeRef {
        match ty {
            TypeRef::Param(name) => self.0.get(name).cloned().unwrap_or(TypeRef::Param(*name)),
            other if other.has_params() => {
                let args = other.type_args().into_iter().map(|arg| self.resolve(arg)).collect();
                other.clone().with_type_args(args)
            }
            other => other.clone(),
        }
    }
}

/// Replace every remaining parameter with `Any`.
pub fn erase_params(ty: &TypeRef) -> TypeRef {
    match ty {
        TypeRef::Param(_) => TypeRef::Any,
        other if other.has_params() => {
            let args = other.type_args().into_iter().map(erase_params).collect();
            other.clone().with_type_args(args)
        }
        other => other.clone(),
    }
}

impl fmt::Debug for TypeBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}
