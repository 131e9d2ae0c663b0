use std::cell::OnceCell;

use morph_api::access::{get_field_value, resolve_generic_argument};
use morph_api::{AccessorDescriptor, FieldDescriptor, TypeRef, Value};

use crate::error::ConversionError;
use crate::generic::erase_params;

/// The object a field is read from.
#[derive(Debug)]
pub enum Owner<'a> {
    Absent,
    Borrowed(&'a Value),
    /// Intermediate object reached through a path (`address.city`).
    Owned(Value),
}

impl Owner<'_> {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Owner::Absent => None,
            Owner::Borrowed(v) => Some(v),
            Owner::Owned(v) => Some(v),
        }
    }
}

/// One side of a field pair for a single conversion pass.
///
/// Value and class are computed on first use and cached for the lifetime of
/// the reference. Reads go through the getter when there is one, then the
/// raw field. A destination reference never reads: handlers store their
/// result with [`FieldRef::set_value`] and the converter commits it.
#[derive(Debug)]
pub struct FieldRef<'a> {
    name: String,
    owner: Owner<'a>,
    field: Option<&'static FieldDescriptor>,
    getter: Option<&'static AccessorDescriptor>,
    setter: Option<&'static AccessorDescriptor>,
    declared: TypeRef,
    value: OnceCell<Value>,
    class: OnceCell<TypeRef>,
    pending: Option<Value>,
}

impl<'a> FieldRef<'a> {
    fn blank(name: String, owner: Owner<'a>, declared: TypeRef) -> Self {
        Self {
            name,
            owner,
            field: None,
            getter: None,
            setter: None,
            declared,
            value: OnceCell::new(),
            class: OnceCell::new(),
            pending: None,
        }
    }

    /// A member of a reflected object. `declared` must already be resolved
    /// against the owner's type bindings.
    pub fn member(
        owner: Owner<'a>,
        name: impl Into<String>,
        field: Option<&'static FieldDescriptor>,
        getter: Option<&'static AccessorDescriptor>,
        declared: TypeRef,
    ) -> Self {
        let mut this = Self::blank(name.into(), owner, declared);
        this.field = field;
        this.getter = getter;
        this
    }

    /// An entry of a map source, read eagerly.
    pub fn entry(owner: Owner<'a>, key: impl Into<String>, value: Value) -> Self {
        let this = Self::blank(key.into(), owner, TypeRef::Any);
        let _ = this.value.set(value);
        this
    }

    /// A free-standing value, e.g. one element of a collection.
    pub fn detached(name: impl Into<String>, value: Value, declared: TypeRef) -> Self {
        let this = Self::blank(name.into(), Owner::Absent, declared);
        let _ = this.value.set(value);
        this
    }

    /// Write-only target for a free-standing value.
    pub fn slot(name: impl Into<String>, declared: TypeRef) -> Self {
        let this = Self::blank(name.into(), Owner::Absent, declared);
        let _ = this.value.set(Value::Null);
        this
    }

    /// A member of the destination object.
    pub fn destination(
        name: impl Into<String>,
        field: Option<&'static FieldDescriptor>,
        setter: Option<&'static AccessorDescriptor>,
        declared: TypeRef,
    ) -> Self {
        let mut this = Self::slot(name, declared);
        this.field = field;
        this.setter = setter;
        this
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_owner(&self) -> bool {
        !matches!(self.owner, Owner::Absent)
    }

    pub fn owner(&self) -> Option<&Value> {
        self.owner.value()
    }

    pub fn field(&self) -> Option<&'static FieldDescriptor> {
        self.field
    }

    pub fn getter(&self) -> Option<&'static AccessorDescriptor> {
        self.getter
    }

    pub fn setter(&self) -> Option<&'static AccessorDescriptor> {
        self.setter
    }

    pub fn declared(&self) -> &TypeRef {
        &self.declared
    }

    /// True for fields and accessors of a reflected type, false for map
    /// entries and free-standing values.
    pub fn is_member(&self) -> bool {
        self.field.is_some() || self.getter.is_some() || self.setter.is_some()
    }

    pub fn is_expandable(&self) -> bool {
        self.field.is_some_and(|f| f.expandable)
            || self.getter.is_some_and(|a| a.expandable)
            || self.setter.is_some_and(|a| a.expandable)
    }

    pub fn is_class_level(&self) -> bool {
        self.field.is_some_and(|f| f.class_level)
    }

    pub fn value(&self) -> Result<&Value, ConversionError> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        let value = self.read()?;
        Ok(self.value.get_or_init(|| value))
    }

    fn read(&self) -> Result<Value, ConversionError> {
        let Some(owner) = self.owner.value() else {
            return Ok(Value::Null);
        };
        let value = owner.with_object(|object| match (self.getter, self.field) {
            (Some(getter), _) => object
                .call_getter(getter.method)
                .map_err(|e| e.with_context(object.descriptor().name)),
            (None, Some(field)) => get_field_value(object, field.name),
            (None, None) => Ok(Value::Null),
        })?;
        Ok(value)
    }

    /// Class used for handler dispatch.
    ///
    /// The declared type when it is fully known; otherwise the runtime type
    /// of the value, falling back to the declared type with unbound
    /// parameters read as `Any`. The value is read only in the second case.
    pub fn class(&self) -> Result<&TypeRef, ConversionError> {
        if let Some(class) = self.class.get() {
            return Ok(class);
        }
        let class = if self.declared.is_concrete() {
            self.declared.clone()
        } else {
            match self.value()? {
                Value::Null => erase_params(&self.declared),
                value => value.runtime_type(),
            }
        };
        Ok(self.class.get_or_init(|| class))
    }

    /// Concrete type argument `index` of this field's type, if known.
    pub fn generic_argument(&self, index: usize) -> Option<TypeRef> {
        resolve_generic_argument(&self.declared, index)
            .or_else(|| self.class.get().and_then(|c| resolve_generic_argument(c, index)))
    }

    /// Store the converted value for this destination.
    pub fn set_value(&mut self, value: Value) {
        self.pending = Some(value);
    }

    pub fn take_pending(&mut self) -> Option<Value> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_class_from_runtime_value() {
        let source = FieldRef::detached("[0]", Value::I32(4), TypeRef::Any);
        assert_eq!(source.class().unwrap(), &TypeRef::I32);
        assert!(!source.is_member());
        assert!(!source.has_owner());
    }

    #[test]
    fn test_slot_class_erases_unbound_params() {
        let slot = FieldRef::slot("items", TypeRef::list(TypeRef::Param("T")));
        assert_eq!(slot.class().unwrap(), &TypeRef::list(TypeRef::Any));
        assert_eq!(slot.generic_argument(0), None);

        let typed = FieldRef::slot("items", TypeRef::list(TypeRef::String));
        assert_eq!(typed.generic_argument(0), Some(TypeRef::String));
    }

    #[test]
    fn test_pending_value() {
        let mut slot = FieldRef::slot("x", TypeRef::String);
        slot.set_value(Value::Str("13".into()));
        assert_eq!(slot.take_pending(), Some(Value::Str("13".into())));
        assert_eq!(slot.take_pending(), None);
    }
}
