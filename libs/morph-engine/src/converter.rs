//! Object-to-object conversion driven by the configured handler and strategy
//! chains.
//!
//! The converter does not detect cycles: a source graph that reaches itself
//! through owned objects cannot exist, but one that reaches itself through
//! `Arc<RwLock<_>>` recurses until the stack is exhausted when the
//! destination types force a deep conversion. Flatten such graphs with
//! [`crate::PropertyConversionEngine`] instead.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use morph_api::access::{construct, enumerate_accessors, enumerate_fields, set_field_value};
use morph_api::{
    AccessorDescriptor, AccessorKind, Data, Describe, FieldDescriptor, ObjectType, Reflect,
    TypeDescriptor, TypeRef, Value,
};

use crate::config::Configuration;
use crate::error::ConversionError;
use crate::field::FieldRef;
use crate::generic::{erase_params, TypeBindings};
use crate::handler::FieldHandlerResult;
use crate::strategy::source_type_name;

/// One writable member of a destination type: a field, a setter, or both.
struct DestinationMember {
    name: String,
    field: Option<&'static FieldDescriptor>,
    setter: Option<&'static AccessorDescriptor>,
    ty: &'static TypeRef,
}

fn destination_members(descriptor: &'static TypeDescriptor) -> Vec<DestinationMember> {
    let mut members: Vec<DestinationMember> = enumerate_fields(descriptor)
        .into_iter()
        .filter(|f| !f.class_level)
        .map(|f| DestinationMember {
            name: f.name.to_string(),
            field: Some(f),
            setter: None,
            ty: &f.ty,
        })
        .collect();
    for accessor in enumerate_accessors(descriptor) {
        if accessor.kind != AccessorKind::Setter {
            continue;
        }
        let Some(property) = accessor.property_name() else {
            continue;
        };
        match members.iter_mut().find(|m| m.name == property) {
            Some(member) => {
                member.setter = Some(accessor);
                member.ty = &accessor.ty;
            }
            None => members.push(DestinationMember {
                name: property,
                field: None,
                setter: Some(accessor),
                ty: &accessor.ty,
            }),
        }
    }
    members
}

/// Source name for a destination field: a `when`-matched override, else an
/// unconditional override, else the field's own name.
fn effective_source_name(member: &DestinationMember, source_type: Option<&str>) -> String {
    let Some(field) = member.field else {
        return member.name.clone();
    };
    let conditional = field
        .sources
        .iter()
        .find(|s| s.when.is_some() && s.when == source_type);
    let unconditional = field.sources.iter().find(|s| s.when.is_none());
    conditional
        .or(unconditional)
        .map(|s| s.name.to_string())
        .unwrap_or_else(|| member.name.clone())
}

/// Per-call conversion state.
///
/// Holds the active configuration, which is swapped for a derived copy while
/// converting into a generic destination, and a memo of resolved destination
/// member types. Created fresh for each top-level call.
pub struct ConversionContext {
    config: Arc<Configuration>,
    classes: HashMap<(usize, String, TypeBindings), TypeRef>,
}

impl ConversionContext {
    pub fn new(config: Arc<Configuration>) -> Self {
        Self { config, classes: HashMap::new() }
    }

    pub fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    /// Convert a free-standing value (a collection element, a map entry) into
    /// `destination`. A null value stays null.
    pub fn convert_value(
        &mut self,
        value: Value,
        source_type: &TypeRef,
        destination: &TypeRef,
    ) -> Result<Value, ConversionError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let source = FieldRef::detached("[element]", value, source_type.clone());
        let mut slot = FieldRef::slot("[element]", self.config.bindings().resolve(destination));
        match self.run_chain(&source, &mut slot)? {
            FieldHandlerResult::Converted => Ok(slot.take_pending().unwrap_or(Value::Null)),
            FieldHandlerResult::Break => Ok(Value::Null),
            FieldHandlerResult::Skip => {
                Err(ConversionError::unsupported(source.class()?, slot.class()?))
            }
        }
    }

    /// Build a fresh destination object and convert `source` into it.
    pub fn convert_object(
        &mut self,
        source: &Value,
        destination: &ObjectType,
    ) -> Result<Box<dyn Reflect>, ConversionError> {
        let mut target =
            construct(destination).map_err(|e| ConversionError::Misuse(e.to_string()))?;
        self.populate(source, destination, target.as_mut())?;
        Ok(target)
    }

    /// Convert `source` into an existing destination object.
    ///
    /// Type parameters of `destination` are bound for the duration of the
    /// call. Fields converted before a failure stay converted.
    pub fn populate(
        &mut self,
        source: &Value,
        destination: &ObjectType,
        target: &mut dyn Reflect,
    ) -> Result<(), ConversionError> {
        if !matches!(source, Value::Object(_) | Value::Shared(_) | Value::Map(_)) {
            return Err(ConversionError::Misuse(format!(
                "cannot convert a {} into {}",
                source.kind_name(),
                destination
            )));
        }
        let scoped = self.bind_params(destination);
        let previous = std::mem::replace(&mut self.config, scoped);
        let result = self.populate_fields(source, destination.descriptor(), target);
        self.config = previous;
        result
    }

    fn bind_params(&self, destination: &ObjectType) -> Arc<Configuration> {
        let mut config = self.config.clone();
        let descriptor = destination.descriptor();
        for (param, arg) in descriptor.type_params.iter().zip(&destination.args) {
            let resolved = erase_params(&config.bindings().resolve(arg));
            if config.bindings().get(param) != Some(&resolved) {
                config = config.copy_with(*param, resolved);
            }
        }
        config
    }

    fn populate_fields(
        &mut self,
        source: &Value,
        descriptor: &'static TypeDescriptor,
        target: &mut dyn Reflect,
    ) -> Result<(), ConversionError> {
        let source_type = source_type_name(source);
        for member in destination_members(descriptor) {
            let source_name = effective_source_name(&member, source_type);
            let Some(source_ref) = self.resolve_source(source, &source_name)? else {
                tracing::trace!(
                    destination = %member.name,
                    source = %source_name,
                    "no source field, left unmodified"
                );
                continue;
            };
            let declared = self.member_class(descriptor, &member);
            let mut destination =
                FieldRef::destination(member.name.as_str(), member.field, member.setter, declared);
            self.run_chain(&source_ref, &mut destination)
                .and_then(|_| match destination.take_pending() {
                    Some(value) => commit(target, &member, value),
                    None => Ok(()),
                })
                .map_err(|e| e.in_field(&source_name, &member.name))?;
        }
        Ok(())
    }

    fn resolve_source<'a>(
        &self,
        source: &'a Value,
        name: &str,
    ) -> Result<Option<FieldRef<'a>>, ConversionError> {
        for strategy in self.config.strategies().iter() {
            if let Some(found) = strategy.resolve(source, name)? {
                if found.has_owner() {
                    tracing::trace!(strategy = strategy.name(), field = name, "source resolved");
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }

    /// Declared type of a destination member under the active bindings.
    fn member_class(
        &mut self,
        descriptor: &'static TypeDescriptor,
        member: &DestinationMember,
    ) -> TypeRef {
        if !member.ty.has_params() {
            return member.ty.clone();
        }
        let owner = descriptor as *const TypeDescriptor as usize;
        let key = (owner, member.name.clone(), self.config.bindings().clone());
        if let Some(class) = self.classes.get(&key) {
            return class.clone();
        }
        let class = self.config.bindings().resolve(member.ty);
        self.classes.insert(key, class.clone());
        class
    }

    fn run_chain(
        &mut self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
    ) -> Result<FieldHandlerResult, ConversionError> {
        let handlers = self.config.handlers().clone();
        for handler in handlers.iter() {
            if handler.checks_types()
                && (!handler.accepts_source(source.class()?.strip_optional())
                    || !handler.accepts_destination(destination.class()?.strip_optional()))
            {
                continue;
            }
            if !handler.condition(source, destination, self)? {
                continue;
            }
            match handler.handle(source, destination, self)? {
                FieldHandlerResult::Skip => continue,
                outcome => {
                    tracing::debug!(
                        source = source.name(),
                        destination = destination.name(),
                        handler = handler.name(),
                        ?outcome,
                        "field handled"
                    );
                    return Ok(outcome);
                }
            }
        }
        tracing::trace!(
            source = source.name(),
            destination = destination.name(),
            "no handler matched"
        );
        Ok(FieldHandlerResult::Skip)
    }
}

fn commit(
    target: &mut dyn Reflect,
    member: &DestinationMember,
    value: Value,
) -> Result<(), ConversionError> {
    match (member.setter, member.field) {
        (Some(setter), _) => target
            .call_setter(setter.method, value)
            .map_err(|e| ConversionError::from(e).with_context(setter.method)),
        (None, Some(field)) => Ok(set_field_value(target, field.name, value)?),
        (None, None) => Ok(()),
    }
}

/// Converts values into reflected destination types.
///
/// Each call runs with a fresh [`ConversionContext`]; one converter can be
/// shared across threads. No cycle detection, see the module docs.
#[derive(Debug, Clone)]
pub struct ObjectConverter {
    config: Arc<Configuration>,
}

impl Default for ObjectConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectConverter {
    pub fn new() -> Self {
        Self { config: Configuration::default_config() }
    }

    pub fn with_config(config: Arc<Configuration>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    /// Convert `source` into a new `D` built by `D::construct`.
    pub fn convert<D: Describe>(&self, source: &impl Data) -> Result<D, ConversionError> {
        let destination = D::construct().map_err(|e| ConversionError::Misuse(e.to_string()))?;
        self.convert_into(source, destination)
    }

    /// Convert `source` into a caller-built destination.
    pub fn convert_into<D: Describe>(
        &self,
        source: &impl Data,
        destination: D,
    ) -> Result<D, ConversionError> {
        let source = source.to_value();
        self.convert_value_into(&source, destination)
    }

    /// Convert, then hand both sides to `extra`, which runs last and may
    /// override anything the automatic conversion produced.
    pub fn convert_with<D, F>(&self, source: &impl Data, extra: F) -> Result<D, ConversionError>
    where
        D: Describe,
        F: FnOnce(&Value, &mut D) -> Result<(), ConversionError>,
    {
        let source = source.to_value();
        let destination = D::construct().map_err(|e| ConversionError::Misuse(e.to_string()))?;
        let mut destination = self.convert_value_into(&source, destination)?;
        extra(&source, &mut destination)?;
        Ok(destination)
    }

    fn convert_value_into<D: Describe>(
        &self,
        source: &Value,
        destination: D,
    ) -> Result<D, ConversionError> {
        if source.is_null() {
            return Err(ConversionError::Misuse("source is null".into()));
        }
        let ty = <D as Data>::type_ref();
        let Some(object_type) = ty.as_object() else {
            return Err(ConversionError::Misuse(format!("{ty} is not a reflected object type")));
        };
        let mut ctx = ConversionContext::new(self.config.clone());
        let mut target: Box<dyn Reflect> = Box::new(destination);
        ctx.populate(source, object_type, target.as_mut())?;
        target
            .into_any()
            .downcast::<D>()
            .map(|d| *d)
            .map_err(|_| ConversionError::Misuse(format!("destination is not a {ty}")))
    }

    /// Convert a dynamic value into any supported destination type.
    pub fn convert_to_type(
        &self,
        source: &Value,
        destination: &TypeRef,
    ) -> Result<Value, ConversionError> {
        if source.is_null() {
            return Err(ConversionError::Misuse("source is null".into()));
        }
        let mut ctx = ConversionContext::new(self.config.clone());
        ctx.convert_value(source.clone(), &source.runtime_type(), destination)
    }

    pub fn convert_slice<D: Describe>(
        &self,
        sources: &[impl Data],
    ) -> Result<Vec<D>, ConversionError> {
        sources
            .iter()
            .enumerate()
            .map(|(i, s)| self.convert(s).map_err(|e| e.with_context(format!("[{i}]"))))
            .collect()
    }

    pub fn convert_iter<D, S, I>(&self, sources: I) -> Result<Vec<D>, ConversionError>
    where
        D: Describe,
        S: Data,
        I: IntoIterator<Item = S>,
    {
        sources.into_iter().map(|s| self.convert(&s)).collect()
    }

    pub fn convert_map<K, D, S>(
        &self,
        sources: &HashMap<K, S>,
    ) -> Result<HashMap<K, D>, ConversionError>
    where
        K: Clone + Eq + Hash,
        D: Describe,
        S: Data,
    {
        sources
            .iter()
            .map(|(k, s)| Ok((k.clone(), self.convert(s)?)))
            .collect()
    }
}
