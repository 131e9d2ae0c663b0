//! Flattening of arbitrary value graphs into `serde_json::Value` trees.
//!
//! Objects become JSON objects keyed by field (or getter property) name;
//! collections become arrays; scalars map onto JSON scalars. An object met
//! again on its own path is replaced by `{"_cyclic_ref": "<TypeName>"}`.
//!
//! Flattening recurses once per nesting level. Only cycles are cut, so an
//! acyclic graph nested deeply enough (a long linked list) exhausts the stack.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use morph_api::access::{enumerate_accessors, enumerate_fields};
use morph_api::{AccessorKind, Data, TypeRef, Value};
use serde_json::{Map, Number};

use crate::error::PropertyError;

pub const CYCLIC_REF: &str = "_cyclic_ref";

/// Identities of the composites on the current recursion path.
#[derive(Debug, Default)]
pub struct Visiting(HashSet<usize>);

impl Visiting {
    fn enter(&mut self, identity: usize) -> bool {
        self.0.insert(identity)
    }

    fn leave(&mut self, identity: usize) {
        self.0.remove(&identity);
    }
}

/// One way of flattening a family of runtime classes.
pub trait PropertyStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn supports_type(&self, ty: &TypeRef) -> bool;

    fn flatten(
        &self,
        value: &Value,
        engine: &PropertyConversionEngine,
        visiting: &mut Visiting,
    ) -> Result<serde_json::Value, PropertyError>;
}

/// Scalars, strings and enums.
#[derive(Debug, Default)]
pub struct LeafStrategy;

impl PropertyStrategy for LeafStrategy {
    fn name(&self) -> &'static str {
        "leaf"
    }

    fn supports_type(&self, ty: &TypeRef) -> bool {
        ty.is_scalar() || matches!(ty, TypeRef::String | TypeRef::Enum(_))
    }

    fn flatten(
        &self,
        value: &Value,
        _engine: &PropertyConversionEngine,
        _visiting: &mut Visiting,
    ) -> Result<serde_json::Value, PropertyError> {
        Ok(leaf(value))
    }
}

fn leaf(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Char(c) => serde_json::Value::String(c.to_string()),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Enum(e) => serde_json::Value::String(e.variant.to_string()),
        Value::F32(f) => float(f64::from(*f)),
        Value::F64(f) => float(*f),
        Value::U64(u) => serde_json::Value::Number(Number::from(*u)),
        other => match other.as_i128().and_then(|i| i64::try_from(i).ok()) {
            Some(i) => serde_json::Value::Number(Number::from(i)),
            None => serde_json::Value::Null,
        },
    }
}

// NaN and infinities have no JSON form.
fn float(f: f64) -> serde_json::Value {
    Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// Declared `Option<T>`: flatten the inner value by its own runtime class.
#[derive(Debug, Default)]
pub struct OptionalStrategy;

impl PropertyStrategy for OptionalStrategy {
    fn name(&self) -> &'static str {
        "optional"
    }

    fn supports_type(&self, ty: &TypeRef) -> bool {
        matches!(ty, TypeRef::Optional(_))
    }

    fn flatten(
        &self,
        value: &Value,
        engine: &PropertyConversionEngine,
        visiting: &mut Visiting,
    ) -> Result<serde_json::Value, PropertyError> {
        engine.flatten_in(value, None, visiting)
    }
}

#[derive(Debug, Default)]
pub struct MapStrategy;

impl PropertyStrategy for MapStrategy {
    fn name(&self) -> &'static str {
        "map"
    }

    fn supports_type(&self, ty: &TypeRef) -> bool {
        matches!(ty, TypeRef::Map(..))
    }

    fn flatten(
        &self,
        value: &Value,
        engine: &PropertyConversionEngine,
        visiting: &mut Visiting,
    ) -> Result<serde_json::Value, PropertyError> {
        let Value::Map(entries) = value else {
            return Ok(serde_json::Value::Null);
        };
        let mut out = Map::new();
        for (key, value) in entries {
            let key = match key.to_text() {
                Some(text) => text,
                None => engine.flatten_in(key, None, visiting)?.to_string(),
            };
            out.insert(key, engine.flatten_in(value, None, visiting)?);
        }
        Ok(serde_json::Value::Object(out))
    }
}

fn flatten_items(
    value: &Value,
    engine: &PropertyConversionEngine,
    visiting: &mut Visiting,
) -> Result<serde_json::Value, PropertyError> {
    let items = value.as_sequence().unwrap_or_default();
    let items = items
        .iter()
        .map(|item| engine.flatten_in(item, None, visiting))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::Value::Array(items))
}

/// Lists and sets.
#[derive(Debug, Default)]
pub struct CollectionStrategy;

impl PropertyStrategy for CollectionStrategy {
    fn name(&self) -> &'static str {
        "collection"
    }

    fn supports_type(&self, ty: &TypeRef) -> bool {
        ty.is_iterable()
    }

    fn flatten(
        &self,
        value: &Value,
        engine: &PropertyConversionEngine,
        visiting: &mut Visiting,
    ) -> Result<serde_json::Value, PropertyError> {
        flatten_items(value, engine, visiting)
    }
}

#[derive(Debug, Default)]
pub struct ArrayStrategy;

impl PropertyStrategy for ArrayStrategy {
    fn name(&self) -> &'static str {
        "array"
    }

    fn supports_type(&self, ty: &TypeRef) -> bool {
        matches!(ty, TypeRef::Array(_))
    }

    fn flatten(
        &self,
        value: &Value,
        engine: &PropertyConversionEngine,
        visiting: &mut Visiting,
    ) -> Result<serde_json::Value, PropertyError> {
        flatten_items(value, engine, visiting)
    }
}

/// Reflected objects, owned or shared. Getters shadow fields of the same
/// property name.
#[derive(Debug, Default)]
pub struct BeanStrategy;

impl BeanStrategy {
    /// Member values read under the object's lock, which is released before
    /// any member is flattened.
    fn members(value: &Value) -> Result<Vec<(String, TypeRef, Value)>, PropertyError> {
        let members = value.with_object(|object| {
            let descriptor = object.descriptor();
            let mut members = Vec::new();
            for field in enumerate_fields(descriptor) {
                if field.class_level {
                    continue;
                }
                members.push((field.name.to_string(), field.ty.clone(), object.get(field.name)?));
            }
            for getter in enumerate_accessors(descriptor) {
                if getter.kind != AccessorKind::Getter {
                    continue;
                }
                let Some(property) = getter.property_name() else {
                    continue;
                };
                let value = object.call_getter(getter.method)?;
                match members.iter_mut().find(|(name, _, _)| *name == property) {
                    Some(member) => *member = (property, getter.ty.clone(), value),
                    None => members.push((property, getter.ty.clone(), value)),
                }
            }
            Ok(members)
        })?;
        Ok(members)
    }
}

impl PropertyStrategy for BeanStrategy {
    fn name(&self) -> &'static str {
        "bean"
    }

    fn supports_type(&self, ty: &TypeRef) -> bool {
        matches!(ty, TypeRef::Object(_) | TypeRef::Shared(_))
    }

    fn flatten(
        &self,
        value: &Value,
        engine: &PropertyConversionEngine,
        visiting: &mut Visiting,
    ) -> Result<serde_json::Value, PropertyError> {
        let Some(identity) = value.identity() else {
            return Ok(serde_json::Value::Null);
        };
        if !visiting.enter(identity) {
            let name = value.runtime_type().simple_name();
            let mut cyclic = Map::new();
            cyclic.insert(CYCLIC_REF.to_string(), serde_json::Value::String(name));
            return Ok(serde_json::Value::Object(cyclic));
        }
        let result = Self::members(value).and_then(|members| {
            let mut out = Map::new();
            for (name, declared, member) in members {
                let declared = matches!(declared, TypeRef::Optional(_)).then_some(&declared);
                out.insert(name, engine.flatten_in(&member, declared, visiting)?);
            }
            Ok(serde_json::Value::Object(out))
        });
        visiting.leave(identity);
        result
    }
}

pub fn default_strategies() -> Vec<Arc<dyn PropertyStrategy>> {
    vec![
        Arc::new(LeafStrategy),
        Arc::new(OptionalStrategy),
        Arc::new(MapStrategy),
        Arc::new(CollectionStrategy),
        Arc::new(ArrayStrategy),
        Arc::new(BeanStrategy),
    ]
}

static SHARED: LazyLock<PropertyConversionEngine> = LazyLock::new(PropertyConversionEngine::new);

/// Flattens values with an ordered strategy list.
///
/// The strategy chosen for a class is cached; the cache is shared by every
/// caller of one engine. Cycle tracking is per call.
pub struct PropertyConversionEngine {
    strategies: Vec<Arc<dyn PropertyStrategy>>,
    cache: DashMap<TypeRef, usize>,
}

impl Default for PropertyConversionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyConversionEngine {
    pub fn new() -> Self {
        Self::with_strategies(default_strategies())
    }

    pub fn with_strategies(strategies: Vec<Arc<dyn PropertyStrategy>>) -> Self {
        Self { strategies, cache: DashMap::new() }
    }

    /// Process-wide engine with the default strategies.
    pub fn shared() -> &'static PropertyConversionEngine {
        &SHARED
    }

    pub fn flatten(&self, value: &Value) -> Result<serde_json::Value, PropertyError> {
        self.flatten_in(value, None, &mut Visiting::default())
    }

    pub fn flatten_data<T: Data>(&self, data: &T) -> Result<serde_json::Value, PropertyError> {
        self.flatten(&data.to_value())
    }

    /// Flatten one node. `declared` overrides the runtime class as the
    /// dispatch key.
    pub fn flatten_in(
        &self,
        value: &Value,
        declared: Option<&TypeRef>,
        visiting: &mut Visiting,
    ) -> Result<serde_json::Value, PropertyError> {
        if value.is_null() {
            return Ok(serde_json::Value::Null);
        }
        let class = match declared {
            Some(ty) => ty.clone(),
            None => value.runtime_type(),
        };
        let strategy = self.strategy_for(&class)?;
        strategy.flatten(value, self, visiting)
    }

    fn strategy_for(&self, class: &TypeRef) -> Result<Arc<dyn PropertyStrategy>, PropertyError> {
        if let Some(index) = self.cache.get(class).map(|entry| *entry) {
            return Ok(self.strategies[index].clone());
        }
        let Some(index) = self.strategies.iter().position(|s| s.supports_type(class)) else {
            return Err(PropertyError::NoStrategy(class.to_string()));
        };
        tracing::trace!(
            class = %class,
            strategy = self.strategies[index].name(),
            "property strategy cached"
        );
        self.cache.insert(class.clone(), index);
        Ok(self.strategies[index].clone())
    }
}

impl fmt::Debug for PropertyConversionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyConversionEngine")
            .field("strategies", &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("cached", &self.cache.len())
            .finish()
    }
}
