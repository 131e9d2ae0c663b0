use morph_api::{TypeRef, Value};

use super::{FieldHandler, FieldHandlerResult};
use crate::converter::ConversionContext;
use crate::error::ConversionError;
use crate::field::FieldRef;

/// Element type of the destination: the retained generic argument, else the
/// binding-resolved class, else `Any`.
fn target_element(destination: &FieldRef<'_>) -> Result<TypeRef, ConversionError> {
    if let Some(element) = destination.generic_argument(0) {
        return Ok(element);
    }
    Ok(destination
        .class()?
        .strip_optional()
        .element()
        .cloned()
        .unwrap_or(TypeRef::Any))
}

fn convert_elements(
    items: &[Value],
    from: &TypeRef,
    to: &TypeRef,
    ctx: &mut ConversionContext,
) -> Result<Vec<Value>, ConversionError> {
    if *to == TypeRef::Any {
        return Ok(items.to_vec());
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            ctx.convert_value(item.clone(), from, to)
                .map_err(|e| e.with_context(format!("[{i}]")))
        })
        .collect()
}

/// Shared body of the four sequence handlers: convert every element into the
/// destination element type and build the destination container kind.
fn convert_sequence(
    source: &FieldRef<'_>,
    destination: &mut FieldRef<'_>,
    ctx: &mut ConversionContext,
) -> Result<FieldHandlerResult, ConversionError> {
    let Some(items) = source.value()?.as_sequence() else {
        return Ok(FieldHandlerResult::Skip);
    };
    let from = source
        .class()?
        .strip_optional()
        .element()
        .cloned()
        .unwrap_or(TypeRef::Any);
    let to = target_element(destination)?;
    let elements = convert_elements(items, &from, &to, ctx)?;
    let converted = match destination.class()?.strip_optional() {
        TypeRef::Set(_) => Value::Set(elements),
        TypeRef::Array(_) => Value::Array(elements),
        _ => Value::List(elements),
    };
    destination.set_value(converted);
    Ok(FieldHandlerResult::Converted)
}

macro_rules! sequence_handler {
    ($(#[$doc:meta])* $name:ident, $label:literal, $source:expr, $destination:expr) => {
        $(#[$doc])*
        #[derive(Debug, Default)]
        pub struct $name;

        impl FieldHandler for $name {
            fn name(&self) -> &'static str {
                $label
            }

            fn accepts_source(&self, class: &TypeRef) -> bool {
                $source(class)
            }

            fn accepts_destination(&self, class: &TypeRef) -> bool {
                $destination(class)
            }

            fn handle(
                &self,
                source: &FieldRef<'_>,
                destination: &mut FieldRef<'_>,
                ctx: &mut ConversionContext,
            ) -> Result<FieldHandlerResult, ConversionError> {
                convert_sequence(source, destination, ctx)
            }
        }
    };
}

fn is_array(class: &TypeRef) -> bool {
    matches!(class, TypeRef::Array(_))
}

sequence_handler!(
    /// List or set into list or set.
    IterableToIterableHandler,
    "iterable-to-iterable",
    TypeRef::is_iterable,
    TypeRef::is_iterable
);

sequence_handler!(
    /// Array into array.
    ArrayToArrayHandler,
    "array-to-array",
    is_array,
    is_array
);

sequence_handler!(
    IterableToArrayHandler,
    "iterable-to-array",
    TypeRef::is_iterable,
    is_array
);

sequence_handler!(
    ArrayToIterableHandler,
    "array-to-iterable",
    is_array,
    TypeRef::is_iterable
);

/// Map into map, converting keys and values separately.
#[derive(Debug, Default)]
pub struct MapToMapHandler;

impl FieldHandler for MapToMapHandler {
    fn name(&self) -> &'static str {
        "map-to-map"
    }

    fn accepts_source(&self, class: &TypeRef) -> bool {
        matches!(class, TypeRef::Map(..))
    }

    fn accepts_destination(&self, class: &TypeRef) -> bool {
        matches!(class, TypeRef::Map(..))
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        let Value::Map(entries) = source.value()? else {
            return Ok(FieldHandlerResult::Skip);
        };
        let (from_key, from_value) = match source.class()?.strip_optional() {
            TypeRef::Map(k, v) => ((**k).clone(), (**v).clone()),
            _ => (TypeRef::Any, TypeRef::Any),
        };
        let (to_key, to_value) = match destination.class()?.strip_optional() {
            TypeRef::Map(k, v) => ((**k).clone(), (**v).clone()),
            _ => (TypeRef::Any, TypeRef::Any),
        };
        let mut converted = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let context = key.to_text().unwrap_or_else(|| key.kind_name().to_string());
            let key = ctx
                .convert_value(key.clone(), &from_key, &to_key)
                .map_err(|e| e.with_context(format!("key {context}")))?;
            let value = ctx
                .convert_value(value.clone(), &from_value, &to_value)
                .map_err(|e| e.with_context(format!("[{context}]")))?;
            converted.push((key, value));
        }
        destination.set_value(Value::Map(converted));
        Ok(FieldHandlerResult::Converted)
    }
}
