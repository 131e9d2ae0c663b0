use morph_api::{Conversion, ObjectBox, ObjectType, TypeRef, UserMethod, Value};

use super::{FieldHandler, FieldHandlerResult};
use crate::converter::ConversionContext;
use crate::error::ConversionError;
use crate::field::FieldRef;

fn is_object(class: &TypeRef) -> bool {
    matches!(class, TypeRef::Object(_) | TypeRef::Shared(_))
}

fn destination_object(destination: &FieldRef<'_>) -> Result<Option<ObjectType>, ConversionError> {
    Ok(destination.class()?.strip_optional().as_object().cloned())
}

/// First single-argument conversion on the destination type whose argument
/// type is the source class.
fn find_conversion(
    conversions: &'static [Conversion],
    source: &FieldRef<'_>,
) -> Result<Option<&'static Conversion>, ConversionError> {
    if conversions.is_empty() {
        return Ok(None);
    }
    let from = source.class()?.strip_optional();
    Ok(conversions.iter().find(|c| c.arg == *from))
}

fn apply_conversion(
    conversion: &Conversion,
    source: &FieldRef<'_>,
    destination: &mut FieldRef<'_>,
) -> Result<FieldHandlerResult, ConversionError> {
    let value = (conversion.call)(source.value()?.clone())
        .map_err(|e| ConversionError::from(e).with_context(conversion.path))?;
    destination.set_value(value);
    Ok(FieldHandlerResult::Converted)
}

/// `#[reflect(constructor(path, arg))]` on the destination type.
#[derive(Debug, Default)]
pub struct ConstructorHandler;

impl FieldHandler for ConstructorHandler {
    fn name(&self) -> &'static str {
        "constructor"
    }

    fn accepts_destination(&self, class: &TypeRef) -> bool {
        is_object(class)
    }

    fn condition(
        &self,
        source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
        _ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        let Some(ty) = destination_object(destination)? else {
            return Ok(false);
        };
        Ok(find_conversion(&ty.descriptor().constructors, source)?.is_some())
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        let Some(ty) = destination_object(destination)? else {
            return Ok(FieldHandlerResult::Skip);
        };
        match find_conversion(&ty.descriptor().constructors, source)? {
            Some(constructor) => apply_conversion(constructor, source, destination),
            None => Ok(FieldHandlerResult::Skip),
        }
    }
}

/// `#[reflect(factory(path, arg))]` on the destination type. Factory errors
/// surface as value errors.
#[derive(Debug, Default)]
pub struct StaticFactoryHandler;

impl FieldHandler for StaticFactoryHandler {
    fn name(&self) -> &'static str {
        "static-factory"
    }

    fn accepts_destination(&self, class: &TypeRef) -> bool {
        is_object(class)
    }

    fn condition(
        &self,
        source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
        _ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        let Some(ty) = destination_object(destination)? else {
            return Ok(false);
        };
        Ok(find_conversion(&ty.descriptor().factories, source)?.is_some())
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        let Some(ty) = destination_object(destination)? else {
            return Ok(FieldHandlerResult::Skip);
        };
        match find_conversion(&ty.descriptor().factories, source)? {
            Some(factory) => apply_conversion(factory, source, destination),
            None => Ok(FieldHandlerResult::Skip),
        }
    }
}

/// `#[reflect(into(method, ty))]` on the source type.
#[derive(Debug, Default)]
pub struct UserMethodHandler;

impl UserMethodHandler {
    fn find(
        source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
    ) -> Result<Option<&'static UserMethod>, ConversionError> {
        let Some(ty) = source.class()?.strip_optional().as_object() else {
            return Ok(None);
        };
        let methods = &ty.descriptor().methods;
        if methods.is_empty() {
            return Ok(None);
        }
        let to = destination.class()?.strip_optional();
        Ok(methods.iter().find(|m| m.target == *to))
    }
}

impl FieldHandler for UserMethodHandler {
    fn name(&self) -> &'static str {
        "user-method"
    }

    fn accepts_source(&self, class: &TypeRef) -> bool {
        is_object(class)
    }

    fn condition(
        &self,
        source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
        _ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        Ok(Self::find(source, destination)?.is_some())
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        let Some(method) = Self::find(source, destination)? else {
            return Ok(FieldHandlerResult::Skip);
        };
        let value = source
            .value()?
            .with_object(|object| (method.call)(object))
            .map_err(|e| ConversionError::from(e).with_context(method.method))?;
        destination.set_value(value);
        Ok(FieldHandlerResult::Converted)
    }
}

/// Catch-all: build the destination object and convert it field by field
/// from a source object or map.
#[derive(Debug, Default)]
pub struct ObjectHandler;

impl FieldHandler for ObjectHandler {
    fn name(&self) -> &'static str {
        "object"
    }

    fn accepts_source(&self, class: &TypeRef) -> bool {
        is_object(class) || matches!(class, TypeRef::Map(..))
    }

    fn accepts_destination(&self, class: &TypeRef) -> bool {
        is_object(class)
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        let Some(ty) = destination_object(destination)? else {
            return Ok(FieldHandlerResult::Skip);
        };
        let object = ctx.convert_object(source.value()?, &ty)?;
        destination.set_value(Value::Object(ObjectBox::new(object)));
        Ok(FieldHandlerResult::Converted)
    }
}
