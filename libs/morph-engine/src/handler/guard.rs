use morph_api::TypeRef;

use super::{FieldHandler, FieldHandlerResult};
use crate::converter::ConversionContext;
use crate::error::ConversionError;
use crate::field::FieldRef;

/// Never write a destination field named by the excluded-fields policy.
#[derive(Debug, Default)]
pub struct ExcludedFieldHandler;

impl FieldHandler for ExcludedFieldHandler {
    fn name(&self) -> &'static str {
        "excluded-field"
    }

    fn checks_types(&self) -> bool {
        false
    }

    fn condition(
        &self,
        _source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
        ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        Ok(destination.is_member() && ctx.config().excluded().excludes(destination.name()))
    }

    fn handle(
        &self,
        _source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        tracing::trace!(destination = destination.name(), "excluded field left untouched");
        Ok(FieldHandlerResult::Break)
    }
}

/// Skip expandable fields the policy does not expand, without reading them.
///
/// A field is expanded when the policy names either side. The chain skips
/// the class check for this handler, so neither side's value is read even
/// when the declared type is dynamic.
#[derive(Debug, Default)]
pub struct ExpandableFieldHandler;

impl FieldHandler for ExpandableFieldHandler {
    fn name(&self) -> &'static str {
        "expandable-field"
    }

    fn checks_types(&self) -> bool {
        false
    }

    fn condition(
        &self,
        source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
        ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        if !source.is_expandable() && !destination.is_expandable() {
            return Ok(false);
        }
        let policy = ctx.config().expandable();
        Ok(!policy.expands(source.name()) && !policy.expands(destination.name()))
    }

    fn handle(
        &self,
        _source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        tracing::trace!(destination = destination.name(), "expandable field not expanded");
        Ok(FieldHandlerResult::Break)
    }
}

/// Class-level members are neither read nor written.
#[derive(Debug, Default)]
pub struct ClassLevelFieldHandler;

impl FieldHandler for ClassLevelFieldHandler {
    fn name(&self) -> &'static str {
        "class-level-field"
    }

    fn checks_types(&self) -> bool {
        false
    }

    fn condition(
        &self,
        source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
        _ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        Ok(source.is_class_level() || destination.is_class_level())
    }

    fn handle(
        &self,
        _source: &FieldRef<'_>,
        _destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        Ok(FieldHandlerResult::Break)
    }
}

/// A null source leaves the destination at its current value.
#[derive(Debug, Default)]
pub struct NullValueHandler;

impl FieldHandler for NullValueHandler {
    fn name(&self) -> &'static str {
        "null-value"
    }

    fn condition(
        &self,
        source: &FieldRef<'_>,
        _destination: &FieldRef<'_>,
        _ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        Ok(source.value()?.is_null())
    }

    fn handle(
        &self,
        _source: &FieldRef<'_>,
        _destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        Ok(FieldHandlerResult::Break)
    }
}

/// Caller-registered conversions for an exact (source, destination) pair.
#[derive(Debug, Default)]
pub struct SimpleConverterHandler;

impl SimpleConverterHandler {
    fn key(
        source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
    ) -> Result<(TypeRef, TypeRef), ConversionError> {
        Ok((
            source.class()?.strip_optional().clone(),
            destination.class()?.strip_optional().clone(),
        ))
    }
}

impl FieldHandler for SimpleConverterHandler {
    fn name(&self) -> &'static str {
        "simple-converter"
    }

    fn condition(
        &self,
        source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
        ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        let converters = ctx.config().simple_converters();
        if converters.is_empty() {
            return Ok(false);
        }
        let (from, to) = Self::key(source, destination)?;
        Ok(converters.find(&from, &to).is_some())
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        let (from, to) = Self::key(source, destination)?;
        let Some(convert) = ctx.config().simple_converters().find(&from, &to).cloned() else {
            return Ok(FieldHandlerResult::Skip);
        };
        let value = convert(source.value()?)?;
        destination.set_value(value);
        Ok(FieldHandlerResult::Converted)
    }
}
