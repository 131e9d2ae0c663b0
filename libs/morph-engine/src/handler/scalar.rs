use morph_api::data::{enum_to_value, enum_variant};
use morph_api::{TypeRef, Value};

use super::{FieldHandler, FieldHandlerResult};
use crate::converter::ConversionContext;
use crate::error::ConversionError;
use crate::field::FieldRef;

/// Build an integer value of type `ty`, checking the range.
pub(crate) fn integer_value(ty: &TypeRef, n: i128) -> Option<Value> {
    Some(match ty {
        TypeRef::I8 => Value::I8(i8::try_from(n).ok()?),
        TypeRef::I16 => Value::I16(i16::try_from(n).ok()?),
        TypeRef::I32 => Value::I32(i32::try_from(n).ok()?),
        TypeRef::I64 => Value::I64(i64::try_from(n).ok()?),
        TypeRef::U8 => Value::U8(u8::try_from(n).ok()?),
        TypeRef::U16 => Value::U16(u16::try_from(n).ok()?),
        TypeRef::U32 => Value::U32(u32::try_from(n).ok()?),
        TypeRef::U64 => Value::U64(u64::try_from(n).ok()?),
        _ => return None,
    })
}

/// (signed, bits) of an integer type.
fn integer_width(ty: &TypeRef) -> Option<(bool, u32)> {
    Some(match ty {
        TypeRef::I8 => (true, 8),
        TypeRef::I16 => (true, 16),
        TypeRef::I32 => (true, 32),
        TypeRef::I64 => (true, 64),
        TypeRef::U8 => (false, 8),
        TypeRef::U16 => (false, 16),
        TypeRef::U32 => (false, 32),
        TypeRef::U64 => (false, 64),
        _ => return None,
    })
}

/// True when every value of `from` is exactly representable in `to`.
pub(crate) fn widens(from: &TypeRef, to: &TypeRef) -> bool {
    if from == to {
        return false;
    }
    match (from, to) {
        (TypeRef::F32, TypeRef::F64) => true,
        // f32 carries 24 mantissa bits, f64 carries 53.
        (f, TypeRef::F32) => integer_width(f).is_some_and(|(_, bits)| bits <= 16),
        (f, TypeRef::F64) => integer_width(f).is_some_and(|(_, bits)| bits <= 32),
        (f, t) => match (integer_width(f), integer_width(t)) {
            (Some((from_signed, from_bits)), Some((to_signed, to_bits))) => {
                match (from_signed, to_signed) {
                    (true, false) => false,
                    _ => to_bits > from_bits,
                }
            }
            _ => false,
        },
    }
}

/// Destination type equals the source type, or the destination is dynamic.
#[derive(Debug, Default)]
pub struct SameTypeHandler;

impl FieldHandler for SameTypeHandler {
    fn name(&self) -> &'static str {
        "same-type"
    }

    fn condition(
        &self,
        source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
        _ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        let to = destination.class()?;
        Ok(to.strip_optional() == &TypeRef::Any || source.class()? == to)
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        destination.set_value(source.value()?.clone());
        Ok(FieldHandlerResult::Converted)
    }
}

/// `Option<T>` into `T` and back. Absence never reaches this handler.
#[derive(Debug, Default)]
pub struct OptionalHandler;

impl FieldHandler for OptionalHandler {
    fn name(&self) -> &'static str {
        "optional"
    }

    fn condition(
        &self,
        source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
        _ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        Ok(source.class()?.strip_optional() == destination.class()?.strip_optional())
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        destination.set_value(source.value()?.clone());
        Ok(FieldHandlerResult::Converted)
    }
}

/// Lossless numeric widening (`i32` → `i64`, `u16` → `f32`, `f32` → `f64`).
#[derive(Debug, Default)]
pub struct NumericWideningHandler;

impl FieldHandler for NumericWideningHandler {
    fn name(&self) -> &'static str {
        "numeric-widening"
    }

    fn accepts_source(&self, class: &TypeRef) -> bool {
        class.is_numeric()
    }

    fn accepts_destination(&self, class: &TypeRef) -> bool {
        class.is_numeric()
    }

    fn condition(
        &self,
        source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
        _ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        Ok(widens(
            source.class()?.strip_optional(),
            destination.class()?.strip_optional(),
        ))
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        let value = source.value()?;
        let to = destination.class()?.strip_optional().clone();
        let widened = match &to {
            TypeRef::F64 => value.as_f64().map(Value::F64),
            TypeRef::F32 => value.as_f64().map(|v| Value::F32(v as f32)),
            integer => value.as_i128().and_then(|n| integer_value(integer, n)),
        };
        match widened {
            Some(v) => {
                destination.set_value(v);
                Ok(FieldHandlerResult::Converted)
            }
            None => Err(ConversionError::value(source.class()?, &to, "not representable")),
        }
    }
}

/// Any scalar into its text form. Enums render as the variant name.
#[derive(Debug, Default)]
pub struct ToStringHandler;

impl FieldHandler for ToStringHandler {
    fn name(&self) -> &'static str {
        "to-string"
    }

    fn accepts_source(&self, class: &TypeRef) -> bool {
        class.is_scalar() && *class != TypeRef::String
    }

    fn accepts_destination(&self, class: &TypeRef) -> bool {
        *class == TypeRef::String
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        match source.value()?.to_text() {
            Some(text) => {
                destination.set_value(Value::Str(text));
                Ok(FieldHandlerResult::Converted)
            }
            None => Ok(FieldHandlerResult::Skip),
        }
    }
}

/// Parse text into a number, bool, char or enum variant.
#[derive(Debug, Default)]
pub struct FromStringHandler;

impl FromStringHandler {
    fn parse(text: &str, to: &TypeRef) -> Result<Value, String> {
        let trimmed = text.trim();
        match to {
            TypeRef::F64 => trimmed.parse::<f64>().map(Value::F64).map_err(|e| e.to_string()),
            TypeRef::F32 => trimmed.parse::<f32>().map(Value::F32).map_err(|e| e.to_string()),
            TypeRef::Bool => trimmed.parse::<bool>().map(Value::Bool).map_err(|e| e.to_string()),
            TypeRef::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(format!("'{text}' is not a single character")),
                }
            }
            TypeRef::Enum(ty) => enum_variant(ty.descriptor(), &Value::Str(trimmed.to_string()))
                .map(|variant| enum_to_value(*ty, variant))
                .map_err(|e| e.message),
            integer => {
                let n = trimmed.parse::<i128>().map_err(|e| e.to_string())?;
                integer_value(integer, n).ok_or_else(|| format!("{n} out of range"))
            }
        }
    }
}

impl FieldHandler for FromStringHandler {
    fn name(&self) -> &'static str {
        "from-string"
    }

    fn accepts_source(&self, class: &TypeRef) -> bool {
        *class == TypeRef::String
    }

    fn accepts_destination(&self, class: &TypeRef) -> bool {
        class.is_scalar() && *class != TypeRef::String
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        let Some(text) = source.value()?.as_str() else {
            return Ok(FieldHandlerResult::Skip);
        };
        let to = destination.class()?.strip_optional().clone();
        let parsed = Self::parse(text, &to)
            .map_err(|reason| ConversionError::value(&TypeRef::String, &to, reason))?;
        destination.set_value(parsed);
        Ok(FieldHandlerResult::Converted)
    }
}

/// Enum to enum by variant name, enum to integer by ordinal, integer to
/// enum by ordinal.
#[derive(Debug, Default)]
pub struct EnumHandler;

impl FieldHandler for EnumHandler {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn accepts_source(&self, class: &TypeRef) -> bool {
        matches!(class, TypeRef::Enum(_)) || class.is_integer()
    }

    fn accepts_destination(&self, class: &TypeRef) -> bool {
        matches!(class, TypeRef::Enum(_)) || class.is_integer()
    }

    fn condition(
        &self,
        source: &FieldRef<'_>,
        destination: &FieldRef<'_>,
        _ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        Ok(matches!(source.class()?.strip_optional(), TypeRef::Enum(_))
            || matches!(destination.class()?.strip_optional(), TypeRef::Enum(_)))
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        let from = source.class()?.strip_optional().clone();
        let to = destination.class()?.strip_optional().clone();
        let value = source.value()?;
        let converted = match (value, &to) {
            (Value::Enum(e), TypeRef::Enum(target)) => {
                let variant = enum_variant(target.descriptor(), &Value::Str(e.variant.to_string()))
                    .map_err(|err| ConversionError::value(&from, &to, err.message))?;
                enum_to_value(*target, variant)
            }
            (Value::Enum(e), integer) => integer_value(integer, e.ordinal as i128)
                .ok_or_else(|| ConversionError::value(&from, &to, "ordinal out of range"))?,
            (other, TypeRef::Enum(target)) => {
                let variant = other
                    .as_i128()
                    .and_then(|n| usize::try_from(n).ok())
                    .and_then(|n| target.descriptor().variants.get(n).copied())
                    .ok_or_else(|| {
                        ConversionError::value(&from, &to, "no variant with this ordinal")
                    })?;
                enum_to_value(*target, variant)
            }
            _ => return Ok(FieldHandlerResult::Skip),
        };
        destination.set_value(converted);
        Ok(FieldHandlerResult::Converted)
    }
}

/// `String` to a char array or char list and back.
#[derive(Debug, Default)]
pub struct CharArrayHandler;

impl FieldHandler for CharArrayHandler {
    fn name(&self) -> &'static str {
        "char-array"
    }

    fn accepts_source(&self, class: &TypeRef) -> bool {
        *class == TypeRef::String || class.is_char_sequence()
    }

    fn accepts_destination(&self, class: &TypeRef) -> bool {
        *class == TypeRef::String || class.is_char_sequence()
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        let to = destination.class()?.strip_optional().clone();
        let converted = match (source.value()?, &to) {
            (Value::Str(text), TypeRef::Array(_)) => {
                Value::Array(text.chars().map(Value::Char).collect())
            }
            (Value::Str(text), TypeRef::List(_)) => {
                Value::List(text.chars().map(Value::Char).collect())
            }
            (sequence, TypeRef::String) => {
                let Some(items) = sequence.as_sequence() else {
                    return Ok(FieldHandlerResult::Skip);
                };
                let mut text = String::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Char(c) => text.push(*c),
                        other => {
                            return Err(ConversionError::value(
                                source.class()?,
                                &to,
                                format!("element is {}, not char", other.kind_name()),
                            ))
                        }
                    }
                }
                Value::Str(text)
            }
            _ => return Ok(FieldHandlerResult::Skip),
        };
        destination.set_value(converted);
        Ok(FieldHandlerResult::Converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widening_table() {
        assert!(widens(&TypeRef::I32, &TypeRef::I64));
        assert!(widens(&TypeRef::U8, &TypeRef::I16));
        assert!(widens(&TypeRef::I32, &TypeRef::F64));
        assert!(widens(&TypeRef::F32, &TypeRef::F64));
        assert!(!widens(&TypeRef::I64, &TypeRef::I32));
        assert!(!widens(&TypeRef::I8, &TypeRef::U64));
        assert!(!widens(&TypeRef::U32, &TypeRef::I32));
        assert!(!widens(&TypeRef::I32, &TypeRef::F32));
        assert!(!widens(&TypeRef::I64, &TypeRef::F64));
    }

    #[test]
    fn test_parse_from_string() {
        assert_eq!(FromStringHandler::parse("19", &TypeRef::I64), Ok(Value::I64(19)));
        assert_eq!(FromStringHandler::parse(" true ", &TypeRef::Bool), Ok(Value::Bool(true)));
        assert_eq!(FromStringHandler::parse("x", &TypeRef::Char), Ok(Value::Char('x')));
        assert!(FromStringHandler::parse("300", &TypeRef::U8).is_err());
        assert!(FromStringHandler::parse("abc", &TypeRef::I32).is_err());
    }
}
