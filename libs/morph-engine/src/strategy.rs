//! Field-resolution strategies: locate the source counterpart of a
//! destination field by name.

use std::fmt;

use morph_api::access::{enumerate_accessors, enumerate_fields, find_field};
use morph_api::{AccessorKind, Value};

use crate::error::ConversionError;
use crate::field::{FieldRef, Owner};
use crate::generic::TypeBindings;

/// A rule mapping a destination field name to a source field.
///
/// A strategy matches when it returns a reference with an owner; `None` or
/// an ownerless reference moves on to the next strategy.
pub trait ConversionStrategy: Send + Sync + fmt::Debug {
    /// Stable name; configurations compare strategies by name.
    fn name(&self) -> &'static str;

    fn resolve<'a>(
        &self,
        source: &'a Value,
        name: &str,
    ) -> Result<Option<FieldRef<'a>>, ConversionError>;
}

/// Look up `name` directly on `owner`: a map key, a field, or a getter
/// property of a reflected object.
pub fn find_member<'a>(
    owner: Owner<'a>,
    name: &str,
) -> Result<Option<FieldRef<'a>>, ConversionError> {
    let Some(value) = owner.value() else {
        return Ok(None);
    };
    match value {
        Value::Map(entries) => {
            let found = entries
                .iter()
                .find(|(key, _)| key.to_text().as_deref() == Some(name))
                .map(|(_, v)| v.clone());
            Ok(found.map(|v| FieldRef::entry(owner, name, v)))
        }
        Value::Object(_) | Value::Shared(_) => {
            let descriptor = value.with_object(|object| Ok(object.descriptor()))?;
            let field = find_field(descriptor, name);
            let getter = enumerate_accessors(descriptor).into_iter().find(|a| {
                a.kind == AccessorKind::Getter && a.property_name().as_deref() == Some(name)
            });
            let declared = match (getter, field) {
                (Some(g), _) => &g.ty,
                (None, Some(f)) => &f.ty,
                (None, None) => return Ok(None),
            };
            let declared = TypeBindings::of_object(&value.runtime_type()).resolve(declared);
            Ok(Some(FieldRef::member(owner, name, field, getter, declared)))
        }
        _ => Ok(None),
    }
}

/// Same name on both sides.
#[derive(Debug, Default)]
pub struct ExactNameStrategy;

impl ConversionStrategy for ExactNameStrategy {
    fn name(&self) -> &'static str {
        "exact-name"
    }

    fn resolve<'a>(
        &self,
        source: &'a Value,
        name: &str,
    ) -> Result<Option<FieldRef<'a>>, ConversionError> {
        find_member(Owner::Borrowed(source), name)
    }
}

/// Source fields declaring `#[reflect(alias = "...")]`.
#[derive(Debug, Default)]
pub struct AliasStrategy;

impl ConversionStrategy for AliasStrategy {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn resolve<'a>(
        &self,
        source: &'a Value,
        name: &str,
    ) -> Result<Option<FieldRef<'a>>, ConversionError> {
        if !source.is_object() {
            return Ok(None);
        }
        let descriptor = source.with_object(|object| Ok(object.descriptor()))?;
        let aliased = enumerate_fields(descriptor)
            .into_iter()
            .find(|f| f.aliases.iter().any(|alias| *alias == name));
        match aliased {
            Some(field) => {
                let declared = TypeBindings::of_object(&source.runtime_type()).resolve(&field.ty);
                Ok(Some(FieldRef::member(
                    Owner::Borrowed(source),
                    name,
                    Some(field),
                    None,
                    declared,
                )))
            }
            None => Ok(None),
        }
    }
}

/// `"address.city"` walks `address`, then reads `city`.
#[derive(Debug, Default)]
pub struct DottedPathStrategy;

impl ConversionStrategy for DottedPathStrategy {
    fn name(&self) -> &'static str {
        "dotted-path"
    }

    fn resolve<'a>(
        &self,
        source: &'a Value,
        name: &str,
    ) -> Result<Option<FieldRef<'a>>, ConversionError> {
        let Some((head, rest)) = name.split_once('.') else {
            return Ok(None);
        };
        let Some(first) = find_member(Owner::Borrowed(source), head)? else {
            return Ok(None);
        };
        let mut current = first.value()?.clone();
        let mut segments = rest.split('.').peekable();
        while let Some(segment) = segments.next() {
            if current.is_null() {
                return Ok(None);
            }
            let Some(next) = find_member(Owner::Owned(current), segment)? else {
                return Ok(None);
            };
            if segments.peek().is_none() {
                return Ok(Some(next));
            }
            current = next.value()?.clone();
        }
        Ok(None)
    }
}

/// `address_city` or `addressCity` resolved as `address` → `city`.
///
/// Splits at every `_` and at every lower-to-upper case boundary, trying the
/// shortest prefix first. Each remainder is resolved again by exact name or
/// by a further split.
#[derive(Debug, Default)]
pub struct FlattenedPathStrategy;

impl FlattenedPathStrategy {
    fn splits(name: &str) -> Vec<(String, String)> {
        let chars: Vec<(usize, char)> = name.char_indices().collect();
        let mut out = Vec::new();
        for window in chars.windows(2) {
            let (i, prev) = window[0];
            let (j, next) = window[1];
            if next == '_' && j + 1 < name.len() {
                out.push((name[..j].to_string(), name[j + 1..].to_string()));
            } else if prev.is_lowercase() && next.is_uppercase() {
                let mut rest = String::with_capacity(name.len() - j);
                rest.extend(next.to_lowercase());
                rest.push_str(&name[j + next.len_utf8()..]);
                out.push((name[..=i].to_string(), rest));
            }
        }
        out
    }

    fn resolve_owned(
        owner: Value,
        name: &str,
    ) -> Result<Option<FieldRef<'static>>, ConversionError> {
        if owner.is_null() {
            return Ok(None);
        }
        let has_direct = match &owner {
            Value::Map(_) | Value::Object(_) | Value::Shared(_) => {
                find_member(Owner::Borrowed(&owner), name)?.is_some()
            }
            _ => return Ok(None),
        };
        if has_direct {
            return find_member(Owner::Owned(owner), name);
        }
        for (prefix, rest) in Self::splits(name) {
            let Some(head) = find_member(Owner::Borrowed(&owner), &prefix)? else {
                continue;
            };
            let next = head.value()?.clone();
            if let Some(found) = Self::resolve_owned(next, &rest)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl ConversionStrategy for FlattenedPathStrategy {
    fn name(&self) -> &'static str {
        "flattened-path"
    }

    fn resolve<'a>(
        &self,
        source: &'a Value,
        name: &str,
    ) -> Result<Option<FieldRef<'a>>, ConversionError> {
        for (prefix, rest) in Self::splits(name) {
            let Some(head) = find_member(Owner::Borrowed(source), &prefix)? else {
                continue;
            };
            let next = head.value()?.clone();
            if let Some(found) = Self::resolve_owned(next, &rest)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

/// Runtime type name used for `#[reflect(source(when = "..."))]`.
pub(crate) fn source_type_name(source: &Value) -> Option<&'static str> {
    source.runtime_type().as_object().map(|o| o.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, Value)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| (Value::Str((*k).to_string()), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_exact_name_on_map() {
        let source = map(&[("s", Value::I64(1))]);
        let found = ExactNameStrategy.resolve(&source, "s").unwrap().unwrap();
        assert!(found.has_owner());
        assert_eq!(found.value().unwrap(), &Value::I64(1));
        assert!(ExactNameStrategy.resolve(&source, "t").unwrap().is_none());
    }

    #[test]
    fn test_dotted_path_through_maps() {
        let source = map(&[("address", map(&[("city", Value::Str("Oslo".into()))]))]);
        let found = DottedPathStrategy.resolve(&source, "address.city").unwrap().unwrap();
        assert_eq!(found.value().unwrap(), &Value::Str("Oslo".into()));
        assert!(DottedPathStrategy.resolve(&source, "address.zip").unwrap().is_none());
        assert!(DottedPathStrategy.resolve(&source, "address").unwrap().is_none());
    }

    #[test]
    fn test_flattened_path_snake_and_camel() {
        let source = map(&[("address", map(&[("city", Value::Str("Oslo".into()))]))]);
        for name in ["address_city", "addressCity"] {
            let found = FlattenedPathStrategy.resolve(&source, name).unwrap().unwrap();
            assert_eq!(found.value().unwrap(), &Value::Str("Oslo".into()));
        }
        assert!(FlattenedPathStrategy.resolve(&source, "addressZip").unwrap().is_none());
    }

    #[test]
    fn test_splits() {
        let splits = FlattenedPathStrategy::splits("billingAddress_city");
        assert_eq!(
            splits,
            vec![
                ("billing".to_string(), "address_city".to_string()),
                ("billingAddress".to_string(), "city".to_string()),
            ]
        );
    }
}
