//! Field-inclusion policy: which destination fields are never written, which
//! expandable fields are converted, and caller-registered scalar converters.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use morph_api::{Data, TypeRef, Value};

use crate::error::ConversionError;

/// Destination fields conversion must never write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ExcludedFields {
    #[default]
    None,
    All,
    Named(BTreeSet<String>),
}

impl ExcludedFields {
    pub fn none() -> Self {
        ExcludedFields::None
    }

    pub fn all() -> Self {
        ExcludedFields::All
    }

    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            ExcludedFields::None
        } else {
            ExcludedFields::Named(names)
        }
    }

    pub fn excludes(&self, field: &str) -> bool {
        match self {
            ExcludedFields::None => false,
            ExcludedFields::All => true,
            ExcludedFields::Named(names) => names.contains(field),
        }
    }
}

/// Which fields marked `#[reflect(expandable)]` are read and converted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ExpandableFields {
    #[default]
    All,
    None,
    Named(BTreeSet<String>),
}

impl ExpandableFields {
    pub fn all() -> Self {
        ExpandableFields::All
    }

    pub fn none() -> Self {
        ExpandableFields::None
    }

    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExpandableFields::Named(names.into_iter().map(Into::into).collect())
    }

    /// Request-style list: absent = expand all, empty = expand none,
    /// otherwise expand exactly the listed names.
    pub fn from_list(list: Option<Vec<String>>) -> Self {
        match list {
            None => ExpandableFields::All,
            Some(names) if names.is_empty() => ExpandableFields::None,
            Some(names) => ExpandableFields::named(names),
        }
    }

    pub fn expands(&self, field: &str) -> bool {
        match self {
            ExpandableFields::All => true,
            ExpandableFields::None => false,
            ExpandableFields::Named(names) => names.contains(field),
        }
    }
}

pub type ConverterFn = Arc<dyn Fn(&Value) -> Result<Value, ConversionError> + Send + Sync>;

/// Caller-registered conversions keyed by (source class, destination class).
///
/// Consulted before every default conversion handler. Two registries are
/// equal when they hold the same keys bound to the same function instances.
#[derive(Clone, Default)]
pub struct SimpleConverters {
    converters: HashMap<(TypeRef, TypeRef), ConverterFn>,
}

impl SimpleConverters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed conversion. A later registration for the same pair
    /// replaces the earlier one.
    pub fn register<S, D, F>(mut self, convert: F) -> Self
    where
        S: Data,
        D: Data,
        F: Fn(S) -> D + Send + Sync + 'static,
    {
        let key = (S::type_ref(), D::type_ref());
        let from = key.0.clone();
        let to = key.1.clone();
        let erased: ConverterFn = Arc::new(move |value: &Value| {
            let input = S::from_value(value.clone())
                .map_err(|e| ConversionError::value(&from, &to, e))?;
            Ok(convert(input).to_value())
        });
        if self.converters.insert(key, erased).is_some() {
            tracing::warn!("simple converter replaced an earlier registration");
        }
        self
    }

    pub fn find(&self, source: &TypeRef, destination: &TypeRef) -> Option<&ConverterFn> {
        self.converters.get(&(source.clone(), destination.clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }
}

impl PartialEq for SimpleConverters {
    fn eq(&self, other: &Self) -> bool {
        self.converters.len() == other.converters.len()
            && self.converters.iter().all(|(key, f)| {
                other
                    .converters
                    .get(key)
                    .is_some_and(|g| Arc::ptr_eq(f, g))
            })
    }
}

impl fmt::Debug for SimpleConverters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.converters.keys().map(|(s, d)| format!("{s} -> {d}")))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expandable_from_list() {
        assert_eq!(ExpandableFields::from_list(None), ExpandableFields::All);
        assert_eq!(ExpandableFields::from_list(Some(vec![])), ExpandableFields::None);

        let named = ExpandableFields::from_list(Some(vec!["orders".into()]));
        assert!(named.expands("orders"));
        assert!(!named.expands("lines"));
    }

    #[test]
    fn test_excluded_named() {
        let excluded = ExcludedFields::named(["password"]);
        assert!(excluded.excludes("password"));
        assert!(!excluded.excludes("login"));
        assert!(ExcludedFields::all().excludes("anything"));
        assert_eq!(ExcludedFields::named(Vec::<String>::new()), ExcludedFields::None);
    }

    #[test]
    fn test_simple_converter_registry() {
        let converters = SimpleConverters::new().register(|v: i64| v as i32);
        let f = converters.find(&TypeRef::I64, &TypeRef::I32).expect("registered");
        assert_eq!(f(&Value::I64(7)).unwrap(), Value::I32(7));
        assert!(converters.find(&TypeRef::I32, &TypeRef::I64).is_none());

        assert_eq!(converters, converters.clone());
        assert_ne!(converters, SimpleConverters::new().register(|v: i64| v as i32));
    }
}
