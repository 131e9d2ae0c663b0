pub mod config;
pub mod converter;
pub mod error;
pub mod field;
pub mod generic;
pub mod handler;
pub mod policy;
pub mod property;
pub mod strategy;

use std::sync::Arc;

use morph_api::{Data, Describe, Value};

pub use config::{Configuration, ConfigurationBuilder, ConversionSettings};
pub use converter::{ConversionContext, ObjectConverter};
pub use error::{ConversionError, PropertyError};
pub use field::{FieldRef, Owner};
pub use generic::TypeBindings;
pub use handler::{FieldHandler, FieldHandlerResult};
pub use policy::{ExcludedFields, ExpandableFields, SimpleConverters};
pub use property::{PropertyConversionEngine, PropertyStrategy};
pub use strategy::ConversionStrategy;

/// Convert `source` into a new `D` with the default configuration.
pub fn convert<D: Describe>(source: &impl Data) -> Result<D, ConversionError> {
    ObjectConverter::new().convert(source)
}

/// Convert with an explicit configuration, then run `extra` on both sides.
pub fn convert_with<D, F>(
    source: &impl Data,
    config: Arc<Configuration>,
    extra: F,
) -> Result<D, ConversionError>
where
    D: Describe,
    F: FnOnce(&Value, &mut D) -> Result<(), ConversionError>,
{
    ObjectConverter::with_config(config).convert_with(source, extra)
}
