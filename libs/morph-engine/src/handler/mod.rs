//! Field handlers: the ordered conversion rules tried on each
//! (source field, destination field) pair.
//!
//! The chain stops at the first handler returning `Converted` or `Break`.
//! New conversions are added by inserting handlers; the default ones are
//! never edited in place.

mod collection;
mod guard;
mod object;
mod scalar;

use std::fmt;
use std::sync::Arc;

use morph_api::TypeRef;

use crate::converter::ConversionContext;
use crate::error::ConversionError;
use crate::field::FieldRef;

pub use collection::{
    ArrayToArrayHandler, ArrayToIterableHandler, IterableToArrayHandler,
    IterableToIterableHandler, MapToMapHandler,
};
pub use guard::{
    ClassLevelFieldHandler, ExcludedFieldHandler, ExpandableFieldHandler, NullValueHandler,
    SimpleConverterHandler,
};
pub use object::{ConstructorHandler, ObjectHandler, StaticFactoryHandler, UserMethodHandler};
pub use scalar::{
    CharArrayHandler, EnumHandler, FromStringHandler, NumericWideningHandler, OptionalHandler,
    SameTypeHandler, ToStringHandler,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldHandlerResult {
    /// Value produced; stop the chain.
    Converted,
    /// Not applicable; try the next handler.
    Skip,
    /// Matched but intentionally left the destination alone; stop the chain.
    Break,
}

/// A single conversion rule.
///
/// The type predicates receive classes with any `Option` layer stripped and
/// are checked before `condition`, which is checked before `handle`.
pub trait FieldHandler: Send + Sync + fmt::Debug {
    /// Stable name; configurations compare handlers by name.
    fn name(&self) -> &'static str;

    /// Whether the chain evaluates `accepts_source` / `accepts_destination`
    /// for this handler. Computing a class may read the source value, so
    /// guards that decide on names and descriptors alone return `false`.
    fn checks_types(&self) -> bool {
        true
    }

    fn accepts_source(&self, _class: &TypeRef) -> bool {
        true
    }

    fn accepts_destination(&self, _class: &TypeRef) -> bool {
        true
    }

    fn condition(
        &self,
        _source: &FieldRef<'_>,
        _destination: &FieldRef<'_>,
        _ctx: &ConversionContext,
    ) -> Result<bool, ConversionError> {
        Ok(true)
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError>;
}

pub type HandlerList = Arc<[Arc<dyn FieldHandler>]>;

/// Guards that run ahead of any caller handler.
pub fn before_default() -> Vec<Arc<dyn FieldHandler>> {
    vec![
        Arc::new(ExcludedFieldHandler),
        Arc::new(ExpandableFieldHandler),
        Arc::new(ClassLevelFieldHandler),
        Arc::new(NullValueHandler),
        Arc::new(SimpleConverterHandler),
    ]
}

/// Built-in conversions, most specific first, generic object last.
pub fn after_default() -> Vec<Arc<dyn FieldHandler>> {
    vec![
        Arc::new(SameTypeHandler),
        Arc::new(OptionalHandler),
        Arc::new(NumericWideningHandler),
        Arc::new(ToStringHandler),
        Arc::new(FromStringHandler),
        Arc::new(EnumHandler),
        Arc::new(CharArrayHandler),
        Arc::new(IterableToIterableHandler),
        Arc::new(ArrayToArrayHandler),
        Arc::new(IterableToArrayHandler),
        Arc::new(ArrayToIterableHandler),
        Arc::new(MapToMapHandler),
        Arc::new(ConstructorHandler),
        Arc::new(StaticFactoryHandler),
        Arc::new(UserMethodHandler),
        Arc::new(ObjectHandler),
    ]
}

/// The default chain: guards, then built-in conversions.
pub fn default_handlers() -> Vec<Arc<dyn FieldHandler>> {
    let mut handlers = before_default();
    handlers.extend(after_default());
    handlers
}
