use morph_api::{ErrorKind, ReflectError, TypeRef};

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// Null source, unknown destination type, or a destination that cannot
    /// be constructed. Never retried.
    #[error("misuse: {0}")]
    Misuse(String),

    #[error("access error: {0}")]
    Access(ReflectError),

    #[error("value error: {0}")]
    Value(String),

    #[error("no conversion from {from} to {to}")]
    Unsupported { from: String, to: String },

    #[error("cannot convert '{source_field}' into '{destination_field}': {cause}")]
    Field {
        source_field: String,
        destination_field: String,
        #[source]
        cause: Box<ConversionError>,
    },

    #[error("config error: {0}")]
    Config(String),
}

impl ConversionError {
    pub fn value(from: &TypeRef, to: &TypeRef, reason: impl std::fmt::Display) -> Self {
        ConversionError::Value(format!("{from} -> {to}: {reason}"))
    }

    pub fn unsupported(from: &TypeRef, to: &TypeRef) -> Self {
        ConversionError::Unsupported { from: from.to_string(), to: to.to_string() }
    }

    /// Add context to the error.
    ///
    /// For `Access` variant, context is added to the inner `ReflectError`.
    /// `Field` errors already carry their location and are returned as is.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            ConversionError::Access(e) => ConversionError::Access(e.with_context(ctx)),
            ConversionError::Misuse(msg) => ConversionError::Misuse(format!("{ctx}: {msg}")),
            ConversionError::Value(msg) => ConversionError::Value(format!("{ctx}: {msg}")),
            ConversionError::Config(msg) => ConversionError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }

    /// Wrap a handler failure with the field pair it occurred on.
    ///
    /// Misuse and access errors are fatal on their own and pass through.
    pub fn in_field(self, source_field: &str, destination_field: &str) -> Self {
        match self {
            e @ (ConversionError::Misuse(_) | ConversionError::Access(_)) => e,
            cause => ConversionError::Field {
                source_field: source_field.to_string(),
                destination_field: destination_field.to_string(),
                cause: Box::new(cause),
            },
        }
    }
}

impl From<ReflectError> for ConversionError {
    fn from(e: ReflectError) -> Self {
        match e.kind {
            ErrorKind::Type => ConversionError::Value(e.message),
            ErrorKind::Access | ErrorKind::Construct => ConversionError::Access(e),
        }
    }
}

/// Errors raised while flattening a value graph.
#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    #[error("no property strategy supports {0}")]
    NoStrategy(String),

    #[error("access error: {0}")]
    Access(#[from] ReflectError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_kinds_map_to_conversion_errors() {
        let e = ConversionError::from(ReflectError::type_mismatch("expected i32, got string"));
        assert!(matches!(e, ConversionError::Value(_)));

        let e = ConversionError::from(ReflectError::access("Dto has no field 'x'"));
        assert!(matches!(e, ConversionError::Access(_)));
    }

    #[test]
    fn test_in_field_wraps_value_errors_only() {
        let wrapped = ConversionError::Value("bad".into()).in_field("x", "y");
        assert_eq!(wrapped.to_string(), "cannot convert 'x' into 'y': value error: bad");

        let misuse = ConversionError::Misuse("null source".into()).in_field("x", "y");
        assert!(matches!(misuse, ConversionError::Misuse(_)));
    }
}
