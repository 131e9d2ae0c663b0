use std::fmt;

/// Error kind for reflective access errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown field or accessor, poisoned lock, inaccessible member.
    Access,
    /// Value shape does not fit the declared type.
    Type,
    /// No usable constructor for the requested type.
    Construct,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Access => f.write_str("access"),
            ErrorKind::Type => f.write_str("type"),
            ErrorKind::Construct => f.write_str("construct"),
        }
    }
}

/// Reflection error returned by every `Reflect`/`Data` method.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ReflectError {
    pub fn access(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Access, message: msg.into() }
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Type, message: msg.into() }
    }

    pub fn construct(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Construct, message: msg.into() }
    }

    /// Shorthand for the common "expected X, got Y" type error.
    pub fn expected(expected: impl fmt::Display, got: impl fmt::Display) -> Self {
        Self::type_mismatch(format!("expected {expected}, got {got}"))
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Display for ReflectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ReflectError {}

impl<T> From<std::sync::PoisonError<T>> for ReflectError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::access(format!("shared object lock poisoned: {e}"))
    }
}
