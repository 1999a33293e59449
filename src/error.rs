//! Error taxonomy (`spec.md` §7).
//!
//! Plain enums with hand-written `Display`/`Error` impls, matching the
//! teacher's `ResourceError`/`SessionError` style — no `thiserror`.

use std::fmt;

/// A value could not be represented at all. Always fatal to the `jelly`
/// call that produced it (contrast with an embedded `(unpersistable …)`,
/// which is a soft, per-object failure and not an error value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A built-in (non-user) callable was encountered. Unimplemented in the
    /// original source (`_jelly_builtin_function_or_method` simply raises);
    /// specced here as a typed error rather than a panic.
    UnsupportedValue(String),
    /// The `Reflector` failed to answer a question the encoder needed.
    Reflect(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedValue(what) => write!(f, "cannot jelly {what}"),
            Self::Reflect(msg) => write!(f, "reflector error: {msg}"),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<ReflectError> for EncodeError {
    fn from(err: ReflectError) -> Self {
        EncodeError::Reflect(err.0)
    }
}

/// Errors surfaced to the caller of `unjelly`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A tag, module, or class not permitted by the `Taster` was
    /// encountered, or a structural rule was violated in a way that could
    /// indicate a crafted adversarial input. Always fatal.
    InsecureJelly(String),
    /// Well-formed atoms/lists but malformed structure: unknown tag, bad
    /// arity, wrong atom type at a fixed position, a dangling
    /// `dereference`, or a reflector construction failure. Always fatal.
    FormatError(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsecureJelly(msg) => write!(f, "insecure jelly: {msg}"),
            Self::FormatError(msg) => write!(f, "malformed jelly: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl DecodeError {
    pub fn insecure(message: impl Into<String>) -> Self {
        Self::InsecureJelly(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::FormatError(message.into())
    }
}

/// A failure reported by a [`crate::Reflector`] implementation (e.g. no
/// such module, a class that refused to construct an instance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectError(pub String);

impl fmt::Display for ReflectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ReflectError {}

impl From<ReflectError> for DecodeError {
    fn from(err: ReflectError) -> Self {
        DecodeError::FormatError(err.0)
    }
}
