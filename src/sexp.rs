//! The on-the-wire value model (`spec.md` §3.1).
//!
//! `Sexp` is the only type that crosses the boundary of this crate on the
//! wire side: `jelly` produces one, `unjelly` consumes one. What a host
//! program does with it afterwards — print it, hand it to a parser, ship
//! it over a socket — is not this crate's concern (`spec.md` §6).

/// A scalar leaf. Strings carry their bytes verbatim; there is no escaping
/// or interning at this layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Atom {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// A tagged recursive value: either an atom, or an ordered list of `Sexp`.
///
/// A list is a *compound* form when its head is an atom naming one of the
/// closed tags in [`crate::Tag`]; every other list is a plain data sequence
/// (e.g. the `[key, value]` pairs inside a `dictionary`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Sexp {
    Atom(Atom),
    List(Vec<Sexp>),
}

impl Sexp {
    pub fn null() -> Self {
        Sexp::Atom(Atom::Null)
    }

    pub fn bool(value: bool) -> Self {
        Sexp::Atom(Atom::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Sexp::Atom(Atom::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Sexp::Atom(Atom::Float(value))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Sexp::Atom(Atom::Str(value.into()))
    }

    /// Returns the head tag name of a compound list, if this is one.
    pub fn head(&self) -> Option<&str> {
        match self {
            Sexp::List(items) => match items.first() {
                Some(Sexp::Atom(Atom::Str(s))) => Some(s.as_str()),
                _ => None,
            },
            Sexp::Atom(_) => None,
        }
    }

    /// The list elements after the head tag, if this is a compound list.
    pub fn tail(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(items) if !items.is_empty() => Some(&items[1..]),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Sexp::Atom(Atom::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Sexp::Atom(Atom::Int(n)) => Some(*n),
            _ => None,
        }
    }
}
