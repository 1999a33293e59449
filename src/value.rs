//! The live host value model: what `unjelly` produces and `jelly` consumes.
//!
//! Scalars are plain Rust values. Compound containers that may participate
//! in cycles (`list`, `dictionary`) use `Rc<RefCell<_>>` for interior
//! mutability and shared ownership; `tuple` is immutable once built and uses
//! a plain `Rc<Vec<_>>` (its members may still be mutable containers, which
//! is how a cycle can pass through a tuple — `spec.md` §9).

use std::cell::RefCell;
use std::rc::Rc;

use crate::identity::{rc_identity, HasIdentity, Identity};
use crate::reflector::Reflector;

/// A live value materialized by `unjelly`, or about to be consumed by
/// `jelly`. Generic over the host bridge `R` so instance/class/module/
/// function/method handles stay the host's own concrete types.
pub enum Value<R: Reflector> {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Rc<RefCell<Vec<Value<R>>>>),
    Dict(Rc<RefCell<Dict<R>>>),
    Tuple(Rc<Vec<Value<R>>>),
    Instance(R::Instance),
    Class(R::Class),
    Module(R::Module),
    Function(R::Function),
    Method(R::Method),
    /// An externally managed object identified by an opaque wire value,
    /// materialized as whatever the persistent-load callback returned —
    /// represented here by folding back to one of the other variants, since
    /// the callback returns a live `Value<R>` (`spec.md` §4.4.5).
    Unpersistable(Unpersistable),
    /// A built-in (non-user) callable, named for diagnostics only. The
    /// original leaves `_jelly_builtin_function_or_method` unimplemented
    /// (`examples/original_source/twisted/spread/jelly.py`); this crate
    /// gives that same refusal a typed shape: encoding one always yields
    /// `EncodeError::UnsupportedValue` rather than panicking.
    Builtin(String),
}

impl<R: Reflector> Value<R> {
    pub fn list(items: Vec<Value<R>>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn dict(entries: Vec<(Value<R>, Value<R>)>) -> Self {
        Value::Dict(Rc::new(RefCell::new(Dict(entries))))
    }

    pub fn tuple(items: Vec<Value<R>>) -> Self {
        Value::Tuple(Rc::new(items))
    }

    /// The identity of this value for encoder bookkeeping, or `None` for
    /// scalars and unpersistable placeholders — neither can participate in
    /// a cycle and neither needs back-reference tracking (`spec.md` §4.3.3).
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Value::None
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Str(_)
            | Value::Unpersistable(_)
            | Value::Builtin(_) => None,
            Value::List(rc) => Some(rc_identity(rc)),
            Value::Dict(rc) => Some(rc_identity(rc)),
            Value::Tuple(rc) => Some(rc_identity(rc)),
            Value::Instance(h) => Some(h.identity()),
            Value::Class(h) => Some(h.identity()),
            Value::Module(h) => Some(h.identity()),
            Value::Function(h) => Some(h.identity()),
            Value::Method(h) => Some(h.identity()),
        }
    }
}

impl<R: Reflector> Clone for Value<R> {
    fn clone(&self) -> Self {
        match self {
            Value::None => Value::None,
            Value::Bool(b) => Value::Bool(*b),
            Value::Int(n) => Value::Int(*n),
            Value::Float(f) => Value::Float(*f),
            Value::Str(s) => Value::Str(s.clone()),
            Value::List(rc) => Value::List(Rc::clone(rc)),
            Value::Dict(rc) => Value::Dict(Rc::clone(rc)),
            Value::Tuple(rc) => Value::Tuple(Rc::clone(rc)),
            Value::Instance(h) => Value::Instance(h.clone()),
            Value::Class(h) => Value::Class(h.clone()),
            Value::Module(h) => Value::Module(h.clone()),
            Value::Function(h) => Value::Function(h.clone()),
            Value::Method(h) => Value::Method(h.clone()),
            Value::Unpersistable(u) => Value::Unpersistable(u.clone()),
            Value::Builtin(name) => Value::Builtin(name.clone()),
        }
    }
}

/// Written by hand rather than derived: deriving would require `R::Instance`
/// etc. to implement `Debug`, which `Reflector` never promises. Host handles
/// print as their kind and identity instead of their contents.
impl<R: Reflector> std::fmt::Debug for Value<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "Bool({b:?})"),
            Value::Int(n) => write!(f, "Int({n:?})"),
            Value::Float(n) => write!(f, "Float({n:?})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(rc) => write!(f, "List(len={}, {:?})", rc.borrow().len(), rc_identity(rc)),
            Value::Dict(rc) => write!(f, "Dict(len={}, {:?})", rc.borrow().0.len(), rc_identity(rc)),
            Value::Tuple(rc) => write!(f, "Tuple(len={}, {:?})", rc.len(), rc_identity(rc)),
            Value::Instance(h) => write!(f, "Instance({:?})", h.identity()),
            Value::Class(h) => write!(f, "Class({:?})", h.identity()),
            Value::Module(h) => write!(f, "Module({:?})", h.identity()),
            Value::Function(h) => write!(f, "Function({:?})", h.identity()),
            Value::Method(h) => write!(f, "Method({:?})", h.identity()),
            Value::Unpersistable(u) => write!(f, "Unpersistable({u:?})"),
            Value::Builtin(name) => write!(f, "Builtin({name:?})"),
        }
    }
}

/// Structural equality where it is meaningful: scalars by value, containers
/// by identity (two distinct-but-equal dictionaries are not the same
/// value — `spec.md` §4.3.8). Host handles compare by identity too, since
/// the `Reflector` is not required to give classes/modules/etc. a notion of
/// structural equality.
impl<R: Reflector> PartialEq for Value<R> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Unpersistable(a), Value::Unpersistable(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => match (self.identity(), other.identity()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

/// An associative container. A plain `Vec` of pairs with linear-scan lookup:
/// `spec.md` §1 rules performance out as a goal, and this sidesteps needing
/// `Hash`/`Eq` bounds on the host's opaque class/module/instance handles.
pub struct Dict<R: Reflector>(pub Vec<(Value<R>, Value<R>)>);

impl<R: Reflector> Dict<R> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, key: Value<R>, value: Value<R>) {
        self.0.push((key, value));
    }
}

impl<R: Reflector> Default for Dict<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// A placeholder recording why a sub-object could not be serialized
/// (`spec.md` §4.5). Equality is by reason string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unpersistable {
    pub reason: String,
}

impl Unpersistable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl std::fmt::Display for Unpersistable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unpersistable: {}", self.reason)
    }
}
