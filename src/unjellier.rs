//! The decoder (`spec.md` §4.4).
//!
//! Performs a two-phase traversal: a tag handler first constructs whatever
//! shell of an object it can build without its children (or, for immutable
//! forms, simply returns the fully built value), then hands back a
//! [`Promise`] describing the work still needed. Identity is registered
//! *before* a mutable container's children are decoded, which is what lets
//! a `dereference` buried inside those children close a cycle back to the
//! container itself.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;

use crate::error::DecodeError;
use crate::persistent::{PersistentLoad, PersistentOutcome};
use crate::reflector::Reflector;
use crate::sexp::{Atom, Sexp};
use crate::tag::Tag;
use crate::taster::Taster;
use crate::value::{Dict, Unpersistable, Value};

/// An object-safe view onto "decode this child `Sexp` fully", used by
/// [`PersistentLoad`] callbacks so that trait doesn't need to close over
/// the decoder's `Taster`/`PersistentLoad` type parameters.
pub trait DecodeContext<R: Reflector> {
    fn decode_value(&mut self, sexp: &Sexp) -> Result<Value<R>, DecodeError>;
}

/// What a tag handler still owes the caller after returning its (possibly
/// incomplete) value.
pub enum Promise<R: Reflector> {
    /// No further work: the value handed back is already complete.
    False,
    FillList {
        list: Rc<RefCell<Vec<Value<R>>>>,
        children: Vec<Sexp>,
    },
    FillDict {
        dict: Rc<RefCell<Dict<R>>>,
        children: Vec<Sexp>,
    },
    FillInstance {
        instance: R::Instance,
        state: Sexp,
    },
    /// A callback (from [`crate::persistent::PersistentLoad`]) that will
    /// finish wiring an already-registered object.
    External(Box<dyn FnOnce(&mut dyn DecodeContext<R>) -> Result<(), DecodeError>>),
}

/// Decodes one root `Sexp` per call. Construct fresh for every `unjelly`
/// call; nothing survives between calls (`spec.md` §4.6, §5 "Shared
/// state: none process-wide").
pub struct Unjellier<'a, R: Reflector> {
    reflector: &'a R,
    taster: &'a dyn Taster<R>,
    persistent_load: Option<&'a dyn PersistentLoad<R>>,
    identity_table: HashMap<u64, Value<R>>,
}

impl<'a, R: Reflector> Unjellier<'a, R> {
    pub fn new(reflector: &'a R, taster: &'a dyn Taster<R>, persistent_load: Option<&'a dyn PersistentLoad<R>>) -> Self {
        Self {
            reflector,
            taster,
            persistent_load,
            identity_table: HashMap::new(),
        }
    }

    pub fn decode_root(&mut self, sexp: &Sexp) -> Result<Value<R>, DecodeError> {
        self.decode_value(sexp)
    }

    /// Decodes `sexp` and keeps whatever promise it returns, in one step.
    /// Used everywhere a value is needed immediately rather than deferred
    /// further (list/dict elements, instance state, tuple/method members).
    fn decode_full(&mut self, sexp: &Sexp) -> Result<Value<R>, DecodeError> {
        let (promise, value) = self.decode(sexp, None)?;
        self.keep(promise)?;
        Ok(value)
    }

    /// Consumes `pending_id` exactly once, atomically, by registering
    /// `value` under it — this is the entire "pending id" protocol
    /// (`SPEC_FULL.md` §A.4): the id is threaded as a plain parameter
    /// rather than mutable decoder state, so nested `reference` forms can
    /// never stomp on an outer one's id.
    fn register_identity(&mut self, pending_id: Option<u64>, value: &Value<R>) {
        if let Some(id) = pending_id {
            self.identity_table.insert(id, value.clone());
        }
    }

    fn keep(&mut self, promise: Promise<R>) -> Result<(), DecodeError> {
        match promise {
            Promise::False => Ok(()),
            Promise::FillList { list, children } => {
                for child in &children {
                    let value = self.decode_full(child)?;
                    list.borrow_mut().push(value);
                }
                Ok(())
            }
            Promise::FillDict { dict, children } => {
                for pair in &children {
                    let items = match pair {
                        Sexp::List(items) if items.len() == 2 => items,
                        _ => return Err(DecodeError::format("dictionary entry must be a two-element list")),
                    };
                    let key = self.decode_full(&items[0])?;
                    let value = self.decode_full(&items[1])?;
                    dict.borrow_mut().push(key, value);
                }
                Ok(())
            }
            Promise::FillInstance { instance, state } => {
                let state_value = self.decode_full(&state)?;
                self.reflector.install_state(&instance, state_value)?;
                Ok(())
            }
            Promise::External(f) => f(self),
        }
    }

    fn decode(&mut self, sexp: &Sexp, pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        match sexp {
            Sexp::Atom(atom) => Ok((Promise::False, atom_to_value(atom))),
            Sexp::List(items) => self.decode_compound(items, pending_id),
        }
    }

    fn decode_compound(&mut self, items: &[Sexp], pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let head = items
            .first()
            .and_then(Sexp::as_str)
            .ok_or_else(|| DecodeError::format("compound list missing a string head tag"))?;
        let tag = Tag::from_str(head).map_err(|_| DecodeError::format(format!("unknown tag `{head}`")))?;
        if !self.taster.type_allowed(tag) {
            return Err(DecodeError::insecure(format!("tag `{tag}` not allowed")));
        }
        let rest = &items[1..];
        match tag {
            Tag::None => self.decode_none(rest, pending_id),
            Tag::Instance => self.decode_instance(rest, pending_id),
            Tag::Class => self.decode_class(rest, pending_id),
            Tag::Dictionary => self.decode_dictionary(rest, pending_id),
            Tag::List => self.decode_list(rest, pending_id),
            Tag::Tuple => self.decode_tuple(rest, pending_id),
            Tag::Module => self.decode_module(rest, pending_id),
            Tag::Function => self.decode_function(rest, pending_id),
            Tag::Method => self.decode_method(rest, pending_id),
            Tag::Reference => self.decode_reference(rest, pending_id),
            Tag::Dereference => self.decode_dereference(rest),
            Tag::Persistent => self.decode_persistent(rest, pending_id),
            Tag::Unpersistable => self.decode_unpersistable(rest, pending_id),
        }
    }

    fn decode_none(&mut self, rest: &[Sexp], pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        if !rest.is_empty() {
            return Err(DecodeError::format("`None` takes no arguments"));
        }
        let value = Value::None;
        self.register_identity(pending_id, &value);
        Ok((Promise::False, value))
    }

    fn decode_unpersistable(
        &mut self,
        rest: &[Sexp],
        pending_id: Option<u64>,
    ) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let [reason] = rest else {
            return Err(DecodeError::format("`unpersistable` takes exactly one argument"));
        };
        let reason = reason.as_str().ok_or_else(|| DecodeError::format("`unpersistable` reason must be a string"))?;
        let value = Value::Unpersistable(Unpersistable::new(reason));
        self.register_identity(pending_id, &value);
        Ok((Promise::False, value))
    }

    fn decode_reference(&mut self, rest: &[Sexp], _pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let [id_sexp, inner] = rest else {
            return Err(DecodeError::format("`reference` takes exactly two arguments"));
        };
        if matches!(inner, Sexp::Atom(_)) {
            return Err(DecodeError::format("`reference` cannot wrap a bare atom"));
        }
        let id = sexp_to_ref_id(id_sexp)?;
        self.decode(inner, Some(id))
    }

    fn decode_dereference(&mut self, rest: &[Sexp]) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let [id_sexp] = rest else {
            return Err(DecodeError::format("`dereference` takes exactly one argument"));
        };
        let id = sexp_to_ref_id(id_sexp)?;
        let value = self
            .identity_table
            .get(&id)
            .cloned()
            .ok_or_else(|| DecodeError::format(format!("dangling dereference to id {id}")))?;
        Ok((Promise::False, value))
    }

    fn decode_list(&mut self, rest: &[Sexp], pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let list = Rc::new(RefCell::new(Vec::new()));
        let value = Value::List(Rc::clone(&list));
        self.register_identity(pending_id, &value);
        Ok((Promise::FillList { list, children: rest.to_vec() }, value))
    }

    fn decode_dictionary(&mut self, rest: &[Sexp], pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let dict = Rc::new(RefCell::new(Dict::new()));
        let value = Value::Dict(Rc::clone(&dict));
        self.register_identity(pending_id, &value);
        Ok((Promise::FillDict { dict, children: rest.to_vec() }, value))
    }

    fn decode_tuple(&mut self, rest: &[Sexp], pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let mut child_promises = Vec::with_capacity(rest.len());
        let mut child_values = Vec::with_capacity(rest.len());
        for child in rest {
            let (promise, value) = self.decode(child, None)?;
            child_promises.push(promise);
            child_values.push(value);
        }
        let value = Value::Tuple(Rc::new(child_values));
        self.register_identity(pending_id, &value);
        for promise in child_promises {
            self.keep(promise)?;
        }
        Ok((Promise::False, value))
    }

    fn decode_instance(&mut self, rest: &[Sexp], pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let [class_sexp, state_sexp] = rest else {
            return Err(DecodeError::format("`instance` takes exactly two arguments"));
        };
        let (class_promise, class_value) = self.decode(class_sexp, None)?;
        self.keep(class_promise)?;
        let class = require_class(class_value)?;
        let instance = self.reflector.new_instance(&class)?;
        let value = Value::Instance(instance.clone());
        self.register_identity(pending_id, &value);
        Ok((Promise::FillInstance { instance, state: state_sexp.clone() }, value))
    }

    fn decode_class(&mut self, rest: &[Sexp], pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let [module_sexp, name_sexp] = rest else {
            return Err(DecodeError::format("`class` takes exactly two arguments"));
        };
        let (module_promise, module_value) = self.decode(module_sexp, None)?;
        self.keep(module_promise)?;
        let module = require_module(module_value)?;
        let name = name_sexp.as_str().ok_or_else(|| DecodeError::format("class name must be a string"))?;
        let class = self.reflector.find_class(&module, name)?;
        if !self.taster.class_allowed(&class) {
            return Err(DecodeError::insecure(format!("class `{name}` not allowed")));
        }
        let value = Value::Class(class);
        self.register_identity(pending_id, &value);
        Ok((Promise::False, value))
    }

    fn decode_module(&mut self, rest: &[Sexp], pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let [name_sexp] = rest else {
            return Err(DecodeError::format("`module` takes exactly one argument"));
        };
        let name = name_sexp.as_str().ok_or_else(|| DecodeError::format("module name must be a string"))?;
        if !self.taster.module_allowed(name) {
            return Err(DecodeError::insecure(format!("module `{name}` not allowed")));
        }
        let module = self.reflector.find_module(name)?;
        let value = Value::Module(module);
        self.register_identity(pending_id, &value);
        Ok((Promise::False, value))
    }

    fn decode_function(&mut self, rest: &[Sexp], pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let [name_sexp, module_sexp] = rest else {
            return Err(DecodeError::format("`function` takes exactly two arguments"));
        };
        let name = name_sexp.as_str().ok_or_else(|| DecodeError::format("function name must be a string"))?;
        let (module_promise, module_value) = self.decode(module_sexp, None)?;
        self.keep(module_promise)?;
        let module = require_module(module_value)?;
        let function = self.reflector.find_function(&module, name)?;
        let value = Value::Function(function);
        self.register_identity(pending_id, &value);
        Ok((Promise::False, value))
    }

    fn decode_method(&mut self, rest: &[Sexp], pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let [name_sexp, self_sexp, class_sexp] = rest else {
            return Err(DecodeError::format("`method` takes exactly three arguments"));
        };
        let name = name_sexp.as_str().ok_or_else(|| DecodeError::format("method name must be a string"))?;
        let (self_promise, self_value) = self.decode(self_sexp, None)?;
        let (class_promise, class_value) = self.decode(class_sexp, None)?;
        self.keep(class_promise)?;
        let class = require_class(class_value)?;
        let receiver = match &self_value {
            Value::None => None,
            Value::Instance(instance) => Some(instance.clone()),
            _ => return Err(DecodeError::insecure("method `self` position did not resolve to None or an instance")),
        };
        let method = self.reflector.make_method(&class, name, receiver)?;
        let value = Value::Method(method);
        self.register_identity(pending_id, &value);
        self.keep(self_promise)?;
        Ok((Promise::False, value))
    }

    fn decode_persistent(&mut self, rest: &[Sexp], pending_id: Option<u64>) -> Result<(Promise<R>, Value<R>), DecodeError> {
        let [opaque] = rest else {
            return Err(DecodeError::format("`persistent` takes exactly one argument"));
        };
        let Some(loader) = self.persistent_load else {
            let value = Value::Unpersistable(Unpersistable::new("persistent callback not found"));
            self.register_identity(pending_id, &value);
            return Ok((Promise::False, value));
        };
        match loader.load(opaque, self)? {
            PersistentOutcome::Ready(value) => {
                self.register_identity(pending_id, &value);
                Ok((Promise::False, value))
            }
            PersistentOutcome::Deferred(value, promise) => {
                self.register_identity(pending_id, &value);
                Ok((promise, value))
            }
        }
    }
}

impl<'a, R: Reflector> DecodeContext<R> for Unjellier<'a, R> {
    fn decode_value(&mut self, sexp: &Sexp) -> Result<Value<R>, DecodeError> {
        self.decode_full(sexp)
    }
}

fn atom_to_value<R: Reflector>(atom: &Atom) -> Value<R> {
    match atom {
        Atom::Null => Value::None,
        Atom::Bool(b) => Value::Bool(*b),
        Atom::Int(n) => Value::Int(*n),
        Atom::Float(f) => Value::Float(*f),
        Atom::Str(s) => Value::Str(s.clone()),
    }
}

fn sexp_to_ref_id(sexp: &Sexp) -> Result<u64, DecodeError> {
    let n = sexp.as_int().ok_or_else(|| DecodeError::format("reference id must be an integer"))?;
    u64::try_from(n).map_err(|_| DecodeError::format("reference id must be a positive integer"))
}

fn require_class<R: Reflector>(value: Value<R>) -> Result<R::Class, DecodeError> {
    match value {
        Value::Class(class) => Ok(class),
        _ => Err(DecodeError::insecure("expected a class at this position")),
    }
}

fn require_module<R: Reflector>(value: Value<R>) -> Result<R::Module, DecodeError> {
    match value {
        Value::Module(module) => Ok(module),
        _ => Err(DecodeError::insecure("expected a module at this position")),
    }
}
