//! The encoder (`spec.md` §4.3).
//!
//! Walks a live `Value<R>` graph and emits a `Sexp`, preserving identity
//! through an in-place splice trick: an object's partially-built wire form
//! lives behind an `Rc<RefCell<Vec<Builder>>>` slot for the duration of the
//! walk, so a later occurrence of the same identity can mutate that slot's
//! *contents* into `[reference, id, original-contents]` without anyone
//! holding a stale copy of the old contents.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::EncodeError;
use crate::identity::{HasIdentity, Identity};
use crate::persistent::PersistentStore;
use crate::reflector::Reflector;
use crate::sexp::{Atom, Sexp};
use crate::taster::Taster;
use crate::value::Value;

/// The encoder's intermediate, mutable form of a `Sexp`. Frozen into a real
/// `Sexp` only once, at the very end of [`Jellier::encode`].
#[derive(Clone)]
enum Builder {
    Atom(Atom),
    List(Rc<RefCell<Vec<Builder>>>),
}

impl Builder {
    fn str(s: impl Into<String>) -> Self {
        Builder::Atom(Atom::Str(s.into()))
    }

    fn int(n: i64) -> Self {
        Builder::Atom(Atom::Int(n))
    }

    fn freeze(self) -> Sexp {
        match self {
            Builder::Atom(atom) => Sexp::Atom(atom),
            Builder::List(rc) => {
                let items = Rc::try_unwrap(rc)
                    .map(RefCell::into_inner)
                    .unwrap_or_else(|rc| rc.borrow().clone());
                Sexp::List(items.into_iter().map(Builder::freeze).collect())
            }
        }
    }
}

/// Encodes one root object per call. Construct fresh for every `jelly`
/// call; nothing survives between calls (`spec.md` §4.6).
pub struct Jellier<'a, R: Reflector> {
    reflector: &'a R,
    taster: &'a dyn Taster<R>,
    persistent_store: Option<&'a dyn PersistentStore<R>>,
    /// identity -> the slot list currently being filled for that object.
    preserved: HashMap<Identity, Rc<RefCell<Vec<Builder>>>>,
    /// identity -> the `(dereference id)` form to hand back on re-encounter,
    /// once that identity has been cooked.
    cooked: HashMap<Identity, Builder>,
    /// identity -> the inner list a cooked object's slot now points to, so
    /// in-flight fills redirect their pushes there instead of the outer
    /// `(reference id …)` wrapper.
    cooked_inner: HashMap<Identity, Rc<RefCell<Vec<Builder>>>>,
    next_ref_id: u64,
}

impl<'a, R: Reflector> Jellier<'a, R> {
    pub fn new(
        reflector: &'a R,
        taster: &'a dyn Taster<R>,
        persistent_store: Option<&'a dyn PersistentStore<R>>,
    ) -> Self {
        Self {
            reflector,
            taster,
            persistent_store,
            preserved: HashMap::new(),
            cooked: HashMap::new(),
            cooked_inner: HashMap::new(),
            next_ref_id: 1,
        }
    }

    pub fn encode(&mut self, root: &Value<R>) -> Result<Sexp, EncodeError> {
        let builder = self.encode_value(root)?;
        Ok(builder.freeze())
    }

    fn encode_value(&mut self, value: &Value<R>) -> Result<Builder, EncodeError> {
        if let Some(id) = value.identity() {
            if let Some(deref) = self.cooked.get(&id) {
                return Ok(deref.clone());
            }
            if self.preserved.contains_key(&id) {
                return Ok(self.cook(id));
            }
        }
        self.dispatch(value)
    }

    /// Promotes a preserved-but-not-yet-referenced identity to a
    /// back-referenceable form: splices the slot's current contents behind
    /// a fresh `reference` wrapper, in place, and records the matching
    /// `dereference` for future occurrences (`spec.md` §4.3 step 2,
    /// GLOSSARY "Cook").
    fn cook(&mut self, id: Identity) -> Builder {
        let slot = Rc::clone(self.preserved.get(&id).expect("cook called on a non-preserved identity"));
        let ref_id = self.next_ref_id;
        self.next_ref_id += 1;

        let contents = std::mem::take(&mut *slot.borrow_mut());
        let inner = Rc::new(RefCell::new(contents));
        *slot.borrow_mut() = vec![Builder::str("reference"), Builder::int(ref_id as i64), Builder::List(Rc::clone(&inner))];

        let deref = Builder::List(Rc::new(RefCell::new(vec![Builder::str("dereference"), Builder::int(ref_id as i64)])));
        self.cooked.insert(id, deref.clone());
        self.cooked_inner.insert(id, inner);
        deref
    }

    /// Registers a fresh, empty slot for `id` and returns it.
    fn prepare(&mut self, id: Identity) -> Rc<RefCell<Vec<Builder>>> {
        let slot = Rc::new(RefCell::new(Vec::new()));
        self.preserved.insert(id, Rc::clone(&slot));
        slot
    }

    /// Appends to whichever list is currently live for `id`: the original
    /// slot, or — if a nested occurrence caused a cook mid-fill — the inner
    /// list the slot now points to. Looked up fresh on every call rather
    /// than cached, since cooking can happen between any two pushes.
    fn push(&mut self, id: Identity, builder: Builder) {
        if let Some(inner) = self.cooked_inner.get(&id) {
            inner.borrow_mut().push(builder);
        } else if let Some(slot) = self.preserved.get(&id) {
            slot.borrow_mut().push(builder);
        }
    }

    /// The final form of a filled object: the slot itself, whether or not
    /// it got cooked along the way (a cooked slot's contents already are
    /// `[reference, id, inner]`).
    fn preserve(&self, id: Identity) -> Builder {
        Builder::List(Rc::clone(self.preserved.get(&id).expect("preserve called on a non-preserved identity")))
    }

    fn dispatch(&mut self, value: &Value<R>) -> Result<Builder, EncodeError> {
        match value {
            Value::None => Ok(Builder::List(Rc::new(RefCell::new(vec![Builder::str("None")])))),
            Value::Bool(b) => Ok(Builder::Atom(Atom::Bool(*b))),
            Value::Int(n) => Ok(Builder::Atom(Atom::Int(*n))),
            Value::Float(f) => Ok(Builder::Atom(Atom::Float(*f))),
            Value::Str(s) => Ok(Builder::Atom(Atom::Str(s.clone()))),
            Value::Unpersistable(u) => Ok(Builder::List(Rc::new(RefCell::new(vec![
                Builder::str("unpersistable"),
                Builder::str(u.reason.clone()),
            ])))),
            Value::Builtin(name) => Err(EncodeError::UnsupportedValue(format!("builtin function or method `{name}`"))),
            Value::List(rc) => {
                let id = value.identity().expect("list has identity");
                self.prepare(id);
                self.push(id, Builder::str("list"));
                let items = rc.borrow().clone();
                for item in &items {
                    let built = self.encode_value(item)?;
                    self.push(id, built);
                }
                Ok(self.preserve(id))
            }
            Value::Tuple(rc) => {
                let id = value.identity().expect("tuple has identity");
                self.prepare(id);
                self.push(id, Builder::str("tuple"));
                for item in rc.iter() {
                    let built = self.encode_value(item)?;
                    self.push(id, built);
                }
                Ok(self.preserve(id))
            }
            Value::Dict(rc) => {
                let id = value.identity().expect("dict has identity");
                self.prepare(id);
                self.push(id, Builder::str("dictionary"));
                let entries = rc.borrow().0.clone();
                for (k, v) in &entries {
                    let key_built = self.encode_value(k)?;
                    let val_built = self.encode_value(v)?;
                    let pair = Builder::List(Rc::new(RefCell::new(vec![key_built, val_built])));
                    self.push(id, pair);
                }
                Ok(self.preserve(id))
            }
            Value::Instance(inst) => self.encode_instance(inst),
            Value::Class(class) => self.encode_class(class),
            Value::Module(module) => self.encode_module(module),
            Value::Function(function) => self.encode_function(function),
            Value::Method(method) => self.encode_method(method),
        }
    }

    /// Instance encoding is the one path where a security denial is still
    /// identity-tracked: `prepare` runs before the Taster is consulted, so a
    /// denied instance's `unpersistable` placeholder lives in the slot
    /// already reserved for it and is reachable by back-reference on reuse
    /// (`SPEC_FULL.md` §A.2).
    fn encode_instance(&mut self, instance: &R::Instance) -> Result<Builder, EncodeError> {
        let id = instance.identity();
        self.prepare(id);

        if let Some(store) = self.persistent_store {
            if let Some(opaque) = store.store(instance) {
                self.push(id, Builder::str("persistent"));
                self.push(id, sexp_to_builder(&opaque));
                return Ok(self.preserve(id));
            }
        }

        let class = self.reflector.instance_class(instance);
        let module = self.reflector.class_module(&class);
        let module_name = self.reflector.module_name(&module);

        if !self.taster.module_allowed(&module_name) || !self.taster.class_allowed(&class) {
            let reason = format!("disallowed instance of {module_name}.{}", self.reflector.class_name(&class));
            self.push(id, Builder::str("unpersistable"));
            self.push(id, Builder::str(reason));
            return Ok(self.preserve(id));
        }

        self.push(id, Builder::str("instance"));
        let class_builder = self.encode_value(&Value::Class(class))?;
        self.push(id, class_builder);
        let state = self.reflector.export_state(instance);
        let state_builder = self.encode_value(&state)?;
        self.push(id, state_builder);
        Ok(self.preserve(id))
    }

    /// Class/module/function encoding checks the Taster *before* `prepare`:
    /// a denied symbol gets a fresh, non-referenceable `unpersistable` every
    /// time rather than sharing a reserved slot (`SPEC_FULL.md` §A.2).
    fn encode_class(&mut self, class: &R::Class) -> Result<Builder, EncodeError> {
        let module = self.reflector.class_module(class);
        let module_name = self.reflector.module_name(&module);
        if !self.taster.module_allowed(&module_name) || !self.taster.class_allowed(class) {
            let reason = format!("disallowed class {module_name}.{}", self.reflector.class_name(class));
            return Ok(Builder::List(Rc::new(RefCell::new(vec![Builder::str("unpersistable"), Builder::str(reason)]))));
        }
        let id = class.identity();
        self.prepare(id);
        self.push(id, Builder::str("class"));
        let module_builder = self.encode_value(&Value::Module(module))?;
        self.push(id, module_builder);
        self.push(id, Builder::str(self.reflector.class_name(class)));
        Ok(self.preserve(id))
    }

    fn encode_module(&mut self, module: &R::Module) -> Result<Builder, EncodeError> {
        let name = self.reflector.module_name(module);
        if !self.taster.module_allowed(&name) {
            let reason = format!("disallowed module {name}");
            return Ok(Builder::List(Rc::new(RefCell::new(vec![Builder::str("unpersistable"), Builder::str(reason)]))));
        }
        let id = module.identity();
        self.prepare(id);
        self.push(id, Builder::str("module"));
        self.push(id, Builder::str(name));
        Ok(self.preserve(id))
    }

    fn encode_function(&mut self, function: &R::Function) -> Result<Builder, EncodeError> {
        let module = self.reflector.function_module(function);
        let module_name = self.reflector.module_name(&module);
        if !self.taster.module_allowed(&module_name) {
            let reason = format!("disallowed function in module {module_name}");
            return Ok(Builder::List(Rc::new(RefCell::new(vec![Builder::str("unpersistable"), Builder::str(reason)]))));
        }
        let id = function.identity();
        self.prepare(id);
        self.push(id, Builder::str("function"));
        self.push(id, Builder::str(self.reflector.function_name(function)));
        let module_builder = self.encode_value(&Value::Module(module))?;
        self.push(id, module_builder);
        Ok(self.preserve(id))
    }

    fn encode_method(&mut self, method: &R::Method) -> Result<Builder, EncodeError> {
        let id = method.identity();
        self.prepare(id);
        self.push(id, Builder::str("method"));
        let (name, receiver, class) = self.reflector.method_parts(method);
        self.push(id, Builder::str(name));
        let self_builder = match receiver {
            Some(inst) => self.encode_value(&Value::Instance(inst))?,
            None => Builder::List(Rc::new(RefCell::new(vec![Builder::str("None")]))),
        };
        self.push(id, self_builder);
        let class_builder = self.encode_value(&Value::Class(class))?;
        self.push(id, class_builder);
        Ok(self.preserve(id))
    }
}

fn sexp_to_builder(sexp: &Sexp) -> Builder {
    match sexp {
        Sexp::Atom(atom) => Builder::Atom(atom.clone()),
        Sexp::List(items) => Builder::List(Rc::new(RefCell::new(items.iter().map(sexp_to_builder).collect()))),
    }
}
