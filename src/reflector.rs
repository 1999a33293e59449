//! The host bridge (`spec.md` §4.2).
//!
//! Everything the core knows about "a class", "a module", "an instance" is
//! behind this trait. The core never reaches into host memory on its own —
//! it only asks a `Reflector` for handles and hands handles back.
//!
//! Mirrors the teacher's `Heap<impl ResourceTracker>` shape: the codec's
//! core types (`Value`, `Jellier`, `Unjellier`) are generic over `R:
//! Reflector` rather than over a trait object, so a host's handle types stay
//! concrete all the way through.

use crate::error::ReflectError;
use crate::identity::HasIdentity;
use crate::value::Value;

/// A host bridge: resolves symbolic names to live handles and moves state
/// into and out of instances.
///
/// Every associated type must carry a stable [`HasIdentity`] so the codec
/// can track sharing and cycles through it without inspecting its contents.
pub trait Reflector {
    /// A live user-defined object.
    type Instance: Clone + HasIdentity;
    /// A class, resolvable by name from a [`Self::Module`].
    type Class: Clone + HasIdentity;
    /// A module, resolvable by name.
    type Module: Clone + HasIdentity;
    /// A top-level function, resolvable by name from a [`Self::Module`].
    type Function: Clone + HasIdentity;
    /// A bound or unbound method.
    type Method: Clone + HasIdentity;

    /// Resolves a module by its dotted name.
    fn find_module(&self, name: &str) -> Result<Self::Module, ReflectError>;

    /// The canonical name of a module, as used in `(module NAME)`.
    fn module_name(&self, module: &Self::Module) -> String;

    /// Resolves a class by name on a module.
    fn find_class(&self, module: &Self::Module, name: &str) -> Result<Self::Class, ReflectError>;

    /// Resolves a top-level function by name on a module.
    fn find_function(&self, module: &Self::Module, name: &str) -> Result<Self::Function, ReflectError>;

    /// The class's own name, as used in `(class MODULE NAME)`.
    fn class_name(&self, class: &Self::Class) -> String;

    /// The module a class was defined in.
    fn class_module(&self, class: &Self::Class) -> Self::Module;

    /// The function's own name, as used in `(function NAME MODULE)`.
    fn function_name(&self, function: &Self::Function) -> String;

    /// The module a function was defined in.
    fn function_module(&self, function: &Self::Function) -> Self::Module;

    /// An instance's class.
    fn instance_class(&self, instance: &Self::Instance) -> Self::Class;

    /// An instance's persisted state. Uses the class's state-export hook if
    /// it has one, else the raw attribute map — that choice is entirely up
    /// to the implementation. Returning a full `Value<Self>` rather than a
    /// bare `Sexp` lets identity (sharing, cycles) inside an instance's
    /// state survive the round trip like anything else in the graph.
    fn export_state(&self, instance: &Self::Instance) -> Value<Self>
    where
        Self: Sized;

    /// Constructs a new, uninitialized instance of `class`, before its state
    /// is known. Split from [`Self::install_state`] so the decoder can
    /// register the instance's identity before decoding its state — the
    /// same empty-then-fill discipline `list`/`dictionary` decoding uses,
    /// which is what lets a cycle through an instance close.
    fn new_instance(&self, class: &Self::Class) -> Result<Self::Instance, ReflectError>;

    /// Installs `state` into a freshly constructed instance (via the
    /// class's state-import hook if it has one, else by replacing the
    /// attribute map).
    fn install_state(&self, instance: &Self::Instance, state: Value<Self>) -> Result<(), ReflectError>
    where
        Self: Sized;

    /// Decomposes a method handle into `(name, receiver, class)`. `receiver`
    /// is `None` for an unbound method.
    fn method_parts(&self, method: &Self::Method) -> (String, Option<Self::Instance>, Self::Class);

    /// Constructs a bound (`receiver = Some`) or unbound (`receiver = None`)
    /// method handle for `name` on `class`. Implements the strict,
    /// own-class-only lookup this crate standardizes on (`SPEC_FULL.md` §A.5)
    /// — an implementation is free to widen this to MRO lookup.
    fn make_method(
        &self,
        class: &Self::Class,
        name: &str,
        receiver: Option<Self::Instance>,
    ) -> Result<Self::Method, ReflectError>;
}
