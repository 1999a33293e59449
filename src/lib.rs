//! `jelly` is a bidirectional codec between an arbitrary, possibly cyclic,
//! host object graph and a tagged s-expression value (`Sexp`). It trades
//! the compactness of a binary pickling format for three things, in order:
//! security (no code execution from untrusted input), human readability,
//! and portability across environments with incompatible binary layouts.
//!
//! The host side of the graph — user-defined class instances, modules,
//! functions, bound methods — is abstracted behind [`Reflector`]; this
//! crate never touches host memory except through that trait. A
//! [`Taster`] gates which tags, modules, and classes a decode is willing to
//! trust, with [`Permissive`] and [`Restrictive`] canned policies. An
//! optional [`PersistentStore`]/[`PersistentLoad`] pair lets a host
//! substitute an opaque external reference for an instance instead of
//! serializing it structurally.
//!
//! Entry points: [`jelly`] encodes, [`unjelly`] decodes. Neither keeps any
//! state beyond a single call.

#![expect(clippy::module_name_repetitions, reason = "Jellier/Unjellier names mirror their module")]

mod error;
mod identity;
mod jellier;
mod persistent;
mod reflector;
mod sexp;
mod tag;
mod taster;
mod unjellier;
mod value;

pub use error::{DecodeError, EncodeError, ReflectError};
pub use identity::{rc_identity, HasIdentity, Identity};
pub use jellier::Jellier;
pub use persistent::{PersistentLoad, PersistentOutcome, PersistentStore};
pub use reflector::Reflector;
pub use sexp::{Atom, Sexp};
pub use tag::Tag;
pub use taster::{Permissive, Restrictive, Taster};
pub use unjellier::{DecodeContext, Promise, Unjellier};
pub use value::{Dict, Unpersistable, Value};

/// Encodes `root` into a `Sexp`, consulting `taster` per instance/class/
/// module/function and `persistent_store` (if given) per instance.
///
/// No sub-object failure aborts the call: a disallowed or unrepresentable
/// sub-object is embedded as `(unpersistable REASON)` instead. The call as
/// a whole only fails for [`EncodeError`]'s own cases (an unsupported host
/// value such as a built-in callable, or a `Reflector` error).
pub fn jelly<R: Reflector>(
    root: &Value<R>,
    reflector: &R,
    taster: &dyn Taster<R>,
    persistent_store: Option<&dyn PersistentStore<R>>,
) -> Result<Sexp, EncodeError> {
    Jellier::new(reflector, taster, persistent_store).encode(root)
}

/// Decodes `sexp` into a live value, consulting `taster` per tag/module/
/// class and `persistent_load` (if given) per `(persistent …)` form.
///
/// Unlike [`jelly`], a disallowed tag/module/class is always fatal
/// (`DecodeError::InsecureJelly`): a consumer must refuse to instantiate
/// anything its policy disallows, rather than silently produce a partial
/// graph (`spec.md` §7).
pub fn unjelly<R: Reflector>(
    sexp: &Sexp,
    reflector: &R,
    taster: &dyn Taster<R>,
    persistent_load: Option<&dyn PersistentLoad<R>>,
) -> Result<Value<R>, DecodeError> {
    Unjellier::new(reflector, taster, persistent_load).decode_root(sexp)
}
