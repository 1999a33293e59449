//! The persistent-store escape hatch (`spec.md` §2.5, §4.3.5, §4.4.5).
//!
//! Two independent, optional callbacks: one consulted per instance while
//! encoding, one consulted per `(persistent …)` form while decoding. Neither
//! is required — `jelly`/`unjelly` default to running without either.

use crate::error::DecodeError;
use crate::reflector::Reflector;
use crate::sexp::Sexp;
use crate::unjellier::{DecodeContext, Promise};
use crate::value::Value;

/// Invoked once per instance during encoding, before the Taster is
/// consulted. Returning `Some(opaque)` substitutes `(persistent opaque)`
/// for the instance and skips class/module gating entirely; returning
/// `None` falls through to ordinary instance encoding.
pub trait PersistentStore<R: Reflector> {
    fn store(&self, instance: &R::Instance) -> Option<Sexp>;
}

/// What a [`PersistentLoad`] callback hands back for one `(persistent
/// OPAQUE)` form.
pub enum PersistentOutcome<R: Reflector> {
    /// The object is already fully live; no further decoding needed.
    Ready(Value<R>),
    /// The object is live but not yet fully wired — the decoder registers
    /// its identity immediately and keeps `promise` like any other deferred
    /// promise (`spec.md` §4.4.5).
    Deferred(Value<R>, Promise<R>),
}

/// Invoked once per `(persistent OPAQUE)` form during decoding. Without a
/// configured callback, every `persistent` form materializes as
/// `Unpersistable("persistent callback not found")`.
///
/// Takes a `&mut dyn DecodeContext<R>` rather than the concrete `Unjellier`
/// so this trait doesn't have to close over the decoder's `Taster`/
/// `PersistentLoad` type parameters — a callback only ever needs to decode
/// sub-`Sexp`s, never the decoder's own configuration.
pub trait PersistentLoad<R: Reflector> {
    fn load(&self, opaque: &Sexp, ctx: &mut dyn DecodeContext<R>) -> Result<PersistentOutcome<R>, DecodeError>;
}
