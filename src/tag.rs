//! The closed set of compound tag names (`spec.md` §3.2).

/// One of the thirteen compound forms a `Sexp` list may be tagged with.
///
/// Any other head atom on a compound list is a decode error: `InsecureJelly`
/// if the taster would have rejected it anyway, `FormatError` (unknown tag)
/// otherwise.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, serde::Serialize, serde::Deserialize,
)]
pub enum Tag {
    #[strum(serialize = "None")]
    None,
    #[strum(serialize = "instance")]
    Instance,
    #[strum(serialize = "class")]
    Class,
    #[strum(serialize = "dictionary")]
    Dictionary,
    #[strum(serialize = "list")]
    List,
    #[strum(serialize = "tuple")]
    Tuple,
    #[strum(serialize = "module")]
    Module,
    #[strum(serialize = "function")]
    Function,
    #[strum(serialize = "method")]
    Method,
    #[strum(serialize = "reference")]
    Reference,
    #[strum(serialize = "dereference")]
    Dereference,
    #[strum(serialize = "persistent")]
    Persistent,
    #[strum(serialize = "unpersistable")]
    Unpersistable,
}
