//! Security policy (`spec.md` §4.1).

use std::collections::HashSet;
use std::marker::PhantomData;

use crate::identity::{HasIdentity, Identity};
use crate::reflector::Reflector;
use crate::tag::Tag;

/// Three total, pure, cheap predicates consulted per tag, per module, per
/// class. Never mutated during a single `jelly`/`unjelly` call.
pub trait Taster<R: Reflector> {
    fn type_allowed(&self, tag: Tag) -> bool;
    fn module_allowed(&self, module_name: &str) -> bool;
    fn class_allowed(&self, class: &R::Class) -> bool;
}

/// Allows everything. The default for both `jelly` and `unjelly`.
pub struct Permissive<R>(PhantomData<fn() -> R>);

impl<R> Permissive<R> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<R> Default for Permissive<R> {
    fn default() -> Self {
        Self::new()
    }
}

// `PhantomData<fn() -> R>` makes the compiler-derived bounds trivial, so we
// write these by hand rather than relying on `derive` to avoid an `R: Clone`
// bound nobody needs.
impl<R> Clone for Permissive<R> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<R: Reflector> Taster<R> for Permissive<R> {
    fn type_allowed(&self, _tag: Tag) -> bool {
        true
    }

    fn module_allowed(&self, _module_name: &str) -> bool {
        true
    }

    fn class_allowed(&self, _class: &R::Class) -> bool {
        true
    }
}

/// Denies everything except a small default allow-set, widened only through
/// its builder methods — each call is additive, never a replacement
/// (`SPEC_FULL.md` §C).
pub struct Restrictive<R: Reflector> {
    allowed_tags: HashSet<Tag>,
    allowed_modules: HashSet<String>,
    allowed_classes: HashSet<Identity>,
    _reflector: PhantomData<fn() -> R>,
}

impl<R: Reflector> Restrictive<R> {
    /// The default allow-set: `None`, `string`, `int`, `float` — no
    /// modules, no classes.
    pub fn new() -> Self {
        let mut allowed_tags = HashSet::new();
        allowed_tags.insert(Tag::None);
        Self {
            allowed_tags,
            allowed_modules: HashSet::new(),
            allowed_classes: HashSet::new(),
            _reflector: PhantomData,
        }
    }

    /// Adds compound tag names to the allow-set.
    pub fn allow_types(&mut self, tags: impl IntoIterator<Item = Tag>) -> &mut Self {
        self.allowed_tags.extend(tags);
        self
    }

    /// Shorthand for `dictionary, list, tuple, reference, dereference,
    /// unpersistable, persistent`.
    pub fn allow_basic_types(&mut self) -> &mut Self {
        self.allow_types([
            Tag::Dictionary,
            Tag::List,
            Tag::Tuple,
            Tag::Reference,
            Tag::Dereference,
            Tag::Unpersistable,
            Tag::Persistent,
        ])
    }

    /// Adds module names to the allow-set. Implies the `module` tag.
    pub fn allow_modules(&mut self, names: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.allowed_modules.extend(names.into_iter().map(Into::into));
        self.allowed_tags.insert(Tag::Module);
        self
    }

    /// For each `(module_name, class)` pair: allows the module, allows the
    /// class, and enables [`Self::allow_basic_types`] plus `instance`,
    /// `class`, `module`.
    pub fn allow_instances_of<'a>(
        &mut self,
        classes: impl IntoIterator<Item = (&'a str, &'a R::Class)>,
    ) -> &mut Self
    where
        R::Class: 'a,
    {
        self.allow_basic_types();
        self.allowed_tags.insert(Tag::Instance);
        self.allowed_tags.insert(Tag::Class);
        self.allowed_tags.insert(Tag::Module);
        for (module_name, class) in classes {
            self.allowed_modules.insert(module_name.to_string());
            self.allowed_classes.insert(class.identity());
        }
        self
    }
}

impl<R: Reflector> Default for Restrictive<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Reflector> Taster<R> for Restrictive<R> {
    fn type_allowed(&self, tag: Tag) -> bool {
        self.allowed_tags.contains(&tag)
    }

    fn module_allowed(&self, module_name: &str) -> bool {
        self.allowed_modules.contains(module_name)
    }

    fn class_allowed(&self, class: &R::Class) -> bool {
        self.allowed_classes.contains(&class.identity())
    }
}
