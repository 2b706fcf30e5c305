//! Sources: the values associations are keyed by.
//!
//! Primitive sources are keyed by value and held strongly; object sources
//! are keyed by allocation identity and held weakly by the store layer.

use core::fmt;
use std::any::Any;
use std::rc::Rc;

/// A value that associations can be attached to.
///
/// Primitive variants (`Text`, `Int`, `Bool`) compare by value and are
/// never evicted. `Object` wraps any `Rc`-owned value and compares by
/// allocation identity; the store keeps only a weak handle to it, so the
/// association system never extends an object's lifetime.
#[derive(Clone)]
pub enum Source {
    Text(String),
    Int(i64),
    Bool(bool),
    Object(Rc<dyn Any>),
}

impl Source {
    /// Wrap an `Rc`-owned value as an object source. The caller keeps the
    /// `Rc`; the same `Rc` (or a clone of it) names the same source.
    pub fn object<T: Any>(rc: &Rc<T>) -> Self {
        Source::Object(rc.clone())
    }

    /// Whether this source is keyed by value rather than identity.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Source::Object(_))
    }

    pub(crate) fn as_object(&self) -> Option<&Rc<dyn Any>> {
        match self {
            Source::Object(rc) => Some(rc),
            _ => None,
        }
    }

    /// Hashable identity key: the primitive value itself, or the data
    /// pointer of the object's allocation.
    pub(crate) fn key(&self) -> SourceKey {
        match self {
            Source::Text(s) => SourceKey::Text(s.clone()),
            Source::Int(i) => SourceKey::Int(*i),
            Source::Bool(b) => SourceKey::Bool(*b),
            Source::Object(rc) => SourceKey::Object(Rc::as_ptr(rc) as *const () as usize),
        }
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Source::Text(a), Source::Text(b)) => a == b,
            (Source::Int(a), Source::Int(b)) => a == b,
            (Source::Bool(a), Source::Bool(b)) => a == b,
            (Source::Object(a), Source::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Source {}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Source::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Source::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Source::Object(rc) => write!(f, "Object({:p})", Rc::as_ptr(rc)),
        }
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Source::Text(s.to_string())
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Source::Text(s)
    }
}

impl From<i64> for Source {
    fn from(i: i64) -> Self {
        Source::Int(i)
    }
}

impl From<bool> for Source {
    fn from(b: bool) -> Self {
        Source::Bool(b)
    }
}

/// Identity key for a source within one store.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) enum SourceKey {
    Text(String),
    Int(i64),
    Bool(bool),
    Object(usize),
}
