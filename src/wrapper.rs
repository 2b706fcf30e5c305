//! SourceWrapper: one source's association set plus its reclaimability
//! handling.
//!
//! A wrapper is in exactly one origin state, fixed at construction except
//! for the one-way `Object` -> `Reclaimed` transition taken when the weak
//! handle reports the source gone. Primitives are held strongly and never
//! transition; once `Reclaimed`, the association table is cleared and
//! stays empty. The wrapper itself is not removed from its store here;
//! only an explicit whole-entry removal does that.

use crate::source::Source;
use crate::subkey::Slot;
use hashbrown::HashMap;
use std::any::Any;
use std::rc::{Rc, Weak};

/// Arbitrary associated payload.
pub type Value = Rc<dyn Any>;

enum Origin {
    /// Primitive source, held strongly. Never evicted.
    Primitive(Source),
    /// Object source, held weakly.
    Object(Weak<dyn Any>),
    /// Object source observed dead by a reclamation pass.
    Reclaimed,
}

pub(crate) struct SourceWrapper {
    origin: Origin,
    pub(crate) associations: HashMap<Slot, Value>,
}

impl SourceWrapper {
    /// Wrap a source. Primitives are stored directly; objects get a weak
    /// handle. Construction always succeeds.
    pub(crate) fn wrap(source: &Source) -> Self {
        let origin = match source {
            Source::Object(rc) => Origin::Object(Rc::downgrade(rc)),
            primitive => Origin::Primitive(primitive.clone()),
        };
        Self {
            origin,
            associations: HashMap::new(),
        }
    }

    pub(crate) fn is_primitive(&self) -> bool {
        matches!(self.origin, Origin::Primitive(_))
    }

    /// The live source, or `None` once an object source is unreachable.
    pub(crate) fn get(&self) -> Option<Source> {
        match &self.origin {
            Origin::Primitive(p) => Some(p.clone()),
            Origin::Object(weak) => weak.upgrade().map(Source::Object),
            Origin::Reclaimed => None,
        }
    }

    /// Whether this wrapper still belongs to `source`. False for a dead
    /// wrapper whose allocation address was reused by a new object.
    pub(crate) fn matches(&self, source: &Source) -> bool {
        match (&self.origin, source) {
            (Origin::Primitive(_), s) => s.is_primitive(),
            (Origin::Object(weak), Source::Object(rc)) => match weak.upgrade() {
                Some(live) => Rc::ptr_eq(&live, rc),
                None => false,
            },
            (Origin::Reclaimed, _) | (Origin::Object(_), _) => false,
        }
    }

    /// Clear the association table if the weak handle reports the source
    /// gone. Returns whether this call performed the transition; safe to
    /// call repeatedly, and a no-op for primitives and live objects.
    pub(crate) fn reap(&mut self) -> bool {
        if let Origin::Object(weak) = &self.origin {
            if weak.strong_count() == 0 {
                self.origin = Origin::Reclaimed;
                self.associations.clear();
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::SourceWrapper;
    use crate::source::Source;
    use crate::subkey::Slot;
    use std::rc::Rc;

    #[test]
    fn primitive_wrapper_always_dereferences() {
        let src = Source::from("k");
        let mut w = SourceWrapper::wrap(&src);
        assert!(w.is_primitive());
        assert_eq!(w.get(), Some(src.clone()));
        assert!(w.matches(&src));
        assert!(!w.reap());
        assert_eq!(w.get(), Some(src));
    }

    #[test]
    fn object_wrapper_reaps_after_last_strong_drop() {
        let obj = Rc::new(5u8);
        let src = Source::object(&obj);
        let mut w = SourceWrapper::wrap(&src);
        w.associations.insert(Slot::Default, Rc::new(1i32));
        assert!(!w.is_primitive());
        assert_eq!(w.get(), Some(src.clone()));
        assert!(!w.reap());

        drop(src);
        drop(obj);
        assert!(w.get().is_none());
        assert!(w.reap());
        assert!(w.associations.is_empty());
        // Second pass is a no-op on an already-reclaimed wrapper.
        assert!(!w.reap());
    }

    #[test]
    fn dead_wrapper_matches_nothing() {
        let obj = Rc::new(());
        let src = Source::object(&obj);
        let mut w = SourceWrapper::wrap(&src);
        drop(src);
        drop(obj);
        w.reap();
        let other = Rc::new(());
        assert!(!w.matches(&Source::object(&other)));
        assert!(!w.matches(&Source::from(1i64)));
    }
}
