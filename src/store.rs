//! Store layer: one association table per carrier, attached through an
//! out-of-band registry instead of mutating the carrier itself.
//!
//! Internal layout follows the layered-map shape: a hash index from
//! source identity to a stable slot handle, over a slot arena holding the
//! wrappers. The comparator scan walks the arena directly; the index is
//! only consulted for identity lookups.
//!
//! The registry is thread-local, as is the default carrier, keeping the
//! whole crate single-threaded by construction. A registry slot holds a
//! weak guard on its carrier so `reclaim` can drop stores whose carriers
//! died; the association system leaves no footprint on the carrier.

use crate::associate::AssocError;
use crate::source::{Source, SourceKey};
use crate::subkey::Slot;
use crate::wrapper::{SourceWrapper, Value};
use core::cell::RefCell;
use hashbrown::HashMap;
use slotmap::{DefaultKey, SlotMap};
use std::any::Any;
use std::rc::{Rc, Weak};

pub(crate) struct StoreInner {
    index: HashMap<SourceKey, DefaultKey>,
    slots: SlotMap<DefaultKey, SourceWrapper>,
}

impl StoreInner {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            slots: SlotMap::with_key(),
        }
    }

    /// Wrapper for `source`, created on demand. A stale wrapper left
    /// behind by a reclaimed object whose allocation address was reused
    /// is replaced by a fresh one.
    fn wrapper_mut(&mut self, source: &Source) -> &mut SourceWrapper {
        let key = source.key();
        let mut handle = self.index.get(&key).copied();
        if let Some(h) = handle {
            if !self.slots[h].matches(source) {
                self.slots.remove(h);
                handle = None;
            }
        }
        let h = match handle {
            Some(h) => h,
            None => {
                let h = self.slots.insert(SourceWrapper::wrap(source));
                self.index.insert(key, h);
                h
            }
        };
        &mut self.slots[h]
    }

    fn wrapper_of(&self, source: &Source) -> Option<&SourceWrapper> {
        let h = *self.index.get(&source.key())?;
        let w = &self.slots[h];
        if w.matches(source) {
            Some(w)
        } else {
            None
        }
    }

    fn wrapper_of_mut(&mut self, source: &Source) -> Option<&mut SourceWrapper> {
        let h = *self.index.get(&source.key())?;
        if self.slots[h].matches(source) {
            Some(&mut self.slots[h])
        } else {
            None
        }
    }
}

/// Handle to one carrier's association table. Cloning the handle shares
/// the table; handles compare equal iff they refer to the same table.
#[derive(Clone)]
pub struct Store {
    inner: Rc<RefCell<StoreInner>>,
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Store {}

impl core::fmt::Debug for Store {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner::new())),
        }
    }

    /// Number of source entries, including entries emptied by per-sub-key
    /// removal or reclamation.
    pub fn len(&self) -> usize {
        self.inner.borrow().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().slots.is_empty()
    }

    /// Whether an entry for `source` exists, empty or not.
    pub fn contains(&self, source: &Source) -> bool {
        self.inner.borrow().wrapper_of(source).is_some()
    }

    /// Number of sub-keys currently associated with `source`.
    pub fn association_count(&self, source: &Source) -> usize {
        self.inner
            .borrow()
            .wrapper_of(source)
            .map_or(0, |w| w.associations.len())
    }

    pub(crate) fn put(&self, source: &Source, slot: Slot, value: Value) {
        self.inner
            .borrow_mut()
            .wrapper_mut(source)
            .associations
            .insert(slot, value);
    }

    /// Overwrite every currently-present sub-key of `source` with `value`.
    /// Creates the wrapper (but no sub-keys) if the source is new.
    pub(crate) fn broadcast(&self, source: &Source, value: &Value) {
        let mut inner = self.inner.borrow_mut();
        let w = inner.wrapper_mut(source);
        for v in w.associations.values_mut() {
            *v = value.clone();
        }
    }

    pub(crate) fn get(&self, source: &Source, slot: &Slot) -> Option<Value> {
        self.inner
            .borrow()
            .wrapper_of(source)
            .and_then(|w| w.associations.get(slot).cloned())
    }

    /// Remove one sub-key. The entry stays even when this empties it.
    pub(crate) fn remove_slot(&self, source: &Source, slot: &Slot) -> bool {
        match self.inner.borrow_mut().wrapper_of_mut(source) {
            Some(w) => w.associations.remove(slot).is_some(),
            None => false,
        }
    }

    /// Remove the whole (source -> wrapper) entry.
    pub(crate) fn remove_entry(&self, source: &Source) -> bool {
        let mut inner = self.inner.borrow_mut();
        let key = source.key();
        let Some(&h) = inner.index.get(&key) else {
            return false;
        };
        if !inner.slots[h].matches(source) {
            // Stale occupant from a dead source; leave it for reclaim.
            return false;
        }
        inner.index.remove(&key);
        inner.slots.remove(h);
        true
    }

    /// Snapshot of (live source, value at `slot`) for every entry whose
    /// source is still reachable. Taken in one borrow so callers can run
    /// arbitrary predicates (which may reenter this crate) afterwards.
    pub(crate) fn snapshot(&self, slot: Option<&Slot>) -> Vec<(Source, Option<Value>)> {
        let inner = self.inner.borrow();
        inner
            .slots
            .values()
            .filter_map(|w| {
                let src = w.get()?;
                let val = slot.and_then(|s| w.associations.get(s).cloned());
                Some((src, val))
            })
            .collect()
    }

    /// Clear the association tables of wrappers whose source died.
    /// Entries are kept; only their contents go. Returns how many
    /// wrappers this pass emptied.
    fn reap_dead(&self) -> usize {
        let mut inner = self.inner.borrow_mut();
        let mut emptied = 0;
        for w in inner.slots.values_mut() {
            if w.reap() {
                emptied += 1;
            }
        }
        emptied
    }
}

struct CarrierSlot {
    /// Weak guard on the carrier; a dead guard means the slot is stale.
    carrier: Weak<dyn Any>,
    store: Store,
}

struct Registry {
    stores: HashMap<usize, CarrierSlot>,
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry {
        stores: HashMap::new(),
    });
    static DEFAULT_CARRIER: Rc<dyn Any> = Rc::new(());
}

/// The process-wide (per thread) default carrier, as a source. Passing it
/// as `Options::storage` is equivalent to passing no storage at all;
/// having it as a value lets callers inspect or detach the default store.
pub fn default_carrier() -> Source {
    DEFAULT_CARRIER.with(|c| Source::Object(c.clone()))
}

fn carrier_key(rc: &Rc<dyn Any>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

/// Resolve the store attached to `carrier`, optionally creating it.
///
/// Fails with `InvalidCarrier` for a primitive carrier. With
/// `create_if_missing` the call is idempotent: a second call returns a
/// handle to the same store. Without it, an unattached carrier resolves
/// to `None` and nothing is mutated.
pub fn store_for(carrier: &Source, create_if_missing: bool) -> Result<Option<Store>, AssocError> {
    let rc = carrier.as_object().ok_or(AssocError::InvalidCarrier)?;
    let key = carrier_key(rc);
    REGISTRY.with(|r| {
        let mut reg = r.borrow_mut();
        if let Some(slot) = reg.stores.get(&key) {
            let live = match slot.carrier.upgrade() {
                Some(live) => Rc::ptr_eq(&live, rc),
                None => false,
            };
            if live {
                return Ok(Some(slot.store.clone()));
            }
            // Stale slot: the previous carrier at this address died.
            reg.stores.remove(&key);
        }
        if !create_if_missing {
            return Ok(None);
        }
        let store = Store::new();
        reg.stores.insert(
            key,
            CarrierSlot {
                carrier: Rc::downgrade(rc),
                store: store.clone(),
            },
        );
        Ok(Some(store))
    })
}

/// Detach and return the store attached to `carrier`, if any. The
/// returned handle stays usable; detaching is what lets the table be
/// dropped once all handles go.
pub fn remove_store(carrier: &Source) -> Result<Option<Store>, AssocError> {
    let rc = carrier.as_object().ok_or(AssocError::InvalidCarrier)?;
    let key = carrier_key(rc);
    REGISTRY.with(|r| {
        let mut reg = r.borrow_mut();
        let Some(slot) = reg.stores.get(&key) else {
            return Ok(None);
        };
        let live = match slot.carrier.upgrade() {
            Some(live) => Rc::ptr_eq(&live, rc),
            None => false,
        };
        let slot = reg.stores.remove(&key).expect("slot checked above");
        Ok(if live { Some(slot.store) } else { None })
    })
}

/// Outcome of a [`reclaim`] pass.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ReclaimStats {
    /// Wrappers whose association table this pass cleared.
    pub emptied_sources: usize,
    /// Registry slots dropped because their carrier died.
    pub dropped_stores: usize,
}

/// Explicit reclamation pass: for every registered store, clear the
/// associations of sources that became unreachable, and drop stores whose
/// carrier became unreachable. Emptied entries stay in their store.
///
/// There is no asynchronous collector here; until this runs (or the dead
/// source's entry is otherwise removed), a dead source's associations
/// occupy memory but are unobservable through the API.
pub fn reclaim() -> ReclaimStats {
    REGISTRY.with(|r| {
        let mut reg = r.borrow_mut();
        let mut stats = ReclaimStats::default();
        reg.stores.retain(|_, slot| {
            if slot.carrier.strong_count() == 0 {
                stats.dropped_stores += 1;
                return false;
            }
            stats.emptied_sources += slot.store.reap_dead();
            true
        });
        stats
    })
}
