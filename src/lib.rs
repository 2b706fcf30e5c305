//! rc-assoc: attach values to arbitrary sources (objects or primitives)
//! without mutating the source and without keeping it alive.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a sidecar attribute store keyed by identity. A caller picks a
//!   source (any `Rc`-owned object, or a primitive), a sub-key, and a
//!   value; the crate remembers the triple in a side-table scoped to a
//!   carrier, holding object sources only weakly.
//! - Layers:
//!   - SourceWrapper: one source's sub-key table plus its origin state
//!     (primitive held strongly, object held via `Weak`, or reclaimed).
//!   - Store: per-carrier table from source identity to SourceWrapper;
//!     a hashbrown index over a slotmap arena, reached through a
//!     cloneable `Rc<RefCell<_>>` handle.
//!   - Association API: `associate` / `associated` / `disassociate`,
//!     the bound-accessor `association`, and the reserved `DEFAULT` /
//!     `ALL` selectors.
//!
//! Constraints
//! - Single-threaded: `Rc`, `RefCell`, and thread-local registry state;
//!   each thread has its own stores and its own default carrier.
//! - Sources never leak: object sources are held through `Weak` only, so
//!   an association never extends its source's lifetime.
//! - Carriers are untouched: stores attach through an out-of-band
//!   registry keyed by carrier identity, with a weak guard per slot, not
//!   through any mutation of the carrier value itself.
//! - Identity: primitives key by value, objects by allocation address. A
//!   recycled address is detected through the weak handle and treated as
//!   a new source.
//!
//! Reclamation model
//! - Rust has weak handles but no post-mortem notification, so eviction
//!   is split: every access checks liveness (a dead source is never
//!   observable), and an explicit [`reclaim`] pass clears dead sources'
//!   tables and drops dead carriers' stores. When a dead source's table
//!   is cleared, its entry stays in the store; only an `ALL` removal
//!   takes entries out. That asymmetry is deliberate and also applies to
//!   removing sub-keys one at a time: emptying an entry never deletes it.
//!
//! Notes and non-goals
//! - No ordering or iteration guarantees across sources; the comparator
//!   scan in `associated` visits entries in arbitrary order.
//! - No transactions: the `ALL` broadcast and `ALL` removal are the only
//!   multi-key operations and are plain loops.
//! - Any code holding a carrier reference shares that carrier's store;
//!   no access control is provided.
//! - Values are `Rc<dyn Any>`; callers downcast on the way out.

mod associate;
mod source;
mod store;
mod subkey;
mod wrapper;

// Public surface
pub use associate::{associate, associated, association, disassociate};
pub use associate::{AssocError, Association, Options};
pub use source::Source;
pub use store::{default_carrier, reclaim, remove_store, store_for};
pub use store::{ReclaimStats, Store};
pub use subkey::{Selector, Subkey, Token, ALL, DEFAULT};
pub use wrapper::Value;
