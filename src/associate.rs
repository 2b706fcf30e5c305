//! The association operations: `associate`, `associated`, `disassociate`,
//! and the bound-accessor composition `association`.

use crate::source::Source;
use crate::store::{default_carrier, store_for};
use crate::subkey::Selector;
use crate::wrapper::Value;
use core::fmt;
use std::rc::Rc;

/// Errors raised by the association operations.
///
/// Lookups on missing sources or sub-keys are not errors; they resolve to
/// the caller-supplied default. Both variants signal call-site mistakes,
/// raised before any mutation occurs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AssocError {
    /// The supplied storage carrier is a primitive; carriers must be
    /// object sources.
    InvalidCarrier,
    /// Store creation yielded nothing for a valid carrier. Defensive;
    /// unreachable through the current store layer.
    NoStorage,
}

impl fmt::Display for AssocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssocError::InvalidCarrier => write!(f, "storage carrier must be an object source"),
            AssocError::NoStorage => write!(f, "no store could be obtained for the carrier"),
        }
    }
}

impl std::error::Error for AssocError {}

type Comparator = Rc<dyn Fn(&Source) -> bool>;

/// Per-call options for the association operations. By-value builder:
///
/// ```
/// use rc_assoc::{Options, Source};
/// use std::rc::Rc;
///
/// let carrier = Rc::new("scope");
/// let opts = Options::new()
///     .storage(Source::object(&carrier))
///     .default_value(Rc::new(0i32));
/// # let _ = opts;
/// ```
#[derive(Clone, Default)]
pub struct Options {
    /// Carrier scoping the operation; the default carrier when absent.
    pub storage: Option<Source>,
    /// Fallback returned by `associated` when nothing is found.
    pub default_value: Option<Value>,
    /// Predicate enabling lookup by attribute instead of identity.
    pub comparator: Option<Comparator>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(mut self, carrier: Source) -> Self {
        self.storage = Some(carrier);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn comparator(mut self, predicate: impl Fn(&Source) -> bool + 'static) -> Self {
        self.comparator = Some(Rc::new(predicate));
        self
    }

    fn carrier(&self) -> Source {
        self.storage.clone().unwrap_or_else(default_carrier)
    }
}

/// Associate `value` with `source` under `subkey`, scoped to
/// `options.storage` (default carrier when absent).
///
/// Lazily creates the carrier's store and the source's entry. With the
/// [`ALL`](crate::ALL) selector, overwrites every currently-present
/// sub-key instead of inserting one; on a source with no sub-keys yet
/// this writes nothing (but the entry is still created).
///
/// Returns the value it was given, same allocation, for chaining.
pub fn associate(
    value: Value,
    source: &Source,
    subkey: impl Into<Selector>,
    options: &Options,
) -> Result<Value, AssocError> {
    let store = store_for(&options.carrier(), true)?.ok_or(AssocError::NoStorage)?;
    match subkey.into().to_slot() {
        Some(slot) => store.put(source, slot, value.clone()),
        None => store.broadcast(source, &value),
    }
    Ok(value)
}

/// Look up the value associated with `source` under `subkey`.
///
/// Without a comparator, resolves by identity: absent store, source, or
/// sub-key all fall back to `options.default_value`. With a comparator,
/// scans the store's entries in arbitrary order and returns the value at
/// `subkey` of the first entry whose (still reachable) source satisfies
/// the predicate and actually has such a value; entries that match the
/// predicate but lack the sub-key are passed over. Never creates a store
/// or an entry.
pub fn associated(
    source: &Source,
    subkey: impl Into<Selector>,
    options: &Options,
) -> Result<Option<Value>, AssocError> {
    let Some(store) = store_for(&options.carrier(), false)? else {
        return Ok(options.default_value.clone());
    };
    let slot = subkey.into().to_slot();

    if let Some(comparator) = &options.comparator {
        // Snapshot first: the predicate is user code and may reenter.
        for (src, val) in store.snapshot(slot.as_ref()) {
            if comparator(&src) {
                if let Some(v) = val {
                    return Ok(Some(v));
                }
            }
        }
        return Ok(options.default_value.clone());
    }

    let found = slot.and_then(|s| store.get(source, &s));
    Ok(found.or_else(|| options.default_value.clone()))
}

/// Remove the association under `subkey`, or the source's whole entry
/// with the [`ALL`](crate::ALL) selector. Returns whether anything was
/// removed; an absent store or source is `false`, not an error.
///
/// Removing the last sub-key individually leaves an empty entry behind;
/// only an `ALL` removal (or a reclamation pass on a dead source, which
/// empties but also keeps the entry) takes the entry itself out. Callers
/// that need entry absence must use `ALL`.
pub fn disassociate(
    source: &Source,
    subkey: impl Into<Selector>,
    options: &Options,
) -> Result<bool, AssocError> {
    let Some(store) = store_for(&options.carrier(), false)? else {
        return Ok(false);
    };
    Ok(match subkey.into().to_slot() {
        Some(slot) => store.remove_slot(source, &slot),
        None => store.remove_entry(source),
    })
}

/// Accessors bound to one `(source, subkey, options)` triple. Pure
/// partial application over the three operations; holds no state of its
/// own. Obtained from [`association`].
pub struct Association {
    source: Source,
    selector: Selector,
    options: Options,
}

impl Association {
    /// `associated` with the bound arguments.
    pub fn get(&self) -> Result<Option<Value>, AssocError> {
        associated(&self.source, self.selector.clone(), &self.options)
    }

    /// `associated` with the bound arguments and `fallback` as the
    /// default value for this call only.
    pub fn get_or(&self, fallback: Value) -> Result<Value, AssocError> {
        let opts = self.options.clone().default_value(fallback.clone());
        let found = associated(&self.source, self.selector.clone(), &opts)?;
        Ok(found.unwrap_or(fallback))
    }

    /// `associate` with the bound arguments.
    pub fn set(&self, value: Value) -> Result<Value, AssocError> {
        associate(value, &self.source, self.selector.clone(), &self.options)
    }

    /// `disassociate` with the bound arguments.
    pub fn forget(&self) -> Result<bool, AssocError> {
        disassociate(&self.source, self.selector.clone(), &self.options)
    }
}

/// Bind `(source, subkey, options)` once and reuse the triple through an
/// [`Association`] for repeated access.
pub fn association(source: &Source, subkey: impl Into<Selector>, options: &Options) -> Association {
    Association {
        source: source.clone(),
        selector: subkey.into(),
        options: options.clone(),
    }
}
