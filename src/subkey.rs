//! Sub-key space: caller-supplied `Subkey`s, opaque `Token`s, and the
//! reserved `DEFAULT`/`ALL` selectors.
//!
//! The reserved selectors live in a different type than `Subkey`, so no
//! caller-supplied sub-key can ever collide with them.

use core::cell::Cell;
use core::marker::PhantomData;

/// Opaque, unforgeable sub-key token. Each call to [`Token::new`] mints a
/// token distinct from every other token. The symbol analog: two tokens
/// compare equal only if one was copied from the other.
///
/// Tokens come from a per-thread counter and are confined to their
/// minting thread, which is what keeps distinctness global:
///
/// ```compile_fail
/// let t = rc_assoc::Token::new();
/// std::thread::spawn(move || drop(t));
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Token {
    id: u64,
    // Keep !Send + !Sync in line with single-threaded design.
    _nosend: PhantomData<*mut ()>,
}

thread_local! {
    static NEXT_TOKEN: Cell<u64> = Cell::new(0);
}

impl Token {
    pub fn new() -> Self {
        NEXT_TOKEN.with(|c| {
            let n = c.get();
            // Minting 2^64 tokens on one thread is not a supported workload.
            c.set(n.checked_add(1).unwrap_or_else(|| std::process::abort()));
            Token {
                id: n,
                _nosend: PhantomData,
            }
        })
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

/// A caller-supplied sub-key: text, index, or opaque token.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Subkey {
    Text(String),
    Index(i64),
    Token(Token),
}

impl From<&str> for Subkey {
    fn from(s: &str) -> Self {
        Subkey::Text(s.to_string())
    }
}

impl From<String> for Subkey {
    fn from(s: String) -> Self {
        Subkey::Text(s)
    }
}

impl From<i64> for Subkey {
    fn from(i: i64) -> Self {
        Subkey::Index(i)
    }
}

impl From<Token> for Subkey {
    fn from(t: Token) -> Self {
        Subkey::Token(t)
    }
}

/// Sub-key argument accepted by the association operations: a concrete
/// [`Subkey`], or one of the two reserved selectors.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Selector {
    /// The implicit sub-key used when a caller has no name for one.
    Default,
    /// Every currently-present sub-key (writes) / the whole entry (removal).
    All,
    Key(Subkey),
}

/// The implicit sub-key selector.
pub const DEFAULT: Selector = Selector::Default;

/// The broadcast/remove-everything selector.
pub const ALL: Selector = Selector::All;

impl Selector {
    /// The association-table slot this selector addresses, if any.
    /// `All` addresses no single slot.
    pub(crate) fn to_slot(&self) -> Option<Slot> {
        match self {
            Selector::Default => Some(Slot::Default),
            Selector::All => None,
            Selector::Key(k) => Some(Slot::Key(k.clone())),
        }
    }
}

impl From<Subkey> for Selector {
    fn from(k: Subkey) -> Self {
        Selector::Key(k)
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        Selector::Key(s.into())
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::Key(s.into())
    }
}

impl From<i64> for Selector {
    fn from(i: i64) -> Self {
        Selector::Key(i.into())
    }
}

impl From<Token> for Selector {
    fn from(t: Token) -> Self {
        Selector::Key(t.into())
    }
}

/// Storage key inside a wrapper's association table. `ALL` never appears
/// here; the default sub-key is a slot like any other.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) enum Slot {
    Default,
    Key(Subkey),
}

#[cfg(test)]
mod tests {
    use super::{Selector, Subkey, Token, ALL, DEFAULT};

    #[test]
    fn tokens_are_distinct() {
        let a = Token::new();
        let b = Token::new();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn sentinels_never_equal_caller_keys() {
        let named: Selector = "DEFAULT".into();
        assert_ne!(named, DEFAULT);
        assert_ne!(named, ALL);
        let indexed: Selector = 0i64.into();
        assert_ne!(indexed, DEFAULT);
        assert_ne!(indexed, ALL);
    }

    #[test]
    fn selector_slots() {
        assert!(DEFAULT.to_slot().is_some());
        assert!(ALL.to_slot().is_none());
        let sel: Selector = Subkey::Text("x".into()).into();
        assert!(sel.to_slot().is_some());
    }
}
