//! Interned names.
//!
//! Every name that flows through the model (attributes, devices, options,
//! file paths) is interned once and afterwards handled as a [`Sym`]. Two
//! symbols from the same [`Interner`] are equal exactly when they share
//! storage, so comparisons and hashing never look at the bytes.
//!
//! Interned strings live for the rest of the process. A configuration run
//! is short-lived and touches a few thousand distinct names, so the
//! interner leaks its storage instead of tracking lifetimes.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An interned string.
#[derive(Copy, Clone)]
pub struct Sym(&'static str);

impl Sym {
    /// Returns the interned text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }

    /// Returns `true` if the symbol is the empty string.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Sym {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.0, other.0)
    }
}

impl Eq for Sym {}

impl Hash for Sym {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_ptr().hash(state);
    }
}

impl PartialOrd for Sym {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Sym {
    /// Orders by text; symbols from different interners with the same text
    /// are ordered by address.
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.0
            .cmp(other.0)
            .then_with(|| self.0.as_ptr().cmp(&other.0.as_ptr()))
    }
}

impl fmt::Debug for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.0, f)
    }
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl AsRef<str> for Sym {
    fn as_ref(&self) -> &str {
        self.0
    }
}

/// Canonicalizing string store.
#[derive(Debug, Default)]
pub struct Interner {
    names: HashSet<&'static str>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical symbol for `text`, creating it on first use.
    pub fn intern(&mut self, text: &str) -> Sym {
        if let Some(&existing) = self.names.get(text) {
            return Sym(existing);
        }
        let stored: &'static str = Box::leak(text.to_owned().into_boxed_str());
        self.names.insert(stored);
        Sym(stored)
    }

    /// Returns the symbol for `text` if it was interned before.
    #[must_use]
    pub fn lookup(&self, text: &str) -> Option<Sym> {
        self.names.get(text).map(|&s| Sym(s))
    }

    /// Interns the lower-case spelling of `sym`.
    pub fn lowercase(&mut self, sym: Sym) -> Sym {
        if sym.0.bytes().any(|b| b.is_ascii_uppercase()) {
            self.intern(&sym.0.to_ascii_lowercase())
        } else {
            sym
        }
    }

    /// Number of distinct strings interned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
