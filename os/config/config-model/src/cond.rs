//! Boolean expressions over selected names.
//!
//! `file`, `object`, `device-major` and `makeoptions` lines carry an
//! optional condition such as `sd | cd` or `ffs & !small`. Atoms are
//! looked up in the selected set at the end of the run.

use crate::symbol::Sym;
use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CondExpr {
    Atom(Sym),
    Not(Box<Self>),
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
}

impl CondExpr {
    #[must_use]
    pub fn not(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    #[must_use]
    pub fn and(lhs: Self, rhs: Self) -> Self {
        Self::And(Box::new(lhs), Box::new(rhs))
    }

    #[must_use]
    pub fn or(lhs: Self, rhs: Self) -> Self {
        Self::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Evaluates the expression, asking `is_set` for each atom.
    pub fn eval(&self, is_set: &mut impl FnMut(Sym) -> bool) -> bool {
        match self {
            Self::Atom(name) => is_set(*name),
            Self::Not(inner) => !inner.eval(is_set),
            Self::And(lhs, rhs) => lhs.eval(is_set) && rhs.eval(is_set),
            Self::Or(lhs, rhs) => lhs.eval(is_set) || rhs.eval(is_set),
        }
    }

    /// All atoms in left-to-right order.
    #[must_use]
    pub fn atoms(&self) -> Vec<Sym> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms(&self, out: &mut Vec<Sym>) {
        match self {
            Self::Atom(name) => out.push(*name),
            Self::Not(inner) => inner.collect_atoms(out),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.collect_atoms(out);
                rhs.collect_atoms(out);
            }
        }
    }
}

impl fmt::Display for CondExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(name) => write!(f, "{name}"),
            Self::Not(inner) => write!(f, "!{inner}"),
            Self::And(lhs, rhs) => write!(f, "({lhs} & {rhs})"),
            Self::Or(lhs, rhs) => write!(f, "({lhs} | {rhs})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Interner;

    #[test]
    fn evaluates_against_set() {
        let mut names = Interner::new();
        let ffs = names.intern("ffs");
        let small = names.intern("small");
        let expr = CondExpr::and(CondExpr::Atom(ffs), CondExpr::not(CondExpr::Atom(small)));
        assert!(expr.eval(&mut |s| s == ffs));
        assert!(!expr.eval(&mut |_| true));
        assert_eq!(expr.atoms(), [ffs, small]);
        assert_eq!(expr.to_string(), "(ffs & !small)");
    }
}
