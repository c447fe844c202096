//! Symbol table entries, as handed to the back end by the front end.
//!
//! The back end treats [`Symbol`] as an opaque identity: it never resolves
//! names itself, only looks up the attributes in [`SymbolTable`] needed to
//! size arrays and distinguish iterators from ordinary variables.

use std::cell::Cell;
use util::SourcePos;

/// An index into a [`SymbolTable`]. Cheap to copy, compares by identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Symbol(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Variable {
        /// Loop induction variable; immutable in the body of its `FOR`.
        iterator: bool,
    },
    Array {
        lo: i64,
        hi: i64,
    },
}

impl SymbolKind {
    pub fn is_array(&self) -> bool {
        matches!(self, SymbolKind::Array { .. })
    }
}

#[derive(Clone, Debug)]
pub struct SymbolEntry {
    pub name: String,
    pub kind: SymbolKind,
    /// Set by the front end once a variable's first definition has been
    /// lowered. Informational only — the register allocator's own
    /// uninitialized-use diagnostic (see `backend::regalloc`) is driven by
    /// the absence of any location for the operand, not by this flag.
    pub initialized: Cell<bool>,
    /// Where this symbol was declared, so the back end's lazily-emitted
    /// uninitialized-use warning (§4.5, §7) can point somewhere. `None` for
    /// symbols synthesized by an optimization pass (e.g. array promotion's
    /// per-offset scalars), which never themselves trigger that warning.
    pub declared_at: Option<SourcePos>,
}

impl SymbolEntry {
    /// Number of words this entry occupies in memory: 1 for a scalar, `hi -
    /// lo + 1` for an array.
    pub fn size(&self) -> u32 {
        match self.kind {
            SymbolKind::Variable { .. } => 1,
            SymbolKind::Array { lo, hi } => (hi - lo + 1) as u32,
        }
    }

    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self.kind {
            SymbolKind::Array { lo, hi } => Some((lo, hi)),
            SymbolKind::Variable { .. } => None,
        }
    }

    pub fn is_iterator(&self) -> bool {
        matches!(self.kind, SymbolKind::Variable { iterator: true })
    }
}

#[derive(Default, Debug)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    pub fn declare_variable(&mut self, name: impl Into<String>, iterator: bool) -> Symbol {
        self.declare_variable_at(name, iterator, None)
    }

    /// As [`SymbolTable::declare_variable`], recording where in the source
    /// this variable was declared for later diagnostics.
    pub fn declare_variable_at(
        &mut self,
        name: impl Into<String>,
        iterator: bool,
        declared_at: Option<SourcePos>,
    ) -> Symbol {
        let id = self.entries.len() as u32;
        self.entries.push(SymbolEntry {
            name: name.into(),
            kind: SymbolKind::Variable { iterator },
            initialized: Cell::new(false),
            declared_at,
        });
        Symbol(id)
    }

    pub fn declare_array(&mut self, name: impl Into<String>, lo: i64, hi: i64) -> Symbol {
        self.declare_array_at(name, lo, hi, None)
    }

    /// As [`SymbolTable::declare_array`], recording where in the source this
    /// array was declared for later diagnostics.
    pub fn declare_array_at(
        &mut self,
        name: impl Into<String>,
        lo: i64,
        hi: i64,
        declared_at: Option<SourcePos>,
    ) -> Symbol {
        debug_assert!(hi >= lo, "array upper bound must not be below lower bound");
        let id = self.entries.len() as u32;
        self.entries.push(SymbolEntry {
            name: name.into(),
            kind: SymbolKind::Array { lo, hi },
            initialized: Cell::new(true),
            declared_at,
        });
        Symbol(id)
    }

    pub fn get(&self, sym: Symbol) -> &SymbolEntry {
        &self.entries[sym.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &SymbolEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (Symbol(i as u32), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_size_is_inclusive() {
        let mut table = SymbolTable::new();
        let a = table.declare_array("a", -3, 3);
        assert_eq!(table.get(a).size(), 7);
    }

    #[test]
    fn scalar_size_is_one() {
        let mut table = SymbolTable::new();
        let v = table.declare_variable("x", false);
        assert_eq!(table.get(v).size(), 1);
    }

    #[test]
    fn iterator_flag_round_trips() {
        let mut table = SymbolTable::new();
        let i = table.declare_variable("i", true);
        assert!(table.get(i).is_iterator());
    }
}
