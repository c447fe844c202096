use crate::symtab::Symbol;
use num_bigint::BigInt;
use std::fmt;

/// A compiler-generated scalar with a unique, non-negative id.
///
/// Temporaries are defined by exactly one instruction (single static
/// assignment), unlike named variables.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct Temp(pub u32);

/// Hands out fresh, strictly increasing [`Temp`] ids.
#[derive(Default, Debug)]
pub struct TempCounter(u32);

impl TempCounter {
    pub fn new() -> TempCounter {
        TempCounter(0)
    }

    pub fn fresh(&mut self) -> Temp {
        let t = Temp(self.0);
        self.0 += 1;
        t
    }
}

/// One operand position in a quadruple.
///
/// Equality and hashing are structural, so operands can key dataflow maps
/// directly (`HashMap<Operand, _>`) without a side identity table.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Operand {
    Constant(BigInt),
    Name(Symbol),
    Temp(Temp),
}

impl Operand {
    pub fn constant(v: impl Into<BigInt>) -> Operand {
        Operand::Constant(v.into())
    }

    pub fn as_constant(&self) -> Option<&BigInt> {
        match self {
            Operand::Constant(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_temp(&self) -> bool {
        matches!(self, Operand::Temp(_))
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Operand::Name(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Constant(v) => write!(f, "{}", v),
            Operand::Name(sym) => write!(f, "%{}", sym.0),
            Operand::Temp(t) => write!(f, "t{}", t.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_ignores_provenance() {
        let a = Operand::constant(5);
        let b = Operand::constant(5);
        assert_eq!(a, b);
    }

    #[test]
    fn temps_are_distinguishable() {
        let mut counter = TempCounter::new();
        let t0 = counter.fresh();
        let t1 = counter.fresh();
        assert_ne!(t0, t1);
    }
}
