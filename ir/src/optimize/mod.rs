//! Optimization passes over a `Program` (§4.2, C3).
//!
//! Each pass returns whether it changed anything; analyses that depend on
//! instruction identity are invalidated by a pass and must be recomputed by
//! whoever needs them next (§5).

pub mod array_promotion;
pub mod const_fold;
pub mod dead_store;

pub use array_promotion::promote_arrays;
pub use const_fold::constant_fold;
pub use dead_store::eliminate_dead_stores;

use crate::block::Program;

/// Runs every pass to a combined fixpoint: array promotion first (it only
/// ever needs to run once, since it doesn't create new promotion
/// candidates), then alternating constant folding and dead-store
/// elimination until neither changes anything.
pub fn optimize(program: &mut Program) -> bool {
    let mut any_changed = promote_arrays(program);

    loop {
        let folded = constant_fold(program);
        let eliminated = eliminate_dead_stores(program);
        if !folded && !eliminated {
            break;
        }
        any_changed = true;
    }

    any_changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::instr::Instruction;
    use crate::operand::{Operand, Temp};
    use crate::symtab::SymbolTable;

    #[test]
    fn dead_store_left_by_folding_is_cleaned_up() {
        let a = Operand::Temp(Temp(0));
        let b = Operand::Temp(Temp(1));
        let mut program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::Move { src: Operand::constant(2), dst: a.clone() },
                    Instruction::Add { left: a.clone(), right: Operand::constant(3), result: a.clone() },
                    Instruction::Move { src: a, dst: b.clone() },
                    Instruction::Put { src: b },
                    Instruction::Halt,
                ],
            )],
            SymbolTable::new(),
        );
        assert!(optimize(&mut program));
        // folding collapses the Add into a literal Move, which the fold
        // rewrites further through the chained Move into b.
        assert!(program.blocks[0].instructions.len() < 5);
    }
}
