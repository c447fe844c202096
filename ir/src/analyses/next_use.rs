use crate::block::Block;
use crate::operand::Operand;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NextUse {
    Dead,
    Live(usize),
}

/// Next-use info for every operand the allocator might ask about, as of the
/// point immediately before a given instruction executes.
///
/// An operand absent from the map is dead at that point; callers should
/// treat `map.get(op)` returning `None` the same as `Some(&NextUse::Dead)`.
pub type NextUseMap = HashMap<Operand, NextUse>;

/// Per-instruction next-use info for one block (§4.1), indexed the same as
/// `block.instructions`.
///
/// Computed with the classic Aho-Ullman backward walk: seed the table from
/// the block's live-out set (each such operand is live with its next use
/// somewhere past the end of the block, represented by the sentinel index
/// `n`), then for each instruction in reverse, record the table *before*
/// applying that instruction's own effect — so `per_instruction[idx]`
/// describes what's still needed strictly after `idx`, which is exactly
/// what a code-gen driver wants to know when deciding whether to free a
/// register right after emitting `idx`. Only then mark `idx`'s destination
/// dead and its sources live at `idx`, in that order, so a destination that
/// is also read by the same instruction (e.g. `x = x + y`) stays live.
///
/// Built once per block from its live-out set and consulted by the code-gen
/// driver while lowering that block's instructions in order, so it must be
/// computed before lowering starts (live-out doesn't change as lowering
/// proceeds).
pub fn next_use(block: &Block, live_out: &HashSet<Operand>) -> Vec<NextUseMap> {
    let n = block.instructions.len();
    let mut state: NextUseMap = HashMap::new();
    for op in live_out {
        state.insert(op.clone(), NextUse::Live(n));
    }

    let mut per_instruction = vec![NextUseMap::new(); n];

    for idx in (0..n).rev() {
        per_instruction[idx] = state.clone();

        let instr = &block.instructions[idx];
        if let Some(def) = instr.defines() {
            state.insert(def.clone(), NextUse::Dead);
        }
        for op in instr.uses() {
            state.insert(op, NextUse::Live(idx));
        }
    }

    per_instruction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::Instruction;
    use crate::operand::Temp;

    fn status(map: &NextUseMap, op: &Operand) -> NextUse {
        map.get(op).copied().unwrap_or(NextUse::Dead)
    }

    #[test]
    fn dead_immediately_after_last_use() {
        let x = Operand::Temp(Temp(0));
        let block = Block::new(
            "entry",
            vec![
                Instruction::Get { dst: x.clone() },
                Instruction::Put { src: x.clone() },
                Instruction::Halt,
            ],
        );
        let nu = next_use(&block, &HashSet::new());
        // nothing after the Put reads x again
        assert_eq!(status(&nu[1], &x), NextUse::Dead);
        assert_eq!(status(&nu[2], &x), NextUse::Dead);
    }

    #[test]
    fn live_between_definition_and_use_names_the_use_site() {
        let x = Operand::Temp(Temp(0));
        let block = Block::new(
            "entry",
            vec![
                Instruction::Get { dst: x.clone() },
                Instruction::Put { src: x.clone() },
                Instruction::Halt,
            ],
        );
        let nu = next_use(&block, &HashSet::new());
        // right after the Get (instruction 0) runs, x is still needed, next at 1
        assert_eq!(status(&nu[0], &x), NextUse::Live(1));
    }

    #[test]
    fn redefinition_before_the_recorded_use_kills_the_old_value() {
        let x = Operand::Temp(Temp(0));
        let block = Block::new(
            "entry",
            vec![
                Instruction::Move { src: Operand::constant(1), dst: x.clone() },
                Instruction::Move { src: Operand::constant(2), dst: x.clone() },
                Instruction::Put { src: x.clone() },
                Instruction::Halt,
            ],
        );
        let nu = next_use(&block, &HashSet::new());
        // the value written at instruction 0 is immediately overwritten at 1
        // before anything reads it, so it's already dead right after 0.
        assert_eq!(status(&nu[0], &x), NextUse::Dead);
        // the value written at 1 is what instruction 2 reads.
        assert_eq!(status(&nu[1], &x), NextUse::Live(2));
    }

    #[test]
    fn no_definition_between_live_point_and_next_use() {
        let x = Operand::Temp(Temp(0));
        let y = Operand::Temp(Temp(1));
        let block = Block::new(
            "entry",
            vec![
                Instruction::Get { dst: x.clone() },
                Instruction::Get { dst: y.clone() },
                Instruction::Put { src: x.clone() },
                Instruction::Halt,
            ],
        );
        let nu = next_use(&block, &HashSet::new());
        if let NextUse::Live(next) = status(&nu[0], &x) {
            for i in 1..next {
                assert_ne!(block.instructions[i].defines(), Some(&x));
            }
        } else {
            panic!("expected x to be live after instruction 0");
        }
    }
}
