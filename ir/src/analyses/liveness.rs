use crate::block::Program;
use crate::instr::BlockId;
use crate::operand::Operand;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveSets {
    pub live_in: HashSet<Operand>,
    pub live_out: HashSet<Operand>,
}

pub type Liveness = HashMap<BlockId, LiveSets>;

/// Backward, all-paths operand liveness, per block (§4.1).
///
/// `out(b) = ∪ in(s) for s in successors(b)`; a block's `in` is computed by
/// walking its instructions in reverse, applying `in = (out ∖
/// defines(inst)) ∪ uses(inst)` at each step. Iterated to a fixpoint over
/// the whole program, since a loop back-edge can make a block's `in` depend
/// on its own `out`.
pub fn liveness(program: &Program) -> Liveness {
    let mut sets: Liveness =
        program.block_ids().map(|id| (id, LiveSets::default())).collect();

    let mut changed = true;
    while changed {
        changed = false;

        for id in program.block_ids() {
            let block = program.block(id);

            let mut out: HashSet<Operand> = HashSet::new();
            for succ in block.successors() {
                out.extend(sets[&succ].live_in.iter().cloned());
            }

            let mut live = out.clone();
            for instr in block.instructions.iter().rev() {
                if let Some(def) = instr.defines() {
                    live.remove(def);
                }
                live.extend(instr.uses());
            }

            let entry = sets.get_mut(&id).unwrap();
            if entry.live_out != out || entry.live_in != live {
                entry.live_out = out;
                entry.live_in = live;
                changed = true;
            }
        }
    }

    sets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::instr::Instruction;
    use crate::operand::Temp;
    use crate::symtab::SymbolTable;

    #[test]
    fn value_dead_after_its_last_use() {
        let t0 = Operand::Temp(Temp(0));
        let t1 = Operand::Temp(Temp(1));
        let program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::Get { dst: t0.clone() },
                    Instruction::Put { src: t0.clone() },
                    Instruction::Get { dst: t1.clone() },
                    Instruction::Halt,
                ],
            )],
            SymbolTable::new(),
        );
        let live = liveness(&program);
        assert!(!live[&BlockId(0)].live_out.contains(&t0));
        assert!(!live[&BlockId(0)].live_out.contains(&t1));
    }

    #[test]
    fn loop_carried_value_is_live_across_back_edge() {
        let sum = Operand::Temp(Temp(0));
        let i = Operand::Temp(Temp(1));
        let program = Program::new(
            vec![
                Block::new(
                    "header",
                    vec![Instruction::Jump { target: BlockId(1) }],
                ),
                Block::new(
                    "body",
                    vec![
                        Instruction::Add { left: sum.clone(), right: i.clone(), result: sum.clone() },
                        Instruction::Jump { target: BlockId(1) },
                    ],
                ),
            ],
            SymbolTable::new(),
        );
        let live = liveness(&program);
        // sum is used and redefined every iteration, so it stays live at the
        // header's entry (the body reads it before writing it).
        assert!(live[&BlockId(0)].live_out.contains(&sum));
    }

    #[test]
    fn adding_a_use_can_only_grow_in_and_out() {
        let x = Operand::Temp(Temp(0));
        let before = Program::new(
            vec![Block::new("entry", vec![Instruction::Halt])],
            SymbolTable::new(),
        );
        let after = Program::new(
            vec![Block::new("entry", vec![Instruction::Put { src: x.clone() }, Instruction::Halt])],
            SymbolTable::new(),
        );

        let live_before = liveness(&before);
        let live_after = liveness(&after);

        assert!(live_before[&BlockId(0)].live_in.is_subset(&live_after[&BlockId(0)].live_in));
    }
}
