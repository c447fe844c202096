use crate::analyses::predecessors::Predecessors;
use crate::block::Program;
use crate::instr::BlockId;
use crate::operand::Operand;
use std::collections::{HashMap, HashSet};

/// A definition site: the instruction at `index` within `block`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DefSite {
    pub block: BlockId,
    pub index: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReachSets {
    pub reach_in: HashSet<DefSite>,
    pub reach_out: HashSet<DefSite>,
}

pub type ReachingDefs = HashMap<BlockId, ReachSets>;

/// Forward, all-paths reaching-definitions analysis (§4.1).
///
/// `in(b) = ∪ out(p) for p in predecessors(b)`; walking a block forward,
/// each definition kills every previously-reaching definition of the same
/// operand and adds itself. Iterated to a fixpoint.
pub fn reaching_definitions(program: &Program, preds: &Predecessors) -> ReachingDefs {
    let mut sets: ReachingDefs =
        program.block_ids().map(|id| (id, ReachSets::default())).collect();

    let mut changed = true;
    while changed {
        changed = false;

        for id in program.block_ids() {
            let mut incoming: HashSet<DefSite> = HashSet::new();
            for &p in &preds[&id] {
                incoming.extend(sets[&p].reach_out.iter().copied());
            }

            let block = program.block(id);
            let mut current = incoming.clone();
            for (index, instr) in block.instructions.iter().enumerate() {
                if let Some(def) = instr.defines() {
                    kill_definitions_of(def, &current, program, &mut current);
                    current.insert(DefSite { block: id, index });
                }
            }

            let entry = sets.get_mut(&id).unwrap();
            if entry.reach_in != incoming || entry.reach_out != current {
                entry.reach_in = incoming;
                entry.reach_out = current;
                changed = true;
            }
        }
    }

    sets
}

fn kill_definitions_of(
    def: &Operand,
    before: &HashSet<DefSite>,
    program: &Program,
    current: &mut HashSet<DefSite>,
) {
    let stale: Vec<DefSite> = before
        .iter()
        .copied()
        .filter(|site| {
            program.block(site.block).instructions[site.index].defines() == Some(def)
        })
        .collect();
    for site in stale {
        current.remove(&site);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyses::predecessors::predecessors;
    use crate::block::Block;
    use crate::instr::Instruction;
    use crate::operand::Temp;
    use crate::symtab::SymbolTable;

    #[test]
    fn single_definition_reaches_its_use() {
        let x = Operand::Temp(Temp(0));
        let program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::Move { src: Operand::constant(1), dst: x.clone() },
                    Instruction::Put { src: x },
                    Instruction::Halt,
                ],
            )],
            SymbolTable::new(),
        );
        let preds = predecessors(&program).unwrap();
        let reach = reaching_definitions(&program, &preds);
        assert_eq!(reach[&BlockId(0)].reach_in.len(), 0);
        assert_eq!(reach[&BlockId(0)].reach_out.len(), 1);
    }

    #[test]
    fn redefinition_kills_the_prior_one() {
        let x = Operand::Temp(Temp(0));
        let program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::Move { src: Operand::constant(1), dst: x.clone() },
                    Instruction::Move { src: Operand::constant(2), dst: x.clone() },
                    Instruction::Halt,
                ],
            )],
            SymbolTable::new(),
        );
        let preds = predecessors(&program).unwrap();
        let reach = reaching_definitions(&program, &preds);
        let out = &reach[&BlockId(0)].reach_out;
        assert_eq!(out.len(), 1);
        assert!(out.contains(&DefSite { block: BlockId(0), index: 1 }));
    }

    #[test]
    fn merge_point_reaches_from_both_branches() {
        use crate::instr::RelOp;
        let x = Operand::Temp(Temp(0));
        let cond = Operand::Temp(Temp(1));
        let program = Program::new(
            vec![
                Block::new(
                    "entry",
                    vec![Instruction::JumpIf {
                        op: RelOp::Eq,
                        left: cond.clone(),
                        right: Operand::constant(0),
                        if_true: BlockId(1),
                        if_false: BlockId(2),
                    }],
                ),
                Block::new(
                    "then",
                    vec![
                        Instruction::Move { src: Operand::constant(1), dst: x.clone() },
                        Instruction::Jump { target: BlockId(3) },
                    ],
                ),
                Block::new(
                    "else",
                    vec![
                        Instruction::Move { src: Operand::constant(2), dst: x.clone() },
                        Instruction::Jump { target: BlockId(3) },
                    ],
                ),
                Block::new("join", vec![Instruction::Halt]),
            ],
            SymbolTable::new(),
        );
        let preds = predecessors(&program).unwrap();
        let reach = reaching_definitions(&program, &preds);
        assert_eq!(reach[&BlockId(3)].reach_in.len(), 2);
    }
}
