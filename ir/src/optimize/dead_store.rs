use crate::analyses::{liveness, next_use, NextUse};
use crate::block::Program;
use crate::instr::Instruction;

/// Removes stores that are provably never read (§4.2).
///
/// A `Move { src: Constant(_), dst }` is dropped when `dst` is dead
/// immediately after it, per the per-block next-use table seeded from that
/// block's live-out set. Anything with a side effect beyond naming a
/// value — `Get`, `Put`, `IndexedStore`, every branch, `Halt` — is always
/// kept; only a bare constant move into a now-unread name is eligible.
pub fn eliminate_dead_stores(program: &mut Program) -> bool {
    let live = liveness(program);
    let mut changed = false;

    for id in program.block_ids().collect::<Vec<_>>() {
        let live_out = live[&id].live_out.clone();
        let block = program.block(id).clone();
        let nu = next_use(&block, &live_out);

        let mut kept = Vec::with_capacity(block.instructions.len());
        for (idx, instr) in block.instructions.into_iter().enumerate() {
            let drop_it = match &instr {
                Instruction::Move { src, dst } if src.as_constant().is_some() => {
                    matches!(nu[idx].get(dst).copied().unwrap_or(NextUse::Dead), NextUse::Dead)
                }
                _ => false,
            };

            if drop_it {
                changed = true;
            } else {
                kept.push(instr);
            }
        }

        program.block_mut(id).instructions = kept;
    }

    if changed {
        log::debug!("eliminate_dead_stores: removed at least one dead constant store");
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::instr::BlockId;
    use crate::operand::{Operand, Temp};
    use crate::symtab::SymbolTable;

    #[test]
    fn dead_constant_store_is_removed() {
        let x = Operand::Temp(Temp(0));
        let mut program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::Move { src: Operand::constant(1), dst: x.clone() },
                    Instruction::Move { src: Operand::constant(2), dst: x },
                    Instruction::Halt,
                ],
            )],
            SymbolTable::new(),
        );
        assert!(eliminate_dead_stores(&mut program));
        assert_eq!(program.blocks[0].instructions.len(), 2);
        assert_eq!(
            program.blocks[0].instructions[0],
            Instruction::Move { src: Operand::constant(2), dst: Operand::Temp(Temp(0)) }
        );
    }

    #[test]
    fn live_out_store_survives() {
        let x = Operand::Temp(Temp(0));
        let mut program = Program::new(
            vec![
                Block::new(
                    "entry",
                    vec![
                        Instruction::Move { src: Operand::constant(1), dst: x.clone() },
                        Instruction::Jump { target: BlockId(1) },
                    ],
                ),
                Block::new("exit", vec![Instruction::Put { src: x.clone() }, Instruction::Halt]),
            ],
            SymbolTable::new(),
        );
        assert!(!eliminate_dead_stores(&mut program));
        assert_eq!(program.blocks[0].instructions.len(), 2);
    }

    #[test]
    fn side_effecting_instructions_are_never_dropped() {
        let x = Operand::Temp(Temp(0));
        let mut program = Program::new(
            vec![Block::new(
                "entry",
                vec![Instruction::Get { dst: x }, Instruction::Halt],
            )],
            SymbolTable::new(),
        );
        assert!(!eliminate_dead_stores(&mut program));
        assert_eq!(program.blocks[0].instructions.len(), 2);
    }
}
