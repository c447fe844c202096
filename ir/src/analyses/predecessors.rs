use crate::block::Program;
use crate::error::MalformedCfg;
use crate::instr::BlockId;
use std::collections::HashMap;

pub type Predecessors = HashMap<BlockId, Vec<BlockId>>;

/// For each block, the set of blocks whose terminator names it as a target.
///
/// `Halt` contributes no edges. Fails if any block's last instruction is not
/// a terminator, or if a terminator names a block outside the program.
pub fn predecessors(program: &Program) -> Result<Predecessors, MalformedCfg> {
    let mut preds: Predecessors = program.block_ids().map(|id| (id, Vec::new())).collect();

    for id in program.block_ids() {
        let block = program.block(id);
        if block.terminator().is_none() {
            return Err(MalformedCfg::MissingTerminator { block: id });
        }
        for target in block.successors() {
            if target.0 >= program.blocks.len() {
                return Err(MalformedCfg::UnknownTarget { from: id, target });
            }
            preds.get_mut(&target).unwrap().push(id);
        }
    }

    Ok(preds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::instr::Instruction;
    use crate::symtab::SymbolTable;

    fn program(blocks: Vec<Block>) -> Program {
        Program::new(blocks, SymbolTable::new())
    }

    #[test]
    fn straight_line_has_no_predecessors_for_entry() {
        let program = program(vec![
            Block::new("entry", vec![Instruction::Jump { target: BlockId(1) }]),
            Block::new("exit", vec![Instruction::Halt]),
        ]);
        let preds = predecessors(&program).unwrap();
        assert!(preds[&BlockId(0)].is_empty());
        assert_eq!(preds[&BlockId(1)], vec![BlockId(0)]);
    }

    #[test]
    fn branch_creates_two_predecessor_edges() {
        use crate::operand::{Operand, Temp};
        use crate::instr::RelOp;

        let program = program(vec![
            Block::new(
                "entry",
                vec![Instruction::JumpIf {
                    op: RelOp::Eq,
                    left: Operand::Temp(Temp(0)),
                    right: Operand::Temp(Temp(1)),
                    if_true: BlockId(1),
                    if_false: BlockId(2),
                }],
            ),
            Block::new("then", vec![Instruction::Jump { target: BlockId(2) }]),
            Block::new("join", vec![Instruction::Halt]),
        ]);
        let preds = predecessors(&program).unwrap();
        assert_eq!(preds[&BlockId(2)], vec![BlockId(0), BlockId(1)]);
    }

    #[test]
    fn missing_terminator_is_reported() {
        let program = program(vec![Block::new("entry", vec![])]);
        assert_eq!(
            predecessors(&program),
            Err(MalformedCfg::MissingTerminator { block: BlockId(0) })
        );
    }

    #[test]
    fn unknown_target_is_reported() {
        let program = program(vec![Block::new(
            "entry",
            vec![Instruction::Jump { target: BlockId(7) }],
        )]);
        assert_eq!(
            predecessors(&program),
            Err(MalformedCfg::UnknownTarget { from: BlockId(0), target: BlockId(7) })
        );
    }
}
