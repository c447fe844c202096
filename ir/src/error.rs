use crate::instr::BlockId;
use std::fmt;

/// An internal malformation of the CFG: a programming error in whatever
/// produced the block list (front end, or a preceding optimization pass),
/// never something a source-level mistake can trigger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MalformedCfg {
    /// A block's last instruction is not `Jump`, `JumpIf` or `Halt` (or the
    /// block is empty).
    MissingTerminator { block: BlockId },
    /// A jump or branch names a block index outside the program's block
    /// list.
    UnknownTarget { from: BlockId, target: BlockId },
}

impl fmt::Display for MalformedCfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedCfg::MissingTerminator { block } => {
                write!(f, "internal error: block {} has no terminator", block.0)
            }
            MalformedCfg::UnknownTarget { from, target } => write!(
                f,
                "internal error: block {} jumps to non-existent block {}",
                from.0, target.0
            ),
        }
    }
}

impl std::error::Error for MalformedCfg {}
