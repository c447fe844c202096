//! Dataflow analyses over a closed list of blocks (§4.1, C2).
//!
//! Every analysis here is a pure function from `&Program` (plus whatever
//! smaller analysis it builds on) to an immutable per-block or
//! per-instruction map; none mutate the IR.

pub mod dominators;
pub mod liveness;
pub mod next_use;
pub mod predecessors;
pub mod reaching;

pub use dominators::{dominators, Dominators};
pub use liveness::{liveness, LiveSets, Liveness};
pub use next_use::{next_use, NextUse, NextUseMap};
pub use predecessors::{predecessors, Predecessors};
pub use reaching::{reaching_definitions, DefSite, ReachSets, ReachingDefs};
