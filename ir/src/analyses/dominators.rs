use crate::analyses::predecessors::Predecessors;
use crate::block::Program;
use crate::instr::BlockId;
use std::collections::{HashMap, HashSet};

pub type Dominators = HashMap<BlockId, HashSet<BlockId>>;

/// Standard iterative fixpoint dominator computation (§4.1).
///
/// `dom(entry) = {entry}`; every other block starts at "all blocks" and
/// shrinks to `{b} ∪ (∩ dom(p) for p in predecessors(b))` until no set
/// changes across a full pass over all blocks.
pub fn dominators(program: &Program, preds: &Predecessors) -> Dominators {
    let entry = program.entry();
    let all: HashSet<BlockId> = program.block_ids().collect();

    let mut dom: Dominators = program
        .block_ids()
        .map(|id| {
            let set = if id == entry {
                let mut s = HashSet::new();
                s.insert(entry);
                s
            } else {
                all.clone()
            };
            (id, set)
        })
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for id in program.block_ids() {
            if id == entry {
                continue;
            }
            let mut new_set: Option<HashSet<BlockId>> = None;
            for &p in &preds[&id] {
                new_set = Some(match new_set {
                    None => dom[&p].clone(),
                    Some(acc) => acc.intersection(&dom[&p]).copied().collect(),
                });
            }
            let mut new_set = new_set.unwrap_or_else(|| all.clone());
            new_set.insert(id);

            if new_set != dom[&id] {
                dom.insert(id, new_set);
                changed = true;
            }
        }
    }

    dom
}
