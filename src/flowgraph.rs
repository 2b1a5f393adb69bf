//! A control flow graph represented as mappings of basic blocks to their predecessors
//! and successors.
//!
//! Successors are basic blocks and predecessors are basic blocks together with the branch
//! instruction that transfers control. The graph considers only the blocks currently in the
//! function layout; recompute it after rewriting terminators or removing blocks.

use crate::entity::SecondaryMap;
use crate::ir::{Block, FunctionData, Inst};
use crate::timing;

/// A basic block denoting where the end of a block is within the predecessor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockPredecessor {
    /// The predecessor block.
    pub block: Block,
    /// The branch instruction at the end of it.
    pub inst: Inst,
}

#[derive(Clone, Default)]
struct CFGNode {
    predecessors: Vec<BlockPredecessor>,
    successors: Vec<Block>,
}

/// The control flow graph maps all blocks in a function to their predecessor and successor
/// blocks.
pub struct ControlFlowGraph {
    data: SecondaryMap<Block, CFGNode>,
    valid: bool,
}

impl ControlFlowGraph {
    /// Allocate a new blank control flow graph.
    pub fn new() -> Self {
        Self {
            data: SecondaryMap::new(),
            valid: false,
        }
    }

    /// Allocate and compute the control flow graph for `func`.
    pub fn with_function(func: &FunctionData) -> Self {
        let mut cfg = Self::new();
        cfg.compute(func);
        cfg
    }

    /// Compute the control flow graph of `func`.
    pub fn compute(&mut self, func: &FunctionData) {
        let _tt = timing::flowgraph();
        self.clear();
        for &block in func.block_order() {
            if let Some(term) = func.terminator(block) {
                for dest in func[term].branch_targets() {
                    self.add_edge(block, term, dest);
                }
            }
        }
        self.valid = true;
    }

    /// Clear all data structures in this control flow graph.
    pub fn clear(&mut self) {
        self.data.clear();
        self.valid = false;
    }

    fn add_edge(&mut self, from: Block, from_inst: Inst, to: Block) {
        self.data[from].successors.push(to);
        self.data[to].predecessors.push(BlockPredecessor {
            block: from,
            inst: from_inst,
        });
    }

    /// Iterate over the predecessors of `block`.
    pub fn pred_iter(&self, block: Block) -> impl Iterator<Item = BlockPredecessor> + '_ {
        self.data[block].predecessors.iter().copied()
    }

    /// Iterate over the successors of `block`.
    pub fn succ_iter(&self, block: Block) -> impl Iterator<Item = Block> + '_ {
        self.data[block].successors.iter().copied()
    }

    /// Is `from` currently an edge source for `to`?
    pub fn is_predecessor(&self, from: Block, to: Block) -> bool {
        self.data[to].predecessors.iter().any(|p| p.block == from)
    }

    /// Check if the control flow graph is in a valid state.
    ///
    /// Note that this doesn't perform any kind of validity checks. It simply checks if the
    /// `compute()` method has been called since the last `clear()`. It does not check that the
    /// graph is consistent with the function.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The blocks reachable from `entry` over successor edges, as a layout-independent set.
    pub fn reachable_from(&self, entry: Block) -> Vec<Block> {
        let mut seen = vec![entry];
        let mut stack = vec![entry];
        while let Some(block) = stack.pop() {
            for succ in self.succ_iter(block) {
                if !seen.contains(&succ) {
                    seen.push(succ);
                    stack.push(succ);
                }
            }
        }
        seen
    }
}

impl Default for ControlFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}
