//! Structured-construct analysis.
//!
//! Builds the tree of structured control-flow constructs (selections and loops) from the merge
//! instructions in a function, and maps every block to its innermost enclosing construct. The
//! liveness propagation walks this tree for control dependence: an instruction is control
//! dependent on the header branch and merge marker of every construct enclosing its block.
//!
//! The walk relies on the structured layout discipline: the blocks of a construct form a
//! contiguous run in layout order between the header and its merge block, with the header
//! belonging to the enclosing construct and the merge block closing the run.

use crate::entity::{entity_impl, PrimaryMap, SecondaryMap};
use crate::ir::{Block, FunctionData, InstData};
use crate::packed_option::PackedOption;
use crate::timing;

/// An opaque reference to a structured construct.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Construct(u32);
entity_impl!(Construct, "construct");

/// The flavor of a construct.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConstructKind {
    /// A two-way or multi-way selection.
    Selection,
    /// A loop.
    Loop,
}

/// One structured construct.
pub struct ConstructData {
    /// Selection or loop.
    pub kind: ConstructKind,
    /// The block whose merge instruction and terminator open the construct.
    pub header: Block,
    /// The block where the construct's paths reconverge.
    pub merge: Block,
    /// The continue target, for loops.
    pub cont: PackedOption<Block>,
    /// The enclosing construct, if any.
    pub parent: PackedOption<Construct>,
}

/// Construct tree information for a single function.
pub struct StructureTree {
    constructs: PrimaryMap<Construct, ConstructData>,
    innermost: SecondaryMap<Block, PackedOption<Construct>>,
    valid: bool,
}

impl StructureTree {
    /// Allocate a new blank structure tree. Use `compute` to fill it in.
    pub fn new() -> Self {
        Self {
            constructs: PrimaryMap::new(),
            innermost: SecondaryMap::new(),
            valid: false,
        }
    }

    /// Allocate and compute the structure tree for `func`.
    pub fn with_function(func: &FunctionData) -> Self {
        let mut tree = Self::new();
        tree.compute(func);
        tree
    }

    /// Compute the construct tree of `func` from its merge instructions.
    pub fn compute(&mut self, func: &FunctionData) {
        let _tt = timing::structure();
        self.constructs.clear();
        self.innermost.clear();

        let mut stack: Vec<Construct> = Vec::new();
        for &block in func.block_order() {
            while let Some(&top) = stack.last() {
                if self.constructs[top].merge == block {
                    stack.pop();
                } else {
                    break;
                }
            }
            self.innermost[block] = stack.last().copied().into();

            if let Some(merge_inst) = func.merge_inst(block) {
                let construct = match func[merge_inst] {
                    InstData::SelectionMerge { merge } => self.constructs.push(ConstructData {
                        kind: ConstructKind::Selection,
                        header: block,
                        merge,
                        cont: PackedOption::default(),
                        parent: stack.last().copied().into(),
                    }),
                    InstData::LoopMerge { merge, cont } => self.constructs.push(ConstructData {
                        kind: ConstructKind::Loop,
                        header: block,
                        merge,
                        cont: cont.into(),
                        parent: stack.last().copied().into(),
                    }),
                    _ => unreachable!("merge_inst returned a non-merge instruction"),
                };
                stack.push(construct);
            }
        }
        self.valid = true;
    }

    /// Check if the structure tree is in a valid state.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The innermost construct containing `block`, if any.
    ///
    /// A construct's header block belongs to the *enclosing* construct; its merge block is
    /// outside the construct.
    pub fn innermost(&self, block: Block) -> Option<Construct> {
        self.innermost[block].expand()
    }

    /// The data of `construct`.
    pub fn data(&self, construct: Construct) -> &ConstructData {
        &self.constructs[construct]
    }

    /// Iterate over all constructs.
    pub fn constructs(&self) -> impl Iterator<Item = Construct> {
        self.constructs.keys()
    }

    /// Is `block` inside `construct` (at any nesting depth)?
    pub fn is_in_construct(&self, block: Block, construct: Construct) -> bool {
        let mut finger = self.innermost(block);
        while let Some(c) = finger {
            if c == construct {
                return true;
            }
            finger = self.constructs[c].parent.expand();
        }
        false
    }

    /// Walk the construct chain of `block` from innermost outwards.
    pub fn enclosing_chain(&self, block: Block) -> impl Iterator<Item = Construct> + '_ {
        let mut finger = self.innermost(block);
        core::iter::from_fn(move || {
            let c = finger?;
            finger = self.constructs[c].parent.expand();
            Some(c)
        })
    }
}

impl Default for StructureTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncBuilder, FunctionData, TypeTable};

    #[test]
    fn nested_selection_in_loop() {
        let mut types = TypeTable::new();
        let void = types.void();
        let boolt = types.bool_ty();

        // b0 -> header b1 (loop, merge b6, cont b5)
        //   b2: inner selection header (merge b4) -> b3 -> b4 -> b5 -> back to b1
        let mut func = FunctionData::new(void);
        let mut b = FuncBuilder::new(&mut func);
        let b0 = b.create_block();
        let b1 = b.func.make_block();
        let b2 = b.func.make_block();
        let b3 = b.func.make_block();
        let b4 = b.func.make_block();
        let b5 = b.func.make_block();
        let b6 = b.func.make_block();

        b.jump(b1);
        b.switch_to_block(b1);
        let cond = b.undef(boolt);
        b.loop_merge(b6, b5);
        b.branch_conditional(cond, b2, b6);
        b.switch_to_block(b2);
        b.selection_merge(b4);
        b.branch_conditional(cond, b3, b4);
        b.switch_to_block(b3);
        b.jump(b4);
        b.switch_to_block(b4);
        b.jump(b5);
        b.switch_to_block(b5);
        b.jump(b1);
        b.switch_to_block(b6);
        b.ret();

        let tree = StructureTree::with_function(&func);
        assert!(tree.is_valid());
        assert_eq!(tree.constructs().count(), 2);

        let lp = tree.innermost(b2).unwrap();
        assert_eq!(tree.data(lp).kind, ConstructKind::Loop);
        assert_eq!(tree.data(lp).header, b1);
        assert_eq!(tree.data(lp).merge, b6);
        assert_eq!(tree.data(lp).cont.expand(), Some(b5));

        let sel = tree.innermost(b3).unwrap();
        assert_eq!(tree.data(sel).kind, ConstructKind::Selection);
        assert_eq!(tree.data(sel).parent.expand(), Some(lp));

        // The selection's merge block is back inside the loop only.
        assert_eq!(tree.innermost(b4), Some(lp));
        // The loop merge block is outside every construct.
        assert_eq!(tree.innermost(b6), None);
        // Headers belong to the enclosing construct.
        assert_eq!(tree.innermost(b1), None);
        assert_eq!(tree.innermost(b2), Some(lp));

        assert!(tree.is_in_construct(b3, lp));
        assert!(tree.is_in_construct(b3, sel));
        assert!(!tree.is_in_construct(b6, lp));
        assert_eq!(tree.enclosing_chain(b3).count(), 2);
    }
}
