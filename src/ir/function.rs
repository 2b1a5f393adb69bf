//! Function bodies.
//!
//! A `FunctionData` owns all of its basic blocks and instructions. Instructions live in a
//! `PrimaryMap` arena; which instructions are *in* the function is defined by block membership,
//! so removing an instruction detaches it from its block and leaves the arena slot unreferenced.
//! Blocks work the same way through the explicit layout order.

use crate::entity::{PrimaryMap, SecondaryMap};
use crate::ir::entities::{Block, GlobalVar, Inst, Type};
use crate::ir::instructions::{InstData, Operand};
use crate::packed_option::PackedOption;

/// The storage a pointer value ultimately points into, as far as the def-use chain shows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerRoot {
    /// A function-scope variable declared in this function.
    Local(Inst),
    /// A module-scope variable.
    Global(GlobalVar),
    /// Anything else: a pointer loaded from memory, selected at runtime, or received as a
    /// parameter. Accesses through such pointers are treated conservatively.
    Unknown,
}

/// Cross-module visibility of a function.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Linkage {
    /// Defined here and visible to other modules; must never be removed.
    Export,
    /// Declared here, defined elsewhere; its effects cannot be analyzed.
    Import,
}

/// A basic block: an ordered instruction list ending in exactly one terminator.
#[derive(Clone, Default)]
pub struct BlockData {
    body: Vec<Inst>,
}

impl BlockData {
    /// The instructions of this block, in execution order.
    pub fn insts(&self) -> &[Inst] {
        &self.body
    }
}

/// A function: parameters, a return type, and a body of basic blocks.
pub struct FunctionData {
    /// The return type; the void type for functions returning nothing.
    pub ret_type: Type,
    /// Parameter instructions, in signature order.
    pub params: Vec<Inst>,
    /// Export/import linkage, if any.
    pub linkage: Option<Linkage>,
    insts: PrimaryMap<Inst, InstData>,
    results: SecondaryMap<Inst, PackedOption<Type>>,
    blocks: PrimaryMap<Block, BlockData>,
    block_order: Vec<Block>,
}

impl FunctionData {
    /// Create an empty function with the given return type.
    pub fn new(ret_type: Type) -> Self {
        Self {
            ret_type,
            params: Vec::new(),
            linkage: None,
            insts: PrimaryMap::new(),
            results: SecondaryMap::new(),
            blocks: PrimaryMap::new(),
            block_order: Vec::new(),
        }
    }

    /// Append a parameter of the given type, returning its defining instruction.
    pub fn add_param(&mut self, ty: Type) -> Inst {
        let index = self.params.len() as u32;
        let inst = self.create_inst(InstData::Param { index }, Some(ty));
        self.params.push(inst);
        inst
    }

    /// Create a new block and append it to the layout.
    pub fn make_block(&mut self) -> Block {
        let block = self.blocks.push(BlockData::default());
        self.block_order.push(block);
        block
    }

    /// The entry block, if the function has a body.
    pub fn entry_block(&self) -> Option<Block> {
        self.block_order.first().copied()
    }

    /// The blocks of this function in layout order.
    pub fn block_order(&self) -> &[Block] {
        &self.block_order
    }

    /// Is `block` still part of the function layout?
    pub fn is_block_in_layout(&self, block: Block) -> bool {
        self.block_order.contains(&block)
    }

    /// Keep only the layout blocks satisfying `keep`.
    pub fn retain_blocks(&mut self, mut keep: impl FnMut(Block) -> bool) {
        self.block_order.retain(|&b| keep(b));
    }

    /// Create a detached instruction.
    pub fn create_inst(&mut self, data: InstData, result: Option<Type>) -> Inst {
        let inst = self.insts.push(data);
        self.results[inst] = result.into();
        inst
    }

    /// Append a detached instruction to the end of `block`.
    pub fn append_inst(&mut self, block: Block, inst: Inst) {
        self.blocks[block].body.push(inst);
    }

    /// The result type of `inst`, if it defines a value.
    pub fn result_type(&self, inst: Inst) -> Option<Type> {
        self.results[inst].expand()
    }

    /// The instruction list of `block`.
    pub fn block_insts(&self, block: Block) -> &[Inst] {
        &self.blocks[block].body
    }

    /// The terminator of `block`, when the block is non-empty and well-formed.
    pub fn terminator(&self, block: Block) -> Option<Inst> {
        let last = *self.blocks[block].body.last()?;
        self.insts[last].opcode().is_terminator().then_some(last)
    }

    /// The merge marker of `block`: the instruction immediately before the terminator, when it
    /// is a `SelectionMerge` or `LoopMerge`.
    pub fn merge_inst(&self, block: Block) -> Option<Inst> {
        let body = &self.blocks[block].body;
        if body.len() < 2 {
            return None;
        }
        let inst = body[body.len() - 2];
        self.insts[inst].opcode().is_merge().then_some(inst)
    }

    /// Keep only the instructions of `block` satisfying `keep`.
    pub fn retain_block_insts(&mut self, block: Block, mut keep: impl FnMut(Inst) -> bool) {
        self.blocks[block].body.retain(|&i| keep(i));
    }

    /// Replace the terminator of `block` with a fresh instruction built from `data`.
    ///
    /// The previous terminator stays in the arena, detached. The block must currently end in a
    /// terminator.
    pub fn replace_terminator(&mut self, block: Block, data: InstData) -> Inst {
        debug_assert!(data.opcode().is_terminator());
        debug_assert!(self.terminator(block).is_some());
        let inst = self.create_inst(data, None);
        *self.blocks[block].body.last_mut().unwrap() = inst;
        inst
    }

    /// Iterate over `(block, inst)` for every instruction in layout order.
    pub fn layout_insts(&self) -> impl Iterator<Item = (Block, Inst)> + '_ {
        self.block_order
            .iter()
            .flat_map(move |&b| self.blocks[b].body.iter().map(move |&i| (b, i)))
    }

    /// Total number of instructions ever created in this function.
    pub fn num_insts(&self) -> usize {
        self.insts.len()
    }

    /// Mutable access to the data of `inst`.
    pub fn inst_mut(&mut self, inst: Inst) -> &mut InstData {
        &mut self.insts[inst]
    }

    /// Follow a pointer operand through access chains to the variable it addresses.
    ///
    /// Indirection (a pointer loaded from memory) resolves to `Unknown`; the def-use chain of
    /// the loaded pointer is still tracked normally by liveness, this only answers which
    /// storage an access ultimately touches.
    pub fn pointer_root(&self, op: Operand) -> PointerRoot {
        match op {
            Operand::Var(v) => PointerRoot::Global(v),
            Operand::Constant(_) => PointerRoot::Unknown,
            Operand::Inst(inst) => match self.insts[inst] {
                InstData::Variable { .. } => PointerRoot::Local(inst),
                InstData::AccessChain { base, .. } => self.pointer_root(base),
                _ => PointerRoot::Unknown,
            },
        }
    }
}

impl core::ops::Index<Inst> for FunctionData {
    type Output = InstData;

    fn index(&self, inst: Inst) -> &InstData {
        &self.insts[inst]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instructions::{InstData, Operand};
    use crate::ir::types::TypeTable;

    #[test]
    fn block_shape_queries() {
        let mut types = TypeTable::new();
        let void = types.void();
        let u32t = types.u32_ty();

        let mut func = FunctionData::new(void);
        let b0 = func.make_block();
        let b1 = func.make_block();
        let b2 = func.make_block();

        // Build: b0 { selection_merge b2; branch_conditional ... } b1 { branch b2 } b2 { return }
        let undef = func.create_inst(InstData::Undef, Some(u32t));
        func.append_inst(b0, undef);
        let merge = func.create_inst(InstData::SelectionMerge { merge: b2 }, None);
        func.append_inst(b0, merge);
        let br = func.create_inst(
            InstData::BranchConditional {
                cond: Operand::Inst(undef),
                dests: [b1, b2],
            },
            None,
        );
        func.append_inst(b0, br);

        let jump = func.create_inst(InstData::Jump { dest: b2 }, None);
        func.append_inst(b1, jump);
        let ret = func.create_inst(InstData::Return, None);
        func.append_inst(b2, ret);

        assert_eq!(func.entry_block(), Some(b0));
        assert_eq!(func.terminator(b0), Some(br));
        assert_eq!(func.merge_inst(b0), Some(merge));
        assert_eq!(func.merge_inst(b1), None);
        assert_eq!(func.layout_insts().count(), 5);

        let new_term = func.replace_terminator(b0, InstData::Jump { dest: b2 });
        assert_eq!(func.terminator(b0), Some(new_term));
    }
}
