//! Programmatic IR construction.
//!
//! `FuncBuilder` appends instructions to a current block, one method per instruction format.
//! Operand parameters accept anything convertible to `Operand`, so instruction results,
//! constants, and global variables can be passed directly.

use crate::ir::entities::{Block, Constant, Func, Inst, Type};
use crate::ir::function::FunctionData;
use crate::ir::instructions::{InstData, Opcode, Operand};
use smallvec::SmallVec;

/// An instruction inserter positioned at the end of a block.
pub struct FuncBuilder<'f> {
    /// The function under construction.
    pub func: &'f mut FunctionData,
    block: Option<Block>,
}

impl<'f> FuncBuilder<'f> {
    /// Create a builder with no current block.
    pub fn new(func: &'f mut FunctionData) -> Self {
        Self { func, block: None }
    }

    /// Create a block and make it current.
    pub fn create_block(&mut self) -> Block {
        let block = self.func.make_block();
        self.block = Some(block);
        block
    }

    /// Make `block` current.
    pub fn switch_to_block(&mut self, block: Block) {
        self.block = Some(block);
    }

    /// The block instructions are currently appended to.
    pub fn current_block(&self) -> Option<Block> {
        self.block
    }

    fn ins(&mut self, data: InstData, result: Option<Type>) -> Inst {
        let block = self.block.expect("no current block");
        let inst = self.func.create_inst(data, result);
        self.func.append_inst(block, inst);
        inst
    }

    /// A unary value operation.
    pub fn unary(&mut self, opcode: Opcode, ty: Type, arg: impl Into<Operand>) -> Inst {
        self.ins(
            InstData::Unary {
                opcode,
                arg: arg.into(),
            },
            Some(ty),
        )
    }

    /// A binary value operation.
    pub fn binary(
        &mut self,
        opcode: Opcode,
        ty: Type,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
    ) -> Inst {
        self.ins(
            InstData::Binary {
                opcode,
                args: [a.into(), b.into()],
            },
            Some(ty),
        )
    }

    /// A conditional select.
    pub fn select(
        &mut self,
        ty: Type,
        cond: impl Into<Operand>,
        then_val: impl Into<Operand>,
        else_val: impl Into<Operand>,
    ) -> Inst {
        self.ins(
            InstData::Select {
                args: [cond.into(), then_val.into(), else_val.into()],
            },
            Some(ty),
        )
    }

    /// An undefined value.
    pub fn undef(&mut self, ty: Type) -> Inst {
        self.ins(InstData::Undef, Some(ty))
    }

    /// A function-scope variable; `ptr_ty` is the pointer type of the result.
    pub fn variable(&mut self, ptr_ty: Type) -> Inst {
        self.ins(InstData::Variable { init: None }, Some(ptr_ty))
    }

    /// A function-scope variable with an initializer.
    pub fn variable_init(&mut self, ptr_ty: Type, init: Constant) -> Inst {
        self.ins(InstData::Variable { init: Some(init) }, Some(ptr_ty))
    }

    /// A load through a pointer.
    pub fn load(&mut self, ty: Type, ptr: impl Into<Operand>) -> Inst {
        self.ins(InstData::Load { ptr: ptr.into() }, Some(ty))
    }

    /// A store through a pointer.
    pub fn store(&mut self, ptr: impl Into<Operand>, value: impl Into<Operand>) -> Inst {
        self.ins(
            InstData::Store {
                ptr: ptr.into(),
                value: value.into(),
            },
            None,
        )
    }

    /// An aggregate copy between two pointers.
    pub fn copy_memory(&mut self, dst: impl Into<Operand>, src: impl Into<Operand>) -> Inst {
        self.ins(
            InstData::CopyMemory {
                dst: dst.into(),
                src: src.into(),
            },
            None,
        )
    }

    /// A pointer offset computation.
    pub fn access_chain(
        &mut self,
        ty: Type,
        base: impl Into<Operand>,
        indices: &[Operand],
    ) -> Inst {
        self.ins(
            InstData::AccessChain {
                base: base.into(),
                indices: indices.iter().copied().collect(),
            },
            Some(ty),
        )
    }

    /// A composite construction.
    pub fn composite_construct(&mut self, ty: Type, elems: &[Operand]) -> Inst {
        self.ins(
            InstData::CompositeConstruct {
                elems: elems.iter().copied().collect(),
            },
            Some(ty),
        )
    }

    /// A composite member extraction.
    pub fn composite_extract(&mut self, ty: Type, base: impl Into<Operand>, indices: &[u32]) -> Inst {
        self.ins(
            InstData::CompositeExtract {
                base: base.into(),
                indices: indices.iter().copied().collect(),
            },
            Some(ty),
        )
    }

    /// A composite member replacement.
    pub fn composite_insert(
        &mut self,
        ty: Type,
        value: impl Into<Operand>,
        base: impl Into<Operand>,
        indices: &[u32],
    ) -> Inst {
        self.ins(
            InstData::CompositeInsert {
                value: value.into(),
                base: base.into(),
                indices: indices.iter().copied().collect(),
            },
            Some(ty),
        )
    }

    /// A vector lane shuffle.
    pub fn vector_shuffle(
        &mut self,
        ty: Type,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
        components: &[u32],
    ) -> Inst {
        self.ins(
            InstData::VectorShuffle {
                vectors: [a.into(), b.into()],
                components: components.iter().copied().collect(),
            },
            Some(ty),
        )
    }

    /// An SSA phi.
    pub fn phi(&mut self, ty: Type, edges: &[(Operand, Block)]) -> Inst {
        self.ins(
            InstData::Phi {
                edges: SmallVec::from_slice(edges),
            },
            Some(ty),
        )
    }

    /// A direct call; `ret` is `None` for void callees.
    pub fn call(&mut self, ret: Option<Type>, callee: Func, args: &[Operand]) -> Inst {
        self.ins(
            InstData::Call {
                callee,
                args: args.iter().copied().collect(),
            },
            ret,
        )
    }

    /// An atomic read-modify-write.
    pub fn atomic(
        &mut self,
        opcode: Opcode,
        ty: Type,
        ptr: impl Into<Operand>,
        operands: &[Operand],
    ) -> Inst {
        debug_assert!(opcode.is_atomic());
        self.ins(
            InstData::Atomic {
                opcode,
                ptr: ptr.into(),
                operands: operands.iter().copied().collect(),
            },
            Some(ty),
        )
    }

    /// An execution barrier.
    pub fn control_barrier(&mut self) -> Inst {
        self.ins(
            InstData::Nullary {
                opcode: Opcode::ControlBarrier,
            },
            None,
        )
    }

    /// A memory barrier.
    pub fn memory_barrier(&mut self) -> Inst {
        self.ins(
            InstData::Nullary {
                opcode: Opcode::MemoryBarrier,
            },
            None,
        )
    }

    /// Emit a geometry-stage vertex.
    pub fn emit_vertex(&mut self) -> Inst {
        self.ins(
            InstData::Nullary {
                opcode: Opcode::EmitVertex,
            },
            None,
        )
    }

    /// End a geometry-stage primitive.
    pub fn end_primitive(&mut self) -> Inst {
        self.ins(
            InstData::Nullary {
                opcode: Opcode::EndPrimitive,
            },
            None,
        )
    }

    /// Declare the merge block of a selection construct.
    pub fn selection_merge(&mut self, merge: Block) -> Inst {
        self.ins(InstData::SelectionMerge { merge }, None)
    }

    /// Declare the merge and continue targets of a loop construct.
    pub fn loop_merge(&mut self, merge: Block, cont: Block) -> Inst {
        self.ins(InstData::LoopMerge { merge, cont }, None)
    }

    /// An unconditional branch.
    pub fn jump(&mut self, dest: Block) -> Inst {
        self.ins(InstData::Jump { dest }, None)
    }

    /// A two-way conditional branch.
    pub fn branch_conditional(
        &mut self,
        cond: impl Into<Operand>,
        then_dest: Block,
        else_dest: Block,
    ) -> Inst {
        self.ins(
            InstData::BranchConditional {
                cond: cond.into(),
                dests: [then_dest, else_dest],
            },
            None,
        )
    }

    /// A multi-way branch.
    pub fn switch(
        &mut self,
        selector: impl Into<Operand>,
        default: Block,
        table: &[(u32, Block)],
    ) -> Inst {
        self.ins(
            InstData::Switch {
                selector: selector.into(),
                default,
                table: table.to_vec(),
            },
            None,
        )
    }

    /// Return from a void function.
    pub fn ret(&mut self) -> Inst {
        self.ins(InstData::Return, None)
    }

    /// Return a value.
    pub fn ret_value(&mut self, value: impl Into<Operand>) -> Inst {
        self.ins(
            InstData::ReturnValue {
                value: value.into(),
            },
            None,
        )
    }

    /// Terminate the invocation.
    pub fn kill(&mut self) -> Inst {
        self.ins(InstData::Kill, None)
    }

    /// Declare the current path unreachable.
    pub fn unreachable(&mut self) -> Inst {
        self.ins(InstData::Unreachable, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::TypeTable;

    #[test]
    fn builds_a_straight_line_block() {
        let mut types = TypeTable::new();
        let void = types.void();
        let u32t = types.u32_ty();

        let mut func = FunctionData::new(void);
        let mut b = FuncBuilder::new(&mut func);
        let block = b.create_block();
        let x = b.undef(u32t);
        let y = b.binary(Opcode::IAdd, u32t, x, x);
        b.ret();

        assert_eq!(func.block_insts(block).len(), 3);
        assert_eq!(func[y].opcode(), Opcode::IAdd);
        assert_eq!(func.result_type(y), Some(u32t));
        assert!(func.terminator(block).is_some());
    }
}
