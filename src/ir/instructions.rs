//! Instruction formats and opcodes.
//!
//! The `instructions` module contains definitions for instruction formats, opcodes, and the
//! in-memory representation of IR instructions.
//!
//! The opcode set is closed: side-effect classification in the dead-code-elimination pass is a
//! total match over `Opcode`, not virtual dispatch. An instruction with a result type defines
//! exactly one SSA value, referenced in operand position by its `Inst` handle.

use crate::ir::entities::{Block, Constant, Func, GlobalVar, Inst};
use core::fmt;
use smallvec::SmallVec;

/// An operand of an instruction: a reference to a value-producing entity.
///
/// Literal immediates (extraction indices, switch case values, shuffle lanes) are stored
/// inline in the instruction format, not as operands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    /// The SSA result of another instruction in the same function.
    Inst(Inst),
    /// A constant from the module's constant pool.
    Constant(Constant),
    /// The address of a module-scope variable.
    Var(GlobalVar),
}

impl From<Inst> for Operand {
    fn from(inst: Inst) -> Self {
        Self::Inst(inst)
    }
}

impl From<Constant> for Operand {
    fn from(c: Constant) -> Self {
        Self::Constant(c)
    }
}

impl From<GlobalVar> for Operand {
    fn from(v: GlobalVar) -> Self {
        Self::Var(v)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Inst(i) => i.fmt(f),
            Self::Constant(c) => c.fmt(f),
            Self::Var(v) => v.fmt(f),
        }
    }
}

/// A short list of operands, inline up to four entries.
pub type OperandList = SmallVec<[Operand; 4]>;

/// An instruction opcode.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Opcode {
    // Unary value operations.
    SNegate,
    FNegate,
    LogicalNot,
    Bitcast,
    ConvertSToF,
    ConvertFToS,
    // Binary value operations.
    IAdd,
    ISub,
    IMul,
    SDiv,
    UDiv,
    FAdd,
    FSub,
    FMul,
    FDiv,
    LogicalAnd,
    LogicalOr,
    IEqual,
    INotEqual,
    ULessThan,
    SLessThan,
    UGreaterThan,
    SGreaterThan,
    FOrdLessThan,
    FOrdGreaterThan,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeftLogical,
    ShiftRightLogical,
    // Other value operations.
    Select,
    Undef,
    CompositeConstruct,
    CompositeExtract,
    CompositeInsert,
    VectorShuffle,
    Phi,
    FunctionCall,
    // Memory.
    Variable,
    Load,
    Store,
    AccessChain,
    CopyMemory,
    // Atomics.
    AtomicIAdd,
    AtomicISub,
    AtomicAnd,
    AtomicOr,
    AtomicExchange,
    AtomicCompareExchange,
    // Synchronization and geometry-stage effects.
    ControlBarrier,
    MemoryBarrier,
    EmitVertex,
    EndPrimitive,
    // Function parameters.
    Param,
    // Structured control-flow markers.
    SelectionMerge,
    LoopMerge,
    // Terminators.
    Branch,
    BranchConditional,
    Switch,
    Return,
    ReturnValue,
    Kill,
    Unreachable,
}

impl Opcode {
    /// True for instructions that can only appear last in a block.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Self::Branch
                | Self::BranchConditional
                | Self::Switch
                | Self::Return
                | Self::ReturnValue
                | Self::Kill
                | Self::Unreachable
        )
    }

    /// True for terminators that transfer control to another block in the same function.
    pub fn is_branch(self) -> bool {
        matches!(self, Self::Branch | Self::BranchConditional | Self::Switch)
    }

    /// True for the structured-control-flow merge markers.
    pub fn is_merge(self) -> bool {
        matches!(self, Self::SelectionMerge | Self::LoopMerge)
    }

    /// True for atomic read-modify-write operations.
    ///
    /// Their memory effect is observable by other invocations even when the returned old value
    /// is discarded, so they are never candidates for removal.
    pub fn is_atomic(self) -> bool {
        matches!(
            self,
            Self::AtomicIAdd
                | Self::AtomicISub
                | Self::AtomicAnd
                | Self::AtomicOr
                | Self::AtomicExchange
                | Self::AtomicCompareExchange
        )
    }

    /// True for execution and memory barriers.
    pub fn is_barrier(self) -> bool {
        matches!(self, Self::ControlBarrier | Self::MemoryBarrier)
    }

    /// True for control exits whose execution is itself the observable effect.
    pub fn is_control_effect(self) -> bool {
        matches!(
            self,
            Self::Return | Self::ReturnValue | Self::Kill | Self::Unreachable
        )
    }

    /// True for the geometry-stage output instructions.
    pub fn is_primitive_output(self) -> bool {
        matches!(self, Self::EmitVertex | Self::EndPrimitive)
    }

    /// The lowercase name used by the textual writer.
    pub fn name(self) -> &'static str {
        match self {
            Self::SNegate => "snegate",
            Self::FNegate => "fnegate",
            Self::LogicalNot => "logical_not",
            Self::Bitcast => "bitcast",
            Self::ConvertSToF => "convert_s_to_f",
            Self::ConvertFToS => "convert_f_to_s",
            Self::IAdd => "iadd",
            Self::ISub => "isub",
            Self::IMul => "imul",
            Self::SDiv => "sdiv",
            Self::UDiv => "udiv",
            Self::FAdd => "fadd",
            Self::FSub => "fsub",
            Self::FMul => "fmul",
            Self::FDiv => "fdiv",
            Self::LogicalAnd => "logical_and",
            Self::LogicalOr => "logical_or",
            Self::IEqual => "ieq",
            Self::INotEqual => "ine",
            Self::ULessThan => "ult",
            Self::SLessThan => "slt",
            Self::UGreaterThan => "ugt",
            Self::SGreaterThan => "sgt",
            Self::FOrdLessThan => "flt",
            Self::FOrdGreaterThan => "fgt",
            Self::BitwiseAnd => "band",
            Self::BitwiseOr => "bor",
            Self::BitwiseXor => "bxor",
            Self::ShiftLeftLogical => "ishl",
            Self::ShiftRightLogical => "ushr",
            Self::Select => "select",
            Self::Undef => "undef",
            Self::CompositeConstruct => "composite_construct",
            Self::CompositeExtract => "composite_extract",
            Self::CompositeInsert => "composite_insert",
            Self::VectorShuffle => "vector_shuffle",
            Self::Phi => "phi",
            Self::FunctionCall => "call",
            Self::Variable => "variable",
            Self::Load => "load",
            Self::Store => "store",
            Self::AccessChain => "access_chain",
            Self::CopyMemory => "copy_memory",
            Self::AtomicIAdd => "atomic_iadd",
            Self::AtomicISub => "atomic_isub",
            Self::AtomicAnd => "atomic_and",
            Self::AtomicOr => "atomic_or",
            Self::AtomicExchange => "atomic_xchg",
            Self::AtomicCompareExchange => "atomic_cmpxchg",
            Self::ControlBarrier => "control_barrier",
            Self::MemoryBarrier => "memory_barrier",
            Self::EmitVertex => "emit_vertex",
            Self::EndPrimitive => "end_primitive",
            Self::Param => "param",
            Self::SelectionMerge => "selection_merge",
            Self::LoopMerge => "loop_merge",
            Self::Branch => "branch",
            Self::BranchConditional => "branch_conditional",
            Self::Switch => "switch",
            Self::Return => "return",
            Self::ReturnValue => "return_value",
            Self::Kill => "kill",
            Self::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The contents of an instruction: a format variant per instruction kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstData {
    /// An effect-only instruction with no operands (barriers, geometry outputs).
    Nullary {
        /// The opcode.
        opcode: Opcode,
    },
    /// A unary value operation.
    Unary {
        /// The opcode.
        opcode: Opcode,
        /// The operand.
        arg: Operand,
    },
    /// A binary value operation.
    Binary {
        /// The opcode.
        opcode: Opcode,
        /// The two operands.
        args: [Operand; 2],
    },
    /// A conditional select: `args[0] ? args[1] : args[2]`.
    Select {
        /// Condition, then-value, else-value.
        args: [Operand; 3],
    },
    /// An undefined value of the result type.
    Undef,
    /// A function-scope variable declaration; the result is a pointer.
    Variable {
        /// The initializer, when present.
        init: Option<Constant>,
    },
    /// A load through a pointer.
    Load {
        /// The pointer.
        ptr: Operand,
    },
    /// A store through a pointer.
    Store {
        /// The pointer.
        ptr: Operand,
        /// The stored value.
        value: Operand,
    },
    /// An aggregate copy: reads all of `src`, writes all of `dst`.
    CopyMemory {
        /// The destination pointer.
        dst: Operand,
        /// The source pointer.
        src: Operand,
    },
    /// A pointer offset computation into an aggregate.
    AccessChain {
        /// The base pointer.
        base: Operand,
        /// The per-level indices.
        indices: OperandList,
    },
    /// Construction of a composite value from parts.
    CompositeConstruct {
        /// The element values.
        elems: OperandList,
    },
    /// Extraction of one member from a composite value.
    CompositeExtract {
        /// The composite.
        base: Operand,
        /// The literal member path.
        indices: SmallVec<[u32; 2]>,
    },
    /// Replacement of one member inside a composite value.
    CompositeInsert {
        /// The new member value.
        value: Operand,
        /// The composite.
        base: Operand,
        /// The literal member path.
        indices: SmallVec<[u32; 2]>,
    },
    /// A lane shuffle of two vectors.
    VectorShuffle {
        /// The two source vectors.
        vectors: [Operand; 2],
        /// The literal lane selectors.
        components: SmallVec<[u32; 4]>,
    },
    /// An SSA phi: one incoming value per predecessor edge.
    Phi {
        /// `(value, predecessor)` pairs.
        edges: SmallVec<[(Operand, Block); 2]>,
    },
    /// A direct function call.
    Call {
        /// The callee.
        callee: Func,
        /// The arguments.
        args: OperandList,
    },
    /// An atomic read-modify-write on a pointer.
    Atomic {
        /// Which atomic operation.
        opcode: Opcode,
        /// The pointer operated on.
        ptr: Operand,
        /// Value operands (one for RMW ops, two for compare-exchange).
        operands: OperandList,
    },
    /// A function parameter; `index` is its position in the signature.
    Param {
        /// Zero-based parameter index.
        index: u32,
    },
    /// Declares the merge block of a two-way or multi-way selection.
    SelectionMerge {
        /// Where the construct's paths reconverge.
        merge: Block,
    },
    /// Declares the merge and continue targets of a loop.
    LoopMerge {
        /// Where the loop exits.
        merge: Block,
        /// The continue target of the back edge.
        cont: Block,
    },
    /// An unconditional branch.
    Jump {
        /// The destination.
        dest: Block,
    },
    /// A two-way conditional branch.
    BranchConditional {
        /// The branch condition.
        cond: Operand,
        /// Taken and not-taken destinations.
        dests: [Block; 2],
    },
    /// A multi-way branch over an integer selector.
    Switch {
        /// The selector value.
        selector: Operand,
        /// The default destination.
        default: Block,
        /// `(case value, destination)` pairs.
        table: Vec<(u32, Block)>,
    },
    /// Return from a void function.
    Return,
    /// Return a value.
    ReturnValue {
        /// The returned value.
        value: Operand,
    },
    /// Terminate the invocation (fragment discard).
    Kill,
    /// Declares the end of a path that cannot execute.
    Unreachable,
}

impl InstData {
    /// The opcode of this instruction.
    pub fn opcode(&self) -> Opcode {
        match *self {
            Self::Nullary { opcode } | Self::Unary { opcode, .. } | Self::Binary { opcode, .. } => {
                opcode
            }
            Self::Select { .. } => Opcode::Select,
            Self::Undef => Opcode::Undef,
            Self::Variable { .. } => Opcode::Variable,
            Self::Load { .. } => Opcode::Load,
            Self::Store { .. } => Opcode::Store,
            Self::CopyMemory { .. } => Opcode::CopyMemory,
            Self::AccessChain { .. } => Opcode::AccessChain,
            Self::CompositeConstruct { .. } => Opcode::CompositeConstruct,
            Self::CompositeExtract { .. } => Opcode::CompositeExtract,
            Self::CompositeInsert { .. } => Opcode::CompositeInsert,
            Self::VectorShuffle { .. } => Opcode::VectorShuffle,
            Self::Phi { .. } => Opcode::Phi,
            Self::Call { .. } => Opcode::FunctionCall,
            Self::Atomic { opcode, .. } => opcode,
            Self::Param { .. } => Opcode::Param,
            Self::SelectionMerge { .. } => Opcode::SelectionMerge,
            Self::LoopMerge { .. } => Opcode::LoopMerge,
            Self::Jump { .. } => Opcode::Branch,
            Self::BranchConditional { .. } => Opcode::BranchConditional,
            Self::Switch { .. } => Opcode::Switch,
            Self::Return => Opcode::Return,
            Self::ReturnValue { .. } => Opcode::ReturnValue,
            Self::Kill => Opcode::Kill,
            Self::Unreachable => Opcode::Unreachable,
        }
    }

    /// Visit every value operand of this instruction.
    pub fn visit_operands(&self, mut f: impl FnMut(Operand)) {
        match self {
            Self::Nullary { .. }
            | Self::Undef
            | Self::Variable { .. }
            | Self::Param { .. }
            | Self::SelectionMerge { .. }
            | Self::LoopMerge { .. }
            | Self::Jump { .. }
            | Self::Return
            | Self::Kill
            | Self::Unreachable => {}
            Self::Unary { arg, .. } => f(*arg),
            Self::Binary { args, .. } => {
                f(args[0]);
                f(args[1]);
            }
            Self::Select { args } => {
                for &a in args {
                    f(a);
                }
            }
            Self::Load { ptr } => f(*ptr),
            Self::Store { ptr, value } => {
                f(*ptr);
                f(*value);
            }
            Self::CopyMemory { dst, src } => {
                f(*dst);
                f(*src);
            }
            Self::AccessChain { base, indices } => {
                f(*base);
                for &i in indices {
                    f(i);
                }
            }
            Self::CompositeConstruct { elems } => {
                for &e in elems {
                    f(e);
                }
            }
            Self::CompositeExtract { base, .. } => f(*base),
            Self::CompositeInsert { value, base, .. } => {
                f(*value);
                f(*base);
            }
            Self::VectorShuffle { vectors, .. } => {
                f(vectors[0]);
                f(vectors[1]);
            }
            Self::Phi { edges } => {
                for &(v, _) in edges {
                    f(v);
                }
            }
            Self::Call { args, .. } => {
                for &a in args {
                    f(a);
                }
            }
            Self::Atomic { ptr, operands, .. } => {
                f(*ptr);
                for &o in operands {
                    f(o);
                }
            }
            Self::BranchConditional { cond, .. } => f(*cond),
            Self::Switch { selector, .. } => f(*selector),
            Self::ReturnValue { value } => f(*value),
        }
    }

    /// Collect the value operands of this instruction.
    pub fn operands(&self) -> OperandList {
        let mut out = OperandList::new();
        self.visit_operands(|op| out.push(op));
        out
    }

    /// The blocks this instruction can transfer control to.
    ///
    /// Empty for non-branch instructions; merge markers do not count as edges.
    pub fn branch_targets(&self) -> SmallVec<[Block; 2]> {
        let mut out = SmallVec::new();
        match self {
            Self::Jump { dest } => out.push(*dest),
            Self::BranchConditional { dests, .. } => {
                out.push(dests[0]);
                out.push(dests[1]);
            }
            Self::Switch { default, table, .. } => {
                out.push(*default);
                for &(_, b) in table {
                    out.push(b);
                }
            }
            _ => {}
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;

    #[test]
    fn opcode_classes_are_disjoint() {
        let terminators = [
            Opcode::Branch,
            Opcode::BranchConditional,
            Opcode::Switch,
            Opcode::Return,
            Opcode::ReturnValue,
            Opcode::Kill,
            Opcode::Unreachable,
        ];
        for op in terminators {
            assert!(op.is_terminator());
            assert!(!op.is_merge());
        }
        assert!(Opcode::Branch.is_branch());
        assert!(!Opcode::Return.is_branch());
        assert!(Opcode::AtomicIAdd.is_atomic());
        assert!(!Opcode::Load.is_atomic());
    }

    #[test]
    fn operand_and_target_traversal() {
        let a = Operand::Inst(Inst::new(0));
        let b = Operand::Inst(Inst::new(1));
        let data = InstData::Binary {
            opcode: Opcode::IAdd,
            args: [a, b],
        };
        assert_eq!(data.opcode(), Opcode::IAdd);
        assert_eq!(data.operands().as_slice(), &[a, b]);
        assert!(data.branch_targets().is_empty());

        let sw = InstData::Switch {
            selector: a,
            default: Block::new(0),
            table: vec![(4, Block::new(1)), (7, Block::new(2))],
        };
        assert_eq!(sw.branch_targets().len(), 3);
    }
}
