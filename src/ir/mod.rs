//! Representation of shader modules.
//!
//! This module and its submodules define the in-memory form the optimization passes operate
//! on: a `Module` of functions, basic blocks, and instructions, together with the module-level
//! tables for types, constants, decorations, debug info, and names.

pub mod annotations;
pub mod builder;
pub mod constant;
pub mod debuginfo;
pub mod entities;
pub mod function;
pub mod instructions;
pub mod module;
pub mod types;

pub use self::annotations::{Annotation, Annotations, BuiltIn, DecorationKind, GroupData};
pub use self::builder::FuncBuilder;
pub use self::constant::{ConstantData, ConstantPool};
pub use self::debuginfo::{
    BindingKind, DebugBinding, DebugGlobalVariable, DebugInfo, DebugLocalData, DebugScopeData,
    DebugSource, DebugTarget, DebugVarRef,
};
pub use self::entities::{
    AnyEntity, Block, Constant, DebugLocal, DebugScope, DecorationGroup, Func, GlobalVar, Inst,
    Type,
};
pub use self::function::{BlockData, FunctionData, Linkage};
pub use self::instructions::{InstData, Opcode, Operand, OperandList};
pub use self::module::{EntryPoint, GlobalVarData, Module, NameTable, Stage, Version};
pub use self::types::{StorageClass, TypeData, TypeTable};
