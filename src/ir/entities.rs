//! IR entity references.
//!
//! Instructions in the IR need to reference other entities in the module: values produced by
//! other instructions, basic blocks, global variables, constants, types. These references are
//! not implemented as Rust references both because Rust's ownership and mutability rules make
//! it difficult, and because 64-bit pointers take up a lot of space. Instead, entity references
//! are structs wrapping a `u32` index into a table owned by the `Module` or by a `FunctionData`.
//! There is a separate index type for each entity type, so we don't lose type safety.
//!
//! Cyclic references (loop back-edges, forward-declared pointer types) are plain index
//! comparisons under this scheme, never ownership relationships.
//!
//! `Block` and `Inst` references are scoped to the function that owns them; all the other
//! entity types are module-wide.

use crate::entity::entity_impl;
use core::fmt;

/// An opaque reference to a function in a module.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Func(u32);
entity_impl!(Func, "func");

/// An opaque reference to a [basic block](https://en.wikipedia.org/wiki/Basic_block) in a
/// function.
///
/// While the order is stable, it is arbitrary and does not necessarily resemble the layout order.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block, "block");

/// An opaque reference to an instruction in a function.
///
/// An instruction with a result type defines exactly one SSA value, so `Inst` doubles as the
/// reference to that value in operand position.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");

/// An opaque reference to a module-scope variable.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalVar(u32);
entity_impl!(GlobalVar, "var");

/// An opaque reference to a constant in the module's constant pool.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Constant(u32);
entity_impl!(Constant, "const");

/// An opaque reference to a type in the module's type table.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Type(u32);
entity_impl!(Type, "type");

/// An opaque reference to a decoration group.
///
/// A decoration group is a shared bundle of decorations applied to several targets at once.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecorationGroup(u32);
entity_impl!(DecorationGroup, "group");

/// An opaque reference to a debug-info lexical scope.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DebugScope(u32);
entity_impl!(DebugScope, "scope");

/// An opaque reference to a debug-info local variable descriptor.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DebugLocal(u32);
entity_impl!(DebugLocal, "dbglocal");

/// An opaque reference to any of the entities defined in this module.
///
/// Function-local entities carry the owning `Func` so the reference is meaningful at module
/// scope. Used by the name table and by decoration targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnyEntity {
    /// A function.
    Func(Func),
    /// A basic block in a function.
    Block(Func, Block),
    /// An instruction result in a function.
    Inst(Func, Inst),
    /// A module-scope variable.
    GlobalVar(GlobalVar),
    /// A constant.
    Constant(Constant),
    /// A type.
    Type(Type),
    /// A decoration group.
    Group(DecorationGroup),
}

impl fmt::Display for AnyEntity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Func(r) => r.fmt(f),
            Self::Block(func, r) => write!(f, "{func}.{r}"),
            Self::Inst(func, r) => write!(f, "{func}.{r}"),
            Self::GlobalVar(r) => r.fmt(f),
            Self::Constant(r) => r.fmt(f),
            Self::Type(r) => r.fmt(f),
            Self::Group(r) => r.fmt(f),
        }
    }
}

impl From<Func> for AnyEntity {
    fn from(r: Func) -> Self {
        Self::Func(r)
    }
}

impl From<(Func, Block)> for AnyEntity {
    fn from((func, block): (Func, Block)) -> Self {
        Self::Block(func, block)
    }
}

impl From<(Func, Inst)> for AnyEntity {
    fn from((func, inst): (Func, Inst)) -> Self {
        Self::Inst(func, inst)
    }
}

impl From<GlobalVar> for AnyEntity {
    fn from(r: GlobalVar) -> Self {
        Self::GlobalVar(r)
    }
}

impl From<Constant> for AnyEntity {
    fn from(r: Constant) -> Self {
        Self::Constant(r)
    }
}

impl From<Type> for AnyEntity {
    fn from(r: Type) -> Self {
        Self::Type(r)
    }
}

impl From<DecorationGroup> for AnyEntity {
    fn from(r: DecorationGroup) -> Self {
        Self::Group(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;
    use crate::packed_option::PackedOption;
    use core::mem;

    #[test]
    fn display() {
        assert_eq!(Inst::new(0).to_string(), "inst0");
        assert_eq!(GlobalVar::new(3).to_string(), "var3");
        assert_eq!(
            AnyEntity::Block(Func::new(1), Block::new(2)).to_string(),
            "func1.block2"
        );
    }

    #[test]
    fn memory() {
        // This is the whole point of `PackedOption`.
        assert_eq!(
            mem::size_of::<Inst>(),
            mem::size_of::<PackedOption<Inst>>()
        );
    }
}
