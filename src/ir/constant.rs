//! The module-wide constant pool.
//!
//! Constants are interned on insertion, so inserting the same data twice returns the same
//! handle. The pool keeps an explicit declaration order; dead-code elimination removes a
//! constant by dropping it from that order, which is what module emission walks. Scalar float
//! data is stored as raw bits so constants stay `Eq`/`Hash`.

use crate::entity::PrimaryMap;
use crate::ir::entities::{Constant, Type};
use crate::ir::instructions::Opcode;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// The data of one constant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstantData {
    /// A boolean constant.
    Bool {
        /// The value.
        value: bool,
        /// Whether this is a specialization constant.
        spec: bool,
    },
    /// A scalar integer or float constant, stored as raw little-endian bits.
    Scalar {
        /// The scalar type.
        ty: Type,
        /// The raw bit pattern, zero-extended to 64 bits.
        bits: u64,
        /// Whether this is a specialization constant.
        spec: bool,
    },
    /// A composite constant (vector, struct), built from other constants.
    Composite {
        /// The composite type.
        ty: Type,
        /// The element constants, in order.
        elems: Vec<Constant>,
        /// Whether this is a specialization composite.
        spec: bool,
    },
    /// A partially evaluated specialization-constant expression.
    SpecOp {
        /// The result type.
        ty: Type,
        /// The operation applied at specialization time.
        opcode: Opcode,
        /// The constant operands.
        operands: Vec<Constant>,
    },
    /// The null value of a type.
    Null {
        /// The type.
        ty: Type,
    },
}

impl ConstantData {
    /// Is this a specialization constant (including spec-op expressions)?
    pub fn is_spec(&self) -> bool {
        match *self {
            Self::Bool { spec, .. } | Self::Scalar { spec, .. } | Self::Composite { spec, .. } => {
                spec
            }
            Self::SpecOp { .. } => true,
            Self::Null { .. } => false,
        }
    }

    /// The constants this constant is built from.
    ///
    /// Liveness flows through these edges: a live composite keeps its direct construction
    /// operands alive, and a live spec-op expression keeps its operands alive.
    pub fn operands(&self) -> &[Constant] {
        match self {
            Self::Composite { elems, .. } => elems,
            Self::SpecOp { operands, .. } => operands,
            Self::Bool { .. } | Self::Scalar { .. } | Self::Null { .. } => &[],
        }
    }

}

/// The module's constant pool: an interning arena plus a declaration order.
pub struct ConstantPool {
    constants: PrimaryMap<Constant, ConstantData>,
    dedup: FxHashMap<ConstantData, Constant>,
    order: Vec<Constant>,
}

impl ConstantPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            constants: PrimaryMap::new(),
            dedup: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Insert a constant, returning the handle of the existing declaration when the same data
    /// was inserted before.
    pub fn insert(&mut self, data: ConstantData) -> Constant {
        if let Some(&c) = self.dedup.get(&data) {
            return c;
        }
        let c = self.constants.push(data.clone());
        self.dedup.insert(data, c);
        self.order.push(c);
        c
    }

    /// Look up the data for a constant handle.
    pub fn get(&self, c: Constant) -> &ConstantData {
        &self.constants[c]
    }

    /// Is this constant still declared in the module?
    pub fn is_declared(&self, c: Constant) -> bool {
        self.order.contains(&c)
    }

    /// Iterate over the declared constants in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Constant> + '_ {
        self.order.iter().copied()
    }

    /// Number of declared constants.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Is the pool empty?
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drop every declared constant not satisfying `keep`.
    ///
    /// Returns the number of constants removed. Handles stay valid for `get` so stale
    /// references can still be printed while diagnosing, but removed constants no longer
    /// appear in iteration.
    pub fn retain(&mut self, mut keep: impl FnMut(Constant) -> bool) -> usize {
        let before = self.order.len();
        self.order.retain(|&c| keep(c));
        before - self.order.len()
    }

    /// Shorthand for a non-spec `u32` scalar.
    pub fn u32_const(&mut self, ty: Type, value: u32) -> Constant {
        self.insert(ConstantData::Scalar {
            ty,
            bits: value as u64,
            spec: false,
        })
    }

    /// Shorthand for a non-spec `f32` scalar.
    pub fn f32_const(&mut self, ty: Type, value: f32) -> Constant {
        self.insert(ConstantData::Scalar {
            ty,
            bits: value.to_bits() as u64,
            spec: false,
        })
    }

    /// The transitive closure of `roots` over constant operands.
    pub fn transitive_closure(&self, roots: impl IntoIterator<Item = Constant>) -> Vec<Constant> {
        let mut live: Vec<Constant> = Vec::new();
        let mut stack: SmallVec<[Constant; 8]> = roots.into_iter().collect();
        while let Some(c) = stack.pop() {
            if live.contains(&c) {
                continue;
            }
            live.push(c);
            stack.extend(self.get(c).operands().iter().copied());
        }
        live
    }
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::TypeTable;

    #[test]
    fn interning_dedups() {
        let mut types = TypeTable::new();
        let mut pool = ConstantPool::new();
        let u32t = types.u32_ty();
        let a = pool.u32_const(u32t, 7);
        let b = pool.u32_const(u32t, 7);
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn closure_follows_composites() {
        let mut types = TypeTable::new();
        let mut pool = ConstantPool::new();
        let f32t = types.f32_ty();
        let v2 = types.vector(f32t, 2);
        let x = pool.f32_const(f32t, 1.0);
        let y = pool.f32_const(f32t, 2.0);
        let unrelated = pool.f32_const(f32t, 3.0);
        let vec = pool.insert(ConstantData::Composite {
            ty: v2,
            elems: vec![x, y],
            spec: false,
        });

        let live = pool.transitive_closure([vec]);
        assert!(live.contains(&vec));
        assert!(live.contains(&x));
        assert!(live.contains(&y));
        assert!(!live.contains(&unrelated));
    }

    #[test]
    fn retain_drops_from_iteration_only() {
        let mut types = TypeTable::new();
        let mut pool = ConstantPool::new();
        let u32t = types.u32_ty();
        let a = pool.u32_const(u32t, 1);
        let b = pool.u32_const(u32t, 2);
        let removed = pool.retain(|c| c == a);
        assert_eq!(removed, 1);
        assert!(pool.is_declared(a));
        assert!(!pool.is_declared(b));
        // The arena still answers for diagnostics.
        assert!(matches!(pool.get(b), ConstantData::Scalar { .. }));
    }
}
