//! The module-wide type table.
//!
//! Types are interned: inserting the same type data twice returns the same handle, so type
//! equality is handle equality. The table is append-only; dead-code elimination never removes
//! types, and forward pointer declarations in particular must survive regardless of use so that
//! physical-storage pointer cycles stay well-formed.

use crate::entity::PrimaryMap;
use crate::ir::entities::Type;
use crate::packed_option::PackedOption;
use core::fmt;
use rustc_hash::FxHashMap;

/// The storage class of a pointer or variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageClass {
    /// Function-local storage, one allocation per invocation.
    Function,
    /// Module-private storage, invisible outside the module.
    Private,
    /// Storage shared across a workgroup.
    Workgroup,
    /// Read-only pipeline input.
    Input,
    /// Pipeline output.
    Output,
    /// Read-only uniform buffer memory.
    Uniform,
    /// Read-write storage buffer memory.
    StorageBuffer,
    /// Opaque resource handles (samplers, images).
    UniformConstant,
    /// Push-constant memory.
    PushConstant,
    /// Physical storage buffer memory addressed through 64-bit pointers.
    PhysicalStorageBuffer,
}

impl StorageClass {
    /// Is a write through this storage class observable outside the module?
    ///
    /// Stores to these classes are unconditional liveness seeds.
    pub fn writes_are_observable(self) -> bool {
        match self {
            Self::Output | Self::StorageBuffer | Self::PhysicalStorageBuffer => true,
            Self::Function
            | Self::Private
            | Self::Workgroup
            | Self::Input
            | Self::Uniform
            | Self::UniformConstant
            | Self::PushConstant => false,
        }
    }

    /// Is this class eligible for the module-local dead-store analysis?
    ///
    /// `Function` storage is always analyzable; `Private` and `Workgroup` storage is analyzable
    /// only under the extra conditions checked by the pass (entry point, no calls).
    pub fn is_module_local(self) -> bool {
        matches!(self, Self::Private | Self::Workgroup)
    }

    /// Does this class appear in entry-point interface lists?
    pub fn is_interface(self) -> bool {
        matches!(self, Self::Input | Self::Output)
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Function => "function",
            Self::Private => "private",
            Self::Workgroup => "workgroup",
            Self::Input => "input",
            Self::Output => "output",
            Self::Uniform => "uniform",
            Self::StorageBuffer => "storage_buffer",
            Self::UniformConstant => "uniform_constant",
            Self::PushConstant => "push_constant",
            Self::PhysicalStorageBuffer => "physical_storage_buffer",
        };
        f.write_str(s)
    }
}

/// The shape of a type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    /// The unit type of instructions without a meaningful result.
    Void,
    /// Boolean.
    Bool,
    /// An integer type of the given width.
    Int {
        /// Width in bits.
        bits: u8,
        /// Whether the type is signed.
        signed: bool,
    },
    /// A floating-point type of the given width.
    Float {
        /// Width in bits.
        bits: u8,
    },
    /// A short vector of scalars.
    Vector {
        /// Element type.
        elem: Type,
        /// Number of lanes.
        lanes: u8,
    },
    /// An aggregate with per-member types.
    Struct {
        /// Member types, in declaration order.
        members: Vec<Type>,
    },
    /// A pointer into a storage class.
    Pointer {
        /// The storage class pointed into.
        storage: StorageClass,
        /// The pointee type.
        pointee: Type,
    },
    /// A forward pointer declaration breaking a type cycle.
    ///
    /// The pointee is filled in when the real pointer type is declared; until then (and in
    /// well-formed recursive layouts, forever at this declaration site) the pointee slot stays
    /// empty. Never eliminated.
    ForwardPointer {
        /// The storage class of the eventual pointer.
        storage: StorageClass,
    },
}

/// The module-wide type table.
pub struct TypeTable {
    types: PrimaryMap<Type, TypeData>,
    dedup: FxHashMap<TypeData, Type>,
    /// Resolved pointees of forward pointer declarations.
    forward_resolutions: FxHashMap<Type, Type>,
}

impl TypeTable {
    /// Create an empty type table.
    pub fn new() -> Self {
        Self {
            types: PrimaryMap::new(),
            dedup: FxHashMap::default(),
            forward_resolutions: FxHashMap::default(),
        }
    }

    /// Intern a type, returning its handle.
    pub fn intern(&mut self, data: TypeData) -> Type {
        if let Some(&ty) = self.dedup.get(&data) {
            return ty;
        }
        let ty = self.types.push(data.clone());
        self.dedup.insert(data, ty);
        ty
    }

    /// Look up the data for a type handle.
    pub fn get(&self, ty: Type) -> &TypeData {
        &self.types[ty]
    }

    /// The void type.
    pub fn void(&mut self) -> Type {
        self.intern(TypeData::Void)
    }

    /// The boolean type.
    pub fn bool_ty(&mut self) -> Type {
        self.intern(TypeData::Bool)
    }

    /// A 32-bit signed integer type.
    pub fn i32_ty(&mut self) -> Type {
        self.intern(TypeData::Int {
            bits: 32,
            signed: true,
        })
    }

    /// A 32-bit unsigned integer type.
    pub fn u32_ty(&mut self) -> Type {
        self.intern(TypeData::Int {
            bits: 32,
            signed: false,
        })
    }

    /// A 32-bit float type.
    pub fn f32_ty(&mut self) -> Type {
        self.intern(TypeData::Float { bits: 32 })
    }

    /// A vector type.
    pub fn vector(&mut self, elem: Type, lanes: u8) -> Type {
        self.intern(TypeData::Vector { elem, lanes })
    }

    /// A struct type.
    pub fn struct_ty(&mut self, members: Vec<Type>) -> Type {
        self.intern(TypeData::Struct { members })
    }

    /// A pointer type.
    pub fn pointer(&mut self, storage: StorageClass, pointee: Type) -> Type {
        self.intern(TypeData::Pointer { storage, pointee })
    }

    /// Declare a forward pointer for a not-yet-declared pointee.
    ///
    /// Forward declarations are not deduplicated; each call introduces a distinct declaration,
    /// matching one declaration per type cycle in the source form.
    pub fn forward_pointer(&mut self, storage: StorageClass) -> Type {
        self.types.push(TypeData::ForwardPointer { storage })
    }

    /// Resolve a forward pointer declaration to its real pointee.
    pub fn resolve_forward_pointer(&mut self, fwd: Type, pointee: Type) {
        debug_assert!(matches!(self.types[fwd], TypeData::ForwardPointer { .. }));
        self.forward_resolutions.insert(fwd, pointee);
    }

    /// The resolved pointee of a forward pointer declaration, if it has been resolved.
    pub fn forward_pointee(&self, fwd: Type) -> Option<Type> {
        self.forward_resolutions.get(&fwd).copied()
    }

    /// The storage class and pointee of `ty`, if it is a pointer type.
    ///
    /// Forward pointers report their resolution when one exists.
    pub fn pointer_parts(&self, ty: Type) -> Option<(StorageClass, PackedOption<Type>)> {
        match self.types[ty] {
            TypeData::Pointer { storage, pointee } => Some((storage, pointee.into())),
            TypeData::ForwardPointer { storage } => {
                Some((storage, self.forward_pointee(ty).into()))
            }
            _ => None,
        }
    }

    /// Number of types in the table.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Is the table empty?
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over all type handles.
    pub fn keys(&self) -> impl Iterator<Item = Type> {
        self.types.keys()
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedups() {
        let mut table = TypeTable::new();
        let f32a = table.f32_ty();
        let f32b = table.f32_ty();
        assert_eq!(f32a, f32b);
        let v4a = table.vector(f32a, 4);
        let v4b = table.vector(f32b, 4);
        assert_eq!(v4a, v4b);
        assert_ne!(v4a, table.vector(f32a, 3));
    }

    #[test]
    fn forward_pointers_are_distinct() {
        let mut table = TypeTable::new();
        let a = table.forward_pointer(StorageClass::PhysicalStorageBuffer);
        let b = table.forward_pointer(StorageClass::PhysicalStorageBuffer);
        assert_ne!(a, b);

        let f32t = table.f32_ty();
        let real = table.pointer(StorageClass::PhysicalStorageBuffer, f32t);
        table.resolve_forward_pointer(a, real);
        assert_eq!(table.forward_pointee(a), Some(real));
        assert_eq!(table.forward_pointee(b), None);
    }
}
