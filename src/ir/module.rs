//! The top-level module container.
//!
//! A `Module` owns the type table, the constant pool, module-scope variables, functions, entry
//! points, decorations, debug info, and the name table. Functions and global variables follow
//! the same arena-plus-order scheme as instructions inside a function: removal drops the entity
//! from the declaration order that emission walks, while the arena slot stays addressable for
//! diagnostics.

use crate::entity::PrimaryMap;
use crate::ir::annotations::Annotations;
use crate::ir::constant::ConstantPool;
use crate::ir::debuginfo::DebugInfo;
use crate::ir::entities::{AnyEntity, Constant, Func, GlobalVar, Type};
use crate::ir::function::FunctionData;
use crate::ir::types::{StorageClass, TypeTable};
use rustc_hash::FxHashMap;

/// The target version of the module's wire format.
///
/// The version decides whether dead interface variables may be dropped from entry-point
/// interface lists: newer versions list every module-scope variable and permit rewriting the
/// list, older versions pin `Input`/`Output` declarations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Version {
    /// Version 1.3: interface lists carry only `Input`/`Output` variables and dead interface
    /// variables must keep their declarations.
    V1_3,
    /// Version 1.4: interface lists carry all referenced module-scope variables and dead
    /// interface variables are removable.
    V1_4,
}

impl Version {
    /// May dead interface variables be removed from entry points at this version?
    pub fn allows_interface_removal(self) -> bool {
        self >= Self::V1_4
    }
}

/// The pipeline stage of an entry point.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Stage {
    Vertex,
    Fragment,
    Geometry,
    Compute,
}

/// An entry point: a function made externally invokable under a name, with its interface
/// variable list.
#[derive(Clone)]
pub struct EntryPoint {
    /// The function executed by this entry point.
    pub func: Func,
    /// The pipeline stage.
    pub stage: Stage,
    /// The externally visible name.
    pub name: String,
    /// The interface variables declared for this entry point.
    pub interface: Vec<GlobalVar>,
}

/// A module-scope variable declaration.
#[derive(Clone)]
pub struct GlobalVarData {
    /// The pointer type of the variable.
    pub ty: Type,
    /// The storage class the variable lives in.
    pub storage: StorageClass,
    /// The initializer, when present.
    pub init: Option<Constant>,
}

/// Debug names attached to entities.
///
/// Purely cosmetic: names never affect liveness. Names of removed entities are dropped with
/// them, except block labels, which survive control-flow simplification.
#[derive(Default)]
pub struct NameTable {
    names: FxHashMap<AnyEntity, String>,
}

impl NameTable {
    /// Attach a name to an entity, replacing any previous name.
    pub fn set(&mut self, entity: impl Into<AnyEntity>, name: impl Into<String>) {
        self.names.insert(entity.into(), name.into());
    }

    /// The name of an entity, if it has one.
    pub fn get(&self, entity: impl Into<AnyEntity>) -> Option<&str> {
        self.names.get(&entity.into()).map(String::as_str)
    }

    /// Remove the name of an entity.
    pub fn remove(&mut self, entity: impl Into<AnyEntity>) {
        self.names.remove(&entity.into());
    }

    /// Keep only names whose entity satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&AnyEntity) -> bool) {
        self.names.retain(|e, _| keep(e));
    }

    /// Number of named entities.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Is the table empty?
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A whole shader module.
pub struct Module {
    /// Target wire-format version.
    pub version: Version,
    /// The type table.
    pub types: TypeTable,
    /// The constant pool.
    pub constants: ConstantPool,
    /// Module-scope variable arena.
    pub global_vars: PrimaryMap<GlobalVar, GlobalVarData>,
    /// Declaration order of module-scope variables.
    pub var_order: Vec<GlobalVar>,
    /// Function arena.
    pub functions: PrimaryMap<Func, FunctionData>,
    /// Declaration order of functions.
    pub func_order: Vec<Func>,
    /// Entry points.
    pub entry_points: Vec<EntryPoint>,
    /// Decorations and decoration groups.
    pub annotations: Annotations,
    /// Debug-info records.
    pub debug_info: DebugInfo,
    /// Entity names.
    pub names: NameTable,
}

impl Module {
    /// Create an empty module at the given version.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            types: TypeTable::new(),
            constants: ConstantPool::new(),
            global_vars: PrimaryMap::new(),
            var_order: Vec::new(),
            functions: PrimaryMap::new(),
            func_order: Vec::new(),
            entry_points: Vec::new(),
            annotations: Annotations::new(),
            debug_info: DebugInfo::new(),
            names: NameTable::default(),
        }
    }

    /// Declare a module-scope variable.
    pub fn declare_var(&mut self, storage: StorageClass, pointee: Type) -> GlobalVar {
        let ty = self.types.pointer(storage, pointee);
        let var = self.global_vars.push(GlobalVarData {
            ty,
            storage,
            init: None,
        });
        self.var_order.push(var);
        var
    }

    /// Declare a function with the given return type.
    pub fn declare_func(&mut self, ret_type: Type) -> Func {
        let func = self.functions.push(FunctionData::new(ret_type));
        self.func_order.push(func);
        func
    }

    /// Declare an entry point for `func`.
    pub fn declare_entry_point(
        &mut self,
        func: Func,
        stage: Stage,
        name: impl Into<String>,
        interface: Vec<GlobalVar>,
    ) {
        self.entry_points.push(EntryPoint {
            func,
            stage,
            name: name.into(),
            interface,
        });
    }

    /// Is `func` the target of any entry point?
    pub fn is_entry_point(&self, func: Func) -> bool {
        self.entry_points.iter().any(|ep| ep.func == func)
    }

    /// Is `var` still declared in the module?
    pub fn is_var_declared(&self, var: GlobalVar) -> bool {
        self.var_order.contains(&var)
    }

    /// Is `func` still declared in the module?
    pub fn is_func_declared(&self, func: Func) -> bool {
        self.func_order.contains(&func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_land_in_order() {
        let mut module = Module::new(Version::V1_4);
        let f32t = module.types.f32_ty();
        let a = module.declare_var(StorageClass::Private, f32t);
        let b = module.declare_var(StorageClass::Input, f32t);
        assert_eq!(module.var_order, vec![a, b]);

        let void = module.types.void();
        let f = module.declare_func(void);
        module.declare_entry_point(f, Stage::Fragment, "main", vec![b]);
        assert!(module.is_entry_point(f));
        assert!(module.is_func_declared(f));
    }

    #[test]
    fn version_gates_interface_removal() {
        assert!(!Version::V1_3.allows_interface_removal());
        assert!(Version::V1_4.allows_interface_removal());
    }
}
