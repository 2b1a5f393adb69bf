//! Debug-info records.
//!
//! Debug records reference code but never keep plain values alive: they are rewritten or
//! dropped as the code they describe is removed, with three exceptions the pass implements.
//! Top-level records (sources, compilation units) survive unconditionally. A global-variable
//! descriptor whose backing variable is removed keeps its descriptor and has the variable
//! operand rewritten to a "no information" sentinel. And a declare-style record pointing at a
//! function-local variable's storage counts as an observation of that storage, keeping its
//! stores alive.

use crate::entity::PrimaryMap;
use crate::ir::entities::{DebugLocal, DebugScope, Func, GlobalVar, Inst};
use crate::ir::instructions::Operand;

/// A source file record. Never swept.
#[derive(Clone)]
pub struct DebugSource {
    /// The file path.
    pub file: String,
    /// Embedded source text, when carried.
    pub text: Option<String>,
}

/// A lexical scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DebugScopeData {
    /// The scope of a whole compilation unit. Never swept.
    CompilationUnit {
        /// Index into [`DebugInfo::sources`].
        source: usize,
    },
    /// A function scope.
    Function {
        /// The parent scope.
        parent: DebugScope,
        /// The described function.
        func: Func,
    },
    /// A braced lexical block inside a function.
    LexicalBlock {
        /// The parent scope.
        parent: DebugScope,
        /// Starting line.
        line: u32,
    },
}

impl DebugScopeData {
    /// The parent scope, when there is one.
    pub fn parent(&self) -> Option<DebugScope> {
        match *self {
            Self::CompilationUnit { .. } => None,
            Self::Function { parent, .. } | Self::LexicalBlock { parent, .. } => Some(parent),
        }
    }
}

/// The variable operand of a global-variable descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DebugVarRef {
    /// The descriptor describes this module-scope variable.
    Var(GlobalVar),
    /// The described variable was removed; no location information remains.
    InfoNone,
}

/// A descriptor of a module-scope variable.
#[derive(Clone)]
pub struct DebugGlobalVariable {
    /// The source-level name.
    pub name: String,
    /// The scope the variable was declared in.
    pub scope: DebugScope,
    /// The described variable, or the no-information sentinel.
    pub var: DebugVarRef,
}

/// A descriptor of a source-level local variable.
#[derive(Clone)]
pub struct DebugLocalData {
    /// The source-level name.
    pub name: String,
    /// The scope the variable was declared in.
    pub scope: DebugScope,
}

/// How a binding record ties a local descriptor to code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BindingKind {
    /// The local lives in the referenced storage for its whole lifetime.
    Declare,
    /// The local's value is read through a dereference of the referenced storage.
    ValueDeref,
    /// The local's value is the referenced SSA value at this point.
    Value,
}

/// A record binding a local descriptor to storage or to a value.
#[derive(Clone)]
pub struct DebugBinding {
    /// The record flavor.
    pub kind: BindingKind,
    /// The described local.
    pub local: DebugLocal,
    /// The function the binding appears in.
    pub func: Func,
    /// For `Declare`/`ValueDeref`: the function-local variable instruction. For `Value`: the
    /// operand holding the value.
    pub target: DebugTarget,
}

/// The code entity a binding record points at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DebugTarget {
    /// A function-local variable's storage.
    LocalStorage(Inst),
    /// A plain SSA value.
    Value(Operand),
}

/// All debug-info state of a module.
pub struct DebugInfo {
    /// Source file records. Never swept.
    pub sources: Vec<DebugSource>,
    /// Scope arena.
    pub scopes: PrimaryMap<DebugScope, DebugScopeData>,
    /// Declaration order of scopes.
    pub scope_order: Vec<DebugScope>,
    /// Global-variable descriptors.
    pub globals: Vec<DebugGlobalVariable>,
    /// Local-variable descriptor arena.
    pub locals: PrimaryMap<DebugLocal, DebugLocalData>,
    /// Declaration order of local descriptors.
    pub local_order: Vec<DebugLocal>,
    /// Binding records.
    pub bindings: Vec<DebugBinding>,
}

impl DebugInfo {
    /// Create an empty debug-info table.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            scopes: PrimaryMap::new(),
            scope_order: Vec::new(),
            globals: Vec::new(),
            locals: PrimaryMap::new(),
            local_order: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Record a source file, returning its index.
    pub fn add_source(&mut self, file: impl Into<String>, text: Option<String>) -> usize {
        self.sources.push(DebugSource {
            file: file.into(),
            text,
        });
        self.sources.len() - 1
    }

    /// Create a scope.
    pub fn make_scope(&mut self, data: DebugScopeData) -> DebugScope {
        let scope = self.scopes.push(data);
        self.scope_order.push(scope);
        scope
    }

    /// Is `scope` still declared?
    pub fn is_scope_declared(&self, scope: DebugScope) -> bool {
        self.scope_order.contains(&scope)
    }

    /// Describe a module-scope variable.
    pub fn describe_global(
        &mut self,
        name: impl Into<String>,
        scope: DebugScope,
        var: GlobalVar,
    ) {
        self.globals.push(DebugGlobalVariable {
            name: name.into(),
            scope,
            var: DebugVarRef::Var(var),
        });
    }

    /// Describe a source-level local variable.
    pub fn describe_local(&mut self, name: impl Into<String>, scope: DebugScope) -> DebugLocal {
        let local = self.locals.push(DebugLocalData {
            name: name.into(),
            scope,
        });
        self.local_order.push(local);
        local
    }

    /// Record a binding of `local` to code in `func`.
    pub fn bind(&mut self, kind: BindingKind, local: DebugLocal, func: Func, target: DebugTarget) {
        self.bindings.push(DebugBinding {
            kind,
            local,
            func,
            target,
        });
    }

    /// Is `local` still declared?
    pub fn is_local_declared(&self, local: DebugLocal) -> bool {
        self.local_order.contains(&local)
    }
}

impl Default for DebugInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;

    #[test]
    fn scope_parent_chain() {
        let mut dbg = DebugInfo::new();
        let src = dbg.add_source("shader.frag", None);
        let unit = dbg.make_scope(DebugScopeData::CompilationUnit { source: src });
        let func_scope = dbg.make_scope(DebugScopeData::Function {
            parent: unit,
            func: Func::new(0),
        });
        let block = dbg.make_scope(DebugScopeData::LexicalBlock {
            parent: func_scope,
            line: 12,
        });

        assert_eq!(dbg.scopes[block].parent(), Some(func_scope));
        assert_eq!(dbg.scopes[func_scope].parent(), Some(unit));
        assert_eq!(dbg.scopes[unit].parent(), None);
    }
}
