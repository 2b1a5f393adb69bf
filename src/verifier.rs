//! Module verifier.
//!
//! Checks the structural invariants the optimizer is required to preserve:
//!
//! - every block in a function layout is non-empty and ends in exactly one terminator
//! - merge markers appear only immediately before their block's terminator
//! - phis lead their block and carry one edge per predecessor
//! - branch and merge targets are blocks in the layout
//! - operands reference instructions attached to the function, declared constants, and
//!   declared module-scope variables
//! - entry points, decorations, names, and debug records reference only entities that are
//!   still present (or the explicit no-information sentinel)
//!
//! The verifier is for tests and debugging; the optimizer never relies on it at runtime.

use crate::flowgraph::ControlFlowGraph;
use crate::ir::{AnyEntity, Block, DebugTarget, DebugVarRef, Func, InstData, Module, Operand};
use crate::timing;
use core::fmt;
use rustc_hash::FxHashSet;

/// A verifier failure: where, and what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierError {
    /// The entity the problem was found at.
    pub location: String,
    /// Description of the problem.
    pub message: String,
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "verifier error at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for VerifierError {}

fn err(location: impl fmt::Display, message: impl Into<String>) -> VerifierError {
    VerifierError {
        location: location.to_string(),
        message: message.into(),
    }
}

/// Verify one function of `module`.
pub fn verify_function(module: &Module, func: Func) -> Result<(), VerifierError> {
    let func_data = &module.functions[func];

    let mut attached: FxHashSet<crate::ir::Inst> = FxHashSet::default();
    attached.extend(func_data.params.iter().copied());
    for (_, inst) in func_data.layout_insts() {
        if !attached.insert(inst) {
            return Err(err(func, format!("{inst} appears twice in the layout")));
        }
    }

    let in_layout: FxHashSet<Block> = func_data.block_order().iter().copied().collect();

    for &block in func_data.block_order() {
        let body = func_data.block_insts(block);
        let last = match body.last() {
            Some(&last) => last,
            None => return Err(err(func, format!("{block} is empty"))),
        };
        if !func_data[last].opcode().is_terminator() {
            return Err(err(func, format!("{block} does not end in a terminator")));
        }

        let mut phis_done = false;
        for (position, &inst) in body.iter().enumerate() {
            let data = &func_data[inst];
            let opcode = data.opcode();
            if opcode.is_terminator() && position != body.len() - 1 {
                return Err(err(func, format!("{inst} terminates {block} early")));
            }
            if opcode.is_merge() && position != body.len().wrapping_sub(2) {
                return Err(err(
                    func,
                    format!("{inst} is a merge marker away from the terminator of {block}"),
                ));
            }
            if opcode == crate::ir::Opcode::Phi {
                if phis_done {
                    return Err(err(func, format!("{inst} is a phi after non-phi code")));
                }
            } else {
                phis_done = true;
            }

            let mut operand_problem = None;
            data.visit_operands(|op| {
                if operand_problem.is_some() {
                    return;
                }
                let ok = match op {
                    Operand::Inst(def) => attached.contains(&def),
                    Operand::Constant(c) => module.constants.is_declared(c),
                    Operand::Var(v) => module.is_var_declared(v),
                };
                if !ok {
                    operand_problem = Some(op);
                }
            });
            if let Some(op) = operand_problem {
                return Err(err(
                    func,
                    format!("{inst} references {op}, which is not in the module"),
                ));
            }

            for dest in data.branch_targets() {
                if !in_layout.contains(&dest) {
                    return Err(err(
                        func,
                        format!("{inst} branches to {dest}, which is not in the layout"),
                    ));
                }
            }
            match *data {
                InstData::SelectionMerge { merge } => {
                    if !in_layout.contains(&merge) {
                        return Err(err(func, format!("{inst} merges at missing {merge}")));
                    }
                }
                InstData::LoopMerge { merge, cont } => {
                    if !in_layout.contains(&merge) || !in_layout.contains(&cont) {
                        return Err(err(func, format!("{inst} references a missing block")));
                    }
                }
                _ => {}
            }
        }
    }

    // Phi edges match the actual predecessors.
    let cfg = ControlFlowGraph::with_function(func_data);
    for &block in func_data.block_order() {
        for &inst in func_data.block_insts(block) {
            if let InstData::Phi { ref edges } = func_data[inst] {
                for &(_, pred) in edges {
                    if !cfg.is_predecessor(pred, block) {
                        return Err(err(
                            func,
                            format!("{inst} has an edge from {pred}, which is not a predecessor"),
                        ));
                    }
                }
                let preds = cfg.pred_iter(block).count();
                if edges.len() != preds {
                    return Err(err(
                        func,
                        format!(
                            "{inst} has {} edges for {} predecessors",
                            edges.len(),
                            preds
                        ),
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Verify the whole module.
pub fn verify_module(module: &Module) -> Result<(), VerifierError> {
    let _tt = timing::verifier();

    for ep in &module.entry_points {
        if !module.is_func_declared(ep.func) {
            return Err(err(
                &ep.name,
                format!("entry point references removed {}", ep.func),
            ));
        }
        for &var in &ep.interface {
            if !module.is_var_declared(var) {
                return Err(err(
                    &ep.name,
                    format!("entry point interface references removed {var}"),
                ));
            }
        }
    }

    for &func in &module.func_order {
        verify_function(module, func)?;
    }

    let entity_present = |entity: &AnyEntity| -> bool {
        match *entity {
            AnyEntity::Func(f) => module.is_func_declared(f),
            AnyEntity::GlobalVar(v) => module.is_var_declared(v),
            AnyEntity::Constant(c) => module.constants.is_declared(c),
            AnyEntity::Type(_) => true,
            AnyEntity::Block(f, b) => {
                module.is_func_declared(f) && module.functions[f].is_block_in_layout(b)
            }
            AnyEntity::Inst(f, i) => {
                module.is_func_declared(f)
                    && (module.functions[f].params.contains(&i)
                        || module.functions[f].layout_insts().any(|(_, inst)| inst == i))
            }
            AnyEntity::Group(g) => module.annotations.is_group_declared(g),
        }
    };

    for ann in &module.annotations.decorations {
        if !entity_present(&ann.target) {
            return Err(err(
                ann.target,
                "decoration targets an entity that is not in the module",
            ));
        }
    }
    for &group in &module.annotations.group_order {
        let data = &module.annotations.groups[group];
        for target in &data.targets {
            if !entity_present(target) {
                return Err(err(group, "group decorates a removed entity"));
            }
        }
    }

    for record in &module.debug_info.globals {
        match record.var {
            DebugVarRef::Var(var) => {
                if !module.is_var_declared(var) {
                    return Err(err(
                        &record.name,
                        format!("debug descriptor references removed {var}"),
                    ));
                }
            }
            DebugVarRef::InfoNone => {}
        }
        if !module.debug_info.is_scope_declared(record.scope) {
            return Err(err(&record.name, "debug descriptor references a removed scope"));
        }
    }
    for binding in &module.debug_info.bindings {
        if !module.is_func_declared(binding.func) {
            return Err(err(binding.func, "debug binding references a removed function"));
        }
        let ok = match binding.target {
            DebugTarget::LocalStorage(storage) => module.functions[binding.func]
                .layout_insts()
                .any(|(_, inst)| inst == storage),
            DebugTarget::Value(op) => match op {
                Operand::Inst(inst) => module.functions[binding.func]
                    .layout_insts()
                    .any(|(_, i)| i == inst),
                Operand::Constant(c) => module.constants.is_declared(c),
                Operand::Var(v) => module.is_var_declared(v),
            },
        };
        if !ok {
            return Err(err(binding.func, "debug binding references removed code"));
        }
        if !module.debug_info.is_local_declared(binding.local) {
            return Err(err(binding.func, "debug binding references a removed local"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncBuilder, Module, Stage, StorageClass, Version};

    fn valid_module() -> Module {
        let mut module = Module::new(Version::V1_4);
        let void = module.types.void();
        let f32t = module.types.f32_ty();
        let out = module.declare_var(StorageClass::Output, f32t);
        let main = module.declare_func(void);
        {
            let mut b = FuncBuilder::new(&mut module.functions[main]);
            b.create_block();
            let x = b.undef(f32t);
            b.store(out, x);
            b.ret();
        }
        module.declare_entry_point(main, Stage::Fragment, "main", vec![out]);
        module
    }

    #[test]
    fn accepts_valid_module() {
        let module = valid_module();
        assert_eq!(verify_module(&module), Ok(()));
    }

    #[test]
    fn rejects_missing_terminator() {
        let mut module = valid_module();
        let main = module.func_order[0];
        let entry = module.functions[main].entry_block().unwrap();
        let term = module.functions[main].terminator(entry).unwrap();
        module.functions[main].retain_block_insts(entry, |i| i != term);
        let result = verify_module(&module);
        assert!(result.is_err());
        let text = result.unwrap_err().to_string();
        assert!(text.contains("terminator"));
    }

    #[test]
    fn rejects_dangling_interface_var() {
        let mut module = valid_module();
        module.var_order.clear();
        assert!(verify_module(&module).is_err());
    }
}
