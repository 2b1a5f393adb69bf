//! Call graph, effect summaries, and function reachability.
//!
//! The dead-code-elimination pass needs three whole-module facts about functions: who calls
//! whom, whether a call to a function can have externally observable effects, and which
//! functions are reachable from an entry point or an exported declaration. All three are
//! computed here in one pass over the module, before any liveness runs.
//!
//! Effect summaries are computed bottom-up to a fixed point. Anything the analysis cannot
//! prove effect-free is `MayHaveSideEffects`; imported functions have no analyzable body and
//! are always `MayHaveSideEffects`.

use crate::entity::{EntitySet, SecondaryMap};
use crate::ir::function::PointerRoot;
use crate::ir::{Func, FunctionData, InstData, Linkage, Module, Opcode};
use crate::timing;

/// Whether calling a function can be observed from outside the call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EffectSummary {
    /// The function provably performs no externally observable effect.
    NoObservableEffects,
    /// The function may perform observable effects, or could not be analyzed.
    MayHaveSideEffects,
}

impl Default for EffectSummary {
    fn default() -> Self {
        // The default is what unanalyzed functions get.
        Self::MayHaveSideEffects
    }
}

/// Call-graph facts for one module.
pub struct CallGraph {
    callees: SecondaryMap<Func, Vec<Func>>,
    summaries: SecondaryMap<Func, EffectSummary>,
    reachable: EntitySet<Func>,
    valid: bool,
}

impl CallGraph {
    /// Allocate a new blank call graph. Use `compute` to fill it in.
    pub fn new() -> Self {
        Self {
            callees: SecondaryMap::new(),
            summaries: SecondaryMap::new(),
            reachable: EntitySet::new(),
            valid: false,
        }
    }

    /// Allocate and compute the call graph for `module`.
    pub fn with_module(module: &Module) -> Self {
        let mut cg = Self::new();
        cg.compute(module);
        cg
    }

    /// Compute callee lists, effect summaries, and reachability for `module`.
    pub fn compute(&mut self, module: &Module) {
        let _tt = timing::call_graph();
        self.callees.clear();
        self.summaries.clear();
        self.reachable.clear();

        for &func in &module.func_order {
            let mut callees = Vec::new();
            for (_, inst) in module.functions[func].layout_insts() {
                if let InstData::Call { callee, .. } = module.functions[func][inst] {
                    if !callees.contains(&callee) {
                        callees.push(callee);
                    }
                }
            }
            self.callees[func] = callees;
        }

        self.compute_summaries(module);
        self.compute_reachability(module);
        self.valid = true;
    }

    fn compute_summaries(&mut self, module: &Module) {
        // Start optimistic for defined functions and run to a fixed point; cycles of
        // effect-free functions then settle as effect-free.
        for &func in &module.func_order {
            let data = &module.functions[func];
            let summary = if data.linkage == Some(Linkage::Import)
                || data.entry_block().is_none()
                || has_local_effects(data)
            {
                EffectSummary::MayHaveSideEffects
            } else {
                EffectSummary::NoObservableEffects
            };
            self.summaries[func] = summary;
        }

        let mut changed = true;
        while changed {
            changed = false;
            for &func in &module.func_order {
                if self.summaries[func] == EffectSummary::MayHaveSideEffects {
                    continue;
                }
                let tainted = self.callees[func]
                    .iter()
                    .any(|&callee| self.summaries[callee] == EffectSummary::MayHaveSideEffects);
                if tainted {
                    self.summaries[func] = EffectSummary::MayHaveSideEffects;
                    changed = true;
                }
            }
        }
    }

    fn compute_reachability(&mut self, module: &Module) {
        let mut stack: Vec<Func> = Vec::new();
        let mark = |set: &mut EntitySet<Func>, stack: &mut Vec<Func>, func: Func| {
            if !set.contains(func) {
                set.insert(func);
                stack.push(func);
            }
        };
        for ep in &module.entry_points {
            mark(&mut self.reachable, &mut stack, ep.func);
        }
        for &func in &module.func_order {
            if module.functions[func].linkage == Some(Linkage::Export) {
                mark(&mut self.reachable, &mut stack, func);
            }
        }
        while let Some(func) = stack.pop() {
            for i in 0..self.callees[func].len() {
                let callee = self.callees[func][i];
                mark(&mut self.reachable, &mut stack, callee);
            }
        }
    }

    /// Check if the call graph is in a valid state.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The direct callees of `func`, deduplicated.
    pub fn callees(&self, func: Func) -> &[Func] {
        &self.callees[func]
    }

    /// The effect summary of `func`.
    pub fn summary(&self, func: Func) -> EffectSummary {
        self.summaries[func]
    }

    /// Is `func` reachable from an entry point or an exported declaration?
    pub fn is_reachable(&self, func: Func) -> bool {
        self.reachable.contains(func)
    }
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Does the body of `func` perform an observable effect itself, calls aside?
///
/// From a caller's point of view every write that outlives the call counts: stores to
/// module-scope variables of any class, stores through pointers the function did not create,
/// atomics, barriers, geometry outputs, and invocation termination.
fn has_local_effects(func: &FunctionData) -> bool {
    for (_, inst) in func.layout_insts() {
        let data = &func[inst];
        let opcode = data.opcode();
        if opcode.is_atomic()
            || opcode.is_barrier()
            || opcode.is_primitive_output()
            || opcode == Opcode::Kill
        {
            return true;
        }
        match *data {
            InstData::Store { ptr, .. } | InstData::CopyMemory { dst: ptr, .. } => {
                if !matches!(func.pointer_root(ptr), PointerRoot::Local(_)) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}
