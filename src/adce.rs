//! An Aggressive Dead Code Elimination (ADCE) pass.
//!
//! Dead code here means everything that does not contribute to an observable effect of the
//! module: instructions whose results feed nothing live, whole structured constructs with dead
//! bodies, stores to memory nothing ever reads, unreferenced constants and module-scope
//! variables, functions nothing reaches, and metadata describing any of the above.
//!
//! The pass starts from the instructions a module cannot lose (stores to externally visible
//! storage, atomics, barriers, control exits, calls with unanalyzable effects) and propagates
//! liveness backwards over def-use edges, structured control dependence, and phi edges until a
//! fixed point. Everything unmarked is then removed, and control flow is repaired: a construct
//! with a dead decision collapses to a plain branch to its merge block, and blocks that become
//! unreachable are dropped while their labels' structural role (header and merge blocks of
//! enclosing constructs) is preserved.
//!
//! Anything the analysis cannot positively classify is retained; the pass has no failure mode
//! of its own. Running it on its own output reports `PassStatus::Unchanged`.

use crate::call_graph::{CallGraph, EffectSummary};
use crate::entity::{EntitySet, SecondaryMap};
use crate::flowgraph::ControlFlowGraph;
use crate::ir::function::PointerRoot;
use crate::ir::{
    AnyEntity, BindingKind, Block, BuiltIn, Constant, ConstantData, DebugLocal, DebugScope,
    DebugScopeData, DebugTarget, DebugVarRef, DecorationGroup, DecorationKind, Func,
    FunctionData, GlobalVar, Inst, InstData, Linkage, Module, Opcode, Operand, StorageClass,
    Type, TypeData,
};
use crate::packed_option::PackedOption;
use crate::structure::{Construct, StructureTree};
use crate::timing;
use crate::trace;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Configuration of the pass.
///
/// All flags widen what is kept; the default configuration is the most aggressive one.
#[derive(Clone, Debug, Default)]
pub struct AdceFlags {
    /// Keep resource variables carrying `DescriptorSet`/`Binding` decorations even when no
    /// live code references them, so external binding contracts stay stable.
    pub preserve_bindings: bool,
    /// Keep all specialization constants regardless of use.
    pub preserve_spec_constants: bool,
    /// Keep all entry-point interface variables regardless of liveness.
    pub preserve_interface: bool,
    /// Allow removal of dead `Output`-class interface variables (on module versions that
    /// permit interface rewriting at all).
    pub remove_dead_outputs: bool,
}

/// The outcome of a pass invocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PassStatus {
    /// The module was rewritten.
    Changed,
    /// The module was already at the pass's fixed point.
    Unchanged,
}

/// Perform aggressive dead code elimination on `module`.
pub fn do_adce(module: &mut Module, flags: &AdceFlags) -> PassStatus {
    let _tt = timing::adce();
    let mut changed = false;

    let call_graph = CallGraph::with_module(module);

    // Module-scope variables with any syntactic read in reachable code. Stores to such a
    // variable are never candidates for removal.
    let observed_globals = collect_observed_globals(module, &call_graph);

    // Function-local storage referenced by declare-style debug records; counts as observed.
    let debug_observed = collect_debug_observed(module);

    // Liveness, one fixed point per reachable function.
    let mut func_live: FxHashMap<Func, FuncLiveness> = FxHashMap::default();
    for &func in &module.func_order {
        if call_graph.is_reachable(func) {
            let liveness =
                analyze_function(module, func, &call_graph, &observed_globals, &debug_observed);
            func_live.insert(func, liveness);
        }
    }

    // Rewrite function bodies.
    for (&func, liveness) in func_live.iter_mut() {
        changed |= sweep_function(&mut module.functions[func], &mut liveness.live);
    }

    // Functions still reachable through the calls that survived the sweep.
    let retained_funcs = post_sweep_reachable(module);
    let before = module.func_order.len();
    module.func_order.retain(|f| retained_funcs.contains(f));
    changed |= module.func_order.len() != before;

    // References made by live code in retained functions.
    let mut used_vars: FxHashSet<GlobalVar> = FxHashSet::default();
    let mut used_consts: FxHashSet<Constant> = FxHashSet::default();
    for (func, liveness) in &func_live {
        if retained_funcs.contains(func) {
            used_vars.extend(liveness.used_vars.iter().copied());
            used_consts.extend(liveness.used_consts.iter().copied());
        }
    }

    changed |= sweep_module(module, flags, &retained_funcs, used_vars, used_consts);

    if changed {
        PassStatus::Changed
    } else {
        PassStatus::Unchanged
    }
}

// ----------------------------------------------------------------------------------------
// Liveness analysis.

struct FuncLiveness {
    live: EntitySet<Inst>,
    used_vars: FxHashSet<GlobalVar>,
    used_consts: FxHashSet<Constant>,
}

struct Liveness<'a> {
    func: &'a FunctionData,
    tree: StructureTree,
    block_of: SecondaryMap<Inst, PackedOption<Block>>,
    merge_to_construct: FxHashMap<Inst, Construct>,
    local_writers: FxHashMap<Inst, Vec<Inst>>,
    observed_locals: FxHashSet<Inst>,
    live_loops: FxHashSet<Construct>,
    live: EntitySet<Inst>,
    worklist: Vec<Inst>,
    used_vars: FxHashSet<GlobalVar>,
    used_consts: FxHashSet<Constant>,
}

impl<'a> Liveness<'a> {
    fn mark(&mut self, inst: Inst) {
        if !self.live.contains(inst) {
            self.live.insert(inst);
            self.worklist.push(inst);
        }
    }

    fn observe(&mut self, ptr: Operand) {
        match self.func.pointer_root(ptr) {
            PointerRoot::Local(var) => self.observe_local(var),
            PointerRoot::Global(var) => {
                self.used_vars.insert(var);
            }
            PointerRoot::Unknown => {}
        }
    }

    /// Record that `var`'s contents are read by live code: the declaration and every write to
    /// it become live.
    fn observe_local(&mut self, var: Inst) {
        if !self.observed_locals.insert(var) {
            return;
        }
        self.mark(var);
        let writers: SmallVec<[Inst; 4]> = self
            .local_writers
            .get(&var)
            .map(|w| w.iter().copied().collect())
            .unwrap_or_default();
        for writer in writers {
            self.mark(writer);
        }
    }

    /// A live loop keeps its break and continue branches even when their blocks hold nothing
    /// else live; removing them would break the structured shape.
    fn mark_loop_live(&mut self, construct: Construct) {
        if !self.live_loops.insert(construct) {
            return;
        }
        let func = self.func;
        let (merge, cont) = {
            let data = self.tree.data(construct);
            (data.merge, data.cont.expand())
        };
        let mut to_mark: SmallVec<[Inst; 8]> = SmallVec::new();
        if let Some(cont) = cont {
            if let Some(term) = func.terminator(cont) {
                to_mark.push(term);
            }
        }
        for &block in func.block_order() {
            if !self.tree.is_in_construct(block, construct) {
                continue;
            }
            if let Some(term) = func.terminator(block) {
                let exits = func[term]
                    .branch_targets()
                    .iter()
                    .any(|&dest| dest == merge || Some(dest) == cont);
                if exits {
                    to_mark.push(term);
                }
            }
        }
        for inst in to_mark {
            self.mark(inst);
        }
    }

    fn process(&mut self, inst: Inst) {
        let func = self.func;
        let data = &func[inst];

        // Def-use: everything a live instruction reads is live.
        data.visit_operands(|op| match op {
            Operand::Inst(def) => self.mark(def),
            Operand::Constant(c) => {
                self.used_consts.insert(c);
            }
            Operand::Var(v) => {
                self.used_vars.insert(v);
            }
        });

        match *data {
            InstData::Variable { init: Some(c) } => {
                self.used_consts.insert(c);
            }
            // A live read makes the storage it reads observed.
            InstData::Load { ptr } => self.observe(ptr),
            InstData::CopyMemory { src, .. } => self.observe(src),
            InstData::Atomic { ptr, .. } => self.observe(ptr),
            // A live phi needs every incoming edge to stay an edge.
            InstData::Phi { ref edges } => {
                let preds: SmallVec<[Block; 4]> = edges.iter().map(|&(_, block)| block).collect();
                for pred in preds {
                    if let Some(term) = func.terminator(pred) {
                        self.mark(term);
                    }
                }
            }
            _ => {}
        }

        if let Some(block) = self.block_of[inst].expand() {
            // A live terminator keeps the merge marker paired with it; the constructs must
            // stay well formed.
            if func.terminator(block) == Some(inst) {
                if let Some(merge) = func.merge_inst(block) {
                    self.mark(merge);
                }
            }
            // Control dependence: the decision of every enclosing construct is live.
            let chain: SmallVec<[Construct; 4]> = self.tree.enclosing_chain(block).collect();
            for construct in chain {
                let header = self.tree.data(construct).header;
                if let Some(merge) = func.merge_inst(header) {
                    self.mark(merge);
                }
                if let Some(term) = func.terminator(header) {
                    self.mark(term);
                }
            }
        }

        if let InstData::LoopMerge { .. } = *data {
            if let Some(&construct) = self.merge_to_construct.get(&inst) {
                self.mark_loop_live(construct);
            }
        }
    }
}

fn analyze_function(
    module: &Module,
    func: Func,
    call_graph: &CallGraph,
    observed_globals: &FxHashSet<GlobalVar>,
    debug_observed: &FxHashSet<(Func, Inst)>,
) -> FuncLiveness {
    let func_data = &module.functions[func];
    let tree = StructureTree::with_function(func_data);

    let mut block_of: SecondaryMap<Inst, PackedOption<Block>> = SecondaryMap::new();
    for (block, inst) in func_data.layout_insts() {
        block_of[inst] = Some(block).into();
    }

    let mut merge_to_construct: FxHashMap<Inst, Construct> = FxHashMap::default();
    for construct in tree.constructs() {
        if let Some(merge) = func_data.merge_inst(tree.data(construct).header) {
            merge_to_construct.insert(merge, construct);
        }
    }

    let mut local_writers: FxHashMap<Inst, Vec<Inst>> = FxHashMap::default();
    let mut has_calls = false;
    for (_, inst) in func_data.layout_insts() {
        match func_data[inst] {
            InstData::Store { ptr, .. } | InstData::CopyMemory { dst: ptr, .. } => {
                if let PointerRoot::Local(var) = func_data.pointer_root(ptr) {
                    local_writers.entry(var).or_default().push(inst);
                }
            }
            InstData::Call { .. } => has_calls = true,
            _ => {}
        }
    }

    let is_entry = module.is_entry_point(func);

    let mut ctx = Liveness {
        func: func_data,
        tree,
        block_of,
        merge_to_construct,
        local_writers,
        observed_locals: FxHashSet::default(),
        live_loops: FxHashSet::default(),
        live: EntitySet::new(),
        worklist: Vec::new(),
        used_vars: FxHashSet::default(),
        used_consts: FxHashSet::default(),
    };

    // Seeds: instructions live on their own authority.
    for (_, inst) in func_data.layout_insts() {
        if is_seed(
            module,
            func_data,
            inst,
            is_entry,
            has_calls,
            observed_globals,
            call_graph,
        ) {
            ctx.mark(inst);
        }
    }
    for &param in &func_data.params {
        ctx.mark(param);
    }

    // Storage whose address escapes the analysis is treated as read.
    let mut escaped: SmallVec<[Inst; 4]> = SmallVec::new();
    for (_, inst) in func_data.layout_insts() {
        for_each_escaping_operand(&func_data[inst], |op| {
            if let PointerRoot::Local(var) = func_data.pointer_root(op) {
                escaped.push(var);
            }
        });
    }
    for var in escaped {
        ctx.observe_local(var);
    }

    // Declare-style debug records observe the storage they describe.
    for &(owner, storage) in debug_observed {
        if owner == func {
            ctx.observe_local(storage);
        }
    }

    while let Some(inst) = ctx.worklist.pop() {
        ctx.process(inst);
    }

    FuncLiveness {
        live: ctx.live,
        used_vars: ctx.used_vars,
        used_consts: ctx.used_consts,
    }
}

/// Is `inst` live independent of whether its result is consumed?
fn is_seed(
    module: &Module,
    func_data: &FunctionData,
    inst: Inst,
    is_entry: bool,
    has_calls: bool,
    observed_globals: &FxHashSet<GlobalVar>,
    call_graph: &CallGraph,
) -> bool {
    let data = &func_data[inst];
    let opcode = data.opcode();
    if opcode.is_atomic()
        || opcode.is_barrier()
        || opcode.is_primitive_output()
        || opcode.is_control_effect()
    {
        return true;
    }
    match *data {
        // Calls may have effects the result does not show. Only a callee proven effect-free
        // lets the call's liveness be decided by its result.
        InstData::Call { callee, .. } => {
            call_graph.summary(callee) == EffectSummary::MayHaveSideEffects
        }
        InstData::Store { ptr, .. } | InstData::CopyMemory { dst: ptr, .. } => {
            store_is_seed(module, func_data, ptr, is_entry, has_calls, observed_globals)
        }
        _ => false,
    }
}

/// Must a write through `ptr` be retained regardless of liveness?
fn store_is_seed(
    module: &Module,
    func_data: &FunctionData,
    ptr: Operand,
    is_entry: bool,
    has_calls: bool,
    observed_globals: &FxHashSet<GlobalVar>,
) -> bool {
    match func_data.pointer_root(ptr) {
        // Can't tell what this writes; keep it.
        PointerRoot::Unknown => true,
        // Writes to locals are live exactly when the variable is observed; that is decided
        // during propagation, not here.
        PointerRoot::Local(_) => false,
        PointerRoot::Global(var) => {
            let storage = module.global_vars[var].storage;
            if storage.writes_are_observable() {
                return true;
            }
            if storage.is_module_local() {
                // A module-local store is removable only in an entry point without calls;
                // a call could read the variable through any callee.
                if !is_entry || has_calls {
                    return true;
                }
                return observed_globals.contains(&var);
            }
            // Writes to read-only classes are malformed input; keep them and let the
            // external validator complain.
            true
        }
    }
}

/// Visit the operands of `inst` through which a pointer could escape the def-use analysis:
/// every position that is neither a dereference nor a branch argument.
fn for_each_escaping_operand(data: &InstData, mut f: impl FnMut(Operand)) {
    match data {
        InstData::Nullary { .. }
        | InstData::Undef
        | InstData::Variable { .. }
        | InstData::Param { .. }
        | InstData::SelectionMerge { .. }
        | InstData::LoopMerge { .. }
        | InstData::Jump { .. }
        | InstData::Return
        | InstData::Kill
        | InstData::Unreachable
        // Dereferencing positions do not leak the pointer itself.
        | InstData::Load { .. }
        | InstData::CopyMemory { .. } => {}
        InstData::Store { value, .. } => f(*value),
        InstData::AccessChain { indices, .. } => {
            for &index in indices {
                f(index);
            }
        }
        InstData::Atomic { operands, .. } => {
            for &op in operands {
                f(op);
            }
        }
        _ => data.visit_operands(f),
    }
}

/// Module-scope variables read anywhere in reachable code.
fn collect_observed_globals(module: &Module, call_graph: &CallGraph) -> FxHashSet<GlobalVar> {
    let mut observed = FxHashSet::default();
    for &func in &module.func_order {
        if !call_graph.is_reachable(func) {
            continue;
        }
        let func_data = &module.functions[func];
        let mut note = |op: Operand| {
            if let PointerRoot::Global(var) = func_data.pointer_root(op) {
                observed.insert(var);
            }
        };
        for (_, inst) in func_data.layout_insts() {
            let data = &func_data[inst];
            match *data {
                InstData::Load { ptr } => note(ptr),
                InstData::CopyMemory { src, .. } => note(src),
                InstData::Atomic { ptr, .. } => note(ptr),
                _ => {}
            }
            for_each_escaping_operand(data, &mut note);
        }
    }
    observed
}

/// Function-local storage observed by declare-style debug records.
fn collect_debug_observed(module: &Module) -> FxHashSet<(Func, Inst)> {
    module
        .debug_info
        .bindings
        .iter()
        .filter(|b| matches!(b.kind, BindingKind::Declare | BindingKind::ValueDeref))
        .filter_map(|b| match b.target {
            DebugTarget::LocalStorage(storage) => Some((b.func, storage)),
            DebugTarget::Value(_) => None,
        })
        .collect()
}

// ----------------------------------------------------------------------------------------
// Sweeping.

/// Remove everything unmarked from `func` and repair control flow. Returns whether anything
/// changed.
fn sweep_function(func: &mut FunctionData, live: &mut EntitySet<Inst>) -> bool {
    let mut changed = false;
    let blocks: Vec<Block> = func.block_order().to_vec();

    // A dead merge marker means nothing inside its construct was live: collapse the whole
    // construct by branching straight to the merge block.
    for &block in &blocks {
        let marker = match func.merge_inst(block) {
            Some(marker) => marker,
            None => continue,
        };
        if live.contains(marker) {
            continue;
        }
        let dest = match func[marker] {
            InstData::SelectionMerge { merge } | InstData::LoopMerge { merge, .. } => merge,
            _ => unreachable!("merge_inst returned a non-merge instruction"),
        };
        trace!("collapsing dead construct at {} to {}", block, dest);
        let jump = func.replace_terminator(block, InstData::Jump { dest });
        live.insert(jump);
        changed = true;
    }

    // Every remaining terminator is structural: a block must end in one, and edges into
    // still-reachable code must survive even from blocks with no live contents. Dead
    // terminators in dead regions disappear with their blocks below.
    for &block in &blocks {
        if let Some(term) = func.terminator(block) {
            live.insert(term);
        }
    }

    // Drop dead instructions.
    for &block in &blocks {
        let before = func.block_insts(block).len();
        func.retain_block_insts(block, |inst| live.contains(inst));
        changed |= func.block_insts(block).len() != before;
    }

    // Drop blocks that the collapsed control flow no longer reaches.
    let entry = match func.entry_block() {
        Some(entry) => entry,
        None => return changed,
    };
    let cfg = ControlFlowGraph::with_function(func);
    let reachable = cfg.reachable_from(entry);
    let before = func.block_order().len();
    func.retain_blocks(|block| reachable.contains(&block));
    changed |= func.block_order().len() != before;

    // Phis keep one edge per remaining predecessor.
    let cfg = ControlFlowGraph::with_function(func);
    let blocks: Vec<Block> = func.block_order().to_vec();
    for &block in &blocks {
        let phis: Vec<Inst> = func
            .block_insts(block)
            .iter()
            .copied()
            .filter(|&inst| func[inst].opcode() == Opcode::Phi)
            .collect();
        for phi in phis {
            if let InstData::Phi { edges } = func.inst_mut(phi) {
                let before = edges.len();
                edges.retain(|&mut (_, pred)| cfg.is_predecessor(pred, block));
                changed |= edges.len() != before;
            }
        }
    }

    changed
}

/// Functions reachable from entry points and exports through calls that survived the sweep.
fn post_sweep_reachable(module: &Module) -> FxHashSet<Func> {
    let mut retained: FxHashSet<Func> = FxHashSet::default();
    let mut stack: Vec<Func> = Vec::new();
    let push = |retained: &mut FxHashSet<Func>, stack: &mut Vec<Func>, func: Func| {
        if retained.insert(func) {
            stack.push(func);
        }
    };
    for ep in &module.entry_points {
        push(&mut retained, &mut stack, ep.func);
    }
    for &func in &module.func_order {
        if module.functions[func].linkage == Some(Linkage::Export) {
            push(&mut retained, &mut stack, func);
        }
    }
    while let Some(func) = stack.pop() {
        for (_, inst) in module.functions[func].layout_insts() {
            if let InstData::Call { callee, .. } = module.functions[func][inst] {
                push(&mut retained, &mut stack, callee);
            }
        }
    }
    retained
}

struct Survivors {
    funcs: FxHashSet<Func>,
    vars: FxHashSet<GlobalVar>,
    consts: FxHashSet<Constant>,
    types: FxHashSet<Type>,
    blocks: FxHashSet<(Func, Block)>,
    insts: FxHashSet<(Func, Inst)>,
    groups: FxHashSet<DecorationGroup>,
}

impl Survivors {
    fn survives(&self, target: &AnyEntity) -> bool {
        match *target {
            AnyEntity::Func(f) => self.funcs.contains(&f),
            AnyEntity::GlobalVar(v) => self.vars.contains(&v),
            AnyEntity::Constant(c) => self.consts.contains(&c),
            AnyEntity::Type(t) => self.types.contains(&t),
            AnyEntity::Block(f, b) => self.blocks.contains(&(f, b)),
            AnyEntity::Inst(f, i) => self.insts.contains(&(f, i)),
            AnyEntity::Group(g) => self.groups.contains(&g),
        }
    }
}

/// Module-level sweeps: variables, constants, annotations, names, debug info.
fn sweep_module(
    module: &mut Module,
    flags: &AdceFlags,
    retained_funcs: &FxHashSet<Func>,
    used_vars: FxHashSet<GlobalVar>,
    used_consts: FxHashSet<Constant>,
) -> bool {
    let mut changed = false;

    // Which module-scope variables stay declared.
    let keep_vars = decide_kept_vars(module, flags, retained_funcs, used_vars);
    let before = module.var_order.len();
    module.var_order.retain(|var| keep_vars.contains(var));
    if module.var_order.len() != before {
        trace!("removed {} module-scope variables", before - module.var_order.len());
        changed = true;
    }
    for ep in &mut module.entry_points {
        let before = ep.interface.len();
        ep.interface.retain(|var| keep_vars.contains(var));
        changed |= ep.interface.len() != before;
    }

    // Which constants stay declared.
    let live_consts = decide_live_consts(module, flags, retained_funcs, used_consts);

    // Types referenced by what remains; used to narrow member decorations. The type table
    // itself is never swept.
    let used_types = collect_used_types(module, &live_consts);

    let mut survivors = Survivors {
        funcs: retained_funcs.clone(),
        vars: module.var_order.iter().copied().collect(),
        consts: live_consts.iter().copied().collect(),
        types: used_types,
        blocks: FxHashSet::default(),
        insts: FxHashSet::default(),
        groups: FxHashSet::default(),
    };
    for &func in &module.func_order {
        for &block in module.functions[func].block_order() {
            survivors.blocks.insert((func, block));
        }
        for (_, inst) in module.functions[func].layout_insts() {
            survivors.insts.insert((func, inst));
        }
        for &param in &module.functions[func].params {
            survivors.insts.insert((func, param));
        }
    }

    // Narrow decoration groups to their surviving targets; a group with none left goes away.
    let group_order: Vec<DecorationGroup> = module.annotations.group_order.clone();
    for group in group_order {
        let data = &mut module.annotations.groups[group];
        let before = data.targets.len() + data.member_targets.len();
        data.targets.retain(|target| survivors.survives(target));
        let types = &survivors.types;
        data.member_targets.retain(|&(ty, _)| types.contains(&ty));
        changed |= data.targets.len() + data.member_targets.len() != before;
        if data.targets.is_empty() && data.member_targets.is_empty() {
            trace!("removing empty decoration {}", group);
        } else {
            survivors.groups.insert(group);
        }
    }
    let before = module.annotations.group_order.len();
    let surviving_groups = &survivors.groups;
    module
        .annotations
        .group_order
        .retain(|group| surviving_groups.contains(group));
    changed |= module.annotations.group_order.len() != before;

    // Direct decorations die with their targets.
    let before = module.annotations.decorations.len();
    module
        .annotations
        .decorations
        .retain(|ann| survivors.survives(&ann.target));
    changed |= module.annotations.decorations.len() != before;

    // Constants.
    changed |= module.constants.retain(|c| live_consts.contains(&c)) > 0;

    // Names die with their targets; block labels survive as long as their block does.
    let before = module.names.len();
    module.names.retain(|entity| survivors.survives(entity));
    changed |= module.names.len() != before;

    changed |= sweep_debug_info(module, &survivors);

    changed
}

fn decide_kept_vars(
    module: &Module,
    flags: &AdceFlags,
    retained_funcs: &FxHashSet<Func>,
    used_vars: FxHashSet<GlobalVar>,
) -> FxHashSet<GlobalVar> {
    let mut keep = used_vars;

    for ann in &module.annotations.decorations {
        if let AnyEntity::GlobalVar(var) = ann.target {
            match ann.kind {
                // The fixed workgroup dimensions are module metadata consumers rely on.
                DecorationKind::BuiltIn(BuiltIn::WorkgroupSize) => {
                    keep.insert(var);
                }
                DecorationKind::DescriptorSet(_) | DecorationKind::Binding(_)
                    if flags.preserve_bindings =>
                {
                    keep.insert(var);
                }
                _ => {}
            }
        }
    }
    if flags.preserve_bindings {
        for &group in &module.annotations.group_order {
            let data = &module.annotations.groups[group];
            let is_binding = data.decorations.iter().any(|k| {
                matches!(
                    k,
                    DecorationKind::DescriptorSet(_) | DecorationKind::Binding(_)
                )
            });
            if is_binding {
                for target in &data.targets {
                    if let AnyEntity::GlobalVar(var) = target {
                        keep.insert(*var);
                    }
                }
            }
        }
    }

    let interface_listed: FxHashSet<GlobalVar> = module
        .entry_points
        .iter()
        .flat_map(|ep| ep.interface.iter().copied())
        .collect();
    if flags.preserve_interface {
        keep.extend(interface_listed.iter().copied());
    }
    for &var in &module.var_order {
        if keep.contains(&var) {
            continue;
        }
        let storage = module.global_vars[var].storage;
        if storage.is_interface() || interface_listed.contains(&var) {
            if !module.version.allows_interface_removal() {
                // The interface list is fixed at this version; the declaration stays.
                keep.insert(var);
            } else if storage == StorageClass::Output && !flags.remove_dead_outputs {
                keep.insert(var);
            }
        }
    }

    // Id-referencing decorations on surviving targets keep the variable they reference.
    loop {
        let mut grew = false;
        for ann in &module.annotations.decorations {
            if let Some(referenced) = ann.kind.referenced_var() {
                let target_alive = match ann.target {
                    AnyEntity::GlobalVar(v) => keep.contains(&v),
                    AnyEntity::Func(f) => retained_funcs.contains(&f),
                    _ => true,
                };
                if target_alive {
                    grew |= keep.insert(referenced);
                }
            }
        }
        if !grew {
            break;
        }
    }

    keep
}

fn decide_live_consts(
    module: &Module,
    flags: &AdceFlags,
    retained_funcs: &FxHashSet<Func>,
    used_consts: FxHashSet<Constant>,
) -> FxHashSet<Constant> {
    let mut roots = used_consts;

    for &var in &module.var_order {
        if let Some(init) = module.global_vars[var].init {
            roots.insert(init);
        }
    }
    if flags.preserve_spec_constants {
        for c in module.constants.iter() {
            if module.constants.get(c).is_spec() {
                roots.insert(c);
            }
        }
    }
    for ann in &module.annotations.decorations {
        if let DecorationKind::BuiltIn(BuiltIn::WorkgroupSize) = ann.kind {
            if let AnyEntity::Constant(c) = ann.target {
                roots.insert(c);
            }
        }
        if let Some(referenced) = ann.kind.referenced_constant() {
            let target_alive = match ann.target {
                AnyEntity::GlobalVar(v) => module.var_order.contains(&v),
                AnyEntity::Func(f) => retained_funcs.contains(&f),
                _ => true,
            };
            if target_alive {
                roots.insert(referenced);
            }
        }
    }
    for &group in &module.annotations.group_order {
        let data = &module.annotations.groups[group];
        let has_live_target = data.targets.iter().any(|t| match *t {
            AnyEntity::GlobalVar(v) => module.var_order.contains(&v),
            AnyEntity::Func(f) => retained_funcs.contains(&f),
            _ => true,
        }) || !data.member_targets.is_empty();
        if has_live_target {
            for kind in &data.decorations {
                if let Some(referenced) = kind.referenced_constant() {
                    roots.insert(referenced);
                }
            }
        }
    }

    module
        .constants
        .transitive_closure(roots)
        .into_iter()
        .collect()
}

/// Types referenced from surviving declarations, closed over component types. Forward pointer
/// declarations always count as used.
fn collect_used_types(module: &Module, live_consts: &FxHashSet<Constant>) -> FxHashSet<Type> {
    let mut used = FxHashSet::default();
    for ty in module.types.keys() {
        if matches!(module.types.get(ty), TypeData::ForwardPointer { .. }) {
            expand_type(module, ty, &mut used);
        }
    }
    for &var in &module.var_order {
        expand_type(module, module.global_vars[var].ty, &mut used);
    }
    for &func in &module.func_order {
        let func_data = &module.functions[func];
        expand_type(module, func_data.ret_type, &mut used);
        for &param in &func_data.params {
            if let Some(ty) = func_data.result_type(param) {
                expand_type(module, ty, &mut used);
            }
        }
        for (_, inst) in func_data.layout_insts() {
            if let Some(ty) = func_data.result_type(inst) {
                expand_type(module, ty, &mut used);
            }
        }
    }
    for &c in live_consts {
        match *module.constants.get(c) {
            ConstantData::Scalar { ty, .. }
            | ConstantData::Composite { ty, .. }
            | ConstantData::SpecOp { ty, .. }
            | ConstantData::Null { ty } => expand_type(module, ty, &mut used),
            ConstantData::Bool { .. } => {}
        }
    }
    used
}

fn expand_type(module: &Module, ty: Type, used: &mut FxHashSet<Type>) {
    if !used.insert(ty) {
        return;
    }
    match *module.types.get(ty) {
        TypeData::Void | TypeData::Bool | TypeData::Int { .. } | TypeData::Float { .. } => {}
        TypeData::Vector { elem, .. } => expand_type(module, elem, used),
        TypeData::Struct { ref members } => {
            for &member in members {
                expand_type(module, member, used);
            }
        }
        TypeData::Pointer { pointee, .. } => expand_type(module, pointee, used),
        TypeData::ForwardPointer { .. } => {
            if let Some(pointee) = module.types.forward_pointee(ty) {
                expand_type(module, pointee, used);
            }
        }
    }
}

/// Debug-info scrubbing: sentinel rewriting, binding retention, scope reference counting.
fn sweep_debug_info(module: &mut Module, survivors: &Survivors) -> bool {
    let mut changed = false;

    // A descriptor outlives its variable; only the location information is lost.
    for record in &mut module.debug_info.globals {
        if let DebugVarRef::Var(var) = record.var {
            if !survivors.vars.contains(&var) {
                record.var = DebugVarRef::InfoNone;
                changed = true;
            }
        }
    }

    let before = module.debug_info.bindings.len();
    module.debug_info.bindings.retain(|binding| {
        if !survivors.funcs.contains(&binding.func) {
            return false;
        }
        match binding.target {
            DebugTarget::LocalStorage(storage) => {
                survivors.insts.contains(&(binding.func, storage))
            }
            DebugTarget::Value(op) => match op {
                Operand::Inst(inst) => survivors.insts.contains(&(binding.func, inst)),
                Operand::Constant(c) => survivors.consts.contains(&c),
                Operand::Var(v) => survivors.vars.contains(&v),
            },
        }
    });
    changed |= module.debug_info.bindings.len() != before;

    // Local descriptors with no surviving binding go away.
    let used_locals: FxHashSet<DebugLocal> = module
        .debug_info
        .bindings
        .iter()
        .map(|b| b.local)
        .collect();
    let before = module.debug_info.local_order.len();
    module
        .debug_info
        .local_order
        .retain(|local| used_locals.contains(local));
    changed |= module.debug_info.local_order.len() != before;

    // Scopes are reference counted through their parents: a lexical block stays as long as
    // any surviving record, or any surviving scope, still points at it.
    let mut live_scopes: FxHashSet<DebugScope> = FxHashSet::default();
    let mark_with_parents = |scopes: &crate::entity::PrimaryMap<DebugScope, DebugScopeData>,
                                 live: &mut FxHashSet<DebugScope>,
                                 mut scope: DebugScope| {
        loop {
            if !live.insert(scope) {
                break;
            }
            match scopes[scope].parent() {
                Some(parent) => scope = parent,
                None => break,
            }
        }
    };
    for &scope in &module.debug_info.scope_order {
        match module.debug_info.scopes[scope] {
            // Top-level records are never subject to the sweep.
            DebugScopeData::CompilationUnit { .. } => {
                live_scopes.insert(scope);
            }
            DebugScopeData::Function { func, .. } => {
                if survivors.funcs.contains(&func) {
                    mark_with_parents(&module.debug_info.scopes, &mut live_scopes, scope);
                }
            }
            DebugScopeData::LexicalBlock { .. } => {}
        }
    }
    for record in &module.debug_info.globals {
        mark_with_parents(&module.debug_info.scopes, &mut live_scopes, record.scope);
    }
    for &local in &module.debug_info.local_order {
        mark_with_parents(
            &module.debug_info.scopes,
            &mut live_scopes,
            module.debug_info.locals[local].scope,
        );
    }
    let before = module.debug_info.scope_order.len();
    module
        .debug_info
        .scope_order
        .retain(|scope| live_scopes.contains(scope));
    changed |= module.debug_info.scope_order.len() != before;

    changed
}
