//! Converting modules into text.
//!
//! The text form is for trace logging and test diagnostics; it is not a parseable format and
//! has no stability guarantees.

use crate::ir::{Func, FunctionData, InstData, Module, Operand};
use core::fmt::Write;

/// Write `func` into `s`, one instruction per line.
pub fn write_function(s: &mut String, module: &Module, func: Func) {
    let data = &module.functions[func];
    let name = module.names.get(func).unwrap_or("");
    let _ = writeln!(s, "{func} {name}:");
    for &param in &data.params {
        let _ = writeln!(s, "    {param} = param");
    }
    for &block in data.block_order() {
        let label = module.names.get((func, block)).unwrap_or("");
        let _ = writeln!(s, "  {block} {label}:");
        for &inst in data.block_insts(block) {
            let _ = write!(s, "    ");
            if data.result_type(inst).is_some() {
                let _ = write!(s, "{inst} = ");
            }
            write_inst_data(s, &data[inst]);
            let _ = writeln!(s);
        }
    }
}

fn write_inst_data(s: &mut String, data: &InstData) {
    let _ = write!(s, "{}", data.opcode());

    // Phi edges pair values with blocks; everything else prints operands then targets.
    if let InstData::Phi { edges } = data {
        for (i, (value, block)) in edges.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            let _ = write!(s, "{sep}[{value}, {block}]");
        }
        return;
    }

    let mut first = true;
    let mut sep = |s: &mut String| {
        let text = if first { " " } else { ", " };
        first = false;
        let _ = s.write_str(text);
    };

    if let InstData::Call { callee, .. } = data {
        sep(s);
        let _ = write!(s, "{callee}");
    }
    data.visit_operands(|op: Operand| {
        sep(s);
        let _ = write!(s, "{op}");
    });
    match data {
        InstData::SelectionMerge { merge } => {
            sep(s);
            let _ = write!(s, "{merge}");
        }
        InstData::LoopMerge { merge, cont } => {
            sep(s);
            let _ = write!(s, "{merge}, continue {cont}");
        }
        _ => {
            for dest in data.branch_targets() {
                sep(s);
                let _ = write!(s, "{dest}");
            }
        }
    }
}

/// Render `module` as text.
pub fn write_module(module: &Module) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "module {:?}", module.version);
    for c in module.constants.iter() {
        let _ = writeln!(s, "{c} = {:?}", module.constants.get(c));
    }
    for &var in &module.var_order {
        let data = &module.global_vars[var];
        let name = module.names.get(var).unwrap_or("");
        let _ = writeln!(s, "{var} {name} = variable {}", data.storage);
    }
    for ep in &module.entry_points {
        let _ = write!(s, "entry_point {:?} \"{}\" = {}", ep.stage, ep.name, ep.func);
        for var in &ep.interface {
            let _ = write!(s, ", {var}");
        }
        let _ = writeln!(s);
    }
    for &func in &module.func_order {
        write_function(&mut s, module, func);
    }
    s
}

/// Render one function's body as text without module context; handy in tracing.
pub fn display_inst(func_data: &FunctionData, inst: crate::ir::Inst) -> String {
    let mut s = String::new();
    if func_data.result_type(inst).is_some() {
        let _ = write!(s, "{inst} = ");
    }
    write_inst_data(&mut s, &func_data[inst]);
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncBuilder, Module, Stage, StorageClass, Version};

    #[test]
    fn renders_a_small_module() {
        let mut module = Module::new(Version::V1_4);
        let void = module.types.void();
        let f32t = module.types.f32_ty();
        let out = module.declare_var(StorageClass::Output, f32t);
        module.names.set(out, "color");

        let main = module.declare_func(void);
        {
            let mut b = FuncBuilder::new(&mut module.functions[main]);
            b.create_block();
            let x = b.undef(f32t);
            b.store(out, x);
            b.ret();
        }
        module.declare_entry_point(main, Stage::Fragment, "main", vec![out]);
        module.names.set(main, "main");

        let text = write_module(&module);
        assert!(text.contains("color"));
        assert!(text.contains("store"));
        assert!(text.contains("entry_point"));

        let inst = module.functions[main].block_insts(module.functions[main].entry_block().unwrap())[0];
        let line = display_inst(&module.functions[main], inst);
        assert!(line.contains("undef"));
    }
}
