//! Human-readable bytecode listing for debugging and tests.
//!
//! ```text
//! [constants]
//! C0 "abc"
//!
//! [code]
//!   00  list 3
//!   01    small_int 1
//!   ...
//! ```

use std::fmt::Write as _;

use ionic_core::Colors;

use crate::constants::{Constant, ConstantPool};
use crate::instructions::{Instruction, Op, join_u64};

/// Render `code` with its constant pool.
pub fn dump(code: &[u32], constants: &ConstantPool, colors: Colors) -> String {
    let mut out = String::new();
    if !constants.is_empty() {
        out.push_str("[constants]\n");
        for (i, c) in constants.iter().enumerate() {
            let _ = writeln!(out, "C{i} {}", format_constant(c));
        }
        out.push('\n');
    }
    out.push_str("[code]\n");
    dump_code(&mut out, code, constants, colors);
    out
}

/// Render instructions only, one per line.
pub fn dump_code(out: &mut String, code: &[u32], constants: &ConstantPool, colors: Colors) {
    let width = width_for_count(code.len());
    let mut depth = 0usize;
    let mut ip = 0;
    while ip < code.len() {
        let insn = Instruction::from_raw(code[ip]);
        let op = insn.op();
        if matches!(op, Op::ContainerEnd | Op::ArgEnd) {
            depth = depth.saturating_sub(1);
        }
        let indent = "  ".repeat(depth);
        let _ = write!(
            out,
            "  {dim}{ip:0width$}{reset}  {indent}{}",
            op.name(),
            dim = colors.dim,
            reset = colors.reset,
        );
        let operands = &code[(ip + 1).min(code.len())..(ip + op.width()).min(code.len())];
        format_operands(out, insn, operands, constants, colors);
        out.push('\n');
        if op.is_container_start() || op == Op::ArgStart {
            depth += 1;
        }
        ip += op.width();
    }
}

fn format_operands(
    out: &mut String,
    insn: Instruction,
    operands: &[u32],
    constants: &ConstantPool,
    colors: Colors,
) {
    let op = insn.op();
    let (n, r) = (colors.number, colors.reset);
    match op {
        Op::NullNull | Op::ContainerEnd | Op::ArgEnd | Op::Eof => {}
        Op::NullTyped => {
            let ty = ionic_core::IonType::from_code(insn.data() as u8)
                .map_or("?", ionic_core::IonType::as_str);
            let _ = write!(out, " {ty}");
        }
        Op::Bool => {
            let _ = write!(out, " {n}{}{r}", insn.data() != 0);
        }
        Op::SmallInt => {
            let _ = write!(out, " {n}{}{r}", insn.signed_data());
        }
        Op::InlineInt => {
            let _ = write!(out, " {n}{}{r}", operands[0] as i32);
        }
        Op::InlineLong => {
            let _ = write!(out, " {n}{}{r}", join_u64(operands[0], operands[1]) as i64);
        }
        Op::InlineDouble => {
            let v = f64::from_bits(join_u64(operands[0], operands[1]));
            let _ = write!(out, " {n}{v:?}{r}");
        }
        _ if op.operands() == 1 => {
            let _ = write!(out, " @{} len={}", operands[0], insn.data());
        }
        _ if op.is_constant_ref() => {
            let shown = constants
                .get(insn.data())
                .map_or_else(|| "<missing>".to_string(), format_constant);
            let _ = write!(
                out,
                " C{}  {dim}; {shown}{reset}",
                insn.data(),
                dim = colors.dim,
                reset = r
            );
        }
        _ => {
            let _ = write!(out, " {}", insn.data());
        }
    }
}

fn format_constant(c: &Constant) -> String {
    match c {
        Constant::Int(v) => v.to_string(),
        Constant::Decimal(d) => d.to_string(),
        Constant::Timestamp(t) => t.to_string(),
        Constant::String(s) => format!("{s:?}"),
        Constant::Symbol(sym) => format!("'{sym}'"),
        Constant::Blob(b) => format!("blob[{}]", b.len()),
        Constant::Clob(b) => format!("clob[{}]", b.len()),
        Constant::Macro(m) => format!("macro {}", m.name().unwrap_or("<anonymous>")),
    }
}

/// Digits needed to print indices below `count`.
pub fn width_for_count(count: usize) -> usize {
    let mut width = 2;
    let mut limit = 100;
    while count > limit {
        width += 1;
        limit *= 10;
    }
    width
}
