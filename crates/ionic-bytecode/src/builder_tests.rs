use ionic_core::{Int, IonType};
use num_bigint::BigInt;

use crate::builder::BytecodeBuilder;
use crate::constants::Constant;
use crate::instructions::{Instruction, Op, join_u64};

fn ops(code: &[u32]) -> Vec<Op> {
    let mut out = Vec::new();
    let mut ip = 0;
    while ip < code.len() {
        let op = Instruction::from_raw(code[ip]).op();
        out.push(op);
        ip += op.width();
    }
    out
}

#[test]
fn integer_widths() {
    let mut b = BytecodeBuilder::new();
    b.i64(7);
    b.i64(Instruction::MIN_SMALL_INT);
    b.i64(1 << 30);
    b.i64(-(1 << 40));
    let (code, constants) = b.finish();

    assert_eq!(
        ops(&code),
        [Op::SmallInt, Op::SmallInt, Op::InlineInt, Op::InlineLong]
    );
    assert_eq!(code.len(), 1 + 1 + 2 + 3);
    assert_eq!(code[3], 1 << 30);
    assert_eq!(join_u64(code[5], code[6]) as i64, -(1 << 40));
    assert!(constants.is_empty());
}

#[test]
fn big_int_goes_to_pool() {
    let big = Int::from(BigInt::from(i64::MAX) * 4);
    let mut b = BytecodeBuilder::new();
    b.int(&big);
    let (code, constants) = b.finish();

    assert_eq!(ops(&code), [Op::CpInt]);
    assert_eq!(constants.get(0), Some(&Constant::Int(big)));
}

#[test]
fn nested_counts_are_patched() {
    let mut b = BytecodeBuilder::new();
    b.start(Op::ListStart);
    b.null(IonType::Null);
    b.start(Op::SexpStart);
    b.null(IonType::String);
    b.bool(true);
    b.end();
    b.end();
    let (code, _) = b.finish();

    let outer = Instruction::from_raw(code[0]);
    let inner = Instruction::from_raw(code[2]);
    assert_eq!(outer.data(), 5);
    assert_eq!(inner.data(), 2);
    assert_eq!(Instruction::from_raw(code[3]).data(), IonType::String.to_code() as u32);
    assert_eq!(
        ops(&code),
        [
            Op::ListStart,
            Op::NullNull,
            Op::SexpStart,
            Op::NullTyped,
            Op::Bool,
            Op::ContainerEnd,
            Op::ContainerEnd
        ]
    );
}

#[test]
fn argument_blocks_end_with_arg_end() {
    let mut b = BytecodeBuilder::new();
    b.start(Op::ArgStart);
    b.end();
    let (code, _) = b.finish();

    assert_eq!(ops(&code), [Op::ArgStart, Op::ArgEnd]);
    assert_eq!(Instruction::from_raw(code[0]).data(), 0);
}

#[test]
fn source_ref_layout() {
    let mut b = BytecodeBuilder::new();
    b.source_ref(Op::RefString, 1000, 12).unwrap();
    let (code, _) = b.finish();

    let insn = Instruction::from_raw(code[0]);
    assert_eq!(insn.op(), Op::RefString);
    assert_eq!(insn.data(), 12);
    assert_eq!(code[1], 1000);
}

#[test]
fn source_ref_too_long() {
    let mut b = BytecodeBuilder::new();
    let err = b
        .source_ref(Op::RefBlob, 0, Instruction::MAX_DATA as usize + 1)
        .unwrap_err();
    assert!(err.is_macro());
}

#[test]
#[should_panic(expected = "unterminated container")]
fn finish_with_open_container() {
    let mut b = BytecodeBuilder::new();
    b.start(Op::StructStart);
    b.finish();
}

#[test]
fn recycled_buffers_are_cleared() {
    let mut b = BytecodeBuilder::new();
    b.bool(false);
    b.constant(Op::CpString, Constant::String("x".into()));
    let (code, constants) = b.finish();

    let b = BytecodeBuilder::with_buffers(code, constants);
    assert!(b.is_empty());
    assert!(b.constants().is_empty());
}
