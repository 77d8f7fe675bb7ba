use crate::instructions::{Instruction, Op, join_u64, split_u64};

#[test]
fn op_byte_roundtrip() {
    let ops = [
        Op::NullNull,
        Op::InlineDouble,
        Op::CpClob,
        Op::SystemSymbol,
        Op::RefClob,
        Op::ContainerEnd,
        Op::RefFieldName,
        Op::RefAnnotation,
        Op::InvokeSystem,
        Op::Eof,
    ];
    for op in ops {
        assert_eq!(Op::from_byte(op as u8), op);
    }
}

#[test]
#[should_panic(expected = "invalid bytecode op")]
fn unknown_op_byte() {
    Op::from_byte(0x19);
}

#[test]
fn operand_counts() {
    assert_eq!(Op::SmallInt.width(), 1);
    assert_eq!(Op::InlineInt.width(), 2);
    assert_eq!(Op::InlineLong.width(), 3);
    assert_eq!(Op::InlineDouble.width(), 3);
    assert_eq!(Op::RefString.width(), 2);
    assert_eq!(Op::RefAnnotation.width(), 2);
    assert_eq!(Op::CpString.width(), 1);
    assert_eq!(Op::InvokeCp.width(), 1);
}

#[test]
fn small_int_sign_extension() {
    for v in [0, 1, -1, 12345, -12345, (1 << 23) - 1, -(1 << 23)] {
        let insn = Instruction::small_int(v);
        assert_eq!(insn.op(), Op::SmallInt);
        assert_eq!(insn.signed_data(), v);
    }
}

#[test]
fn with_data_keeps_op() {
    let insn = Instruction::new(Op::ListStart, 0).with_data(42);
    assert_eq!(insn.op(), Op::ListStart);
    assert_eq!(insn.data(), 42);
    assert_eq!(format!("{insn:?}"), "list(42)");
}

#[test]
fn split_join() {
    let v = 0x0123_4567_89AB_CDEFu64;
    let [hi, lo] = split_u64(v);
    assert_eq!(hi, 0x0123_4567);
    assert_eq!(lo, 0x89AB_CDEF);
    assert_eq!(join_u64(hi, lo), v);
}

#[test]
fn classification() {
    assert!(Op::StructStart.is_container_start());
    assert!(!Op::ArgStart.is_container_start());
    assert!(Op::CpFieldName.is_field_name());
    assert!(Op::AnnotationSystemSid.is_annotation());
    assert!(Op::InvokeAddress.is_invocation());
    assert!(Op::InvokeCp.is_constant_ref());
    assert!(!Op::InvokeAddress.is_constant_ref());
}
