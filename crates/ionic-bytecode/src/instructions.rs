//! Instruction words for macro bytecode.
//!
//! Every instruction is one `u32`:
//! - Bits 31-24: operation ([`Op`])
//! - Bits 23-0: data (length, index, inline value or address)
//!
//! Some operations are followed by operand words (see [`Op::operands`]).
//! Container and argument starts carry the number of instructions strictly
//! between them and their matching end marker once finalized.

use std::fmt;

/// Operation field of an instruction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Op {
    /// `null`.
    NullNull = 0x01,
    /// Typed null; data is an `IonType` code.
    NullTyped = 0x02,
    /// data is 0 or 1.
    Bool = 0x03,
    /// 24-bit signed integer held in the data field.
    SmallInt = 0x04,
    /// One operand: `i32`.
    InlineInt = 0x05,
    /// Two operands: high word, low word.
    InlineLong = 0x06,
    /// Two operands: high and low words of the `f64` bits.
    InlineDouble = 0x07,

    CpInt = 0x08,
    CpDecimal = 0x09,
    CpTimestamp = 0x0A,
    CpString = 0x0B,
    CpSymbol = 0x0C,
    CpBlob = 0x0D,
    CpClob = 0x0E,

    /// Symbol ID in the active symbol table.
    SymbolSid = 0x0F,
    /// Symbol ID in the system symbol table.
    SystemSymbol = 0x10,

    // Source references: data is the payload length, one operand holds the
    // payload offset in the source buffer.
    RefInt = 0x11,
    RefDecimal = 0x12,
    /// data is the short-form opcode instead of a length.
    RefShortTimestamp = 0x13,
    RefLongTimestamp = 0x14,
    RefString = 0x15,
    RefSymbol = 0x16,
    RefBlob = 0x17,
    RefClob = 0x18,

    ListStart = 0x20,
    SexpStart = 0x21,
    StructStart = 0x22,
    ContainerEnd = 0x23,

    FieldSid = 0x24,
    FieldSystemSid = 0x25,
    CpFieldName = 0x26,
    RefFieldName = 0x27,

    AnnotationSid = 0x28,
    AnnotationSystemSid = 0x29,
    CpAnnotation = 0x2A,
    RefAnnotation = 0x2B,

    /// Start of one argument; data counts its content.
    ArgStart = 0x30,
    ArgEnd = 0x31,
    /// Reference to parameter `data` of the enclosing macro.
    Parameter = 0x32,
    /// Invoke the macro held in constant `data`; its arguments precede it.
    InvokeCp = 0x33,
    /// Invoke the macro at address `data` of the active macro table.
    InvokeAddress = 0x34,
    /// Invoke system macro `data`.
    InvokeSystem = 0x35,

    Eof = 0x3F,
}

impl Op {
    /// Decode from the operation byte.
    ///
    /// Panics on bytes this crate never emits.
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x01 => Self::NullNull,
            0x02 => Self::NullTyped,
            0x03 => Self::Bool,
            0x04 => Self::SmallInt,
            0x05 => Self::InlineInt,
            0x06 => Self::InlineLong,
            0x07 => Self::InlineDouble,
            0x08 => Self::CpInt,
            0x09 => Self::CpDecimal,
            0x0A => Self::CpTimestamp,
            0x0B => Self::CpString,
            0x0C => Self::CpSymbol,
            0x0D => Self::CpBlob,
            0x0E => Self::CpClob,
            0x0F => Self::SymbolSid,
            0x10 => Self::SystemSymbol,
            0x11 => Self::RefInt,
            0x12 => Self::RefDecimal,
            0x13 => Self::RefShortTimestamp,
            0x14 => Self::RefLongTimestamp,
            0x15 => Self::RefString,
            0x16 => Self::RefSymbol,
            0x17 => Self::RefBlob,
            0x18 => Self::RefClob,
            0x20 => Self::ListStart,
            0x21 => Self::SexpStart,
            0x22 => Self::StructStart,
            0x23 => Self::ContainerEnd,
            0x24 => Self::FieldSid,
            0x25 => Self::FieldSystemSid,
            0x26 => Self::CpFieldName,
            0x27 => Self::RefFieldName,
            0x28 => Self::AnnotationSid,
            0x29 => Self::AnnotationSystemSid,
            0x2A => Self::CpAnnotation,
            0x2B => Self::RefAnnotation,
            0x30 => Self::ArgStart,
            0x31 => Self::ArgEnd,
            0x32 => Self::Parameter,
            0x33 => Self::InvokeCp,
            0x34 => Self::InvokeAddress,
            0x35 => Self::InvokeSystem,
            0x3F => Self::Eof,
            _ => panic!("invalid bytecode op: 0x{b:02X}"),
        }
    }

    /// Number of operand words following the instruction.
    pub fn operands(self) -> usize {
        match self {
            Self::InlineInt => 1,
            Self::InlineLong | Self::InlineDouble => 2,
            Self::RefInt
            | Self::RefDecimal
            | Self::RefShortTimestamp
            | Self::RefLongTimestamp
            | Self::RefString
            | Self::RefSymbol
            | Self::RefBlob
            | Self::RefClob
            | Self::RefFieldName
            | Self::RefAnnotation => 1,
            _ => 0,
        }
    }

    /// Instruction plus operands.
    pub fn width(self) -> usize {
        1 + self.operands()
    }

    /// Data field is a constant-pool index.
    pub fn is_constant_ref(self) -> bool {
        matches!(
            self,
            Self::CpInt
                | Self::CpDecimal
                | Self::CpTimestamp
                | Self::CpString
                | Self::CpSymbol
                | Self::CpBlob
                | Self::CpClob
                | Self::CpFieldName
                | Self::CpAnnotation
                | Self::InvokeCp
        )
    }

    pub fn is_container_start(self) -> bool {
        matches!(self, Self::ListStart | Self::SexpStart | Self::StructStart)
    }

    pub fn is_field_name(self) -> bool {
        matches!(
            self,
            Self::FieldSid | Self::FieldSystemSid | Self::CpFieldName | Self::RefFieldName
        )
    }

    pub fn is_annotation(self) -> bool {
        matches!(
            self,
            Self::AnnotationSid
                | Self::AnnotationSystemSid
                | Self::CpAnnotation
                | Self::RefAnnotation
        )
    }

    pub fn is_invocation(self) -> bool {
        matches!(
            self,
            Self::InvokeCp | Self::InvokeAddress | Self::InvokeSystem
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NullNull => "null",
            Self::NullTyped => "null_typed",
            Self::Bool => "bool",
            Self::SmallInt => "small_int",
            Self::InlineInt => "inline_int",
            Self::InlineLong => "inline_long",
            Self::InlineDouble => "inline_double",
            Self::CpInt => "cp_int",
            Self::CpDecimal => "cp_decimal",
            Self::CpTimestamp => "cp_timestamp",
            Self::CpString => "cp_string",
            Self::CpSymbol => "cp_symbol",
            Self::CpBlob => "cp_blob",
            Self::CpClob => "cp_clob",
            Self::SymbolSid => "symbol_sid",
            Self::SystemSymbol => "system_symbol",
            Self::RefInt => "ref_int",
            Self::RefDecimal => "ref_decimal",
            Self::RefShortTimestamp => "ref_short_timestamp",
            Self::RefLongTimestamp => "ref_long_timestamp",
            Self::RefString => "ref_string",
            Self::RefSymbol => "ref_symbol",
            Self::RefBlob => "ref_blob",
            Self::RefClob => "ref_clob",
            Self::ListStart => "list",
            Self::SexpStart => "sexp",
            Self::StructStart => "struct",
            Self::ContainerEnd => "end",
            Self::FieldSid => "field_sid",
            Self::FieldSystemSid => "field_system_sid",
            Self::CpFieldName => "cp_field",
            Self::RefFieldName => "ref_field",
            Self::AnnotationSid => "annotation_sid",
            Self::AnnotationSystemSid => "annotation_system_sid",
            Self::CpAnnotation => "cp_annotation",
            Self::RefAnnotation => "ref_annotation",
            Self::ArgStart => "arg",
            Self::ArgEnd => "arg_end",
            Self::Parameter => "parameter",
            Self::InvokeCp => "invoke_cp",
            Self::InvokeAddress => "invoke",
            Self::InvokeSystem => "invoke_system",
            Self::Eof => "eof",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One instruction word.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction(u32);

impl Instruction {
    pub const DATA_BITS: u32 = 24;
    pub const MAX_DATA: u32 = (1 << Self::DATA_BITS) - 1;
    pub const MIN_SMALL_INT: i64 = -(1 << (Self::DATA_BITS - 1));
    pub const MAX_SMALL_INT: i64 = (1 << (Self::DATA_BITS - 1)) - 1;

    #[inline]
    pub fn new(op: Op, data: u32) -> Self {
        debug_assert!(data <= Self::MAX_DATA, "data overflow: {data}");
        Self(((op as u32) << Self::DATA_BITS) | data)
    }

    /// Small integer packed into the data field.
    #[inline]
    pub fn small_int(value: i32) -> Self {
        debug_assert!((Self::MIN_SMALL_INT..=Self::MAX_SMALL_INT).contains(&(value as i64)));
        Self::new(Op::SmallInt, (value as u32) & Self::MAX_DATA)
    }

    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn op(self) -> Op {
        Op::from_byte((self.0 >> Self::DATA_BITS) as u8)
    }

    #[inline]
    pub fn data(self) -> u32 {
        self.0 & Self::MAX_DATA
    }

    /// Data field sign-extended from 24 bits.
    #[inline]
    pub fn signed_data(self) -> i32 {
        ((self.0 << 8) as i32) >> 8
    }

    /// Same operation with a new data field.
    #[inline]
    pub fn with_data(self, data: u32) -> Self {
        debug_assert!(data <= Self::MAX_DATA, "data overflow: {data}");
        Self((self.0 & !Self::MAX_DATA) | data)
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.op(), self.data())
    }
}

/// Split a 64-bit value into operand words, high word first.
#[inline]
pub fn split_u64(value: u64) -> [u32; 2] {
    [(value >> 32) as u32, value as u32]
}

/// Join operand words produced by [`split_u64`].
#[inline]
pub fn join_u64(high: u32, low: u32) -> u64 {
    ((high as u64) << 32) | low as u64
}
