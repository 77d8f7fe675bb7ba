//! Opcode lookup tables for both protocol generations.
//!
//! Each table maps the first byte of an encoded value to its token category
//! and to where its payload length comes from. Built at compile time.

use ionic_core::wire::v1_1::SHORT_TIMESTAMP_LENGTHS;

/// Token category selected by an opcode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Category {
    Nop,
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    Timestamp,
    String,
    Symbol,
    Blob,
    Clob,
    List,
    Sexp,
    Struct,
    Annotations,
    VersionMarker,
    MacroInvocation,
    DelimitedEnd,
    Invalid,
}

/// Where the payload length of a value comes from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Length {
    /// Length is part of the opcode.
    Fixed(u8),
    /// A 1.0 VarUInt length follows the opcode.
    VarUInt,
    /// A 1.1 FlexUInt length follows the opcode.
    FlexUInt,
    /// Payload runs until a delimited-end marker.
    Delimited,
    /// Opcode-specific framing (e-expressions, annotations, SID forms).
    Special,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OpcodeInfo {
    pub category: Category,
    pub length: Length,
}

impl OpcodeInfo {
    const fn new(category: Category, length: Length) -> Self {
        Self { category, length }
    }

    const INVALID: Self = Self::new(Category::Invalid, Length::Fixed(0));
}

pub static OPCODES_1_0: [OpcodeInfo; 256] = build_1_0();
pub static OPCODES_1_1: [OpcodeInfo; 256] = build_1_1();

const fn classify_1_0(op: u8) -> OpcodeInfo {
    use Category::*;
    let t = op >> 4;
    let l = op & 0x0F;
    let length = match l {
        14 => Length::VarUInt,
        n => Length::Fixed(n),
    };
    match t {
        0x0 => match l {
            15 => OpcodeInfo::new(Null, Length::Fixed(0)),
            _ => OpcodeInfo::new(Nop, length),
        },
        0x1 => match l {
            0 | 1 => OpcodeInfo::new(Bool, Length::Fixed(0)),
            15 => OpcodeInfo::new(Null, Length::Fixed(0)),
            _ => OpcodeInfo::INVALID,
        },
        0x2..=0xD => {
            if l == 15 {
                return OpcodeInfo::new(Null, Length::Fixed(0));
            }
            let category = match t {
                0x2 | 0x3 => Int,
                0x4 => Float,
                0x5 => Decimal,
                0x6 => Timestamp,
                0x7 => Symbol,
                0x8 => String,
                0x9 => Clob,
                0xA => Blob,
                0xB => List,
                0xC => Sexp,
                _ => Struct,
            };
            // Sorted structs always carry an explicit length.
            if t == 0xD && l == 1 {
                return OpcodeInfo::new(Struct, Length::VarUInt);
            }
            OpcodeInfo::new(category, length)
        }
        0xE => match l {
            0 => OpcodeInfo::new(VersionMarker, Length::Fixed(3)),
            3..=14 => OpcodeInfo::new(Annotations, length),
            _ => OpcodeInfo::INVALID,
        },
        _ => OpcodeInfo::INVALID,
    }
}

const fn classify_1_1(op: u8) -> OpcodeInfo {
    use Category::*;
    use Length::*;
    let l = op & 0x0F;
    match op {
        0x00..=0x5F => OpcodeInfo::new(MacroInvocation, Special),
        0x60..=0x68 => OpcodeInfo::new(Int, Fixed(l)),
        0x6A => OpcodeInfo::new(Float, Fixed(0)),
        0x6B => OpcodeInfo::new(Float, Fixed(2)),
        0x6C => OpcodeInfo::new(Float, Fixed(4)),
        0x6D => OpcodeInfo::new(Float, Fixed(8)),
        0x6E | 0x6F => OpcodeInfo::new(Bool, Fixed(0)),
        0x70..=0x7F => OpcodeInfo::new(Decimal, Fixed(l)),
        0x80..=0x8C => OpcodeInfo::new(Timestamp, Fixed(SHORT_TIMESTAMP_LENGTHS[l as usize])),
        0x90..=0x9F => OpcodeInfo::new(String, Fixed(l)),
        0xA0..=0xAF => OpcodeInfo::new(Symbol, Fixed(l)),
        0xB0..=0xBF => OpcodeInfo::new(List, Fixed(l)),
        0xC0..=0xCF => OpcodeInfo::new(Sexp, Fixed(l)),
        0xD0 | 0xD2..=0xDF => OpcodeInfo::new(Struct, Fixed(l)),
        0xE0 => OpcodeInfo::new(VersionMarker, Fixed(3)),
        0xE1 => OpcodeInfo::new(Symbol, Fixed(1)),
        0xE2 => OpcodeInfo::new(Symbol, Fixed(2)),
        0xE3 => OpcodeInfo::new(Symbol, Special),
        0xE4..=0xE9 => OpcodeInfo::new(Annotations, Special),
        0xEA => OpcodeInfo::new(Null, Fixed(0)),
        0xEB => OpcodeInfo::new(Null, Fixed(1)),
        0xEC => OpcodeInfo::new(Nop, Fixed(0)),
        0xED => OpcodeInfo::new(Nop, FlexUInt),
        0xEE => OpcodeInfo::new(Symbol, Fixed(1)),
        0xEF => OpcodeInfo::new(MacroInvocation, Special),
        0xF0 => OpcodeInfo::new(DelimitedEnd, Fixed(0)),
        0xF1 => OpcodeInfo::new(List, Delimited),
        0xF2 => OpcodeInfo::new(Sexp, Delimited),
        0xF3 => OpcodeInfo::new(Struct, Delimited),
        0xF4 | 0xF5 => OpcodeInfo::new(MacroInvocation, Special),
        0xF6 => OpcodeInfo::new(Int, FlexUInt),
        0xF7 => OpcodeInfo::new(Decimal, FlexUInt),
        0xF8 => OpcodeInfo::new(Timestamp, FlexUInt),
        0xF9 => OpcodeInfo::new(String, FlexUInt),
        0xFA => OpcodeInfo::new(Symbol, FlexUInt),
        0xFB => OpcodeInfo::new(List, FlexUInt),
        0xFC => OpcodeInfo::new(Sexp, FlexUInt),
        0xFD => OpcodeInfo::new(Struct, FlexUInt),
        0xFE => OpcodeInfo::new(Blob, FlexUInt),
        0xFF => OpcodeInfo::new(Clob, FlexUInt),
        _ => OpcodeInfo::INVALID,
    }
}

const fn build_1_0() -> [OpcodeInfo; 256] {
    let mut table = [OpcodeInfo::INVALID; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = classify_1_0(i as u8);
        i += 1;
    }
    table
}

const fn build_1_1() -> [OpcodeInfo; 256] {
    let mut table = [OpcodeInfo::INVALID; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = classify_1_1(i as u8);
        i += 1;
    }
    table
}
