//! Token categories reported by every cursor.

use std::fmt;

use serde::Serialize;

/// What a cursor is positioned on after `next_token`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    #[default]
    Unset,
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
    FieldName,
    Annotations,
    MacroInvocation,
    VersionMarker,
    End,
}

impl TokenKind {
    /// True for tokens that denote a value (scalar, container or null).
    pub fn is_value(self) -> bool {
        matches!(
            self,
            TokenKind::Null
                | TokenKind::Bool
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::Decimal
                | TokenKind::Timestamp
                | TokenKind::String
                | TokenKind::Symbol
                | TokenKind::Blob
                | TokenKind::Clob
                | TokenKind::List
                | TokenKind::Sexp
                | TokenKind::Struct
        )
    }

    pub fn is_container(self) -> bool {
        matches!(self, TokenKind::List | TokenKind::Sexp | TokenKind::Struct)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Unset => "unset",
            TokenKind::Null => "null",
            TokenKind::Bool => "bool",
            TokenKind::Int => "int",
            TokenKind::Float => "float",
            TokenKind::Decimal => "decimal",
            TokenKind::Timestamp => "timestamp",
            TokenKind::String => "string",
            TokenKind::Symbol => "symbol",
            TokenKind::Blob => "blob",
            TokenKind::Clob => "clob",
            TokenKind::List => "list",
            TokenKind::Sexp => "sexp",
            TokenKind::Struct => "struct",
            TokenKind::FieldName => "field name",
            TokenKind::Annotations => "annotations",
            TokenKind::MacroInvocation => "macro invocation",
            TokenKind::VersionMarker => "version marker",
            TokenKind::End => "end",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The Ion data model types. Used for typed nulls.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IonType {
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
}

impl IonType {
    /// Type selected by a 1.0 type descriptor's high nibble.
    pub fn from_type_code(code: u8) -> Option<Self> {
        Some(match code {
            0x0 => IonType::Null,
            0x1 => IonType::Bool,
            0x2 | 0x3 => IonType::Int,
            0x4 => IonType::Float,
            0x5 => IonType::Decimal,
            0x6 => IonType::Timestamp,
            0x7 => IonType::Symbol,
            0x8 => IonType::String,
            0x9 => IonType::Clob,
            0xA => IonType::Blob,
            0xB => IonType::List,
            0xC => IonType::Sexp,
            0xD => IonType::Struct,
            _ => return None,
        })
    }

    /// Type selected by the byte following a 1.1 typed-null opcode.
    pub fn from_typed_null(byte: u8) -> Option<Self> {
        Some(match byte {
            0x00 => IonType::Bool,
            0x01 => IonType::Int,
            0x02 => IonType::Float,
            0x03 => IonType::Decimal,
            0x04 => IonType::Timestamp,
            0x05 => IonType::String,
            0x06 => IonType::Symbol,
            0x07 => IonType::Blob,
            0x08 => IonType::Clob,
            0x09 => IonType::List,
            0x0A => IonType::Sexp,
            0x0B => IonType::Struct,
            _ => return None,
        })
    }

    /// Compact code stored in bytecode data fields.
    pub fn to_code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => IonType::Null,
            1 => IonType::Bool,
            2 => IonType::Int,
            3 => IonType::Float,
            4 => IonType::Decimal,
            5 => IonType::Timestamp,
            6 => IonType::String,
            7 => IonType::Symbol,
            8 => IonType::Blob,
            9 => IonType::Clob,
            10 => IonType::List,
            11 => IonType::Sexp,
            12 => IonType::Struct,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IonType::Null => "null",
            IonType::Bool => "bool",
            IonType::Int => "int",
            IonType::Float => "float",
            IonType::Decimal => "decimal",
            IonType::Timestamp => "timestamp",
            IonType::String => "string",
            IonType::Symbol => "symbol",
            IonType::Blob => "blob",
            IonType::Clob => "clob",
            IonType::List => "list",
            IonType::Sexp => "sexp",
            IonType::Struct => "struct",
        }
    }
}

impl fmt::Display for IonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
