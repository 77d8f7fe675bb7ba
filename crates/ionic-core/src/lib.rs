#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core types for the ionic binary Ion decoder.
//!
//! Everything here is independent of a protocol generation's framing:
//! - integer codecs (`varint` for 1.0, `flex` for 1.1)
//! - scalar payload decoders (`wire`)
//! - value, token and symbol types
//! - the [`ValueReader`] cursor contract and the error taxonomy

pub mod colors;
pub mod error;
pub mod flex;
pub mod reader;
pub mod symbols;
pub mod token;
pub mod value;
pub mod varint;
pub mod wire;

#[cfg(test)]
mod flex_tests;
#[cfg(test)]
mod symbols_tests;

pub use colors::Colors;
pub use error::{DecodeError, Error, MacroError, Result, UsageError};
pub use flex::FlexSym;
pub use reader::{ValueReader, expect_lob, expect_token};
pub use symbols::{SymbolTable, SymbolToken};
pub use token::{IonType, TokenKind};
pub use value::{Decimal, Int, Precision, Timestamp};
