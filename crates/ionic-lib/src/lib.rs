//! ionic: a binary Ion 1.0 and 1.1 reader with macro expansion.
//!
//! # Example
//!
//! ```
//! use ionic_lib::{StreamReader, TokenKind, ValueReader};
//!
//! let bytes = [0xE0, 0x01, 0x00, 0xEA, 0x21, 0x05];
//! let mut reader = StreamReader::new(&bytes);
//! assert_eq!(reader.next_token().unwrap(), TokenKind::Int);
//! assert_eq!(reader.read_i64().unwrap(), 5);
//! assert_eq!(reader.next_token().unwrap(), TokenKind::End);
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod binary;
pub mod context;
pub mod cursor;
pub mod directive;
pub mod pool;
pub mod reader;
pub mod tdl;

#[cfg(test)]
mod cursor_tests;
#[cfg(test)]
mod directive_tests;
#[cfg(test)]
mod pool_tests;
#[cfg(test)]
mod reader_tests;
#[cfg(test)]
mod test_utils;

pub use binary::{Binary10Cursor, Binary11Cursor, NestedReader};
pub use context::{EncodingContext, Module, Version};
pub use cursor::Cursor;
pub use pool::{CursorKind, ResourcePool};
pub use reader::{ReaderOptions, StreamReader};
pub use tdl::{MacroScope, read_macro};

pub use ionic_core::{
    Decimal, Error, Int, IonType, Result, SymbolTable, SymbolToken, Timestamp, TokenKind,
    ValueReader,
};
