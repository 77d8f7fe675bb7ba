//! Raw binary tokenizers for both protocol generations.
//!
//! The tokenizers know nothing about directives or macro tables beyond what
//! they need to find value boundaries. A value token leaves the cursor
//! positioned after the value, so `skip` on a value is free and the payload is
//! decoded only when an accessor asks for it.

pub mod eexp;
pub mod v1_0;
pub mod v1_1;


use std::ops::Range;
use std::sync::Arc;

use ionic_bytecode::Category;
use ionic_core::error::eof;
use ionic_core::{DecodeError, Result, SymbolTable, SymbolToken, TokenKind, ValueReader, wire};
use ionic_vm::TemplateCursor;

pub use eexp::{ArgCompiler, EExpHeader, MacroAddress};
pub use v1_0::Binary10Cursor;
pub use v1_1::Binary11Cursor;

/// A reader that can descend into the container it is positioned on.
pub trait NestedReader: ValueReader + Sized {
    /// Cursor over the children of the current container.
    ///
    /// The parent is already positioned past the container.
    fn take_container(&mut self) -> Result<Self>;
}

impl NestedReader for TemplateCursor<'_> {
    fn take_container(&mut self) -> Result<Self> {
        TemplateCursor::take_container(self)
    }
}

impl NestedReader for Binary10Cursor<'_> {
    fn take_container(&mut self) -> Result<Self> {
        Binary10Cursor::take_container(self)
    }
}

impl NestedReader for Binary11Cursor<'_> {
    fn take_container(&mut self) -> Result<Self> {
        Binary11Cursor::take_container(self)
    }
}

/// Token reported for a value category.
pub(crate) fn token_of(category: Category) -> TokenKind {
    match category {
        Category::Null => TokenKind::Null,
        Category::Bool => TokenKind::Bool,
        Category::Int => TokenKind::Int,
        Category::Float => TokenKind::Float,
        Category::Decimal => TokenKind::Decimal,
        Category::Timestamp => TokenKind::Timestamp,
        Category::String => TokenKind::String,
        Category::Symbol => TokenKind::Symbol,
        Category::Blob => TokenKind::Blob,
        Category::Clob => TokenKind::Clob,
        Category::List => TokenKind::List,
        Category::Sexp => TokenKind::Sexp,
        Category::Struct => TokenKind::Struct,
        Category::Annotations => TokenKind::Annotations,
        Category::VersionMarker => TokenKind::VersionMarker,
        Category::MacroInvocation => TokenKind::MacroInvocation,
        Category::Nop | Category::DelimitedEnd | Category::Invalid => TokenKind::Unset,
    }
}

/// Byte at `pos`, failing at the end of input.
#[inline]
pub(crate) fn byte_at(source: &[u8], pos: usize) -> Result<u8> {
    source.get(pos).copied().ok_or_else(|| eof(pos))
}

/// `start..start + len`, checked against the enclosing container `limit` and
/// the end of input.
pub(crate) fn span(source: &[u8], start: usize, len: usize, limit: usize) -> Result<Range<usize>> {
    let end = start.checked_add(len).ok_or(DecodeError::Truncated)?;
    if end > source.len() {
        return Err(eof(source.len()));
    }
    if end > limit {
        return Err(DecodeError::Truncated.into());
    }
    Ok(start..end)
}

/// An encoded symbol reference: a field name or one annotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SymRef {
    Sid(usize),
    /// Inline UTF-8 text at this source range.
    Text(Range<usize>),
    System(u8),
}

impl SymRef {
    pub(crate) fn resolve(&self, source: &[u8], symbols: &SymbolTable) -> Result<SymbolToken> {
        match self {
            SymRef::Sid(sid) => symbols.token(*sid),
            SymRef::Text(range) => {
                let text = wire::utf8(&source[range.clone()], range.start)?;
                Ok(SymbolToken::with_text(Arc::from(text)))
            }
            SymRef::System(sid) => SymbolTable::system_token_1_1(*sid as usize),
        }
    }
}
