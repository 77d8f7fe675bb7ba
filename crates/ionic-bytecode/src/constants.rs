//! Constant pool: decoded-once values referenced by index from instructions.

use std::sync::Arc;

use ionic_core::{Decimal, Int, SymbolToken, Timestamp};

use crate::macros::Macro;

/// A value too large for an instruction word.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Int(Int),
    Decimal(Decimal),
    Timestamp(Timestamp),
    String(Arc<str>),
    Symbol(SymbolToken),
    Blob(Arc<[u8]>),
    Clob(Arc<[u8]>),
    Macro(Arc<Macro>),
}

/// Append-only, index-stable constant storage.
///
/// Entries are shared: copying an entry into another pool clones the `Arc`,
/// never the value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstantPool {
    entries: Vec<Arc<Constant>>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a constant, returning its index.
    pub fn push(&mut self, constant: Constant) -> u32 {
        self.push_shared(Arc::new(constant))
    }

    /// Append an existing shared constant, returning its index.
    pub fn push_shared(&mut self, constant: Arc<Constant>) -> u32 {
        let index = self.entries.len() as u32;
        self.entries.push(constant);
        index
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.entries.get(index as usize).map(|c| &**c)
    }

    #[inline]
    pub fn get_shared(&self, index: u32) -> Option<&Arc<Constant>> {
        self.entries.get(index as usize)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry but keep the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constant> {
        self.entries.iter().map(|c| &**c)
    }
}
