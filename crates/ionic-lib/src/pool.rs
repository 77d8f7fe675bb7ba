//! Recycled cursor state.
//!
//! Every cursor owns a few growable buffers: the bytecode of the e-expression
//! it is expanding, the flattened program and its annotations.
//! The pool keeps those buffers after a cursor closes so that reading a
//! stream of similar values reaches a steady state with no new allocations.

use ionic_bytecode::ConstantPool;
use ionic_core::SymbolToken;

/// What a cursor reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CursorKind {
    TopLevel,
    List,
    Sexp,
    Struct,
}

impl CursorKind {
    fn slot(self) -> usize {
        self as usize
    }
}

/// Buffers owned by one cursor while it is open.
#[derive(Debug, Default)]
pub struct CursorState {
    pub(crate) request_code: Vec<u32>,
    pub(crate) request_constants: ConstantPool,
    pub(crate) program_code: Vec<u32>,
    pub(crate) program_constants: ConstantPool,
}

impl CursorState {
    fn reset(&mut self) {
        self.request_code.clear();
        self.request_constants.clear();
        self.program_code.clear();
        self.program_constants.clear();
    }
}

/// Per-kind free lists of cursor state and annotation buffers.
#[derive(Debug, Default)]
pub struct ResourcePool {
    free: [Vec<CursorState>; 4],
    annotation_buffers: Vec<Vec<SymbolToken>>,
    allocations: usize,
}

impl ResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a new cursor of `kind`, recycled when one is free.
    pub fn acquire(&mut self, kind: CursorKind) -> CursorState {
        match self.free[kind.slot()].pop() {
            Some(state) => state,
            None => {
                self.allocations += 1;
                CursorState::default()
            }
        }
    }

    /// Return the state of a closed cursor.
    pub fn release(&mut self, kind: CursorKind, mut state: CursorState) {
        state.reset();
        self.free[kind.slot()].push(state);
    }

    /// An empty annotation buffer.
    pub fn acquire_annotations(&mut self) -> Vec<SymbolToken> {
        match self.annotation_buffers.pop() {
            Some(buffer) => buffer,
            None => {
                self.allocations += 1;
                Vec::new()
            }
        }
    }

    pub fn release_annotations(&mut self, mut buffer: Vec<SymbolToken>) {
        buffer.clear();
        self.annotation_buffers.push(buffer);
    }

    /// Number of fresh states and buffers created so far.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Number of idle states of `kind`.
    pub fn idle(&self, kind: CursorKind) -> usize {
        self.free[kind.slot()].len()
    }
}
