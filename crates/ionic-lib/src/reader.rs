//! Top-level driver.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use std::sync::Arc;

use ionic_bytecode::Macro;
use ionic_core::SymbolTable;
use ionic_vm::{FlattenLimits, Flattener, PrintTracer};

use crate::context::{EncodingContext, Version};
use crate::cursor::{Cursor, Session};
use crate::pool::ResourcePool;

/// Reader configuration.
#[derive(Clone, Copy, Debug)]
pub struct ReaderOptions {
    /// Maximum container nesting (default: 512).
    max_container_depth: usize,
    flatten_limits: FlattenLimits,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_container_depth: 512,
            flatten_limits: FlattenLimits::default(),
        }
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_container_depth(mut self, depth: usize) -> Self {
        self.max_container_depth = depth;
        self
    }

    /// Bounds applied to each macro expansion.
    pub fn flatten_limits(mut self, limits: FlattenLimits) -> Self {
        self.flatten_limits = limits;
        self
    }

    pub fn get_max_container_depth(&self) -> usize {
        self.max_container_depth
    }

    pub fn get_flatten_limits(&self) -> FlattenLimits {
        self.flatten_limits
    }
}

/// Reads a binary Ion stream from its first byte.
///
/// Dereferences to the top-level [`Cursor`]. Every cursor taken from it
/// shares one encoding context and one resource pool, so a reader and its
/// cursors stay on one thread.
#[derive(Debug)]
pub struct StreamReader<'s> {
    cursor: Cursor<'s>,
}

impl<'s> StreamReader<'s> {
    pub fn new(source: &'s [u8]) -> Self {
        Self::with_options(source, ReaderOptions::default())
    }

    pub fn with_options(source: &'s [u8], options: ReaderOptions) -> Self {
        let session = Session {
            context: EncodingContext::new(),
            flattener: Flattener::new(options.flatten_limits),
            pool: ResourcePool::new(),
            tracer: None,
            max_container_depth: options.max_container_depth,
        };
        Self {
            cursor: Cursor::top_level(source, Rc::new(RefCell::new(session))),
        }
    }

    /// Protocol generation at the current position.
    pub fn version(&self) -> Version {
        self.session().borrow().context.version()
    }

    /// Symbols in scope at the current position.
    pub fn symbol_table(&self) -> Arc<SymbolTable> {
        Arc::clone(self.session().borrow().context.symbols())
    }

    /// Macros e-expressions address at the current position.
    pub fn macro_table(&self) -> Arc<[Arc<Macro>]> {
        Arc::clone(self.session().borrow().context.active_macro_table())
    }

    /// Snapshot of the encoding context.
    pub fn context(&self) -> EncodingContext {
        self.session().borrow().context.clone()
    }

    /// Cursor states and buffers allocated so far.
    pub fn pool_allocations(&self) -> usize {
        self.session().borrow().pool.allocations()
    }

    /// Record every following expansion with `tracer`.
    pub fn set_tracer(&mut self, tracer: PrintTracer) {
        self.session().borrow_mut().tracer = Some(tracer);
    }

    pub fn take_tracer(&mut self) -> Option<PrintTracer> {
        self.session().borrow_mut().tracer.take()
    }
}

impl<'s> Deref for StreamReader<'s> {
    type Target = Cursor<'s>;

    fn deref(&self) -> &Cursor<'s> {
        &self.cursor
    }
}

impl DerefMut for StreamReader<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cursor
    }
}
