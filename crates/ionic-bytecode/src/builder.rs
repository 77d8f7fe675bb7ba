//! Incremental bytecode emission with container backpatching.

use std::sync::Arc;

use ionic_core::{Int, IonType, MacroError, Result};

use crate::constants::{Constant, ConstantPool};
use crate::instructions::{Instruction, Op, split_u64};

/// Appends instructions and constants to a pair of buffers.
///
/// Container and argument starts are emitted as placeholders and patched when
/// the matching end is emitted, so a finished start always carries the number
/// of instructions strictly between it and its end marker.
#[derive(Debug, Default)]
pub struct BytecodeBuilder {
    code: Vec<u32>,
    constants: ConstantPool,
    /// Positions of open container and argument starts.
    open: Vec<usize>,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build into recycled buffers. Both are cleared first.
    pub fn with_buffers(mut code: Vec<u32>, mut constants: ConstantPool) -> Self {
        code.clear();
        constants.clear();
        Self {
            code,
            constants,
            open: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn code(&self) -> &[u32] {
        &self.code
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    /// Depth of open containers and arguments.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    #[inline]
    pub fn emit(&mut self, op: Op, data: u32) {
        self.code.push(Instruction::new(op, data).raw());
    }

    /// Copy raw words verbatim.
    #[inline]
    pub fn extend_raw(&mut self, words: &[u32]) {
        self.code.extend_from_slice(words);
    }

    pub fn null(&mut self, ty: IonType) {
        match ty {
            IonType::Null => self.emit(Op::NullNull, 0),
            ty => self.emit(Op::NullTyped, ty.to_code() as u32),
        }
    }

    pub fn bool(&mut self, value: bool) {
        self.emit(Op::Bool, value as u32);
    }

    /// Smallest encoding that holds `value`.
    pub fn int(&mut self, value: &Int) {
        match value.as_i64() {
            Some(v) => self.i64(v),
            None => self.constant(Op::CpInt, Constant::Int(value.clone())),
        }
    }

    pub fn i64(&mut self, v: i64) {
        if (Instruction::MIN_SMALL_INT..=Instruction::MAX_SMALL_INT).contains(&v) {
            self.code.push(Instruction::small_int(v as i32).raw());
        } else if let Ok(v) = i32::try_from(v) {
            self.emit(Op::InlineInt, 0);
            self.code.push(v as u32);
        } else {
            self.emit(Op::InlineLong, 0);
            self.code.extend_from_slice(&split_u64(v as u64));
        }
    }

    pub fn double(&mut self, value: f64) {
        self.emit(Op::InlineDouble, 0);
        self.code.extend_from_slice(&split_u64(value.to_bits()));
    }

    /// Add `constant` to the pool and reference it with `op`.
    pub fn constant(&mut self, op: Op, constant: Constant) {
        let index = self.constants.push(constant);
        self.emit(op, index);
    }

    /// Reference an already shared constant with `op`.
    pub fn shared_constant(&mut self, op: Op, constant: Arc<Constant>) {
        let index = self.constants.push_shared(constant);
        self.emit(op, index);
    }

    /// Reference `len` payload bytes at `offset` in the source buffer.
    pub fn source_ref(&mut self, op: Op, offset: usize, len: usize) -> Result<()> {
        let len = u32::try_from(len)
            .ok()
            .filter(|&l| l <= Instruction::MAX_DATA)
            .ok_or(MacroError::LimitExceeded(Instruction::MAX_DATA as usize))?;
        let offset =
            u32::try_from(offset).map_err(|_| MacroError::LimitExceeded(u32::MAX as usize))?;
        self.emit(op, len);
        self.code.push(offset);
        Ok(())
    }

    /// Move every instruction from `at` onward to the end of `out`.
    ///
    /// Constants stay in this builder's pool, so the moved words remain valid
    /// only against it. Nothing may be open past `at`.
    pub fn move_tail(&mut self, at: usize, out: &mut Vec<u32>) {
        debug_assert!(self.open.last().is_none_or(|&p| p < at));
        out.extend_from_slice(&self.code[at..]);
        self.code.truncate(at);
    }

    /// Open a container or argument; `op` must be a start marker.
    pub fn start(&mut self, op: Op) {
        debug_assert!(op.is_container_start() || op == Op::ArgStart);
        self.open.push(self.code.len());
        self.emit(op, 0);
    }

    /// Close the innermost container or argument and patch its start.
    ///
    /// Panics if nothing is open.
    pub fn end(&mut self) {
        let start = self.open.pop().expect("end on empty container stack");
        let start_insn = Instruction::from_raw(self.code[start]);
        let end_op = if start_insn.op() == Op::ArgStart {
            Op::ArgEnd
        } else {
            Op::ContainerEnd
        };
        let count = (self.code.len() - start - 1) as u32;
        self.code[start] = start_insn.with_data(count).raw();
        self.emit(end_op, 0);
    }

    /// Return the buffers. Panics if a container is still open.
    pub fn finish(self) -> (Vec<u32>, ConstantPool) {
        assert!(self.open.is_empty(), "unterminated container in bytecode");
        (self.code, self.constants)
    }
}
