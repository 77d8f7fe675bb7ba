//! Flattening: inline macro invocations into one instruction array.
//!
//! A request is a run of argument blocks followed by an invocation, as
//! produced by the template compiler or by the e-expression reader. The
//! flattener walks it and appends plain values to a destination builder:
//!
//! - scalars, symbols and source references are copied; constant references
//!   share the source `Arc` through a new slot in the destination pool
//! - containers are rebuilt so their counts are patched against the output
//! - parameter references copy the caller's argument, which was flattened
//!   before the callee body started
//! - invocations recurse into the callee with a fresh environment frame
//!
//! The output never contains invocation, argument or parameter instructions.

use std::ops::Range;
use std::sync::Arc;

use ionic_bytecode::{
    BytecodeBuilder, Constant, ConstantPool, Instruction, Macro, MacroBody, Op, Parameter,
    SystemMacro,
};
use ionic_core::{MacroError, Result};

use super::env::EnvArena;
use super::evaluator::Program;
use super::trace::Tracer;

/// Bounds on a single expansion.
#[derive(Clone, Copy, Debug)]
pub struct FlattenLimits {
    /// Maximum nesting of invocations (default: 256).
    pub(crate) max_depth: usize,
    /// Maximum number of output instructions (default: 4,194,304).
    pub(crate) max_instructions: usize,
}

impl Default for FlattenLimits {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_instructions: 1 << 22,
        }
    }
}

impl FlattenLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the invocation nesting limit.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the output size limit.
    pub fn max_instructions(mut self, count: usize) -> Self {
        self.max_instructions = count;
        self
    }

    pub fn get_max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn get_max_instructions(&self) -> usize {
        self.max_instructions
    }
}

/// One expansion request.
#[derive(Clone, Copy, Debug)]
pub struct Expansion<'a> {
    /// Argument blocks followed by an invocation.
    pub code: &'a [u32],
    /// Pool that `code` references.
    pub constants: &'a ConstantPool,
    /// Input buffer that source references point into.
    pub source: &'a [u8],
    /// Active macro table, indexed by address.
    pub macros: &'a [Arc<Macro>],
}

/// Per-request data shared by every recursion level.
pub(super) struct Cx<'a> {
    pub(super) source: &'a [u8],
    pub(super) macros: &'a [Arc<Macro>],
}

/// Reusable flattening state.
///
/// Buffers (environment frames, scratch space) survive between requests.
#[derive(Debug, Default)]
pub struct Flattener {
    pub(super) limits: FlattenLimits,
    pub(super) dest: BytecodeBuilder,
    pub(super) env: EnvArena,
    scratch: Vec<Vec<u32>>,
}

impl Flattener {
    pub fn new(limits: FlattenLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn limits(&self) -> FlattenLimits {
        self.limits
    }

    /// Flatten `request` into recycled `code`/`constants` buffers.
    ///
    /// The returned program is terminated by an `Eof` instruction.
    pub fn expand<T: Tracer>(
        &mut self,
        request: Expansion<'_>,
        code: Vec<u32>,
        constants: ConstantPool,
        tracer: &mut T,
    ) -> Result<Program> {
        self.dest = BytecodeBuilder::with_buffers(code, constants);
        self.env.clear();
        let cx = Cx {
            source: request.source,
            macros: request.macros,
        };
        let result = self.flatten_range(&cx, request.code, Some(request.constants), tracer);
        let dest = std::mem::take(&mut self.dest);
        result?;

        let (mut code, constants) = dest.finish();
        code.push(Instruction::new(Op::Eof, 0).raw());
        tracing::trace!(
            instructions = code.len(),
            constants = constants.len(),
            "expansion flattened"
        );
        Ok(Program::new(code, constants))
    }

    /// Walk `code`, appending its flattened form to the destination.
    ///
    /// `constants` is the pool `code` references, or `None` when `code` was
    /// already flattened into the destination pool.
    pub(super) fn flatten_range<T: Tracer>(
        &mut self,
        cx: &Cx<'_>,
        code: &[u32],
        constants: Option<&ConstantPool>,
        tracer: &mut T,
    ) -> Result<()> {
        let mut args: Vec<Range<usize>> = Vec::new();
        let mut field: Option<usize> = None;
        let mut ip = 0;
        while ip < code.len() {
            let insn = Instruction::from_raw(code[ip]);
            let op = insn.op();
            match op {
                Op::ArgStart => {
                    let len = insn.data() as usize;
                    args.push(ip + 1..ip + 1 + len);
                    ip += len + 2;
                    continue;
                }
                Op::Parameter => {
                    let index = insn.data() as usize;
                    let arg = self.env.argument(index)?;
                    tracer.trace_parameter(index, value_spans(arg).count());
                    match field.take() {
                        Some(at) => emit_with_field(&mut self.dest, arg, code, at, constants),
                        None => self.dest.extend_raw(arg),
                    }
                }
                Op::InvokeCp | Op::InvokeAddress | Op::InvokeSystem => {
                    let target = self.resolve(cx, insn, constants)?;
                    match field.take() {
                        None => self.invoke(cx, &target, code, &args, constants, tracer)?,
                        Some(at) => {
                            let mark = self.dest.len();
                            self.invoke(cx, &target, code, &args, constants, tracer)?;
                            let mut produced = self.take_scratch();
                            self.dest.move_tail(mark, &mut produced);
                            emit_with_field(&mut self.dest, &produced, code, at, constants);
                            self.recycle_scratch(produced);
                        }
                    }
                    args.clear();
                }
                Op::FieldSid | Op::FieldSystemSid | Op::CpFieldName | Op::RefFieldName => {
                    field = Some(ip);
                }
                Op::ListStart | Op::SexpStart | Op::StructStart => {
                    if let Some(at) = field.take() {
                        copy_instruction(&mut self.dest, code, at, constants);
                    }
                    let len = insn.data() as usize;
                    self.dest.start(op);
                    self.flatten_range(cx, &code[ip + 1..ip + 1 + len], constants, tracer)?;
                    self.dest.end();
                    ip += len + 2;
                    continue;
                }
                Op::Eof => break,
                Op::ContainerEnd | Op::ArgEnd => {
                    unreachable!("end marker outside its container at {ip}")
                }
                _ => {
                    if let Some(at) = field.take() {
                        copy_instruction(&mut self.dest, code, at, constants);
                    }
                    copy_instruction(&mut self.dest, code, ip, constants);
                }
            }
            ip += op.width();
        }
        Ok(())
    }

    fn resolve(
        &self,
        cx: &Cx<'_>,
        insn: Instruction,
        constants: Option<&ConstantPool>,
    ) -> Result<Arc<Macro>> {
        let index = insn.data() as usize;
        match insn.op() {
            Op::InvokeCp => {
                let pool = constants.unwrap_or(self.dest.constants());
                match pool.get(insn.data()) {
                    Some(Constant::Macro(m)) => Ok(Arc::clone(m)),
                    _ => Err(MacroError::NotAMacro(index).into()),
                }
            }
            Op::InvokeAddress => cx
                .macros
                .get(index)
                .cloned()
                .ok_or_else(|| MacroError::UndefinedMacro(index).into()),
            _ => SystemMacro::from_address(index)
                .map(Macro::system)
                .ok_or_else(|| MacroError::UndefinedMacro(index).into()),
        }
    }

    /// Expand one invocation whose argument blocks are `args` within `code`.
    fn invoke<T: Tracer>(
        &mut self,
        cx: &Cx<'_>,
        target: &Arc<Macro>,
        code: &[u32],
        args: &[Range<usize>],
        constants: Option<&ConstantPool>,
        tracer: &mut T,
    ) -> Result<()> {
        let params = target.signature();
        // `none` reports supplied arguments itself.
        if args.len() != params.len() && target.system_kind() != Some(SystemMacro::None) {
            return Err(MacroError::ArityMismatch {
                expected: params.len(),
                found: args.len(),
            }
            .into());
        }
        let depth = self.env.depth() + 1;
        if depth > self.limits.max_depth {
            return Err(MacroError::LimitExceeded(self.limits.max_depth).into());
        }

        tracer.trace_enter(target, depth, args.len());
        let mark = self.dest.len();
        match target.body() {
            MacroBody::System(which) => {
                self.invoke_system(cx, *which, code, args, constants, tracer)?;
            }
            MacroBody::Template {
                code: body,
                constants: body_constants,
            } => {
                let (mut buffer, mut bounds) = self.env.take_buffers();
                let flattened = self.flatten_arguments(
                    cx,
                    params,
                    code,
                    args,
                    constants,
                    &mut buffer,
                    &mut bounds,
                    tracer,
                );
                if let Err(e) = flattened {
                    self.env.recycle(buffer, bounds);
                    return Err(e);
                }
                self.env.push(buffer, bounds);
                let result = self.flatten_range(cx, body, Some(body_constants), tracer);
                self.env.pop();
                result?;
            }
        }
        self.check_size()?;

        let emitted = self.dest.len() - mark;
        tracer.trace_exit(target, depth, emitted);
        tracing::trace!(
            name = target.name().unwrap_or("<anonymous>"),
            depth,
            args = args.len(),
            emitted,
            "macro expanded"
        );
        Ok(())
    }

    /// Flatten each argument into `buffer`, recording where each one ends.
    #[allow(clippy::too_many_arguments)]
    fn flatten_arguments<T: Tracer>(
        &mut self,
        cx: &Cx<'_>,
        params: &[Parameter],
        code: &[u32],
        args: &[Range<usize>],
        constants: Option<&ConstantPool>,
        buffer: &mut Vec<u32>,
        bounds: &mut Vec<usize>,
        tracer: &mut T,
    ) -> Result<()> {
        bounds.push(0);
        for (param, range) in params.iter().zip(args) {
            let arg_mark = self.dest.len();
            let start = buffer.len();
            self.flatten_range(cx, &code[range.clone()], constants, tracer)?;
            self.dest.move_tail(arg_mark, buffer);
            if !param.cardinality.accepts(value_spans(&buffer[start..]).count()) {
                return Err(MacroError::Cardinality {
                    parameter: param.name.to_string(),
                }
                .into());
            }
            bounds.push(buffer.len());
        }
        Ok(())
    }

    pub(super) fn check_size(&self) -> Result<()> {
        if self.dest.len() > self.limits.max_instructions {
            return Err(MacroError::LimitExceeded(self.limits.max_instructions).into());
        }
        Ok(())
    }

    /// Flatten `code` and move the result out of the destination.
    pub(super) fn flatten_to_scratch<T: Tracer>(
        &mut self,
        cx: &Cx<'_>,
        code: &[u32],
        constants: Option<&ConstantPool>,
        tracer: &mut T,
    ) -> Result<Vec<u32>> {
        let mark = self.dest.len();
        self.flatten_range(cx, code, constants, tracer)?;
        let mut out = self.take_scratch();
        self.dest.move_tail(mark, &mut out);
        Ok(out)
    }

    pub(super) fn take_scratch(&mut self) -> Vec<u32> {
        self.scratch.pop().unwrap_or_default()
    }

    pub(super) fn recycle_scratch(&mut self, mut buffer: Vec<u32>) {
        buffer.clear();
        self.scratch.push(buffer);
    }
}

/// Copy the instruction at `ip` with its operands.
///
/// Constant references are rewritten to a new slot in the destination pool
/// holding the same shared constant.
pub(super) fn copy_instruction(
    dest: &mut BytecodeBuilder,
    code: &[u32],
    ip: usize,
    constants: Option<&ConstantPool>,
) {
    let insn = Instruction::from_raw(code[ip]);
    let op = insn.op();
    match constants {
        Some(pool) if op.is_constant_ref() => {
            let shared = pool
                .get_shared(insn.data())
                .expect("constant index out of range");
            dest.shared_constant(op, Arc::clone(shared));
        }
        _ => dest.extend_raw(&code[ip..ip + op.width()]),
    }
}

/// Emit every value of `values`, each preceded by the field name at
/// `code[field]`. An empty `values` emits nothing.
fn emit_with_field(
    dest: &mut BytecodeBuilder,
    values: &[u32],
    code: &[u32],
    field: usize,
    constants: Option<&ConstantPool>,
) {
    for span in value_spans(values) {
        copy_instruction(dest, code, field, constants);
        dest.extend_raw(&values[span]);
    }
}

/// Ranges of the top-level values in flattened `code`, annotations included.
pub(crate) fn value_spans(code: &[u32]) -> impl Iterator<Item = Range<usize>> + '_ {
    let mut ip = 0;
    std::iter::from_fn(move || {
        if ip >= code.len() {
            return None;
        }
        let start = ip;
        while ip < code.len() {
            let insn = Instruction::from_raw(code[ip]);
            let op = insn.op();
            if op.is_annotation() {
                ip += op.width();
                continue;
            }
            ip += if op.is_container_start() {
                insn.data() as usize + 2
            } else {
                op.width()
            };
            break;
        }
        Some(start..ip)
    })
}

/// Position of the value instruction within a span, past its annotations.
pub(crate) fn skip_annotations(code: &[u32], mut ip: usize) -> usize {
    while ip < code.len() {
        let op = Instruction::from_raw(code[ip]).op();
        if !op.is_annotation() {
            break;
        }
        ip += op.width();
    }
    ip
}
