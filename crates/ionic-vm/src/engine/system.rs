//! System macros evaluated while flattening.
//!
//! Arguments arrive as raw argument blocks, so each macro decides which of
//! them to flatten and in what order. `default` in particular never expands
//! its second argument when the first produced anything.

use std::ops::Range;
use std::sync::Arc;

use ionic_bytecode::{Constant, ConstantPool, Instruction, Op, SystemMacro, join_u64};
use ionic_core::{IonType, MacroError, Result, SymbolToken, wire};

use super::flatten::{Cx, Flattener, skip_annotations, value_spans};
use super::trace::Tracer;

impl Flattener {
    pub(super) fn invoke_system<T: Tracer>(
        &mut self,
        cx: &Cx<'_>,
        which: SystemMacro,
        code: &[u32],
        args: &[Range<usize>],
        constants: Option<&ConstantPool>,
        tracer: &mut T,
    ) -> Result<()> {
        let arg = |i: usize| args[i].clone();
        match which {
            SystemMacro::None => {
                if args.iter().any(|r| !r.is_empty()) {
                    return Err(MacroError::NoneWithArguments.into());
                }
            }
            SystemMacro::Values => {
                for range in args {
                    self.flatten_range(cx, &code[range.clone()], constants, tracer)?;
                }
            }
            SystemMacro::Default => {
                let mark = self.dest.len();
                self.flatten_range(cx, &code[arg(0)], constants, tracer)?;
                if self.dest.len() == mark {
                    self.flatten_range(cx, &code[arg(1)], constants, tracer)?;
                }
            }
            SystemMacro::Meta => {}
            SystemMacro::Flatten => {
                let values = self.flatten_to_scratch(cx, &code[arg(0)], constants, tracer)?;
                let result = self.splice(&values);
                self.recycle_scratch(values);
                result?;
            }
            SystemMacro::MakeList | SystemMacro::MakeSexp => {
                let values = self.flatten_to_scratch(cx, &code[arg(0)], constants, tracer)?;
                let op = if which == SystemMacro::MakeList {
                    Op::ListStart
                } else {
                    Op::SexpStart
                };
                self.dest.start(op);
                let result = self.splice(&values);
                self.dest.end();
                self.recycle_scratch(values);
                result?;
            }
            SystemMacro::Annotate => {
                let annotations = self.flatten_to_scratch(cx, &code[arg(0)], constants, tracer)?;
                let result = self.emit_annotations(&annotations);
                self.recycle_scratch(annotations);
                result?;
                self.flatten_range(cx, &code[arg(1)], constants, tracer)?;
            }
            SystemMacro::Repeat => {
                let count = self.flatten_to_scratch(cx, &code[arg(0)], constants, tracer)?;
                let n = self.repeat_count(cx, &count);
                self.recycle_scratch(count);
                let n = n?;
                let values = self.flatten_to_scratch(cx, &code[arg(1)], constants, tracer)?;
                let result = self.repeat(n, &values);
                self.recycle_scratch(values);
                result?;
            }
            other => return Err(MacroError::UnsupportedSystemMacro(other.name()).into()),
        }
        Ok(())
    }

    /// Append `values` `n` times. `values` must hold at least one value, and
    /// the whole output must fit the instruction limit before copying starts.
    fn repeat(&mut self, n: u64, values: &[u32]) -> Result<()> {
        if value_spans(values).next().is_none() {
            return Err(MacroError::Cardinality {
                parameter: "value".to_string(),
            }
            .into());
        }
        let room = self.limits.max_instructions.saturating_sub(self.dest.len()) as u64;
        if n.saturating_mul(values.len() as u64) > room {
            return Err(MacroError::LimitExceeded(self.limits.max_instructions).into());
        }
        for _ in 0..n {
            self.dest.extend_raw(values);
        }
        Ok(())
    }

    /// Append the elements of every list or sexp in `values`.
    fn splice(&mut self, values: &[u32]) -> Result<()> {
        for span in value_spans(values) {
            let at = skip_annotations(values, span.start);
            let insn = Instruction::from_raw(values[at]);
            match insn.op() {
                Op::ListStart | Op::SexpStart => {
                    self.dest.extend_raw(&values[at + 1..span.end - 1]);
                }
                Op::NullTyped if is_sequence_null(insn) => {}
                _ => return Err(MacroError::FlattenNonSequence.into()),
            }
        }
        Ok(())
    }

    /// Emit each text value in `values` as an annotation instruction.
    fn emit_annotations(&mut self, values: &[u32]) -> Result<()> {
        for span in value_spans(values) {
            let at = skip_annotations(values, span.start);
            let insn = Instruction::from_raw(values[at]);
            match insn.op() {
                Op::SymbolSid => self.dest.emit(Op::AnnotationSid, insn.data()),
                Op::SystemSymbol => self.dest.emit(Op::AnnotationSystemSid, insn.data()),
                Op::CpSymbol | Op::CpString => {
                    let token = match self.dest.constants().get(insn.data()) {
                        Some(Constant::Symbol(token)) => token.clone(),
                        Some(Constant::String(text)) => SymbolToken::with_text(Arc::clone(text)),
                        _ => return Err(MacroError::ExpectedText("annotate").into()),
                    };
                    self.dest
                        .constant(Op::CpAnnotation, Constant::Symbol(token));
                }
                Op::RefSymbol | Op::RefString => {
                    let offset = values[at + 1] as usize;
                    self.dest
                        .source_ref(Op::RefAnnotation, offset, insn.data() as usize)?;
                }
                _ => return Err(MacroError::ExpectedText("annotate").into()),
            }
        }
        Ok(())
    }

    fn repeat_count(&self, cx: &Cx<'_>, values: &[u32]) -> Result<u64> {
        let mut spans = value_spans(values);
        let (Some(span), None) = (spans.next(), spans.next()) else {
            return Err(MacroError::ExpectedInteger("repeat").into());
        };
        let at = skip_annotations(values, span.start);
        let insn = Instruction::from_raw(values[at]);
        let n = match insn.op() {
            Op::SmallInt => Some(insn.signed_data() as i64),
            Op::InlineInt => Some(values[at + 1] as i32 as i64),
            Op::InlineLong => Some(join_u64(values[at + 1], values[at + 2]) as i64),
            Op::CpInt => match self.dest.constants().get(insn.data()) {
                Some(Constant::Int(v)) => v.as_i64(),
                _ => None,
            },
            Op::RefInt => {
                let offset = values[at + 1] as usize;
                let bytes = &cx.source[offset..offset + insn.data() as usize];
                wire::v1_1::int(bytes).as_i64()
            }
            _ => None,
        };
        n.and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| MacroError::ExpectedInteger("repeat").into())
    }
}

fn is_sequence_null(insn: Instruction) -> bool {
    matches!(
        IonType::from_code(insn.data() as u8),
        Some(IonType::List | IonType::Sexp)
    )
}
