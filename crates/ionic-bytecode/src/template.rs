//! Template expressions and their compilation to bytecode.
//!
//! A template body is a sequence of [`TemplateExpr`]. Compiling it produces the
//! instruction array and constant pool stored in [`MacroBody::Template`].
//!
//! Invocation layout: one `ArgStart .. ArgEnd` block per callee parameter, in
//! signature order, followed by the invoke instruction. A parameter with no
//! argument gets an empty block.
//!
//! [`MacroBody::Template`]: crate::macros::MacroBody::Template

use std::sync::Arc;

use ionic_core::{Decimal, Int, IonType, MacroError, Result, SymbolToken, Timestamp};

use crate::builder::BytecodeBuilder;
use crate::constants::Constant;
use crate::instructions::Op;
use crate::macros::{Macro, MacroBody, Parameter, SystemMacro};

/// One node of a template body.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateExpr {
    Null(IonType),
    Bool(bool),
    Int(Int),
    Float(f64),
    Decimal(Decimal),
    Timestamp(Timestamp),
    String(Arc<str>),
    Symbol(SymbolToken),
    Blob(Arc<[u8]>),
    Clob(Arc<[u8]>),
    List(Vec<TemplateExpr>),
    Sexp(Vec<TemplateExpr>),
    Struct(Vec<(SymbolToken, TemplateExpr)>),
    Annotated(Vec<SymbolToken>, Box<TemplateExpr>),
    /// Reference to the enclosing macro's parameter by index.
    Variable(usize),
    /// Invocation; one expression per supplied argument.
    Invoke(Arc<Macro>, Vec<TemplateExpr>),
    /// Expression group: several values passed as one argument.
    Group(Vec<TemplateExpr>),
}

impl TemplateExpr {
    pub fn int(v: i64) -> Self {
        Self::Int(Int::Small(v))
    }

    pub fn string(s: &str) -> Self {
        Self::String(Arc::from(s))
    }

    pub fn symbol(s: &str) -> Self {
        Self::Symbol(SymbolToken::with_text(s))
    }

    pub fn list(items: Vec<TemplateExpr>) -> Self {
        Self::List(items)
    }

    pub fn invoke(target: &Arc<Macro>, args: Vec<TemplateExpr>) -> Self {
        Self::Invoke(Arc::clone(target), args)
    }

    pub fn group(items: Vec<TemplateExpr>) -> Self {
        Self::Group(items)
    }

    /// Values this expression contributes when used as an argument, if known
    /// without evaluation.
    fn static_count(&self) -> Option<usize> {
        match self {
            Self::Group(items) => Some(items.len()),
            Self::Variable(_) | Self::Invoke(..) => None,
            _ => Some(1),
        }
    }
}

/// Compile a template macro.
pub fn compile_template(
    name: Option<Arc<str>>,
    signature: Vec<Parameter>,
    body: &[TemplateExpr],
) -> Result<Macro> {
    let mut compiler = TemplateCompiler {
        signature: &signature,
        builder: BytecodeBuilder::new(),
    };
    for expr in body {
        compiler.expr(expr)?;
    }
    let (code, constants) = compiler.builder.finish();
    Ok(Macro::template(name, signature, code, constants))
}

struct TemplateCompiler<'s> {
    signature: &'s [Parameter],
    builder: BytecodeBuilder,
}

impl TemplateCompiler<'_> {
    fn expr(&mut self, expr: &TemplateExpr) -> Result<()> {
        let b = &mut self.builder;
        match expr {
            TemplateExpr::Null(ty) => b.null(*ty),
            TemplateExpr::Bool(v) => b.bool(*v),
            TemplateExpr::Int(v) => b.int(v),
            TemplateExpr::Float(v) => b.double(*v),
            TemplateExpr::Decimal(d) => b.constant(Op::CpDecimal, Constant::Decimal(d.clone())),
            TemplateExpr::Timestamp(t) => {
                b.constant(Op::CpTimestamp, Constant::Timestamp(t.clone()))
            }
            TemplateExpr::String(s) => b.constant(Op::CpString, Constant::String(Arc::clone(s))),
            TemplateExpr::Symbol(sym) => match (sym.text(), sym.sid()) {
                (None, Some(sid)) => b.emit(Op::SymbolSid, sid as u32),
                _ => b.constant(Op::CpSymbol, Constant::Symbol(sym.clone())),
            },
            TemplateExpr::Blob(bytes) => b.constant(Op::CpBlob, Constant::Blob(Arc::clone(bytes))),
            TemplateExpr::Clob(bytes) => b.constant(Op::CpClob, Constant::Clob(Arc::clone(bytes))),
            TemplateExpr::List(items) => self.sequence(Op::ListStart, items)?,
            TemplateExpr::Sexp(items) => self.sequence(Op::SexpStart, items)?,
            TemplateExpr::Struct(fields) => {
                self.builder.start(Op::StructStart);
                for (name, value) in fields {
                    self.builder
                        .constant(Op::CpFieldName, Constant::Symbol(name.clone()));
                    self.expr(value)?;
                }
                self.builder.end();
            }
            TemplateExpr::Annotated(annotations, value) => {
                for ann in annotations {
                    self.builder
                        .constant(Op::CpAnnotation, Constant::Symbol(ann.clone()));
                }
                self.expr(value)?;
            }
            TemplateExpr::Variable(index) => {
                if *index >= self.signature.len() {
                    return Err(MacroError::UnresolvedParameter(*index).into());
                }
                b.emit(Op::Parameter, *index as u32);
            }
            TemplateExpr::Invoke(target, args) => self.invoke(target, args)?,
            TemplateExpr::Group(items) => {
                for item in items {
                    self.expr(item)?;
                }
            }
        }
        Ok(())
    }

    fn sequence(&mut self, op: Op, items: &[TemplateExpr]) -> Result<()> {
        self.builder.start(op);
        for item in items {
            self.expr(item)?;
        }
        self.builder.end();
        Ok(())
    }

    fn invoke(&mut self, target: &Arc<Macro>, args: &[TemplateExpr]) -> Result<()> {
        let params = target.signature();
        if target.system_kind() == Some(SystemMacro::None) && !args.is_empty() {
            return Err(MacroError::NoneWithArguments.into());
        }
        if args.len() > params.len() {
            return Err(MacroError::ArityMismatch {
                expected: params.len(),
                found: args.len(),
            }
            .into());
        }
        for (i, param) in params.iter().enumerate() {
            let arg = args.get(i);
            let count = arg.map_or(Some(0), TemplateExpr::static_count);
            if let Some(count) = count
                && !param.cardinality.accepts(count)
            {
                if arg.is_none() {
                    return Err(MacroError::ArityMismatch {
                        expected: params.len(),
                        found: args.len(),
                    }
                    .into());
                }
                return Err(MacroError::Cardinality {
                    parameter: param.name.to_string(),
                }
                .into());
            }
            self.builder.start(Op::ArgStart);
            if let Some(arg) = arg {
                self.expr(arg)?;
            }
            self.builder.end();
        }
        match target.body() {
            MacroBody::System(which) => self.builder.emit(Op::InvokeSystem, which.address() as u32),
            MacroBody::Template { .. } => self
                .builder
                .constant(Op::InvokeCp, Constant::Macro(Arc::clone(target))),
        }
        Ok(())
    }
}
