//! The application-facing cursor.
//!
//! A [`Cursor`] merges three token sources behind one [`ValueReader`]:
//! the raw tokenizer of the current protocol generation, the program produced
//! by expanding an e-expression, and (for containers produced by an
//! expansion) a template cursor. Version markers and directives are applied to
//! the encoding context and never reach the caller.
//!
//! Each value is fetched together with its field name and annotations, then
//! reported as up to three tokens: `FieldName`, `Annotations`, the value.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;
use std::sync::Arc;

use ionic_bytecode::{BytecodeBuilder, ConstantPool, Instruction, Macro, Op, SystemMacro};
use ionic_core::{
    Decimal, DecodeError, Int, IonType, MacroError, Result, SymbolToken, Timestamp,
    TokenKind, UsageError, ValueReader, expect_token,
};
use ionic_vm::{Expansion, Flattener, NoopTracer, PrintTracer, Program, TemplateCursor};

use crate::binary::{ArgCompiler, Binary10Cursor, Binary11Cursor, EExpHeader, NestedReader};
use crate::context::{EncodingContext, SYSTEM_MODULE, Version};
use crate::directive::{self, SYMBOL_TABLE};
use crate::pool::{CursorKind, CursorState, ResourcePool};

/// State shared by every cursor of one top-level reader.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) context: EncodingContext,
    pub(crate) flattener: Flattener,
    pub(crate) pool: ResourcePool,
    pub(crate) tracer: Option<PrintTracer>,
    pub(crate) max_container_depth: usize,
}

/// Token source below the expansion layer.
#[derive(Debug)]
pub(crate) enum RawSource<'s> {
    V1_0(Binary10Cursor<'s>),
    V1_1(Binary11Cursor<'s>),
    /// Children of a container produced by an expansion.
    Template(TemplateCursor<'s>),
}

macro_rules! raw {
    ($source:expr, $r:ident => $body:expr) => {
        match $source {
            RawSource::V1_0($r) => $body,
            RawSource::V1_1($r) => $body,
            RawSource::Template($r) => $body,
        }
    };
}

impl<'s> RawSource<'s> {
    /// Top-level tokenizer for `version`, starting at `pos`.
    fn at(source: &'s [u8], pos: usize, context: &EncodingContext) -> Self {
        let symbols = Arc::clone(context.symbols());
        match context.version() {
            Version::V1_0 => RawSource::V1_0(Binary10Cursor::at(source, pos, symbols)),
            Version::V1_1 => {
                let macros = Arc::clone(context.active_macro_table());
                RawSource::V1_1(Binary11Cursor::at(source, pos, symbols, macros))
            }
        }
    }

    fn position(&self) -> usize {
        match self {
            RawSource::V1_0(r) => r.position(),
            RawSource::V1_1(r) => r.position(),
            RawSource::Template(_) => 0,
        }
    }

    fn version_marker(&self) -> (u8, u8) {
        match self {
            RawSource::V1_0(r) => r.version(),
            RawSource::V1_1(r) => r.version(),
            RawSource::Template(_) => unreachable!("expansions carry no version markers"),
        }
    }

    /// Pick up tables changed by a directive.
    fn refresh(&mut self, context: &EncodingContext) {
        match self {
            RawSource::V1_0(r) => r.set_symbols(Arc::clone(context.symbols())),
            RawSource::V1_1(r) => {
                r.set_symbols(Arc::clone(context.symbols()));
                r.set_macros(Arc::clone(context.active_macro_table()));
            }
            RawSource::Template(r) => r.set_symbols(Arc::clone(context.symbols())),
        }
    }

    fn invocation(&self) -> Result<EExpHeader> {
        match self {
            RawSource::V1_1(r) => r.invocation(),
            _ => None,
        }
        .ok_or_else(|| MacroError::UnexpectedInvocation.into())
    }

    fn resume_at(&mut self, end: usize) -> Result<()> {
        match self {
            RawSource::V1_1(r) => r.resume_at(end),
            _ => Err(MacroError::UnexpectedInvocation.into()),
        }
    }
}

impl ValueReader for RawSource<'_> {
    fn next_token(&mut self) -> Result<TokenKind> {
        raw!(self, r => r.next_token())
    }

    fn current_token(&self) -> TokenKind {
        raw!(self, r => r.current_token())
    }

    fn skip(&mut self) -> Result<()> {
        raw!(self, r => r.skip())
    }

    fn null_type(&mut self) -> Result<IonType> {
        raw!(self, r => r.null_type())
    }

    fn read_bool(&mut self) -> Result<bool> {
        raw!(self, r => r.read_bool())
    }

    fn read_int(&mut self) -> Result<Int> {
        raw!(self, r => r.read_int())
    }

    fn read_f64(&mut self) -> Result<f64> {
        raw!(self, r => r.read_f64())
    }

    fn read_decimal(&mut self) -> Result<Decimal> {
        raw!(self, r => r.read_decimal())
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        raw!(self, r => r.read_timestamp())
    }

    fn read_str(&mut self) -> Result<&str> {
        raw!(self, r => r.read_str())
    }

    fn read_symbol(&mut self) -> Result<SymbolToken> {
        raw!(self, r => r.read_symbol())
    }

    fn read_lob(&mut self) -> Result<&[u8]> {
        raw!(self, r => r.read_lob())
    }

    fn read_field_name(&mut self) -> Result<SymbolToken> {
        raw!(self, r => r.read_field_name())
    }

    fn read_annotations(&mut self, out: &mut Vec<SymbolToken>) -> Result<()> {
        raw!(self, r => r.read_annotations(out))
    }
}

impl NestedReader for RawSource<'_> {
    fn take_container(&mut self) -> Result<Self> {
        Ok(match self {
            RawSource::V1_0(r) => RawSource::V1_0(r.take_container()?),
            RawSource::V1_1(r) => RawSource::V1_1(r.take_container()?),
            RawSource::Template(r) => RawSource::Template(r.take_container()?),
        })
    }
}

/// An e-expression being read back.
#[derive(Debug)]
struct ExpansionState<'s> {
    cursor: TemplateCursor<'s>,
    /// Field name every produced value is reported under.
    field: Option<SymbolToken>,
}

/// Cursor over one sequence of values: the top level or a container.
#[derive(Debug)]
pub struct Cursor<'s> {
    kind: CursorKind,
    source: &'s [u8],
    raw: RawSource<'s>,
    expansion: Option<ExpansionState<'s>>,
    session: Rc<RefCell<Session>>,
    state: CursorState,
    depth: usize,
    current: TokenKind,
    /// Token of the value the current entry ends with.
    value: TokenKind,
    /// Whether that value comes from `expansion`.
    expanded: bool,
    field: Option<SymbolToken>,
    annotations: Vec<SymbolToken>,
}

impl<'s> Cursor<'s> {
    /// Top-level cursor over `source`, starting in the Ion 1.0 context.
    pub(crate) fn top_level(source: &'s [u8], session: Rc<RefCell<Session>>) -> Self {
        let (raw, state, annotations) = {
            let mut guard = session.borrow_mut();
            let s = &mut *guard;
            let raw = RawSource::at(source, 0, &s.context);
            (raw, s.pool.acquire(CursorKind::TopLevel), s.pool.acquire_annotations())
        };
        Self {
            kind: CursorKind::TopLevel,
            source,
            raw,
            expansion: None,
            session,
            state,
            depth: 0,
            current: TokenKind::Unset,
            value: TokenKind::Unset,
            expanded: false,
            field: None,
            annotations,
        }
    }

    pub(crate) fn session(&self) -> &Rc<RefCell<Session>> {
        &self.session
    }

    pub fn kind(&self) -> CursorKind {
        self.kind
    }

    /// Nesting depth; the top level is 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn in_struct(&self) -> bool {
        self.kind == CursorKind::Struct
    }

    /// Field name of the current entry, if it has one.
    pub fn field_name(&self) -> Option<&SymbolToken> {
        self.field.as_ref()
    }

    /// Symbol ID of the current field name. Names written as inline text
    /// have none.
    pub fn field_name_sid(&self) -> Result<Option<usize>> {
        if !self.in_struct() {
            return Err(UsageError::NotInStruct.into());
        }
        Ok(self.field.as_ref().and_then(SymbolToken::sid))
    }

    /// Annotations of the current entry.
    pub fn annotations(&self) -> &[SymbolToken] {
        &self.annotations
    }

    /// Whether the current value was produced by a macro.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Release the cursor's buffers to the pool.
    pub fn close(self) {}

    /// Cursor over the children of the current container.
    pub fn take_container(&mut self) -> Result<Cursor<'s>> {
        let kind = match self.current {
            TokenKind::List => CursorKind::List,
            TokenKind::Sexp => CursorKind::Sexp,
            TokenKind::Struct => CursorKind::Struct,
            found => {
                return Err(UsageError::WrongToken {
                    expected: TokenKind::List,
                    found,
                }
                .into());
            }
        };
        let depth = self.depth + 1;
        let mut session = self.session.borrow_mut();
        if depth > session.max_container_depth {
            return Err(DecodeError::DepthExceeded(session.max_container_depth).into());
        }
        let raw = match &mut self.expansion {
            Some(expansion) if self.expanded => RawSource::Template(expansion.cursor.take_container()?),
            _ => self.raw.take_container()?,
        };
        let state = session.pool.acquire(kind);
        let annotations = session.pool.acquire_annotations();
        drop(session);
        Ok(Cursor {
            kind,
            source: self.source,
            raw,
            expansion: None,
            session: Rc::clone(&self.session),
            state,
            depth,
            current: TokenKind::Unset,
            value: TokenKind::Unset,
            expanded: false,
            field: None,
            annotations,
        })
    }

    pub fn take_list(&mut self) -> Result<Cursor<'s>> {
        expect_token(self.current, TokenKind::List)?;
        self.take_container()
    }

    pub fn take_sexp(&mut self) -> Result<Cursor<'s>> {
        expect_token(self.current, TokenKind::Sexp)?;
        self.take_container()
    }

    pub fn take_struct(&mut self) -> Result<Cursor<'s>> {
        expect_token(self.current, TokenKind::Struct)?;
        self.take_container()
    }

    /// Position on the next entry: a value with its field name and
    /// annotations already read.
    fn fetch(&mut self) -> Result<TokenKind> {
        loop {
            self.field = None;
            self.annotations.clear();

            if let Some(expansion) = &mut self.expansion {
                let mut token = expansion.cursor.next_token()?;
                if token == TokenKind::End {
                    self.finish_expansion();
                    continue;
                }
                if token == TokenKind::Annotations {
                    expansion.cursor.read_annotations(&mut self.annotations)?;
                    token = expansion.cursor.next_token()?;
                }
                self.field = expansion.field.clone();
                self.expanded = true;
                return Ok(token);
            }

            self.expanded = false;
            let mut token = self.raw.next_token()?;
            match token {
                TokenKind::VersionMarker => {
                    self.on_version_marker()?;
                    continue;
                }
                TokenKind::FieldName => {
                    self.field = Some(self.raw.read_field_name()?);
                    token = self.raw.next_token()?;
                }
                _ => {}
            }
            if token == TokenKind::Annotations {
                self.raw.read_annotations(&mut self.annotations)?;
                token = self.raw.next_token()?;
            }
            if token == TokenKind::MacroInvocation {
                let field = self.field.take();
                self.begin_expansion(field)?;
                continue;
            }
            if self.kind == CursorKind::TopLevel && self.try_directive(token)? {
                continue;
            }
            return Ok(token);
        }
    }

    fn on_version_marker(&mut self) -> Result<()> {
        let (major, minor) = self.raw.version_marker();
        let mut session = self.session.borrow_mut();
        session.context.on_version_marker(major, minor)?;
        self.raw = RawSource::at(self.source, self.raw.position(), &session.context);
        Ok(())
    }

    /// Apply the current top-level value if it is a directive.
    fn try_directive(&mut self, token: TokenKind) -> Result<bool> {
        let Some(first) = self.annotations.first() else {
            return Ok(false);
        };
        let mut session = self.session.borrow_mut();
        let context = &mut session.context;
        match token {
            TokenKind::Struct if first.is(SYMBOL_TABLE) => {
                let mut fields = self.raw.take_container()?;
                directive::apply_symbol_table(context, &mut fields)?;
            }
            TokenKind::Sexp if first.is(SYSTEM_MODULE) && context.version() == Version::V1_1 => {
                let mut clause = self.raw.take_container()?;
                directive::apply_clause(context, &mut clause)?;
            }
            _ => return Ok(false),
        }
        self.raw.refresh(context);
        Ok(true)
    }

    /// Compile and flatten the e-expression the raw tokenizer is positioned on.
    fn begin_expansion(&mut self, field: Option<SymbolToken>) -> Result<()> {
        let header = self.raw.invocation()?;
        let macros = Arc::clone(self.session.borrow().context.active_macro_table());
        let target = header.address.resolve(&macros)?;
        tracing::trace!(address = ?header.address, name = ?target.name(), "e-expression");

        if let Some(which) = target.system_kind().filter(|m| m.is_directive()) {
            if self.kind != CursorKind::TopLevel || field.is_some() {
                return Err(MacroError::InvalidDirective(format!(
                    "`{}` outside the top level",
                    which.name()
                ))
                .into());
            }
            return self.apply_directive(header, &target, which, &macros);
        }

        let mut request = BytecodeBuilder::with_buffers(
            mem::take(&mut self.state.request_code),
            mem::take(&mut self.state.request_constants),
        );
        let end = ArgCompiler::new(self.source, &macros, &mut request).invocation(header)?;
        self.raw.resume_at(end)?;
        let (code, constants) = request.finish();
        let program = self.flatten(&code, &constants, &macros);
        self.state.request_code = code;
        self.state.request_constants = constants;

        let symbols = Arc::clone(self.session.borrow().context.symbols());
        self.expansion = Some(ExpansionState {
            cursor: TemplateCursor::new(Rc::new(program?), self.source, symbols),
            field,
        });
        Ok(())
    }

    /// Evaluate a directive e-expression: its arguments are flattened through
    /// `values` and applied to the encoding context.
    fn apply_directive(
        &mut self,
        header: EExpHeader,
        target: &Macro,
        which: SystemMacro,
        macros: &[Arc<Macro>],
    ) -> Result<()> {
        if which == SystemMacro::Use {
            return Err(MacroError::UnsupportedFeature("use").into());
        }
        let mut request = BytecodeBuilder::with_buffers(
            mem::take(&mut self.state.request_code),
            mem::take(&mut self.state.request_constants),
        );
        let end = ArgCompiler::new(self.source, macros, &mut request).arguments(target, header.args)?;
        self.raw.resume_at(end)?;
        let values = Instruction::new(Op::InvokeSystem, SystemMacro::Values.address() as u32);
        request.extend_raw(&[values.raw()]);
        let (code, constants) = request.finish();
        let program = self.flatten(&code, &constants, macros);
        self.state.request_code = code;
        self.state.request_constants = constants;

        let mut session = self.session.borrow_mut();
        let symbols = Arc::clone(session.context.symbols());
        let mut args = TemplateCursor::new(Rc::new(program?), self.source, symbols);
        directive::apply_system(&mut session.context, which, &mut args)?;
        self.raw.refresh(&session.context);
        drop(session);
        self.recycle(args.into_program());
        Ok(())
    }

    fn flatten(
        &mut self,
        code: &[u32],
        constants: &ConstantPool,
        macros: &[Arc<Macro>],
    ) -> Result<Program> {
        let request = Expansion {
            code,
            constants,
            source: self.source,
            macros,
        };
        let program_code = mem::take(&mut self.state.program_code);
        let program_constants = mem::take(&mut self.state.program_constants);
        let mut guard = self.session.borrow_mut();
        let session = &mut *guard;
        match session.tracer.as_mut() {
            Some(tracer) => session
                .flattener
                .expand(request, program_code, program_constants, tracer),
            None => session
                .flattener
                .expand(request, program_code, program_constants, &mut NoopTracer),
        }
    }

    fn finish_expansion(&mut self) {
        if let Some(expansion) = self.expansion.take() {
            self.recycle(expansion.cursor.into_program());
        }
    }

    /// Keep a finished program's buffers, unless a child cursor still reads it.
    fn recycle(&mut self, program: Rc<Program>) {
        if let Ok(program) = Rc::try_unwrap(program) {
            let (code, constants) = program.into_parts();
            self.state.program_code = code;
            self.state.program_constants = constants;
        }
    }

    /// Reader positioned on the current value.
    fn value_reader(&mut self) -> Result<&mut dyn ValueReader> {
        if matches!(self.current, TokenKind::FieldName | TokenKind::Annotations) {
            return Err(UsageError::WrongToken {
                expected: self.value,
                found: self.current,
            }
            .into());
        }
        let reader: &mut dyn ValueReader = match &mut self.expansion {
            Some(expansion) if self.expanded => &mut expansion.cursor,
            _ => &mut self.raw,
        };
        Ok(reader)
    }

}

impl ValueReader for Cursor<'_> {
    fn next_token(&mut self) -> Result<TokenKind> {
        self.current = match self.current {
            TokenKind::End => return Err(UsageError::PastEnd.into()),
            TokenKind::FieldName if !self.annotations.is_empty() => TokenKind::Annotations,
            TokenKind::FieldName | TokenKind::Annotations => self.value,
            _ => {
                self.value = self.fetch()?;
                if self.field.is_some() && self.value != TokenKind::End {
                    TokenKind::FieldName
                } else if !self.annotations.is_empty() {
                    TokenKind::Annotations
                } else {
                    self.value
                }
            }
        };
        Ok(self.current)
    }

    #[inline]
    fn current_token(&self) -> TokenKind {
        self.current
    }

    fn skip(&mut self) -> Result<()> {
        if self.current == TokenKind::End {
            return Err(UsageError::PastEnd.into());
        }
        // The underlying reader already stands after the value.
        self.current = TokenKind::Unset;
        Ok(())
    }

    fn null_type(&mut self) -> Result<IonType> {
        self.value_reader()?.null_type()
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.value_reader()?.read_bool()
    }

    fn read_int(&mut self) -> Result<Int> {
        self.value_reader()?.read_int()
    }

    fn read_f64(&mut self) -> Result<f64> {
        self.value_reader()?.read_f64()
    }

    fn read_decimal(&mut self) -> Result<Decimal> {
        self.value_reader()?.read_decimal()
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        self.value_reader()?.read_timestamp()
    }

    fn read_str(&mut self) -> Result<&str> {
        self.value_reader()?.read_str()
    }

    fn read_symbol(&mut self) -> Result<SymbolToken> {
        self.value_reader()?.read_symbol()
    }

    fn read_lob(&mut self) -> Result<&[u8]> {
        self.value_reader()?.read_lob()
    }

    fn read_field_name(&mut self) -> Result<SymbolToken> {
        if !self.in_struct() {
            return Err(UsageError::NotInStruct.into());
        }
        expect_token(self.current, TokenKind::FieldName)?;
        self.field
            .clone()
            .ok_or_else(|| UsageError::WrongToken {
                expected: TokenKind::FieldName,
                found: self.value,
            }
            .into())
    }

    fn read_annotations(&mut self, out: &mut Vec<SymbolToken>) -> Result<()> {
        expect_token(self.current, TokenKind::Annotations)?;
        out.extend_from_slice(&self.annotations);
        Ok(())
    }
}

impl NestedReader for Cursor<'_> {
    fn take_container(&mut self) -> Result<Self> {
        Cursor::take_container(self)
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        self.finish_expansion();
        let Ok(mut session) = self.session.try_borrow_mut() else {
            // Only an unwinding panic may leave the session borrowed.
            debug_assert!(
                std::thread::panicking(),
                "cursor dropped while its session is borrowed"
            );
            return;
        };
        session.pool.release(self.kind, mem::take(&mut self.state));
        session.pool.release_annotations(mem::take(&mut self.annotations));
    }
}
