//! Reading values back out of a flattened program.
//!
//! [`TemplateCursor`] walks instructions the way the binary tokenizers walk
//! bytes. Scalars stay encoded until an accessor asks for them: constant-pool
//! entries are cloned or borrowed, source references decode the original input
//! bytes on demand.

use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;

use ionic_bytecode::{Constant, ConstantPool, Instruction, Op, join_u64};
use ionic_core::{
    Decimal, DecodeError, Int, IonType, MacroError, Result, SymbolTable, SymbolToken, Timestamp,
    TokenKind, UsageError, ValueReader, expect_lob, expect_token, wire,
};

/// Output of one expansion.
#[derive(Debug, Default)]
pub struct Program {
    code: Vec<u32>,
    constants: ConstantPool,
}

impl Program {
    pub fn new(code: Vec<u32>, constants: ConstantPool) -> Self {
        Self { code, constants }
    }

    pub fn code(&self) -> &[u32] {
        &self.code
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    /// Give the buffers back for reuse.
    pub fn into_parts(self) -> (Vec<u32>, ConstantPool) {
        (self.code, self.constants)
    }
}

/// Cursor over one sequence of a flattened program.
#[derive(Debug)]
pub struct TemplateCursor<'s> {
    program: Rc<Program>,
    source: &'s [u8],
    symbols: Arc<SymbolTable>,
    /// Next unread instruction.
    ip: usize,
    end: usize,
    current: TokenKind,
    /// Instruction of the current value.
    value_ip: usize,
    /// Instruction of the most recent field name.
    field_ip: Option<usize>,
    annotations: Range<usize>,
    in_struct: bool,
}

impl<'s> TemplateCursor<'s> {
    /// Cursor over the top level of `program`.
    pub fn new(program: Rc<Program>, source: &'s [u8], symbols: Arc<SymbolTable>) -> Self {
        let end = program.code.len();
        Self {
            program,
            source,
            symbols,
            ip: 0,
            end,
            current: TokenKind::Unset,
            value_ip: 0,
            field_ip: None,
            annotations: 0..0,
            in_struct: false,
        }
    }

    pub fn program(&self) -> &Rc<Program> {
        &self.program
    }

    /// Give up the cursor, keeping its program.
    pub fn into_program(self) -> Rc<Program> {
        self.program
    }

    pub fn in_struct(&self) -> bool {
        self.in_struct
    }

    /// Replace the table used to resolve symbol IDs.
    pub fn set_symbols(&mut self, symbols: Arc<SymbolTable>) {
        self.symbols = symbols;
    }

    /// Cursor over the children of the current container.
    ///
    /// The parent is already positioned past the container.
    pub fn take_container(&mut self) -> Result<TemplateCursor<'s>> {
        if !self.current.is_container() {
            return Err(UsageError::WrongToken {
                expected: TokenKind::List,
                found: self.current,
            }
            .into());
        }
        let insn = self.insn(self.value_ip);
        let start = self.value_ip + 1;
        Ok(TemplateCursor {
            program: Rc::clone(&self.program),
            source: self.source,
            symbols: Arc::clone(&self.symbols),
            ip: start,
            end: start + insn.data() as usize,
            current: TokenKind::Unset,
            value_ip: start,
            field_ip: None,
            annotations: start..start,
            in_struct: insn.op() == Op::StructStart,
        })
    }

    pub fn take_list(&mut self) -> Result<TemplateCursor<'s>> {
        expect_token(self.current, TokenKind::List)?;
        self.take_container()
    }

    pub fn take_sexp(&mut self) -> Result<TemplateCursor<'s>> {
        expect_token(self.current, TokenKind::Sexp)?;
        self.take_container()
    }

    pub fn take_struct(&mut self) -> Result<TemplateCursor<'s>> {
        expect_token(self.current, TokenKind::Struct)?;
        self.take_container()
    }

    #[inline]
    fn insn(&self, ip: usize) -> Instruction {
        Instruction::from_raw(self.program.code[ip])
    }

    #[inline]
    fn operand(&self, ip: usize) -> u32 {
        self.program.code[ip + 1]
    }

    /// Source bytes referenced by the instruction at `ip`.
    fn source_bytes(&self, ip: usize, len: usize) -> Result<&'s [u8]> {
        let offset = self.operand(ip) as usize;
        let source: &'s [u8] = self.source;
        source
            .get(offset..offset + len)
            .ok_or_else(|| DecodeError::Truncated.into())
    }

    fn constant(&self, index: u32) -> &Constant {
        self.program
            .constants
            .get(index)
            .expect("constant index out of range")
    }

    /// Instruction after the value starting at `ip`.
    fn value_end(&self, ip: usize) -> usize {
        let insn = self.insn(ip);
        let op = insn.op();
        if op.is_container_start() {
            ip + insn.data() as usize + 2
        } else {
            ip + op.width()
        }
    }

    fn advance(&mut self) -> Result<TokenKind> {
        if self.ip >= self.end {
            return Ok(TokenKind::End);
        }
        let insn = self.insn(self.ip);
        let op = insn.op();
        let kind = match op {
            Op::FieldSid | Op::FieldSystemSid | Op::CpFieldName | Op::RefFieldName => {
                self.field_ip = Some(self.ip);
                self.ip += op.width();
                return Ok(TokenKind::FieldName);
            }
            Op::AnnotationSid | Op::AnnotationSystemSid | Op::CpAnnotation | Op::RefAnnotation => {
                let start = self.ip;
                while self.ip < self.end && self.insn(self.ip).op().is_annotation() {
                    self.ip += self.insn(self.ip).op().width();
                }
                self.annotations = start..self.ip;
                return Ok(TokenKind::Annotations);
            }
            Op::Eof | Op::ContainerEnd => {
                self.ip = self.end;
                return Ok(TokenKind::End);
            }
            Op::Parameter => {
                return Err(MacroError::UnresolvedParameter(insn.data() as usize).into());
            }
            Op::ArgStart | Op::ArgEnd | Op::InvokeCp | Op::InvokeAddress | Op::InvokeSystem => {
                return Err(MacroError::UnexpectedInvocation.into());
            }
            Op::NullNull | Op::NullTyped => TokenKind::Null,
            Op::Bool => TokenKind::Bool,
            Op::SmallInt | Op::InlineInt | Op::InlineLong | Op::CpInt | Op::RefInt => {
                TokenKind::Int
            }
            Op::InlineDouble => TokenKind::Float,
            Op::CpDecimal | Op::RefDecimal => TokenKind::Decimal,
            Op::CpTimestamp | Op::RefShortTimestamp | Op::RefLongTimestamp => TokenKind::Timestamp,
            Op::CpString | Op::RefString => TokenKind::String,
            Op::CpSymbol | Op::SymbolSid | Op::SystemSymbol | Op::RefSymbol => TokenKind::Symbol,
            Op::CpBlob | Op::RefBlob => TokenKind::Blob,
            Op::CpClob | Op::RefClob => TokenKind::Clob,
            Op::ListStart => TokenKind::List,
            Op::SexpStart => TokenKind::Sexp,
            Op::StructStart => TokenKind::Struct,
        };
        self.value_ip = self.ip;
        self.ip = self.value_end(self.ip);
        Ok(kind)
    }

    /// Resolve a symbol-valued instruction at `ip`.
    fn symbol_at(&self, ip: usize) -> Result<SymbolToken> {
        let insn = self.insn(ip);
        match insn.op() {
            Op::SymbolSid | Op::FieldSid | Op::AnnotationSid => {
                self.symbols.token(insn.data() as usize)
            }
            Op::SystemSymbol | Op::FieldSystemSid | Op::AnnotationSystemSid => {
                SymbolTable::system_token_1_1(insn.data() as usize)
            }
            Op::CpSymbol | Op::CpFieldName | Op::CpAnnotation => {
                match self.constant(insn.data()) {
                    Constant::Symbol(token) => Ok(token.clone()),
                    Constant::String(text) => Ok(SymbolToken::with_text(Arc::clone(text))),
                    _ => unreachable!("symbol instruction with a non-text constant"),
                }
            }
            Op::RefSymbol | Op::RefFieldName | Op::RefAnnotation => {
                let offset = self.operand(ip) as usize;
                let bytes = self.source_bytes(ip, insn.data() as usize)?;
                Ok(SymbolToken::with_text(wire::utf8(bytes, offset)?))
            }
            op => unreachable!("{op} is not a symbol instruction"),
        }
    }

    fn expect_value(&self, expected: TokenKind) -> Result<Instruction> {
        expect_token(self.current, expected)?;
        Ok(self.insn(self.value_ip))
    }
}

impl ValueReader for TemplateCursor<'_> {
    fn next_token(&mut self) -> Result<TokenKind> {
        if self.current == TokenKind::End {
            return Err(UsageError::PastEnd.into());
        }
        self.current = self.advance()?;
        Ok(self.current)
    }

    #[inline]
    fn current_token(&self) -> TokenKind {
        self.current
    }

    fn skip(&mut self) -> Result<()> {
        match self.current {
            TokenKind::FieldName => {
                let at = super::flatten::skip_annotations(&self.program.code[..self.end], self.ip);
                self.ip = self.value_end(at);
                self.current = TokenKind::Unset;
            }
            TokenKind::Annotations => {
                self.ip = self.value_end(self.ip);
                self.current = TokenKind::Unset;
            }
            TokenKind::End => return Err(UsageError::PastEnd.into()),
            _ => {}
        }
        Ok(())
    }

    fn null_type(&mut self) -> Result<IonType> {
        let insn = self.expect_value(TokenKind::Null)?;
        match insn.op() {
            Op::NullTyped => IonType::from_code(insn.data() as u8)
                .ok_or_else(|| DecodeError::InvalidTypedNull(insn.data() as u8).into()),
            _ => Ok(IonType::Null),
        }
    }

    fn read_bool(&mut self) -> Result<bool> {
        let insn = self.expect_value(TokenKind::Bool)?;
        Ok(insn.data() != 0)
    }

    fn read_int(&mut self) -> Result<Int> {
        let insn = self.expect_value(TokenKind::Int)?;
        let ip = self.value_ip;
        Ok(match insn.op() {
            Op::SmallInt => Int::Small(insn.signed_data() as i64),
            Op::InlineInt => Int::Small(self.operand(ip) as i32 as i64),
            Op::InlineLong => Int::Small(join_u64(self.operand(ip), self.program.code[ip + 2]) as i64),
            Op::CpInt => match self.constant(insn.data()) {
                Constant::Int(v) => v.clone(),
                _ => unreachable!("cp_int with a non-integer constant"),
            },
            _ => wire::v1_1::int(self.source_bytes(ip, insn.data() as usize)?),
        })
    }

    fn read_f64(&mut self) -> Result<f64> {
        self.expect_value(TokenKind::Float)?;
        let ip = self.value_ip;
        Ok(f64::from_bits(join_u64(
            self.operand(ip),
            self.program.code[ip + 2],
        )))
    }

    fn read_decimal(&mut self) -> Result<Decimal> {
        let insn = self.expect_value(TokenKind::Decimal)?;
        match insn.op() {
            Op::CpDecimal => match self.constant(insn.data()) {
                Constant::Decimal(d) => Ok(d.clone()),
                _ => unreachable!("cp_decimal with a non-decimal constant"),
            },
            _ => wire::v1_1::decimal(self.source_bytes(self.value_ip, insn.data() as usize)?),
        }
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        let insn = self.expect_value(TokenKind::Timestamp)?;
        let ip = self.value_ip;
        match insn.op() {
            Op::CpTimestamp => match self.constant(insn.data()) {
                Constant::Timestamp(t) => Ok(t.clone()),
                _ => unreachable!("cp_timestamp with a non-timestamp constant"),
            },
            Op::RefShortTimestamp => {
                let opcode = insn.data() as u8;
                let len = wire::v1_1::short_timestamp_len(opcode)
                    .ok_or(DecodeError::InvalidTimestamp("unknown short form"))?;
                wire::v1_1::short_timestamp(opcode, self.source_bytes(ip, len)?)
            }
            _ => wire::v1_1::long_timestamp(self.source_bytes(ip, insn.data() as usize)?),
        }
    }

    fn read_str(&mut self) -> Result<&str> {
        let insn = self.expect_value(TokenKind::String)?;
        match insn.op() {
            Op::CpString => match self.constant(insn.data()) {
                Constant::String(s) => Ok(&**s),
                _ => unreachable!("cp_string with a non-string constant"),
            },
            _ => {
                let offset = self.operand(self.value_ip) as usize;
                let bytes = self.source_bytes(self.value_ip, insn.data() as usize)?;
                wire::utf8(bytes, offset)
            }
        }
    }

    fn read_symbol(&mut self) -> Result<SymbolToken> {
        expect_token(self.current, TokenKind::Symbol)?;
        self.symbol_at(self.value_ip)
    }

    fn read_lob(&mut self) -> Result<&[u8]> {
        expect_lob(self.current)?;
        let insn = self.insn(self.value_ip);
        match insn.op() {
            Op::CpBlob | Op::CpClob => match self.constant(insn.data()) {
                Constant::Blob(b) | Constant::Clob(b) => Ok(&**b),
                _ => unreachable!("lob instruction with a non-lob constant"),
            },
            _ => self.source_bytes(self.value_ip, insn.data() as usize),
        }
    }

    fn read_field_name(&mut self) -> Result<SymbolToken> {
        if !self.in_struct {
            return Err(UsageError::NotInStruct.into());
        }
        expect_token(self.current, TokenKind::FieldName)?;
        let ip = self.field_ip.ok_or(UsageError::NotInStruct)?;
        self.symbol_at(ip)
    }

    fn read_annotations(&mut self, out: &mut Vec<SymbolToken>) -> Result<()> {
        expect_token(self.current, TokenKind::Annotations)?;
        let mut ip = self.annotations.start;
        while ip < self.annotations.end {
            out.push(self.symbol_at(ip)?);
            ip += self.insn(ip).op().width();
        }
        Ok(())
    }
}
