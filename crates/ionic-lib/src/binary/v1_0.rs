//! Ion 1.0 binary tokenizer.

use std::ops::Range;
use std::sync::Arc;

use ionic_bytecode::{Category, Length, OPCODES_1_0};
use ionic_core::varint::read_var_uint;
use ionic_core::{
    Decimal, DecodeError, Int, IonType, Result, SymbolTable, SymbolToken, Timestamp, TokenKind,
    UsageError, ValueReader, expect_lob, expect_token, wire,
};

use super::{byte_at, span, token_of};

/// Cursor over one sequence of Ion 1.0 values.
#[derive(Debug, Clone)]
pub struct Binary10Cursor<'s> {
    source: &'s [u8],
    pos: usize,
    end: usize,
    top_level: bool,
    in_struct: bool,
    symbols: Arc<SymbolTable>,
    current: TokenKind,
    /// Type descriptor of the current value.
    descriptor: u8,
    payload: Range<usize>,
    field_sid: usize,
    annotations: Range<usize>,
    /// End of the open annotation wrapper; its value must end exactly here.
    wrapper_end: Option<usize>,
    version: (u8, u8),
}

impl<'s> Binary10Cursor<'s> {
    /// Top-level cursor over all of `source`.
    pub fn new(source: &'s [u8], symbols: Arc<SymbolTable>) -> Self {
        Self::at(source, 0, symbols)
    }

    /// Top-level cursor starting at `pos`.
    pub fn at(source: &'s [u8], pos: usize, symbols: Arc<SymbolTable>) -> Self {
        Self {
            source,
            pos,
            end: source.len(),
            top_level: true,
            in_struct: false,
            symbols,
            current: TokenKind::Unset,
            descriptor: 0,
            payload: pos..pos,
            field_sid: 0,
            annotations: pos..pos,
            wrapper_end: None,
            version: (1, 0),
        }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Version announced by the most recent version marker.
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    pub fn in_struct(&self) -> bool {
        self.in_struct
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    /// Replace the table used to resolve symbol IDs.
    pub fn set_symbols(&mut self, symbols: Arc<SymbolTable>) {
        self.symbols = symbols;
    }

    /// Symbol ID of the current field name.
    pub fn field_name_sid(&self) -> Result<usize> {
        if !self.in_struct {
            return Err(UsageError::NotInStruct.into());
        }
        expect_token(self.current, TokenKind::FieldName)?;
        Ok(self.field_sid)
    }

    /// Cursor over the children of the current container.
    pub fn take_container(&mut self) -> Result<Binary10Cursor<'s>> {
        if !self.current.is_container() {
            return Err(UsageError::WrongToken {
                expected: TokenKind::List,
                found: self.current,
            }
            .into());
        }
        let start = self.payload.start;
        Ok(Binary10Cursor {
            source: self.source,
            pos: start,
            end: self.payload.end,
            top_level: false,
            in_struct: self.current == TokenKind::Struct,
            symbols: Arc::clone(&self.symbols),
            current: TokenKind::Unset,
            descriptor: 0,
            payload: start..start,
            field_sid: 0,
            annotations: start..start,
            wrapper_end: None,
            version: self.version,
        })
    }

    pub fn take_list(&mut self) -> Result<Binary10Cursor<'s>> {
        expect_token(self.current, TokenKind::List)?;
        self.take_container()
    }

    pub fn take_sexp(&mut self) -> Result<Binary10Cursor<'s>> {
        expect_token(self.current, TokenKind::Sexp)?;
        self.take_container()
    }

    pub fn take_struct(&mut self) -> Result<Binary10Cursor<'s>> {
        expect_token(self.current, TokenKind::Struct)?;
        self.take_container()
    }

    /// Whether the previous token still owes a value.
    fn pending_value(&self) -> bool {
        matches!(self.current, TokenKind::FieldName | TokenKind::Annotations)
    }

    fn advance(&mut self) -> Result<TokenKind> {
        loop {
            if self.pos >= self.end {
                if self.pending_value() {
                    return Err(DecodeError::Truncated.into());
                }
                return Ok(TokenKind::End);
            }
            if self.in_struct && !self.pending_value() {
                let (sid, n) = read_var_uint(self.source, self.pos)?;
                self.pos += n;
                self.field_sid = sid;
                // Padding may carry a field name; both are dropped.
                if self.pos < self.end
                    && OPCODES_1_0[self.source[self.pos] as usize].category == Category::Nop
                {
                    self.pos = self.value_span(self.pos)?.1;
                    continue;
                }
                return Ok(TokenKind::FieldName);
            }

            let start = self.pos;
            let td = self.source[start];
            let info = OPCODES_1_0[td as usize];
            match info.category {
                Category::Nop => {
                    if self.current == TokenKind::Annotations {
                        return Err(invalid(td, start));
                    }
                    self.pos = self.value_span(start)?.1;
                }
                Category::VersionMarker => {
                    if !self.top_level || self.pending_value() {
                        return Err(invalid(td, start));
                    }
                    let marker = span(self.source, start, 4, self.end)?;
                    let bytes = &self.source[marker];
                    if bytes[3] != 0xEA {
                        return Err(invalid(bytes[3], start + 3));
                    }
                    self.version = (bytes[1], bytes[2]);
                    self.pos = start + 4;
                    return Ok(TokenKind::VersionMarker);
                }
                Category::Annotations => {
                    if self.current == TokenKind::Annotations {
                        return Err(invalid(td, start));
                    }
                    let (payload, wrapper_end) = self.value_span(start)?;
                    let (annot_len, n) = read_var_uint(self.source, payload.start)?;
                    let annotations = span(self.source, payload.start + n, annot_len, wrapper_end)?;
                    if annotations.is_empty() || annotations.end == wrapper_end {
                        return Err(invalid(td, start));
                    }
                    self.pos = annotations.end;
                    self.annotations = annotations;
                    self.wrapper_end = Some(wrapper_end);
                    return Ok(TokenKind::Annotations);
                }
                Category::Invalid
                | Category::DelimitedEnd
                | Category::MacroInvocation => return Err(invalid(td, start)),
                category => {
                    let (payload, value_end) = self.value_span(start)?;
                    if self.wrapper_end.take().is_some_and(|w| w != value_end) {
                        return Err(DecodeError::Truncated.into());
                    }
                    self.descriptor = td;
                    self.payload = payload;
                    self.pos = value_end;
                    return Ok(token_of(category));
                }
            }
        }
    }

    /// Payload range and end of the item whose type descriptor is at `start`.
    fn value_span(&self, start: usize) -> Result<(Range<usize>, usize)> {
        let td = byte_at(self.source, start)?;
        let (len, header) = match OPCODES_1_0[td as usize].length {
            Length::Fixed(n) => (n as usize, 1),
            Length::VarUInt => {
                let (len, n) = read_var_uint(self.source, start + 1)?;
                (len, 1 + n)
            }
            _ => unreachable!("1.0 opcodes carry fixed or VarUInt lengths"),
        };
        let payload = span(self.source, start + header, len, self.end)?;
        let end = payload.end;
        Ok((payload, end))
    }

    fn bytes(&self) -> &'s [u8] {
        let source: &'s [u8] = self.source;
        &source[self.payload.clone()]
    }

    fn expect_value(&self, expected: TokenKind) -> Result<&'s [u8]> {
        expect_token(self.current, expected)?;
        Ok(self.bytes())
    }
}

fn invalid(opcode: u8, position: usize) -> ionic_core::Error {
    DecodeError::InvalidOpcode { opcode, position }.into()
}

impl ValueReader for Binary10Cursor<'_> {
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
            TokenKind::FieldName | TokenKind::Annotations => {
                while self.pending_value() {
                    self.current = self.advance()?;
                }
                self.current = TokenKind::Unset;
            }
            TokenKind::End => return Err(UsageError::PastEnd.into()),
            _ => {}
        }
        Ok(())
    }

    fn null_type(&mut self) -> Result<IonType> {
        expect_token(self.current, TokenKind::Null)?;
        if self.descriptor == 0x0F {
            return Ok(IonType::Null);
        }
        IonType::from_type_code(self.descriptor >> 4)
            .ok_or_else(|| DecodeError::InvalidTypedNull(self.descriptor).into())
    }

    fn read_bool(&mut self) -> Result<bool> {
        expect_token(self.current, TokenKind::Bool)?;
        Ok(self.descriptor & 0x0F == 1)
    }

    fn read_int(&mut self) -> Result<Int> {
        let bytes = self.expect_value(TokenKind::Int)?;
        Ok(wire::v1_0::int(bytes, self.descriptor >> 4 == 0x3))
    }

    fn read_f64(&mut self) -> Result<f64> {
        wire::v1_0::float(self.expect_value(TokenKind::Float)?)
    }

    fn read_decimal(&mut self) -> Result<Decimal> {
        wire::v1_0::decimal(self.expect_value(TokenKind::Decimal)?)
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        wire::v1_0::timestamp(self.expect_value(TokenKind::Timestamp)?)
    }

    fn read_str(&mut self) -> Result<&str> {
        let bytes = self.expect_value(TokenKind::String)?;
        wire::utf8(bytes, self.payload.start)
    }

    fn read_symbol(&mut self) -> Result<SymbolToken> {
        let sid = wire::v1_0::sid(self.expect_value(TokenKind::Symbol)?)?;
        self.symbols.token(sid)
    }

    fn read_lob(&mut self) -> Result<&[u8]> {
        expect_lob(self.current)?;
        Ok(self.bytes())
    }

    fn read_field_name(&mut self) -> Result<SymbolToken> {
        let sid = self.field_name_sid()?;
        self.symbols.token(sid)
    }

    fn read_annotations(&mut self, out: &mut Vec<SymbolToken>) -> Result<()> {
        expect_token(self.current, TokenKind::Annotations)?;
        let mut pos = self.annotations.start;
        while pos < self.annotations.end {
            let (sid, n) = read_var_uint(self.source, pos)?;
            out.push(self.symbols.token(sid)?);
            pos += n;
        }
        Ok(())
    }
}
