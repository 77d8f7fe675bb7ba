//! Ion 1.1 binary tokenizer.
//!
//! Length-prefixed values are framed from their opcode alone. Delimited
//! containers are scanned once to find their terminator, which needs the
//! active macro table: an e-expression inside a delimited container can only
//! be stepped over by reading its arguments.

use std::ops::Range;
use std::sync::Arc;

use ionic_bytecode::{Category, Length, Macro, OPCODES_1_1};
use ionic_core::flex::{FlexSym, read_flex_len, read_flex_sym, read_flex_uint};
use ionic_core::{
    Decimal, DecodeError, Int, IonType, Result, SymbolTable, SymbolToken, Timestamp, TokenKind,
    UsageError, ValueReader, expect_lob, expect_token, wire,
};

use super::eexp::{self, EExpHeader};
use super::{SymRef, byte_at, span, token_of};

/// How a struct encodes its field names.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FieldNames {
    /// FlexUInt symbol IDs; ID 0 switches to `FlexSym`.
    Sid,
    FlexSym,
}

/// Cursor over one sequence of Ion 1.1 values.
#[derive(Debug, Clone)]
pub struct Binary11Cursor<'s> {
    source: &'s [u8],
    pos: usize,
    end: usize,
    top_level: bool,
    fields: Option<FieldNames>,
    symbols: Arc<SymbolTable>,
    macros: Arc<[Arc<Macro>]>,
    current: TokenKind,
    opcode: u8,
    payload: Range<usize>,
    field: SymRef,
    annotations: Range<usize>,
    flex_annotations: bool,
    invocation: Option<EExpHeader>,
    version: (u8, u8),
}

impl<'s> Binary11Cursor<'s> {
    /// Top-level cursor over all of `source`.
    pub fn new(source: &'s [u8], symbols: Arc<SymbolTable>, macros: Arc<[Arc<Macro>]>) -> Self {
        Self::at(source, 0, symbols, macros)
    }

    /// Top-level cursor starting at `pos`.
    pub fn at(
        source: &'s [u8],
        pos: usize,
        symbols: Arc<SymbolTable>,
        macros: Arc<[Arc<Macro>]>,
    ) -> Self {
        Self {
            source,
            pos,
            end: source.len(),
            top_level: true,
            fields: None,
            symbols,
            macros,
            current: TokenKind::Unset,
            opcode: 0,
            payload: pos..pos,
            field: SymRef::Sid(0),
            annotations: pos..pos,
            flex_annotations: false,
            invocation: None,
            version: (1, 1),
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
        self.fields.is_some()
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    pub fn set_symbols(&mut self, symbols: Arc<SymbolTable>) {
        self.symbols = symbols;
    }

    pub fn macros(&self) -> &Arc<[Arc<Macro>]> {
        &self.macros
    }

    pub fn set_macros(&mut self, macros: Arc<[Arc<Macro>]>) {
        self.macros = macros;
    }

    /// Header of the e-expression the cursor is positioned on.
    pub fn invocation(&self) -> Option<EExpHeader> {
        self.invocation
    }

    /// Continue after an e-expression whose arguments end at `end`.
    pub fn resume_at(&mut self, end: usize) -> Result<()> {
        let header = self.invocation.take().ok_or(UsageError::WrongToken {
            expected: TokenKind::MacroInvocation,
            found: self.current,
        })?;
        if header.length.is_some_and(|len| header.args + len != end) || end > self.end {
            return Err(DecodeError::Truncated.into());
        }
        self.pos = end;
        self.current = TokenKind::Unset;
        Ok(())
    }

    /// Cursor over the children of the current container.
    pub fn take_container(&mut self) -> Result<Binary11Cursor<'s>> {
        if !self.current.is_container() {
            return Err(UsageError::WrongToken {
                expected: TokenKind::List,
                found: self.current,
            }
            .into());
        }
        let fields = match self.opcode {
            0xD0 | 0xD2..=0xDF | 0xFD => Some(FieldNames::Sid),
            0xF3 => Some(FieldNames::FlexSym),
            _ => None,
        };
        let start = self.payload.start;
        Ok(Binary11Cursor {
            source: self.source,
            pos: start,
            end: self.payload.end,
            top_level: false,
            fields,
            symbols: Arc::clone(&self.symbols),
            macros: Arc::clone(&self.macros),
            current: TokenKind::Unset,
            opcode: 0,
            payload: start..start,
            field: SymRef::Sid(0),
            annotations: start..start,
            flex_annotations: false,
            invocation: None,
            version: self.version,
        })
    }

    pub fn take_list(&mut self) -> Result<Binary11Cursor<'s>> {
        expect_token(self.current, TokenKind::List)?;
        self.take_container()
    }

    pub fn take_sexp(&mut self) -> Result<Binary11Cursor<'s>> {
        expect_token(self.current, TokenKind::Sexp)?;
        self.take_container()
    }

    pub fn take_struct(&mut self) -> Result<Binary11Cursor<'s>> {
        expect_token(self.current, TokenKind::Struct)?;
        self.take_container()
    }

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
            if self.fields.is_some() && !self.pending_value() {
                if self.read_field()? {
                    return Ok(TokenKind::FieldName);
                }
                continue;
            }

            let start = self.pos;
            let op = self.source[start];
            match OPCODES_1_1[op as usize].category {
                Category::Nop => {
                    if self.current == TokenKind::Annotations {
                        return Err(invalid(op, start));
                    }
                    self.pos = prefixed_extent(self.source, start, self.end)?.1;
                }
                Category::VersionMarker => {
                    if !self.top_level || self.pending_value() {
                        return Err(invalid(op, start));
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
                        return Err(invalid(op, start));
                    }
                    let (range, flex) = annotation_span(self.source, start, self.end)?;
                    self.pos = range.end;
                    self.annotations = range;
                    self.flex_annotations = flex;
                    return Ok(TokenKind::Annotations);
                }
                Category::MacroInvocation => {
                    if self.current == TokenKind::Annotations {
                        return Err(invalid(op, start));
                    }
                    let header = eexp::read_header(self.source, start)?;
                    self.pos = header.args;
                    self.invocation = Some(header);
                    return Ok(TokenKind::MacroInvocation);
                }
                Category::DelimitedEnd | Category::Invalid => return Err(invalid(op, start)),
                category => {
                    let (payload, value_end) = self.extent(start)?;
                    self.opcode = op;
                    self.payload = payload;
                    self.pos = value_end;
                    return Ok(token_of(category));
                }
            }
        }
    }

    /// Read one field name. False when the name only switched the encoding
    /// mode or was followed by padding.
    fn read_field(&mut self) -> Result<bool> {
        let flex = self.fields == Some(FieldNames::FlexSym);
        let (name, n) = read_sym(self.source, self.pos, flex)?;
        self.pos += n;
        if !flex && name == SymRef::Sid(0) {
            self.fields = Some(FieldNames::FlexSym);
            return Ok(false);
        }
        if self.pos < self.end && is_nop(self.source[self.pos]) {
            self.pos = prefixed_extent(self.source, self.pos, self.end)?.1;
            return Ok(false);
        }
        self.field = name;
        Ok(true)
    }

    /// Payload range and end of the value at `start`, scanning delimited
    /// containers for their terminator.
    fn extent(&self, start: usize) -> Result<(Range<usize>, usize)> {
        let op = byte_at(self.source, start)?;
        if OPCODES_1_1[op as usize].length != Length::Delimited {
            return prefixed_extent(self.source, start, self.end);
        }
        let body = start + 1;
        let close = self.scan_delimited(op, body)?;
        let terminator = if op == 0xF3 { 2 } else { 1 };
        Ok((body..close, close + terminator))
    }

    /// Offset of the terminator of the delimited container whose body starts
    /// at `body`.
    ///
    /// Nested delimited containers are tracked on an explicit stack, so
    /// nesting depth costs heap rather than call stack.
    fn scan_delimited(&self, op: u8, body: usize) -> Result<usize> {
        // Opcodes of the containers still open, innermost last.
        let mut open = vec![op];
        let mut pos = body;
        while let Some(&inner) = open.last() {
            if pos >= self.end {
                return Err(DecodeError::Truncated.into());
            }
            if inner == 0xF3 {
                let (name, n) = read_flex_sym(self.source, pos)?;
                if name == FlexSym::End {
                    open.pop();
                    if open.is_empty() {
                        return Ok(pos);
                    }
                    pos += n;
                    continue;
                }
                pos += n;
            } else if self.source[pos] == 0xF0 {
                open.pop();
                if open.is_empty() {
                    return Ok(pos);
                }
                pos += 1;
                continue;
            }

            let mut op = byte_at(self.source, pos)?;
            while OPCODES_1_1[op as usize].category == Category::Annotations {
                pos = annotation_span(self.source, pos, self.end)?.0.end;
                op = byte_at(self.source, pos)?;
            }
            let info = OPCODES_1_1[op as usize];
            pos = match info.category {
                Category::MacroInvocation => {
                    let header = eexp::read_header(self.source, pos)?;
                    eexp::skip_invocation(self.source, header, &self.macros)?
                }
                Category::VersionMarker | Category::DelimitedEnd | Category::Invalid => {
                    return Err(invalid(op, pos));
                }
                _ if info.length == Length::Delimited => {
                    open.push(op);
                    pos + 1
                }
                _ => prefixed_extent(self.source, pos, self.end)?.1,
            };
        }
        unreachable!("delimited scan left without a container")
    }

    fn skip_invocation(&mut self) -> Result<()> {
        let Some(header) = self.invocation else {
            return Ok(());
        };
        let end = eexp::skip_invocation(self.source, header, &self.macros)?;
        self.resume_at(end)
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

pub(crate) fn invalid(opcode: u8, position: usize) -> ionic_core::Error {
    DecodeError::InvalidOpcode { opcode, position }.into()
}

#[inline]
pub(crate) fn is_nop(op: u8) -> bool {
    OPCODES_1_1[op as usize].category == Category::Nop
}

/// Payload range and end of the length-prefixed value at `start`.
pub(crate) fn prefixed_extent(
    source: &[u8],
    start: usize,
    limit: usize,
) -> Result<(Range<usize>, usize)> {
    let op = byte_at(source, start)?;
    let (header, len) = match OPCODES_1_1[op as usize].length {
        Length::Fixed(n) => (1, n as usize),
        Length::FlexUInt => {
            let (len, n) = read_flex_len(source, start + 1)?;
            (1 + n, len)
        }
        // The payload of 0xE3 is the FlexUInt itself.
        Length::Special if op == 0xE3 => (1, read_flex_uint(source, start + 1)?.1),
        _ => return Err(invalid(op, start)),
    };
    let payload = span(source, start + header, len, limit)?;
    let end = payload.end;
    Ok((payload, end))
}

/// Encoded symbols of the annotation sequence at `start`, and whether they are
/// FlexSyms. The range ends where the annotated value begins.
pub(crate) fn annotation_span(
    source: &[u8],
    start: usize,
    limit: usize,
) -> Result<(Range<usize>, bool)> {
    let op = byte_at(source, start)?;
    let body = start + 1;
    let flex = matches!(op, 0xE7..=0xE9);
    let range = match op {
        0xE4 | 0xE5 | 0xE7 | 0xE8 => {
            let count = if matches!(op, 0xE4 | 0xE7) { 1 } else { 2 };
            let mut pos = body;
            for _ in 0..count {
                pos += read_sym(source, pos, flex)?.1;
            }
            body..pos
        }
        0xE6 | 0xE9 => {
            let (len, n) = read_flex_len(source, body)?;
            span(source, body + n, len, limit)?
        }
        _ => return Err(invalid(op, start)),
    };
    if range.end > limit {
        return Err(DecodeError::Truncated.into());
    }
    Ok((range, flex))
}

/// Read one symbol reference: a FlexUInt symbol ID, or a FlexSym when `flex`.
pub(crate) fn read_sym(source: &[u8], pos: usize, flex: bool) -> Result<(SymRef, usize)> {
    if !flex {
        let (sid, n) = read_flex_len(source, pos)?;
        return Ok((SymRef::Sid(sid), n));
    }
    let (sym, n) = read_flex_sym(source, pos)?;
    let sym = match sym {
        FlexSym::Sid(sid) => SymRef::Sid(sid),
        FlexSym::Text(text) => SymRef::Text(pos + n - text.len()..pos + n),
        FlexSym::System(sid) => SymRef::System(sid),
        FlexSym::End => return Err(invalid(0xF0, pos + n - 1)),
    };
    Ok((sym, n))
}

/// Symbol ID carried by the `0xE1..=0xE3` forms.
pub(crate) fn symbol_id(op: u8, source: &[u8], payload: Range<usize>) -> Result<usize> {
    let bytes = &source[payload.clone()];
    Ok(match op {
        0xE1 => bytes[0] as usize,
        0xE2 => u16::from_le_bytes([bytes[0], bytes[1]]) as usize + 256,
        _ => {
            let (sid, _) = read_flex_uint(source, payload.start)?;
            usize::try_from(sid).map_err(|_| DecodeError::IntegerOverflow)? + 65792
        }
    })
}

impl ValueReader for Binary11Cursor<'_> {
    fn next_token(&mut self) -> Result<TokenKind> {
        if self.current == TokenKind::End {
            return Err(UsageError::PastEnd.into());
        }
        self.skip_invocation()?;
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
                self.skip_invocation()?;
                self.current = TokenKind::Unset;
            }
            TokenKind::MacroInvocation => {
                self.skip_invocation()?;
                self.current = TokenKind::Unset;
            }
            TokenKind::End => return Err(UsageError::PastEnd.into()),
            _ => {}
        }
        Ok(())
    }

    fn null_type(&mut self) -> Result<IonType> {
        let bytes = self.expect_value(TokenKind::Null)?;
        match bytes.first() {
            None => Ok(IonType::Null),
            Some(&code) => {
                IonType::from_typed_null(code).ok_or_else(|| DecodeError::InvalidTypedNull(code).into())
            }
        }
    }

    fn read_bool(&mut self) -> Result<bool> {
        expect_token(self.current, TokenKind::Bool)?;
        Ok(self.opcode == 0x6E)
    }

    fn read_int(&mut self) -> Result<Int> {
        Ok(wire::v1_1::int(self.expect_value(TokenKind::Int)?))
    }

    fn read_f64(&mut self) -> Result<f64> {
        wire::v1_1::float(self.expect_value(TokenKind::Float)?)
    }

    fn read_decimal(&mut self) -> Result<Decimal> {
        wire::v1_1::decimal(self.expect_value(TokenKind::Decimal)?)
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        let bytes = self.expect_value(TokenKind::Timestamp)?;
        match self.opcode {
            0xF8 => wire::v1_1::long_timestamp(bytes),
            op => wire::v1_1::short_timestamp(op, bytes),
        }
    }

    fn read_str(&mut self) -> Result<&str> {
        let bytes = self.expect_value(TokenKind::String)?;
        wire::utf8(bytes, self.payload.start)
    }

    fn read_symbol(&mut self) -> Result<SymbolToken> {
        let bytes = self.expect_value(TokenKind::Symbol)?;
        match self.opcode {
            0xA0..=0xAF | 0xFA => {
                let text = wire::utf8(bytes, self.payload.start)?;
                Ok(SymbolToken::with_text(text))
            }
            0xEE => SymbolTable::system_token_1_1(bytes[0] as usize),
            op => self
                .symbols
                .token(symbol_id(op, self.source, self.payload.clone())?),
        }
    }

    fn read_lob(&mut self) -> Result<&[u8]> {
        expect_lob(self.current)?;
        Ok(self.bytes())
    }

    fn read_field_name(&mut self) -> Result<SymbolToken> {
        if self.fields.is_none() {
            return Err(UsageError::NotInStruct.into());
        }
        expect_token(self.current, TokenKind::FieldName)?;
        self.field.resolve(self.source, &self.symbols)
    }

    fn read_annotations(&mut self, out: &mut Vec<SymbolToken>) -> Result<()> {
        expect_token(self.current, TokenKind::Annotations)?;
        let mut pos = self.annotations.start;
        while pos < self.annotations.end {
            let (sym, n) = read_sym(self.source, pos, self.flex_annotations)?;
            out.push(sym.resolve(self.source, &self.symbols)?);
            pos += n;
        }
        Ok(())
    }
}
