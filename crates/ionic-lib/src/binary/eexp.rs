//! E-expressions: headers, and their arguments compiled to bytecode.
//!
//! The argument compiler writes one `ArgStart`..`ArgEnd` block per parameter
//! of the invoked macro, in the form the flattener consumes:
//!
//! - tagged scalars become source references (or inline words for bools,
//!   floats and symbol IDs), so payloads are decoded only if read
//! - containers are compiled inline, nested e-expressions become their own
//!   argument blocks followed by an invocation
//! - tagless encodings are decoded eagerly, since their bytes carry no opcode
//!   to decode them from later

use std::sync::Arc;

use ionic_bytecode::{
    BytecodeBuilder, Cardinality, Category, Instruction, Macro, Op, OPCODES_1_1, Parameter,
    ParameterEncoding, SystemMacro,
};
use ionic_core::flex::{
    FlexSym, fixed_int, fixed_uint, read_flex_int, read_flex_len, read_flex_sym, read_flex_uint,
};
use ionic_core::{DecodeError, Int, IonType, MacroError, Result, wire};

use super::v1_1::{annotation_span, invalid, is_nop, prefixed_extent, read_sym, symbol_id};
use super::{SymRef, byte_at, span};

/// Nesting bound for containers and e-expressions inside arguments.
const MAX_NESTING: usize = 512;

/// Where an e-expression's macro lives.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MacroAddress {
    /// Index into the active macro table.
    Table(usize),
    /// Index into the system macro table.
    System(usize),
}

impl MacroAddress {
    /// The macro at this address.
    pub fn resolve(self, macros: &[Arc<Macro>]) -> Result<Arc<Macro>> {
        match self {
            MacroAddress::Table(address) => macros
                .get(address)
                .cloned()
                .ok_or_else(|| MacroError::UndefinedMacro(address).into()),
            MacroAddress::System(address) => SystemMacro::from_address(address)
                .map(Macro::system)
                .ok_or_else(|| MacroError::UndefinedMacro(address).into()),
        }
    }

    /// Invocation instruction for this address.
    pub fn instruction(self) -> Result<Instruction> {
        let (op, address) = match self {
            MacroAddress::Table(address) => (Op::InvokeAddress, address),
            MacroAddress::System(address) => (Op::InvokeSystem, address),
        };
        Ok(Instruction::new(op, data(address)?))
    }
}

/// Decoded e-expression opcode and address.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EExpHeader {
    pub address: MacroAddress,
    /// Offset of the first byte after the address (presence bits or arguments).
    pub args: usize,
    /// Byte length of the arguments, for the length-prefixed form.
    pub length: Option<usize>,
}

/// Read the e-expression header at `pos`.
pub fn read_header(source: &[u8], pos: usize) -> Result<EExpHeader> {
    let op = byte_at(source, pos)?;
    let low = (op & 0x0F) as usize;
    let (address, args, length) = match op {
        0x00..=0x3F => (MacroAddress::Table(op as usize), pos + 1, None),
        0x40..=0x4F => {
            let high = byte_at(source, pos + 1)? as usize;
            (MacroAddress::Table(((high << 4) | low) + 64), pos + 2, None)
        }
        0x50..=0x5F => {
            let high = u16::from_le_bytes([byte_at(source, pos + 1)?, byte_at(source, pos + 2)?]);
            let address = (((high as usize) << 4) | low) + 4160;
            (MacroAddress::Table(address), pos + 3, None)
        }
        0xEF => {
            let address = byte_at(source, pos + 1)? as usize;
            (MacroAddress::System(address), pos + 2, None)
        }
        0xF4 => {
            let (address, n) = read_flex_len(source, pos + 1)?;
            (MacroAddress::Table(address), pos + 1 + n, None)
        }
        0xF5 => {
            let (address, n) = read_flex_len(source, pos + 1)?;
            let (len, m) = read_flex_len(source, pos + 1 + n)?;
            (MacroAddress::Table(address), pos + 1 + n + m, Some(len))
        }
        _ => return Err(invalid(op, pos)),
    };
    Ok(EExpHeader {
        address,
        args,
        length,
    })
}

/// End of the e-expression described by `header`.
pub fn skip_invocation(source: &[u8], header: EExpHeader, macros: &[Arc<Macro>]) -> Result<usize> {
    if let Some(len) = header.length {
        return Ok(span(source, header.args, len, source.len())?.end);
    }
    let mut scratch = BytecodeBuilder::new();
    ArgCompiler::new(source, macros, &mut scratch).invocation(header)
}

/// 24-bit instruction data, or a limit error.
fn data(value: usize) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|&v| v <= Instruction::MAX_DATA)
        .ok_or_else(|| MacroError::LimitExceeded(Instruction::MAX_DATA as usize).into())
}

#[derive(Clone, Copy)]
enum Role {
    Value,
    Field,
    Annotation,
}

/// Compiles e-expression arguments into a bytecode builder.
pub struct ArgCompiler<'a> {
    source: &'a [u8],
    macros: &'a [Arc<Macro>],
    out: &'a mut BytecodeBuilder,
    depth: usize,
}

impl<'a> ArgCompiler<'a> {
    pub fn new(source: &'a [u8], macros: &'a [Arc<Macro>], out: &'a mut BytecodeBuilder) -> Self {
        Self {
            source,
            macros,
            out,
            depth: 0,
        }
    }

    /// Compile the e-expression described by `header`: its argument blocks,
    /// then its invocation. Returns the offset after the e-expression.
    pub fn invocation(&mut self, header: EExpHeader) -> Result<usize> {
        let target = header.address.resolve(self.macros)?;
        let end = self.arguments(&target, header.args)?;
        if header.length.is_some_and(|len| header.args + len != end) {
            return Err(DecodeError::Truncated.into());
        }
        self.out.extend_raw(&[header.address.instruction()?.raw()]);
        Ok(end)
    }

    /// Compile one argument block per parameter of `target`, reading from
    /// `pos`. Returns the offset after the last argument.
    pub fn arguments(&mut self, target: &Macro, pos: usize) -> Result<usize> {
        let presence = span(self.source, pos, target.presence_bytes(), self.source.len())?;
        let mut pos = presence.end;
        let mut slot = 0;
        for param in target.signature() {
            self.out.start(Op::ArgStart);
            if param.cardinality == Cardinality::ExactlyOne {
                pos = self.single(param, pos)?;
            } else {
                let byte = self.source[presence.start + slot / 4];
                let bits = (byte >> ((slot % 4) * 2)) & 0b11;
                slot += 1;
                pos = match bits {
                    0b00 => pos,
                    0b01 => self.single(param, pos)?,
                    0b10 => self.group(param, pos)?,
                    _ => return Err(DecodeError::InvalidPresenceBits.into()),
                };
            }
            self.out.end();
        }
        Ok(pos)
    }

    fn single(&mut self, param: &Parameter, pos: usize) -> Result<usize> {
        match param.encoding {
            ParameterEncoding::Tagged => self.tagged(pos),
            encoding => self.tagless(encoding, pos),
        }
    }

    fn group(&mut self, param: &Parameter, pos: usize) -> Result<usize> {
        let (len, n) = read_flex_len(self.source, pos)?;
        let body = pos + n;
        if len > 0 {
            let range = span(self.source, body, len, self.source.len())?;
            let mut pos = range.start;
            while pos < range.end {
                pos = self.single(param, pos)?;
            }
            if pos != range.end {
                return Err(DecodeError::Truncated.into());
            }
            return Ok(pos);
        }
        if param.encoding == ParameterEncoding::Tagged {
            let mut pos = body;
            while byte_at(self.source, pos)? != 0xF0 {
                pos = self.tagged(pos)?;
            }
            return Ok(pos + 1);
        }
        // Delimited tagless groups are length-prefixed chunks ending with an empty one.
        let mut pos = body;
        loop {
            let (chunk, n) = read_flex_len(self.source, pos)?;
            pos += n;
            if chunk == 0 {
                return Ok(pos);
            }
            let range = span(self.source, pos, chunk, self.source.len())?;
            while pos < range.end {
                pos = self.single(param, pos)?;
            }
            if pos != range.end {
                return Err(DecodeError::Truncated.into());
            }
        }
    }

    fn tagless(&mut self, encoding: ParameterEncoding, pos: usize) -> Result<usize> {
        if let Some(width) = encoding.fixed_width() {
            let range = span(self.source, pos, width, self.source.len())?;
            let bytes = &self.source[range.clone()];
            match encoding {
                ParameterEncoding::Float16
                | ParameterEncoding::Float32
                | ParameterEncoding::Float64 => self.out.double(wire::v1_1::float(bytes)?),
                ParameterEncoding::UInt8
                | ParameterEncoding::UInt16
                | ParameterEncoding::UInt32
                | ParameterEncoding::UInt64 => self.out.int(&fixed_uint(bytes)),
                _ => self.out.int(&fixed_int(bytes)),
            }
            return Ok(range.end);
        }
        match encoding {
            ParameterEncoding::FlexUInt => {
                let (value, n) = read_flex_uint(self.source, pos)?;
                match i64::try_from(value) {
                    Ok(v) => self.out.i64(v),
                    Err(_) => self.out.int(&Int::from_magnitude_be(&value.to_be_bytes(), false)),
                }
                Ok(pos + n)
            }
            ParameterEncoding::FlexInt => {
                let (value, n) = read_flex_int(self.source, pos)?;
                self.out.i64(value);
                Ok(pos + n)
            }
            ParameterEncoding::FlexSym => {
                let (sym, n) = read_flex_sym(self.source, pos)?;
                if sym == FlexSym::End {
                    return Err(invalid(0xF0, pos + n - 1));
                }
                let (sym, n) = read_sym(self.source, pos, true)?;
                self.symbol(sym, Role::Value)?;
                Ok(pos + n)
            }
            _ => unreachable!("tagged parameters are read by opcode"),
        }
    }

    /// Compile the tagged value at `pos`.
    fn tagged(&mut self, pos: usize) -> Result<usize> {
        let op = byte_at(self.source, pos)?;
        match OPCODES_1_1[op as usize].category {
            Category::MacroInvocation => {
                let header = read_header(self.source, pos)?;
                self.nested(|c| c.invocation(header))
            }
            Category::Annotations => {
                let (range, flex) = annotation_span(self.source, pos, self.source.len())?;
                let mut at = range.start;
                while at < range.end {
                    let (sym, n) = read_sym(self.source, at, flex)?;
                    self.symbol(sym, Role::Annotation)?;
                    at += n;
                }
                let next = byte_at(self.source, range.end)?;
                if matches!(
                    OPCODES_1_1[next as usize].category,
                    Category::Annotations | Category::MacroInvocation | Category::Nop
                ) {
                    return Err(invalid(next, range.end));
                }
                self.tagged(range.end)
            }
            Category::Null => {
                if op == 0xEA {
                    self.out.null(IonType::Null);
                    return Ok(pos + 1);
                }
                let code = byte_at(self.source, pos + 1)?;
                let ty = IonType::from_typed_null(code).ok_or(DecodeError::InvalidTypedNull(code))?;
                self.out.null(ty);
                Ok(pos + 2)
            }
            Category::Bool => {
                self.out.bool(op == 0x6E);
                Ok(pos + 1)
            }
            Category::Float => {
                let (payload, end) = prefixed_extent(self.source, pos, self.source.len())?;
                self.out.double(wire::v1_1::float(&self.source[payload])?);
                Ok(end)
            }
            Category::Int => self.reference(Op::RefInt, pos),
            Category::Decimal => self.reference(Op::RefDecimal, pos),
            Category::String => self.reference(Op::RefString, pos),
            Category::Blob => self.reference(Op::RefBlob, pos),
            Category::Clob => self.reference(Op::RefClob, pos),
            Category::Timestamp if op == 0xF8 => self.reference(Op::RefLongTimestamp, pos),
            Category::Timestamp => {
                let (payload, end) = prefixed_extent(self.source, pos, self.source.len())?;
                let offset = u32::try_from(payload.start)
                    .map_err(|_| MacroError::LimitExceeded(u32::MAX as usize))?;
                self.out.emit(Op::RefShortTimestamp, op as u32);
                self.out.extend_raw(&[offset]);
                Ok(end)
            }
            Category::Symbol => match op {
                0xA0..=0xAF | 0xFA => self.reference(Op::RefSymbol, pos),
                0xEE => {
                    let sid = byte_at(self.source, pos + 1)?;
                    self.out.emit(Op::SystemSymbol, sid as u32);
                    Ok(pos + 2)
                }
                _ => {
                    let (payload, end) = prefixed_extent(self.source, pos, self.source.len())?;
                    let sid = symbol_id(op, self.source, payload)?;
                    self.out.emit(Op::SymbolSid, data(sid)?);
                    Ok(end)
                }
            },
            Category::List | Category::Sexp => self.nested(|c| c.sequence(pos)),
            Category::Struct => self.nested(|c| c.structure(pos)),
            Category::Nop
            | Category::VersionMarker
            | Category::DelimitedEnd
            | Category::Invalid => Err(invalid(op, pos)),
        }
    }

    fn reference(&mut self, op: Op, pos: usize) -> Result<usize> {
        let (payload, end) = prefixed_extent(self.source, pos, self.source.len())?;
        self.out.source_ref(op, payload.start, payload.len())?;
        Ok(end)
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<usize>) -> Result<usize> {
        if self.depth >= MAX_NESTING {
            return Err(DecodeError::DepthExceeded(MAX_NESTING).into());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn skip_padding(&self, mut pos: usize, limit: usize) -> Result<usize> {
        while pos < limit && is_nop(self.source[pos]) {
            pos = prefixed_extent(self.source, pos, limit)?.1;
        }
        Ok(pos)
    }

    fn sequence(&mut self, pos: usize) -> Result<usize> {
        let op = self.source[pos];
        let kind = match op {
            0xB0..=0xBF | 0xFB | 0xF1 => Op::ListStart,
            _ => Op::SexpStart,
        };
        self.out.start(kind);
        let end = if op == 0xF1 || op == 0xF2 {
            let limit = self.source.len();
            let mut at = pos + 1;
            loop {
                at = self.skip_padding(at, limit)?;
                if byte_at(self.source, at)? == 0xF0 {
                    break at + 1;
                }
                at = self.tagged(at)?;
            }
        } else {
            let (payload, end) = prefixed_extent(self.source, pos, self.source.len())?;
            let mut at = self.skip_padding(payload.start, payload.end)?;
            while at < payload.end {
                at = self.tagged(at)?;
                at = self.skip_padding(at, payload.end)?;
            }
            if at != payload.end {
                return Err(DecodeError::Truncated.into());
            }
            end
        };
        self.out.end();
        Ok(end)
    }

    fn structure(&mut self, pos: usize) -> Result<usize> {
        let op = self.source[pos];
        self.out.start(Op::StructStart);
        let end = if op == 0xF3 {
            let mut at = pos + 1;
            loop {
                let (name, n) = read_flex_sym(self.source, at)?;
                if name == FlexSym::End {
                    break at + n;
                }
                let (name, n) = read_sym(self.source, at, true)?;
                at = self.field(name, at + n)?;
            }
        } else {
            let (payload, end) = prefixed_extent(self.source, pos, self.source.len())?;
            let mut flex = false;
            let mut at = payload.start;
            while at < payload.end {
                let (name, n) = read_sym(self.source, at, flex)?;
                at += n;
                if !flex && name == SymRef::Sid(0) {
                    flex = true;
                    continue;
                }
                at = self.field(name, at)?;
            }
            if at != payload.end {
                return Err(DecodeError::Truncated.into());
            }
            end
        };
        self.out.end();
        Ok(end)
    }

    /// Compile one struct field whose value starts at `pos`. A field whose
    /// value is padding is dropped.
    fn field(&mut self, name: SymRef, pos: usize) -> Result<usize> {
        if is_nop(byte_at(self.source, pos)?) {
            return Ok(prefixed_extent(self.source, pos, self.source.len())?.1);
        }
        self.symbol(name, Role::Field)?;
        self.tagged(pos)
    }

    fn symbol(&mut self, sym: SymRef, role: Role) -> Result<()> {
        let (sid_op, text_op, system_op) = match role {
            Role::Value => (Op::SymbolSid, Op::RefSymbol, Op::SystemSymbol),
            Role::Field => (Op::FieldSid, Op::RefFieldName, Op::FieldSystemSid),
            Role::Annotation => (Op::AnnotationSid, Op::RefAnnotation, Op::AnnotationSystemSid),
        };
        match sym {
            SymRef::Sid(sid) => self.out.emit(sid_op, data(sid)?),
            SymRef::Text(range) => self.out.source_ref(text_op, range.start, range.len())?,
            SymRef::System(sid) => self.out.emit(system_op, sid as u32),
        }
        Ok(())
    }
}
