use ionic_core::flex::{write_flex_int, write_flex_uint};
use ionic_core::{Error, IonType, TokenKind, ValueReader};

use crate::StreamReader;
use crate::binary::NestedReader;

pub const IVM_1_0: [u8; 4] = [0xE0, 0x01, 0x00, 0xEA];
pub const IVM_1_1: [u8; 4] = [0xE0, 0x01, 0x01, 0xEA];

/// Read the whole stream and render it as Ion text, space separated.
pub fn read_all(bytes: &[u8]) -> String {
    let mut reader = StreamReader::new(bytes);
    render(&mut *reader)
}

/// Read until the stream fails.
pub fn read_error(bytes: &[u8]) -> Error {
    let mut reader = StreamReader::new(bytes);
    match try_render(&mut *reader) {
        Ok(text) => panic!("stream read without error: {text}"),
        Err(e) => e,
    }
}

pub fn render<R: NestedReader>(reader: &mut R) -> String {
    try_render(reader).unwrap()
}

fn try_render<R: NestedReader>(reader: &mut R) -> ionic_core::Result<String> {
    Ok(render_items(reader)?.join(" "))
}

fn render_items<R: NestedReader>(reader: &mut R) -> ionic_core::Result<Vec<String>> {
    let mut items = Vec::new();
    let mut prefix = String::new();
    loop {
        match reader.next_token()? {
            TokenKind::End => return Ok(items),
            TokenKind::FieldName => {
                let name = reader.read_field_name()?;
                prefix.push_str(&format!("{name}: "));
            }
            TokenKind::Annotations => {
                let mut annotations = Vec::new();
                reader.read_annotations(&mut annotations)?;
                for a in annotations {
                    prefix.push_str(&format!("{a}::"));
                }
            }
            token => {
                let value = render_value(reader, token)?;
                items.push(format!("{prefix}{value}"));
                prefix.clear();
            }
        }
    }
}

fn render_value<R: NestedReader>(reader: &mut R, token: TokenKind) -> ionic_core::Result<String> {
    Ok(match token {
        TokenKind::Null => match reader.null_type()? {
            IonType::Null => "null".to_string(),
            ty => format!("null.{ty}"),
        },
        TokenKind::Bool => reader.read_bool()?.to_string(),
        TokenKind::Int => reader.read_int()?.to_string(),
        TokenKind::Float => format!("{:e}", reader.read_f64()?),
        TokenKind::Decimal => reader.read_decimal()?.to_string(),
        TokenKind::Timestamp => reader.read_timestamp()?.to_string(),
        TokenKind::String => format!("{:?}", reader.read_str()?),
        TokenKind::Symbol => reader.read_symbol()?.to_string(),
        TokenKind::Blob | TokenKind::Clob => format!("{{{{{} bytes}}}}", reader.read_lob()?.len()),
        TokenKind::List => format!("[{}]", render_items(&mut reader.take_container()?)?.join(", ")),
        TokenKind::Sexp => format!("({})", render_items(&mut reader.take_container()?)?.join(" ")),
        TokenKind::Struct => format!("{{{}}}", render_items(&mut reader.take_container()?)?.join(", ")),
        other => unreachable!("{other} is not a value token"),
    })
}

// Ion 1.1 encoder for building test streams.

pub fn cat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

pub fn int(value: i64) -> Vec<u8> {
    if value == 0 {
        return vec![0x60];
    }
    let bytes = value.to_le_bytes();
    let mut len = 8;
    while len > 1 {
        let (top, next) = (bytes[len - 1], bytes[len - 2]);
        let redundant = (top == 0x00 && next & 0x80 == 0) || (top == 0xFF && next & 0x80 != 0);
        if !redundant {
            break;
        }
        len -= 1;
    }
    let mut out = vec![0x60 + len as u8];
    out.extend_from_slice(&bytes[..len]);
    out
}

fn prefixed(short: u8, long: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    if payload.len() <= 15 {
        out.push(short + payload.len() as u8);
    } else {
        out.push(long);
        write_flex_uint(payload.len() as u64, &mut out);
    }
    out.extend_from_slice(payload);
    out
}

pub fn string(text: &str) -> Vec<u8> {
    prefixed(0x90, 0xF9, text.as_bytes())
}

pub fn symbol(text: &str) -> Vec<u8> {
    prefixed(0xA0, 0xFA, text.as_bytes())
}

pub fn list(items: &[Vec<u8>]) -> Vec<u8> {
    prefixed(0xB0, 0xFB, &items.concat())
}

pub fn sexp(items: &[Vec<u8>]) -> Vec<u8> {
    prefixed(0xC0, 0xFC, &items.concat())
}

fn flex_sym_text(text: &str, out: &mut Vec<u8>) {
    write_flex_int(-(text.len() as i64), out);
    out.extend_from_slice(text.as_bytes());
}

/// Delimited struct with inline field names.
pub fn fields(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut out = vec![0xF3];
    for (name, value) in entries {
        flex_sym_text(name, &mut out);
        out.extend_from_slice(value);
    }
    out.extend_from_slice(&[0x01, 0xF0]);
    out
}

/// `value` with one inline-text annotation.
pub fn annotated(annotation: &str, value: Vec<u8>) -> Vec<u8> {
    let mut out = vec![0xE7];
    flex_sym_text(annotation, &mut out);
    out.extend(value);
    out
}

/// `$ion::(keyword args..)`
pub fn directive(keyword: &str, args: &[Vec<u8>]) -> Vec<u8> {
    let mut items = vec![symbol(keyword)];
    items.extend_from_slice(args);
    annotated("$ion", sexp(&items))
}
