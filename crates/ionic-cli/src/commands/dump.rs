//! Print every value of a stream, one line per token.

use std::fmt::Write;
use std::path::PathBuf;

use ionic_core::Colors;
use ionic_lib::{
    Decimal, Int, IonType, NestedReader, Result, StreamReader, SymbolToken, Timestamp, TokenKind,
};
use ionic_vm::{PrintTracer, Verbosity};
use serde::Serialize;
use serde_json::{Number, Value};

use super::input::load_or_exit;

pub struct DumpArgs {
    pub input: PathBuf,
    pub color: bool,
    /// Trace verbosity, when expansions are traced.
    pub trace: Option<Verbosity>,
    pub json: bool,
}

pub fn run(args: DumpArgs) {
    let bytes = load_or_exit(&args.input);
    let colors = Colors::new(args.color);
    let format = if args.json {
        Format::Json
    } else {
        Format::Text(colors)
    };

    let mut reader = StreamReader::new(&bytes);
    if let Some(verbosity) = args.trace {
        reader.set_tracer(PrintTracer::new(verbosity, colors));
    }
    let mut out = String::new();
    let result = dump(&mut *reader, format, &mut out);
    print!("{out}");
    if let Some(tracer) = reader.take_tracer() {
        for line in tracer.lines() {
            eprintln!("{line}");
        }
    }
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Output style.
#[derive(Clone, Copy, Debug)]
pub enum Format {
    Text(Colors),
    Json,
}

/// Write every value `reader` produces to `out`. On error, `out` holds the
/// values read before it.
pub fn dump<R: NestedReader>(reader: &mut R, format: Format, out: &mut String) -> Result<()> {
    dump_items(reader, 0, format, out)
}

struct Entry {
    depth: usize,
    token: TokenKind,
    field: Option<SymbolToken>,
    annotations: Vec<SymbolToken>,
}

enum Scalar {
    Null(IonType),
    Bool(bool),
    Int(Int),
    Float(f64),
    Decimal(Decimal),
    Timestamp(Timestamp),
    String(String),
    Symbol(SymbolToken),
    Lob(Vec<u8>),
}

impl Scalar {
    fn read<R: NestedReader>(r: &mut R, token: TokenKind) -> Result<Self> {
        Ok(match token {
            TokenKind::Null => Scalar::Null(r.null_type()?),
            TokenKind::Bool => Scalar::Bool(r.read_bool()?),
            TokenKind::Int => Scalar::Int(r.read_int()?),
            TokenKind::Float => Scalar::Float(r.read_f64()?),
            TokenKind::Decimal => Scalar::Decimal(r.read_decimal()?),
            TokenKind::Timestamp => Scalar::Timestamp(r.read_timestamp()?),
            TokenKind::String => Scalar::String(r.read_str()?.to_string()),
            TokenKind::Symbol => Scalar::Symbol(r.read_symbol()?),
            TokenKind::Blob | TokenKind::Clob => Scalar::Lob(r.read_lob()?.to_vec()),
            other => unreachable!("{other} is not a scalar token"),
        })
    }

    fn text(&self, token: TokenKind, c: Colors) -> String {
        match self {
            Scalar::Null(IonType::Null) => format!("{}null{}", c.dim, c.reset),
            Scalar::Null(ty) => format!("{}null.{ty}{}", c.dim, c.reset),
            Scalar::Bool(b) => format!("{}{b}{}", c.number, c.reset),
            Scalar::Int(i) => format!("{}{i}{}", c.number, c.reset),
            Scalar::Float(f) => format!("{}{f:e}{}", c.number, c.reset),
            Scalar::Decimal(d) => format!("{}{d}{}", c.number, c.reset),
            Scalar::Timestamp(t) => format!("{}{t}{}", c.number, c.reset),
            Scalar::String(s) => format!("{}{s:?}{}", c.text, c.reset),
            Scalar::Symbol(s) => format!("{}{s}{}", c.text, c.reset),
            Scalar::Lob(bytes) => {
                let kind = if token == TokenKind::Clob { "clob" } else { "blob" };
                format!("{}{{{{{kind} {}}}}}{}", c.text, hex(bytes), c.reset)
            }
        }
    }

    fn json(&self) -> (Option<&'static str>, Value) {
        let value = match self {
            Scalar::Null(IonType::Null) => Value::Null,
            Scalar::Null(ty) => return (Some(ty.as_str()), Value::Null),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => match i.as_i64() {
                Some(small) => Value::from(small),
                None => Value::String(i.to_string()),
            },
            Scalar::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            Scalar::Decimal(d) => Value::String(d.to_string()),
            Scalar::Timestamp(t) => Value::String(t.to_string()),
            Scalar::String(s) => Value::String(s.clone()),
            Scalar::Symbol(s) => Value::String(s.to_string()),
            Scalar::Lob(bytes) => Value::String(hex(bytes)),
        };
        (None, value)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Serialize)]
struct JsonLine {
    depth: usize,
    token: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    null_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

impl JsonLine {
    fn new(entry: &Entry) -> Self {
        Self {
            depth: entry.depth,
            token: entry.token.as_str(),
            field: entry.field.as_ref().map(ToString::to_string),
            annotations: entry.annotations.iter().map(ToString::to_string).collect(),
            null_type: None,
            value: None,
        }
    }

    fn write(&self, out: &mut String) {
        let line = serde_json::to_string(self).expect("token lines always serialize");
        out.push_str(&line);
        out.push('\n');
    }
}

impl Format {
    fn prefix(c: Colors, entry: &Entry) -> String {
        let mut prefix = "  ".repeat(entry.depth);
        if let Some(field) = &entry.field {
            let _ = write!(prefix, "{}{field}{}: ", c.key, c.reset);
        }
        for a in &entry.annotations {
            let _ = write!(prefix, "{}{a}{}::", c.key, c.reset);
        }
        prefix
    }

    fn scalar(self, entry: &Entry, value: &Scalar, out: &mut String) {
        match self {
            Format::Text(c) => {
                let _ = writeln!(out, "{}{}", Self::prefix(c, entry), value.text(entry.token, c));
            }
            Format::Json => {
                let (null_type, value) = value.json();
                let mut line = JsonLine::new(entry);
                line.null_type = null_type;
                line.value = Some(value);
                line.write(out);
            }
        }
    }

    fn open(self, entry: &Entry, out: &mut String) {
        match self {
            Format::Text(c) => {
                let bracket = match entry.token {
                    TokenKind::List => '[',
                    TokenKind::Sexp => '(',
                    _ => '{',
                };
                let _ = writeln!(out, "{}{}{bracket}{}", Self::prefix(c, entry), c.dim, c.reset);
            }
            Format::Json => JsonLine::new(entry).write(out),
        }
    }

    fn close(self, entry: &Entry, out: &mut String) {
        match self {
            Format::Text(c) => {
                let bracket = match entry.token {
                    TokenKind::List => ']',
                    TokenKind::Sexp => ')',
                    _ => '}',
                };
                let indent = "  ".repeat(entry.depth);
                let _ = writeln!(out, "{indent}{}{bracket}{}", c.dim, c.reset);
            }
            Format::Json => {
                let end = Entry {
                    depth: entry.depth,
                    token: TokenKind::End,
                    field: None,
                    annotations: Vec::new(),
                };
                JsonLine::new(&end).write(out);
            }
        }
    }
}

fn dump_items<R: NestedReader>(
    r: &mut R,
    depth: usize,
    format: Format,
    out: &mut String,
) -> Result<()> {
    let mut field = None;
    let mut annotations = Vec::new();
    loop {
        match r.next_token()? {
            TokenKind::End => return Ok(()),
            TokenKind::FieldName => field = Some(r.read_field_name()?),
            TokenKind::Annotations => r.read_annotations(&mut annotations)?,
            token => {
                let entry = Entry {
                    depth,
                    token,
                    field: field.take(),
                    annotations: std::mem::take(&mut annotations),
                };
                if token.is_container() {
                    format.open(&entry, out);
                    let mut children = r.take_container()?;
                    dump_items(&mut children, depth + 1, format, out)?;
                    format.close(&entry, out);
                } else {
                    let value = Scalar::read(r, token)?;
                    format.scalar(&entry, &value, out);
                }
            }
        }
    }
}
