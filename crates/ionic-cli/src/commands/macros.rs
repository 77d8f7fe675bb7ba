//! Print the macro table in effect at the end of a stream.

use std::fmt::Write;
use std::path::PathBuf;

use ionic_bytecode::{MacroBody, dump};
use ionic_core::Colors;
use ionic_lib::{EncodingContext, Result, StreamReader, TokenKind, ValueReader};

use super::input::load_or_exit;

pub struct MacrosArgs {
    pub input: PathBuf,
    pub color: bool,
}

pub fn run(args: MacrosArgs) {
    let bytes = load_or_exit(&args.input);
    let mut reader = StreamReader::new(&bytes);
    if let Err(e) = read_to_end(&mut reader) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
    print!("{}", render(&reader.context(), Colors::new(args.color)));
}

/// Read past every top-level value so that every directive is applied.
pub fn read_to_end(reader: &mut StreamReader<'_>) -> Result<()> {
    while reader.next_token()? != TokenKind::End {}
    Ok(())
}

/// One line per macro, followed by the bytecode of template bodies.
pub fn render(ctx: &EncodingContext, c: Colors) -> String {
    let table = ctx.active_macro_table();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}Ion {}: {} macros, {} symbols{}",
        c.dim,
        ctx.version().as_str(),
        table.len(),
        ctx.symbols().len() - 1,
        c.reset
    );
    for (address, m) in table.iter().enumerate() {
        let name = m.name().unwrap_or("_");
        let _ = write!(out, "{address} ({}{name}{}", c.key, c.reset);
        for param in m.signature() {
            let _ = write!(out, " {param}");
        }
        out.push(')');
        match m.body() {
            MacroBody::System(_) => {
                let _ = writeln!(out, " {}system{}", c.dim, c.reset);
            }
            MacroBody::Template { code, constants } => {
                out.push('\n');
                for line in dump(code, constants, c).lines() {
                    let _ = writeln!(out, "  {line}");
                }
            }
        }
    }
    out
}
