//! Directives: values that edit the encoding context instead of reaching the
//! application.
//!
//! Three forms are recognized at top level:
//! - a struct annotated `$ion_symbol_table` (local symbol table)
//! - a sexp annotated `$ion` whose head names a directive, `$ion::(add_symbols "a")`
//! - an e-expression invoking one of the directive system macros
//!
//! The readers handed to these functions are raw: an e-expression nested in a
//! directive is rejected.

use std::sync::Arc;

use ionic_bytecode::{Macro, SystemMacro};
use ionic_core::{DecodeError, MacroError, Result, SymbolToken, TokenKind, ValueReader};

use crate::binary::NestedReader;
use crate::context::EncodingContext;
use crate::tdl::{MacroScope, read_macro};

/// Annotation marking a local symbol table.
pub const SYMBOL_TABLE: &str = "$ion_symbol_table";

fn invalid(reason: impl Into<String>) -> ionic_core::Error {
    MacroError::InvalidDirective(reason.into()).into()
}

/// Next token; directive arguments carry no annotations.
fn next_unannotated<R: ValueReader>(r: &mut R) -> Result<TokenKind> {
    match r.next_token()? {
        TokenKind::Annotations => Err(invalid("annotated value in a directive")),
        token => Ok(token),
    }
}

/// Apply a local symbol table. `fields` reads the struct's fields.
pub fn apply_symbol_table<R: NestedReader>(ctx: &mut EncodingContext, fields: &mut R) -> Result<()> {
    let mut append = false;
    let mut symbols: Option<Vec<Option<Arc<str>>>> = None;
    let mut seen_imports = false;

    while fields.next_token()? == TokenKind::FieldName {
        let name = fields.read_field_name()?;
        let mut token = fields.next_token()?;
        if token == TokenKind::Annotations {
            let mut ignored = Vec::new();
            fields.read_annotations(&mut ignored)?;
            token = fields.next_token()?;
        }
        match name.text() {
            Some("imports") => {
                if std::mem::replace(&mut seen_imports, true) {
                    return Err(DecodeError::InvalidSymbolTable("repeated imports field").into());
                }
                match token {
                    TokenKind::Symbol => append = fields.read_symbol()?.is(SYMBOL_TABLE),
                    TokenKind::List => {
                        return Err(MacroError::UnsupportedFeature("shared symbol table imports").into());
                    }
                    _ => fields.skip()?,
                }
            }
            Some("symbols") => {
                if symbols.is_some() {
                    return Err(DecodeError::InvalidSymbolTable("repeated symbols field").into());
                }
                if token != TokenKind::List {
                    fields.skip()?;
                    continue;
                }
                let mut list = fields.take_container()?;
                let mut texts = Vec::new();
                loop {
                    match list.next_token()? {
                        TokenKind::End => break,
                        TokenKind::String => texts.push(Some(Arc::from(list.read_str()?))),
                        _ => {
                            list.skip()?;
                            texts.push(None);
                        }
                    }
                }
                symbols = Some(texts);
            }
            _ => fields.skip()?,
        }
    }

    ctx.apply_symbol_table(append, symbols.unwrap_or_default());
    Ok(())
}

/// Apply a `$ion::(keyword args..)` clause. `clause` is positioned inside the sexp.
pub fn apply_clause<R: NestedReader>(ctx: &mut EncodingContext, clause: &mut R) -> Result<()> {
    if next_unannotated(clause)? != TokenKind::Symbol {
        return Err(invalid("directive must start with a keyword"));
    }
    let keyword = clause.read_symbol()?;
    let which = match keyword.text() {
        Some("module") => return Err(MacroError::UnsupportedFeature("module").into()),
        Some("encoding") => return Err(MacroError::UnsupportedFeature("encoding").into()),
        Some(text) => SystemMacro::from_name(text).filter(|m| m.is_directive()),
        None => None,
    };
    let which = which.ok_or_else(|| invalid(format!("unknown directive `{keyword}`")))?;
    apply_system(ctx, which, clause)
}

/// Apply directive system macro `which`; `args` reads its argument values in order.
pub fn apply_system<R: NestedReader>(
    ctx: &mut EncodingContext,
    which: SystemMacro,
    args: &mut R,
) -> Result<()> {
    match which {
        SystemMacro::SetSymbols => {
            let texts = read_texts(args)?;
            ctx.set_symbols(texts);
            Ok(())
        }
        SystemMacro::AddSymbols => {
            let texts = read_texts(args)?;
            ctx.add_symbols(texts);
            Ok(())
        }
        SystemMacro::SetMacros => {
            let macros = read_definitions(ctx, args, &[])?;
            ctx.set_macros(macros)
        }
        SystemMacro::AddMacros => {
            let inherited = Arc::clone(ctx.active_macro_table());
            let macros = read_definitions(ctx, args, &inherited)?;
            ctx.add_macros(macros)
        }
        SystemMacro::Use => {
            let key = match next_unannotated(args)? {
                TokenKind::String => args.read_str()?.to_string(),
                TokenKind::Symbol => args.read_symbol()?.to_string(),
                found => return Err(invalid(format!("`use` expects a catalog key, found {found}"))),
            };
            ctx.use_module(&key)
        }
        other => Err(invalid(format!("`{}` is not a directive", other.name()))),
    }
}

fn read_texts<R: ValueReader>(args: &mut R) -> Result<Vec<Option<Arc<str>>>> {
    let mut texts = Vec::new();
    loop {
        match next_unannotated(args)? {
            TokenKind::End => return Ok(texts),
            TokenKind::String => texts.push(Some(Arc::from(args.read_str()?))),
            TokenKind::Symbol => texts.push(args.read_symbol()?.text_arc().cloned()),
            TokenKind::Null => {
                args.skip()?;
                texts.push(None);
            }
            TokenKind::MacroInvocation => return Err(invalid("e-expression in a directive")),
            found => return Err(invalid(format!("expected symbol text, found {found}"))),
        }
    }
}

fn read_definitions<R: NestedReader>(
    ctx: &EncodingContext,
    args: &mut R,
    inherited: &[Arc<Macro>],
) -> Result<Vec<Arc<Macro>>> {
    let mut defined: Vec<Arc<Macro>> = Vec::new();
    let mut annotations: Vec<SymbolToken> = Vec::new();
    loop {
        let mut token = args.next_token()?;
        let mut module = None;
        if token == TokenKind::Annotations {
            annotations.clear();
            args.read_annotations(&mut annotations)?;
            let [single] = annotations.as_slice() else {
                return Err(invalid("a macro reference takes one module name"));
            };
            let text = single.text_arc().cloned();
            module = Some(text.ok_or_else(|| invalid("module name without text"))?);
            token = args.next_token()?;
        }
        let definition = match token {
            TokenKind::End if module.is_none() => return Ok(defined),
            TokenKind::Sexp if module.is_none() => {
                let mut def = args.take_container()?;
                let scope = MacroScope {
                    inherited,
                    defined: &defined,
                };
                Arc::new(read_macro(&mut def, &scope)?)
            }
            TokenKind::Symbol => {
                let symbol = args.read_symbol()?;
                let name = symbol
                    .text()
                    .ok_or_else(|| invalid(format!("macro reference {symbol} has no text")))?;
                ctx.macro_named(module.as_deref(), name)?
            }
            TokenKind::MacroInvocation => return Err(invalid("e-expression in a directive")),
            found => return Err(invalid(format!("expected a macro definition, found {found}"))),
        };
        defined.push(definition);
    }
}
