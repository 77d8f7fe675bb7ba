use std::sync::Arc;

use ionic_bytecode::system_macro_table;
use ionic_core::{DecodeError, Error, MacroError, Result, TokenKind, ValueReader};

use crate::binary::Binary11Cursor;
use crate::context::EncodingContext;
use crate::directive::{apply_clause, apply_symbol_table};
use crate::test_utils::{annotated, fields, int, list, sexp, string, symbol};

fn ion_1_1() -> EncodingContext {
    let mut ctx = EncodingContext::new();
    ctx.on_version_marker(1, 1).unwrap();
    ctx
}

fn reader(bytes: &[u8]) -> Binary11Cursor<'_> {
    Binary11Cursor::new(
        bytes,
        EncodingContext::new().symbols().clone(),
        Arc::from(system_macro_table()),
    )
}

fn symbol_table(ctx: &mut EncodingContext, value: Vec<u8>) -> Result<()> {
    let mut top = reader(&value);
    assert_eq!(top.next_token()?, TokenKind::Struct);
    let mut entries = top.take_container()?;
    apply_symbol_table(ctx, &mut entries)
}

fn clause(ctx: &mut EncodingContext, value: Vec<u8>) -> Result<()> {
    let mut top = reader(&value);
    assert_eq!(top.next_token()?, TokenKind::Sexp);
    let mut items = top.take_container()?;
    apply_clause(ctx, &mut items)
}

fn invalid_directive(result: Result<()>) -> String {
    match result {
        Err(Error::Macro(MacroError::InvalidDirective(reason))) => reason,
        other => panic!("expected an invalid directive, got {other:?}"),
    }
}

#[test]
fn symbol_table_fields() {
    let mut ctx = ion_1_1();
    let table = fields(&[
        ("symbols", list(&[string("a"), int(1), string("b")])),
        ("max_id", int(7)),
    ]);

    symbol_table(&mut ctx, table).unwrap();

    let symbols = ctx.symbols();
    assert_eq!(symbols.len(), 66 + 3);
    assert_eq!(symbols.sid_of("a"), Some(66));
    assert_eq!(symbols.text(67).unwrap(), None);
    assert_eq!(symbols.sid_of("b"), Some(68));
}

#[test]
fn symbol_table_imports_itself() {
    let mut ctx = ion_1_1();
    ctx.add_symbols(vec![Some(Arc::from("a"))]);
    let table = fields(&[
        ("imports", symbol("$ion_symbol_table")),
        ("symbols", list(&[string("b")])),
    ]);

    symbol_table(&mut ctx, table).unwrap();

    assert_eq!(ctx.symbols().sid_of("a"), Some(66));
    assert_eq!(ctx.symbols().sid_of("b"), Some(67));
}

#[test]
fn shared_imports_are_unsupported() {
    let mut ctx = ion_1_1();
    let table = fields(&[("imports", list(&[]))]);

    assert_eq!(
        symbol_table(&mut ctx, table).unwrap_err(),
        Error::Macro(MacroError::UnsupportedFeature("shared symbol table imports"))
    );
}

#[test]
fn repeated_symbols_field() {
    let mut ctx = ion_1_1();
    let table = fields(&[("symbols", list(&[])), ("symbols", list(&[]))]);

    assert_eq!(
        symbol_table(&mut ctx, table).unwrap_err(),
        Error::Decode(DecodeError::InvalidSymbolTable("repeated symbols field"))
    );
}

#[test]
fn add_symbols_clause() {
    let mut ctx = ion_1_1();
    let add = sexp(&[symbol("add_symbols"), string("a"), symbol("b"), vec![0xEA]]);

    clause(&mut ctx, add).unwrap();

    assert_eq!(ctx.symbols().len(), 69);
    assert_eq!(ctx.symbols().sid_of("b"), Some(67));
    assert_eq!(ctx.symbols().text(68).unwrap(), None);
}

#[test]
fn unknown_clause() {
    let mut ctx = ion_1_1();
    let err = invalid_directive(clause(&mut ctx, sexp(&[symbol("frobnicate")])));

    insta::assert_snapshot!(err, @"unknown directive `frobnicate`");
}

#[test]
fn non_directive_system_macro() {
    let mut ctx = ion_1_1();
    let err = invalid_directive(clause(&mut ctx, sexp(&[symbol("values"), int(1)])));

    insta::assert_snapshot!(err, @"unknown directive `values`");
}

#[test]
fn module_clause_is_unsupported() {
    let mut ctx = ion_1_1();

    assert_eq!(
        clause(&mut ctx, sexp(&[symbol("module"), symbol("m")])).unwrap_err(),
        Error::Macro(MacroError::UnsupportedFeature("module"))
    );
}

#[test]
fn annotated_argument() {
    let mut ctx = ion_1_1();
    let set = sexp(&[symbol("set_symbols"), annotated("a", string("x"))]);

    let err = invalid_directive(clause(&mut ctx, set));

    insta::assert_snapshot!(err, @"annotated value in a directive");
}

#[test]
fn e_expression_argument() {
    let mut ctx = ion_1_1();
    let set = sexp(&[symbol("set_symbols"), vec![0xEF, 0x00]]);

    let err = invalid_directive(clause(&mut ctx, set));

    insta::assert_snapshot!(err, @"e-expression in a directive");
    assert_eq!(ctx.symbols().len(), 66);
}

#[test]
fn macro_reexport_by_name() {
    let mut ctx = ion_1_1();
    let set = sexp(&[
        symbol("set_macros"),
        symbol("values"),
        annotated("$ion", symbol("repeat")),
    ]);

    clause(&mut ctx, set).unwrap();

    let names: Vec<_> = ctx.active_macro_table().iter().map(|m| m.name()).collect();
    assert_eq!(names, [Some("values"), Some("repeat")]);
}
