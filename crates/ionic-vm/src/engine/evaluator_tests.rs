use std::rc::Rc;
use std::sync::Arc;

use ionic_bytecode::{BytecodeBuilder, ConstantPool, Instruction, Op, TemplateExpr as T};
use ionic_core::{
    Decimal, Error, Int, IonType, MacroError, SymbolTable, SymbolToken, Timestamp, TokenKind,
    UsageError, ValueReader,
};

use super::test_utils::{eval, expand, expand_code, render};
use super::{FlattenLimits, NoopTracer, Program, TemplateCursor};

fn cursor(program: Program) -> TemplateCursor<'static> {
    TemplateCursor::new(Rc::new(program), &[], SymbolTable::system_1_0())
}

fn raw_program(build: impl FnOnce(&mut BytecodeBuilder)) -> Program {
    let mut b = BytecodeBuilder::new();
    build(&mut b);
    b.emit(Op::Eof, 0);
    let (code, constants) = b.finish();
    Program::new(code, constants)
}

#[test]
fn scalars_from_template() {
    let body = [
        T::Null(IonType::Blob),
        T::Null(IonType::Null),
        T::Bool(true),
        T::int(-3),
        T::int(100_000),
        T::int(1 << 40),
        T::Float(1.5),
        T::Decimal(Decimal::new(Int::Small(15), -1)),
        T::Timestamp(Timestamp::with_year(2024).unwrap().with_month(5).unwrap()),
        T::string("hi"),
        T::symbol("sym"),
        T::Blob(Arc::from(&b"abc"[..])),
    ];

    assert_eq!(
        eval(&body),
        r#"null.blob null true -3 100000 1099511627776 1.5e0 15d-1 2024-05T "hi" sym {{3 bytes}}"#
    );
}

#[test]
fn source_references_decode_on_read() {
    let source = [0x00, 0xE8, 0x03, b'h', b'i', 54];
    let mut b = BytecodeBuilder::new();
    b.source_ref(Op::RefInt, 1, 2).unwrap();
    b.source_ref(Op::RefString, 3, 2).unwrap();
    b.source_ref(Op::RefSymbol, 3, 2).unwrap();
    b.emit(Op::RefShortTimestamp, 0x80);
    b.extend_raw(&[5]);
    let (code, constants) = b.finish();

    let program = expand_code(
        FlattenLimits::new(),
        &code,
        &constants,
        &source,
        &[],
        &mut NoopTracer,
    )
    .unwrap();
    assert_eq!(render(program, &source), r#"1000 "hi" hi 2024T"#);
}

#[test]
fn symbol_ids_resolve_against_table() {
    let program = raw_program(|b| {
        b.emit(Op::SymbolSid, 4);
        b.emit(Op::SystemSymbol, 1);
    });
    let mut c = cursor(program);

    assert_eq!(c.next_token().unwrap(), TokenKind::Symbol);
    assert_eq!(c.read_symbol().unwrap().text(), Some("name"));
    assert_eq!(c.next_token().unwrap(), TokenKind::Symbol);
    assert_eq!(c.read_symbol().unwrap().text(), Some("$ion"));
    assert_eq!(c.next_token().unwrap(), TokenKind::End);
}

#[test]
fn struct_fields_and_skip() {
    let body = [T::Struct(vec![
        (SymbolToken::with_text("a"), T::int(1)),
        (SymbolToken::with_text("b"), T::list(vec![T::int(2)])),
        (SymbolToken::with_text("c"), T::int(3)),
    ])];
    let mut top = cursor(expand(&body).unwrap());

    assert_eq!(top.next_token().unwrap(), TokenKind::Struct);
    let mut fields = top.take_struct().unwrap();
    assert!(fields.in_struct());

    assert_eq!(fields.next_token().unwrap(), TokenKind::FieldName);
    assert_eq!(fields.read_field_name().unwrap().text(), Some("a"));
    fields.skip().unwrap();

    assert_eq!(fields.next_token().unwrap(), TokenKind::FieldName);
    assert_eq!(fields.read_field_name().unwrap().text(), Some("b"));
    assert_eq!(fields.next_token().unwrap(), TokenKind::List);
    fields.skip().unwrap();

    assert_eq!(fields.next_token().unwrap(), TokenKind::FieldName);
    assert_eq!(fields.next_token().unwrap(), TokenKind::Int);
    assert_eq!(fields.read_i64().unwrap(), 3);
    assert_eq!(fields.next_token().unwrap(), TokenKind::End);

    assert_eq!(top.next_token().unwrap(), TokenKind::End);
}

#[test]
fn skip_annotated_value() {
    let body = [
        T::Annotated(vec![SymbolToken::with_text("a")], Box::new(T::int(1))),
        T::int(2),
    ];
    let mut c = cursor(expand(&body).unwrap());

    assert_eq!(c.next_token().unwrap(), TokenKind::Annotations);
    c.skip().unwrap();
    assert_eq!(c.next_token().unwrap(), TokenKind::Int);
    assert_eq!(c.read_i64().unwrap(), 2);
}

#[test]
fn annotations_then_value() {
    let body = [T::Annotated(
        vec![SymbolToken::with_text("a"), SymbolToken::with_text("b")],
        Box::new(T::symbol("x")),
    )];
    let mut c = cursor(expand(&body).unwrap());

    assert_eq!(c.next_token().unwrap(), TokenKind::Annotations);
    let mut annotations = Vec::new();
    c.read_annotations(&mut annotations).unwrap();
    let texts: Vec<_> = annotations.iter().filter_map(|a| a.text()).collect();
    assert_eq!(texts, ["a", "b"]);
    assert_eq!(c.next_token().unwrap(), TokenKind::Symbol);
    assert_eq!(c.read_symbol().unwrap().text(), Some("x"));
}

#[test]
fn wrong_accessor() {
    let mut c = cursor(expand(&[T::int(1)]).unwrap());
    c.next_token().unwrap();

    let err = c.read_str().unwrap_err();
    assert_eq!(
        err,
        Error::from(UsageError::WrongToken {
            expected: TokenKind::String,
            found: TokenKind::Int
        })
    );
}

#[test]
fn field_name_outside_struct() {
    let mut c = cursor(expand(&[T::int(1)]).unwrap());
    c.next_token().unwrap();

    let err = c.read_field_name().unwrap_err();
    assert_eq!(err, Error::from(UsageError::NotInStruct));
}

#[test]
fn reading_past_end() {
    let mut c = cursor(expand(&[]).unwrap());

    assert_eq!(c.next_token().unwrap(), TokenKind::End);
    let err = c.next_token().unwrap_err();
    assert_eq!(err, Error::from(UsageError::PastEnd));
}

#[test]
fn unflattened_invocation() {
    let program = raw_program(|b| b.emit(Op::InvokeSystem, 1));
    let mut c = cursor(program);

    let err = c.next_token().unwrap_err();
    assert_eq!(err, Error::from(MacroError::UnexpectedInvocation));
}

#[test]
fn unflattened_parameter() {
    let program = raw_program(|b| b.emit(Op::Parameter, 2));
    let mut c = cursor(program);

    let err = c.next_token().unwrap_err();
    assert_eq!(err, Error::from(MacroError::UnresolvedParameter(2)));
}

#[test]
fn program_buffers_round_trip() {
    let program = Program::new(
        vec![Instruction::new(Op::Eof, 0).raw()],
        ConstantPool::new(),
    );
    let (code, constants) = program.into_parts();

    assert_eq!(code.len(), 1);
    assert!(constants.is_empty());
}
