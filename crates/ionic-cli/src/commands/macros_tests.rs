use std::sync::Arc;

use indoc::indoc;
use ionic_bytecode::{Macro, SystemMacro, TemplateExpr, compile_template};
use ionic_core::Colors;
use ionic_lib::{EncodingContext, Int, StreamReader};

use super::macros::{read_to_end, render};

fn ion_1_1() -> EncodingContext {
    let mut ctx = EncodingContext::new();
    ctx.on_version_marker(1, 1).unwrap();
    ctx
}

#[test]
fn system_macros() {
    let mut ctx = ion_1_1();
    ctx.set_macros(vec![
        Macro::system(SystemMacro::Values),
        Macro::system(SystemMacro::Repeat),
    ])
    .unwrap();

    assert_eq!(
        render(&ctx, Colors::OFF),
        indoc! {"
            Ion 1.1: 2 macros, 65 symbols
            0 (values values*) system
            1 (repeat n value+) system
        "}
    );
}

#[test]
fn template_bodies_show_bytecode() {
    let one = compile_template(Some(Arc::from("one")), Vec::new(), &[TemplateExpr::Int(Int::from(1))])
        .unwrap();
    let mut ctx = ion_1_1();
    ctx.set_macros(vec![Arc::new(one)]).unwrap();

    let out = render(&ctx, Colors::OFF);

    assert!(out.contains("0 (one)\n  [code]\n"), "{out}");
}

#[test]
fn stream_without_directives() {
    let bytes = [0xE0, 0x01, 0x00, 0xEA, 0x21, 0x05];
    let mut reader = StreamReader::new(&bytes);

    read_to_end(&mut reader).unwrap();

    assert_eq!(render(&reader.context(), Colors::OFF), "Ion 1.0: 0 macros, 9 symbols\n");
}
