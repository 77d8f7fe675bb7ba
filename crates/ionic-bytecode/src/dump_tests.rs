use std::sync::Arc;

use ionic_core::Colors;

use crate::dump::{dump, width_for_count};
use crate::macros::{Cardinality, Macro, Parameter, SystemMacro};
use crate::template::{TemplateExpr, compile_template};

fn dump_body(body: &[TemplateExpr]) -> String {
    let m = compile_template(None, Vec::new(), body).unwrap();
    let crate::MacroBody::Template { code, constants } = m.body() else {
        unreachable!()
    };
    dump(code, constants, Colors::OFF)
}

#[test]
fn list_with_constant() {
    let res = dump_body(&[TemplateExpr::list(vec![
        TemplateExpr::int(1),
        TemplateExpr::string("abc"),
    ])]);

    insta::assert_snapshot!(res, @r#"
    [constants]
    C0 "abc"

    [code]
      00  list 2
      01    small_int 1
      02    cp_string C0  ; "abc"
      03  end
    "#);
}

#[test]
fn system_invocation() {
    let values = Macro::system(SystemMacro::Values);
    let res = dump_body(&[TemplateExpr::invoke(
        &values,
        vec![TemplateExpr::group(vec![
            TemplateExpr::int(1),
            TemplateExpr::int(2),
        ])],
    )]);

    insta::assert_snapshot!(res, @r"
    [code]
      00  arg 2
      01    small_int 1
      02    small_int 2
      03  arg_end
      04  invoke_system 1
    ");
}

#[test]
fn template_invocation() {
    let twice = compile_template(
        Some(Arc::from("twice")),
        vec![Parameter::new("x", Cardinality::ExactlyOne)],
        &[TemplateExpr::Variable(0), TemplateExpr::Variable(0)],
    )
    .unwrap();
    let twice = Arc::new(twice);
    let res = dump_body(&[TemplateExpr::invoke(&twice, vec![TemplateExpr::int(5)])]);

    insta::assert_snapshot!(res, @r"
    [constants]
    C0 macro twice

    [code]
      00  arg 1
      01    small_int 5
      02  arg_end
      03  invoke_cp C0  ; macro twice
    ");
}

#[test]
fn index_width() {
    assert_eq!(width_for_count(0), 2);
    assert_eq!(width_for_count(100), 2);
    assert_eq!(width_for_count(101), 3);
    assert_eq!(width_for_count(5000), 4);
}
