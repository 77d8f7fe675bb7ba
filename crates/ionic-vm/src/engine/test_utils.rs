use std::rc::Rc;
use std::sync::Arc;

use ionic_bytecode::{
    ConstantPool, Macro, MacroBody, Parameter, TemplateExpr, compile_template,
};
use ionic_core::{IonType, Result, SymbolTable, TokenKind, ValueReader};

use super::{Expansion, FlattenLimits, Flattener, NoopTracer, Program, TemplateCursor, Tracer};

/// Compile a named template macro.
pub fn template(name: &str, signature: Vec<Parameter>, body: &[TemplateExpr]) -> Arc<Macro> {
    Arc::new(compile_template(Some(Arc::from(name)), signature, body).unwrap())
}

/// Flatten a request consisting of `body`, compiled as an anonymous template.
pub fn expand_with<T: Tracer>(
    limits: FlattenLimits,
    body: &[TemplateExpr],
    tracer: &mut T,
) -> Result<Program> {
    let request = compile_template(None, Vec::new(), body)?;
    let MacroBody::Template { code, constants } = request.body() else {
        unreachable!("compiled request is a template")
    };
    expand_code(limits, code, constants, &[], &[], tracer)
}

pub fn expand_code<T: Tracer>(
    limits: FlattenLimits,
    code: &[u32],
    constants: &ConstantPool,
    source: &[u8],
    macros: &[Arc<Macro>],
    tracer: &mut T,
) -> Result<Program> {
    let request = Expansion {
        code,
        constants,
        source,
        macros,
    };
    Flattener::new(limits).expand(request, Vec::new(), ConstantPool::new(), tracer)
}

pub fn expand(body: &[TemplateExpr]) -> Result<Program> {
    expand_with(FlattenLimits::new(), body, &mut NoopTracer)
}

/// Flatten `body` and render its values as Ion text, space separated.
pub fn eval(body: &[TemplateExpr]) -> String {
    render(expand(body).unwrap(), &[])
}

pub fn render(program: Program, source: &[u8]) -> String {
    let mut cursor = TemplateCursor::new(Rc::new(program), source, SymbolTable::system_1_1());
    render_items(&mut cursor).join(" ")
}

pub fn render_items(cursor: &mut TemplateCursor<'_>) -> Vec<String> {
    let mut items = Vec::new();
    let mut prefix = String::new();
    loop {
        match cursor.next_token().unwrap() {
            TokenKind::End => return items,
            TokenKind::FieldName => {
                let name = cursor.read_field_name().unwrap();
                prefix.push_str(&format!("{name}: "));
            }
            TokenKind::Annotations => {
                let mut annotations = Vec::new();
                cursor.read_annotations(&mut annotations).unwrap();
                for a in annotations {
                    prefix.push_str(&format!("{a}::"));
                }
            }
            token => {
                let value = render_value(cursor, token);
                items.push(format!("{prefix}{value}"));
                prefix.clear();
            }
        }
    }
}

fn render_value(cursor: &mut TemplateCursor<'_>, token: TokenKind) -> String {
    match token {
        TokenKind::Null => match cursor.null_type().unwrap() {
            IonType::Null => "null".to_string(),
            ty => format!("null.{ty}"),
        },
        TokenKind::Bool => cursor.read_bool().unwrap().to_string(),
        TokenKind::Int => cursor.read_int().unwrap().to_string(),
        TokenKind::Float => format!("{:e}", cursor.read_f64().unwrap()),
        TokenKind::Decimal => cursor.read_decimal().unwrap().to_string(),
        TokenKind::Timestamp => cursor.read_timestamp().unwrap().to_string(),
        TokenKind::String => format!("{:?}", cursor.read_str().unwrap()),
        TokenKind::Symbol => cursor.read_symbol().unwrap().to_string(),
        TokenKind::Blob | TokenKind::Clob => {
            format!("{{{{{} bytes}}}}", cursor.read_lob().unwrap().len())
        }
        TokenKind::List => {
            let items = render_items(&mut cursor.take_list().unwrap());
            format!("[{}]", items.join(", "))
        }
        TokenKind::Sexp => {
            let items = render_items(&mut cursor.take_sexp().unwrap());
            format!("({})", items.join(" "))
        }
        TokenKind::Struct => {
            let items = render_items(&mut cursor.take_struct().unwrap());
            format!("{{{}}}", items.join(", "))
        }
        other => unreachable!("{other} is not a value token"),
    }
}
