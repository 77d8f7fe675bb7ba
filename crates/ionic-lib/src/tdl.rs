//! Template definition language: macro definitions read from Ion values.
//!
//! ```text
//! (macro point (x y?) {x: (%x), y: (.default (%y) 0)})
//! ```
//!
//! - parameters are symbols, optionally annotated with an encoding
//!   (`flex_uint::n`) and optionally followed by a cardinality sigil
//! - `(%x)` expands a parameter
//! - `(.name args..)`, `(.3 args..)` and `(. $ion::name args..)` invoke a macro
//! - `(.. a b)` passes several values as one argument
//! - `(.literal v)` quotes `v`
//!
//! Everything else in the body is a literal.

use std::sync::Arc;

use ionic_bytecode::{
    Cardinality, Macro, Parameter, ParameterEncoding, SystemMacro, TemplateExpr, compile_template,
};
use ionic_core::{MacroError, Result, SymbolToken, TokenKind, ValueReader};

use crate::binary::NestedReader;
use crate::context::SYSTEM_MODULE;

/// Macros a definition can refer to.
#[derive(Clone, Copy, Debug, Default)]
pub struct MacroScope<'a> {
    /// Table being extended; empty when it is being replaced.
    pub inherited: &'a [Arc<Macro>],
    /// Definitions earlier in the same directive.
    pub defined: &'a [Arc<Macro>],
}

impl MacroScope<'_> {
    /// Resolve `name`, in `module` when given. Later definitions shadow
    /// inherited ones, which shadow system macros.
    pub fn by_name(&self, module: Option<&str>, name: &str) -> Result<Arc<Macro>> {
        let named = |m: &&Arc<Macro>| m.name() == Some(name);
        let found = match module {
            Some(SYSTEM_MODULE) => SystemMacro::from_name(name).map(Macro::system),
            Some(_) => None,
            None => self
                .defined
                .iter()
                .rev()
                .find(named)
                .or_else(|| self.inherited.iter().find(named))
                .cloned()
                .or_else(|| SystemMacro::from_name(name).map(Macro::system)),
        };
        found.ok_or_else(|| {
            let qualified = match module {
                Some(module) => format!("{module}::{name}"),
                None => name.to_string(),
            };
            MacroError::UndefinedMacroName(qualified).into()
        })
    }

    /// The macro that will sit at `address` once the directive is applied.
    pub fn by_address(&self, address: usize) -> Result<Arc<Macro>> {
        self.inherited
            .iter()
            .chain(self.defined)
            .nth(address)
            .cloned()
            .ok_or_else(|| MacroError::UndefinedMacro(address).into())
    }
}

fn invalid(reason: impl Into<String>) -> ionic_core::Error {
    MacroError::InvalidDefinition(reason.into()).into()
}

fn text_of(symbol: &SymbolToken) -> Result<Arc<str>> {
    symbol
        .text_arc()
        .cloned()
        .ok_or_else(|| invalid(format!("symbol {symbol} has no text")))
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn sigil(text: &str) -> Option<Cardinality> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Cardinality::from_sigil(c),
        _ => None,
    }
}

/// Read one `(macro name (params..) body..)` definition. `def` is positioned
/// inside the s-expression.
pub fn read_macro<R: NestedReader>(def: &mut R, scope: &MacroScope<'_>) -> Result<Macro> {
    let keyword = match def.next_token()? {
        TokenKind::Symbol => def.read_symbol()?,
        _ => SymbolToken::default(),
    };
    if !keyword.is("macro") {
        return Err(invalid("expected `(macro name (parameters) body)`"));
    }

    let name = match def.next_token()? {
        TokenKind::Null => None,
        TokenKind::Symbol => {
            let name = text_of(&def.read_symbol()?)?;
            if !is_identifier(&name) {
                return Err(invalid(format!("`{name}` is not a valid macro name")));
            }
            Some(name)
        }
        found => return Err(invalid(format!("macro name must be a symbol, found {found}"))),
    };

    if def.next_token()? != TokenKind::Sexp {
        return Err(invalid("expected a parameter list"));
    }
    let mut params = def.take_container()?;
    let signature = read_signature(&mut params)?;

    let mut body = Vec::new();
    {
        let mut reader = BodyReader {
            signature: &signature,
            scope,
        };
        loop {
            let token = def.next_token()?;
            if token == TokenKind::End {
                break;
            }
            body.push(reader.expr(def, token)?);
        }
    }
    compile_template(name, signature, &body)
}

fn read_signature<R: ValueReader>(params: &mut R) -> Result<Vec<Parameter>> {
    let mut signature: Vec<Parameter> = Vec::new();
    let mut annotations = Vec::new();
    let mut sigil_allowed = false;
    loop {
        let mut encoding = ParameterEncoding::Tagged;
        let mut token = params.next_token()?;
        if token == TokenKind::Annotations {
            annotations.clear();
            params.read_annotations(&mut annotations)?;
            let [annotation] = annotations.as_slice() else {
                return Err(invalid("a parameter takes at most one encoding"));
            };
            let text = text_of(annotation)?;
            encoding = ParameterEncoding::from_name(&text)
                .ok_or_else(|| invalid(format!("unknown encoding `{text}`")))?;
            token = params.next_token()?;
        }
        match token {
            TokenKind::End => return Ok(signature),
            TokenKind::Symbol => {}
            found => return Err(invalid(format!("parameters must be symbols, found {found}"))),
        }

        let text = text_of(&params.read_symbol()?)?;
        if let Some(cardinality) = sigil(&text) {
            let misplaced = !sigil_allowed || encoding != ParameterEncoding::Tagged;
            let Some(last) = signature.last_mut().filter(|_| !misplaced) else {
                return Err(invalid(format!("misplaced cardinality `{text}`")));
            };
            last.cardinality = cardinality;
            sigil_allowed = false;
            continue;
        }
        if !is_identifier(&text) {
            return Err(invalid(format!("`{text}` is not a valid parameter name")));
        }
        if signature.iter().any(|p| *p.name == *text) {
            return Err(invalid(format!("duplicate parameter `{text}`")));
        }
        signature.push(Parameter::new(text, Cardinality::ExactlyOne).with_encoding(encoding));
        sigil_allowed = true;
    }
}

struct BodyReader<'a> {
    signature: &'a [Parameter],
    scope: &'a MacroScope<'a>,
}

impl BodyReader<'_> {
    fn expr<R: NestedReader>(&mut self, r: &mut R, token: TokenKind) -> Result<TemplateExpr> {
        match token {
            TokenKind::Annotations => {
                let mut annotations = Vec::new();
                r.read_annotations(&mut annotations)?;
                let token = r.next_token()?;
                let value = self.expr(r, token)?;
                if matches!(
                    value,
                    TemplateExpr::Variable(_) | TemplateExpr::Invoke(..) | TemplateExpr::Group(_)
                ) {
                    return Err(invalid("only literals can be annotated"));
                }
                Ok(TemplateExpr::Annotated(annotations, Box::new(value)))
            }
            TokenKind::Sexp => {
                let mut child = r.take_container()?;
                self.sexp(&mut child, false)
            }
            TokenKind::List => {
                let mut child = r.take_container()?;
                Ok(TemplateExpr::List(self.exprs(&mut child)?))
            }
            TokenKind::Struct => {
                let mut child = r.take_container()?;
                let mut fields = Vec::new();
                while child.next_token()? == TokenKind::FieldName {
                    let name = child.read_field_name()?;
                    let token = child.next_token()?;
                    fields.push((name, self.expr(&mut child, token)?));
                }
                Ok(TemplateExpr::Struct(fields))
            }
            token => scalar(r, token),
        }
    }

    fn exprs<R: NestedReader>(&mut self, r: &mut R) -> Result<Vec<TemplateExpr>> {
        let mut items = Vec::new();
        loop {
            let token = r.next_token()?;
            if token == TokenKind::End {
                return Ok(items);
            }
            items.push(self.expr(r, token)?);
        }
    }

    /// An s-expression: an operator form or a literal s-expression.
    fn sexp<R: NestedReader>(&mut self, r: &mut R, argument: bool) -> Result<TemplateExpr> {
        let first = r.next_token()?;
        if first == TokenKind::Symbol {
            let head = r.read_symbol()?;
            match head.text() {
                Some("%") => return self.variable(r, None),
                Some(".") => return self.invocation(r, None),
                Some("..") if argument => return Ok(TemplateExpr::Group(self.exprs(r)?)),
                Some("..") => return Err(invalid("expression group outside an argument")),
                Some(text) if text.len() > 1 && text.starts_with('%') => {
                    return self.variable(r, Some(&text[1..]));
                }
                Some(text) if text.len() > 1 && text.starts_with('.') => {
                    return self.invocation(r, Some(&text[1..]));
                }
                _ => {}
            }
        }
        let mut items = Vec::new();
        let mut token = first;
        while token != TokenKind::End {
            items.push(self.expr(r, token)?);
            token = r.next_token()?;
        }
        Ok(TemplateExpr::Sexp(items))
    }

    fn variable<R: ValueReader>(&mut self, r: &mut R, name: Option<&str>) -> Result<TemplateExpr> {
        let name: Arc<str> = match name {
            Some(name) => Arc::from(name),
            None if r.next_token()? == TokenKind::Symbol => text_of(&r.read_symbol()?)?,
            None => return Err(invalid("`%` expects a parameter name")),
        };
        if r.next_token()? != TokenKind::End {
            return Err(invalid(format!("`(%{name})` takes no arguments")));
        }
        self.signature
            .iter()
            .position(|p| *p.name == *name)
            .map(TemplateExpr::Variable)
            .ok_or_else(|| invalid(format!("unknown variable `{name}`")))
    }

    fn invocation<R: NestedReader>(&mut self, r: &mut R, name: Option<&str>) -> Result<TemplateExpr> {
        let target = match name {
            Some("literal") => return quote(r),
            Some(name) => match name.parse::<usize>() {
                Ok(address) => self.scope.by_address(address)?,
                Err(_) => self.scope.by_name(None, name)?,
            },
            None => match r.next_token()? {
                TokenKind::Symbol => {
                    let name = text_of(&r.read_symbol()?)?;
                    if &*name == "literal" {
                        return quote(r);
                    }
                    self.scope.by_name(None, &name)?
                }
                TokenKind::Annotations => {
                    let mut annotations = Vec::new();
                    r.read_annotations(&mut annotations)?;
                    let [module] = annotations.as_slice() else {
                        return Err(invalid("a macro reference takes one module name"));
                    };
                    let module = text_of(module)?;
                    if r.next_token()? != TokenKind::Symbol {
                        return Err(invalid("expected a macro name"));
                    }
                    let name = text_of(&r.read_symbol()?)?;
                    self.scope.by_name(Some(&module), &name)?
                }
                TokenKind::Int => {
                    let address = usize::try_from(r.read_i64()?)
                        .map_err(|_| invalid("macro addresses are non-negative"))?;
                    self.scope.by_address(address)?
                }
                found => return Err(invalid(format!("expected a macro reference, found {found}"))),
            },
        };

        let mut args = Vec::new();
        loop {
            match r.next_token()? {
                TokenKind::End => break,
                TokenKind::Sexp => {
                    let mut child = r.take_container()?;
                    args.push(self.sexp(&mut child, true)?);
                }
                token => args.push(self.expr(r, token)?),
            }
        }
        Ok(TemplateExpr::Invoke(target, args))
    }
}

/// `(.literal v)`: exactly one value, with no operator forms.
fn quote<R: NestedReader>(r: &mut R) -> Result<TemplateExpr> {
    let token = r.next_token()?;
    if token == TokenKind::End {
        return Err(invalid("`.literal` expects one value"));
    }
    let value = literal(r, token)?;
    if r.next_token()? != TokenKind::End {
        return Err(invalid("`.literal` expects one value"));
    }
    Ok(value)
}

fn literal<R: NestedReader>(r: &mut R, token: TokenKind) -> Result<TemplateExpr> {
    let items = |r: &mut R| -> Result<Vec<TemplateExpr>> {
        let mut child = r.take_container()?;
        let mut items = Vec::new();
        loop {
            let token = child.next_token()?;
            if token == TokenKind::End {
                return Ok(items);
            }
            items.push(literal(&mut child, token)?);
        }
    };
    match token {
        TokenKind::Annotations => {
            let mut annotations = Vec::new();
            r.read_annotations(&mut annotations)?;
            let token = r.next_token()?;
            Ok(TemplateExpr::Annotated(annotations, Box::new(literal(r, token)?)))
        }
        TokenKind::List => Ok(TemplateExpr::List(items(r)?)),
        TokenKind::Sexp => Ok(TemplateExpr::Sexp(items(r)?)),
        TokenKind::Struct => {
            let mut child = r.take_container()?;
            let mut fields = Vec::new();
            while child.next_token()? == TokenKind::FieldName {
                let name = child.read_field_name()?;
                let token = child.next_token()?;
                fields.push((name, literal(&mut child, token)?));
            }
            Ok(TemplateExpr::Struct(fields))
        }
        token => scalar(r, token),
    }
}

fn scalar<R: ValueReader>(r: &mut R, token: TokenKind) -> Result<TemplateExpr> {
    Ok(match token {
        TokenKind::Null => TemplateExpr::Null(r.null_type()?),
        TokenKind::Bool => TemplateExpr::Bool(r.read_bool()?),
        TokenKind::Int => TemplateExpr::Int(r.read_int()?),
        TokenKind::Float => TemplateExpr::Float(r.read_f64()?),
        TokenKind::Decimal => TemplateExpr::Decimal(r.read_decimal()?),
        TokenKind::Timestamp => TemplateExpr::Timestamp(r.read_timestamp()?),
        TokenKind::String => TemplateExpr::String(Arc::from(r.read_str()?)),
        TokenKind::Symbol => TemplateExpr::Symbol(r.read_symbol()?),
        TokenKind::Blob => TemplateExpr::Blob(Arc::from(r.read_lob()?)),
        TokenKind::Clob => TemplateExpr::Clob(Arc::from(r.read_lob()?)),
        found => return Err(invalid(format!("unexpected {found} in a template"))),
    })
}
