//! Macro definitions: signatures, template bodies and the system macro set.

use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::constants::ConstantPool;

/// How many values an argument may supply.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Cardinality {
    /// `!`
    #[default]
    ExactlyOne,
    /// `?`
    ZeroOrOne,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
}

impl Cardinality {
    pub fn from_sigil(sigil: char) -> Option<Self> {
        Some(match sigil {
            '!' => Self::ExactlyOne,
            '?' => Self::ZeroOrOne,
            '*' => Self::ZeroOrMore,
            '+' => Self::OneOrMore,
            _ => return None,
        })
    }

    pub fn sigil(self) -> char {
        match self {
            Self::ExactlyOne => '!',
            Self::ZeroOrOne => '?',
            Self::ZeroOrMore => '*',
            Self::OneOrMore => '+',
        }
    }

    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::ExactlyOne => count == 1,
            Self::ZeroOrOne => count <= 1,
            Self::ZeroOrMore => true,
            Self::OneOrMore => count >= 1,
        }
    }

    pub fn allows_empty(self) -> bool {
        self.accepts(0)
    }
}

/// Binary encoding of an argument inside an e-expression.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum ParameterEncoding {
    /// Opcode-prefixed value.
    #[default]
    Tagged,
    FlexUInt,
    FlexInt,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float16,
    Float32,
    Float64,
    FlexSym,
}

impl ParameterEncoding {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "flex_uint" => Self::FlexUInt,
            "flex_int" => Self::FlexInt,
            "uint8" => Self::UInt8,
            "uint16" => Self::UInt16,
            "uint32" => Self::UInt32,
            "uint64" => Self::UInt64,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "float16" => Self::Float16,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "flex_symbol" => Self::FlexSym,
            _ => return None,
        })
    }

    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::Tagged => return None,
            Self::FlexUInt => "flex_uint",
            Self::FlexInt => "flex_int",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::FlexSym => "flex_symbol",
        })
    }

    /// Width of fixed-size tagless encodings.
    pub fn fixed_width(self) -> Option<usize> {
        Some(match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::UInt16 | Self::Int16 | Self::Float16 => 2,
            Self::UInt32 | Self::Int32 | Self::Float32 => 4,
            Self::UInt64 | Self::Int64 | Self::Float64 => 8,
            _ => return None,
        })
    }
}

/// One entry of a macro signature.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Parameter {
    pub name: Arc<str>,
    pub encoding: ParameterEncoding,
    pub cardinality: Cardinality,
}

impl Parameter {
    pub fn new(name: impl Into<Arc<str>>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            encoding: ParameterEncoding::Tagged,
            cardinality,
        }
    }

    pub fn with_encoding(mut self, encoding: ParameterEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(enc) = self.encoding.name() {
            write!(f, "{enc}::")?;
        }
        f.write_str(&self.name)?;
        if self.cardinality != Cardinality::ExactlyOne {
            write!(f, "{}", self.cardinality.sigil())?;
        }
        Ok(())
    }
}

/// Evaluation logic of a macro.
#[derive(Clone, PartialEq, Debug)]
pub enum MacroBody {
    /// Pre-compiled template.
    Template {
        code: Vec<u32>,
        constants: ConstantPool,
    },
    /// Hard-coded evaluation.
    System(SystemMacro),
}

/// A macro: optional name, signature and body.
#[derive(Clone, PartialEq, Debug)]
pub struct Macro {
    name: Option<Arc<str>>,
    signature: Vec<Parameter>,
    body: MacroBody,
}

impl Macro {
    pub fn template(
        name: Option<Arc<str>>,
        signature: Vec<Parameter>,
        code: Vec<u32>,
        constants: ConstantPool,
    ) -> Self {
        Self {
            name,
            signature,
            body: MacroBody::Template { code, constants },
        }
    }

    /// Shared definition of a system macro.
    pub fn system(which: SystemMacro) -> Arc<Macro> {
        Arc::clone(&SYSTEM_MACROS[which as usize])
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn signature(&self) -> &[Parameter] {
        &self.signature
    }

    pub fn body(&self) -> &MacroBody {
        &self.body
    }

    pub fn system_kind(&self) -> Option<SystemMacro> {
        match self.body {
            MacroBody::System(s) => Some(s),
            MacroBody::Template { .. } => None,
        }
    }

    /// Number of presence bits an e-expression for this macro carries.
    pub fn presence_bits(&self) -> usize {
        self.signature
            .iter()
            .filter(|p| p.cardinality != Cardinality::ExactlyOne)
            .count()
            * 2
    }

    /// Number of presence bytes preceding the arguments.
    pub fn presence_bytes(&self) -> usize {
        self.presence_bits().div_ceil(8)
    }
}

macro_rules! system_macros {
    ($($variant:ident = $addr:literal, $name:literal, [$($param:literal $card:ident),*];)*) => {
        /// Macros with hard-coded semantics, by address in the system macro table.
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        #[repr(u8)]
        pub enum SystemMacro {
            $($variant = $addr,)*
        }

        impl SystemMacro {
            pub const ALL: &'static [SystemMacro] = &[$(SystemMacro::$variant,)*];

            pub fn from_address(address: usize) -> Option<Self> {
                Self::ALL.get(address).copied()
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(SystemMacro::$variant),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(SystemMacro::$variant => $name,)*
                }
            }

            fn signature(self) -> Vec<Parameter> {
                match self {
                    $(SystemMacro::$variant => vec![$(Parameter::new($param, Cardinality::$card)),*],)*
                }
            }
        }
    };
}

system_macros! {
    None = 0, "none", [];
    Values = 1, "values", ["values" ZeroOrMore];
    Default = 2, "default", ["expr" ZeroOrMore, "default_expr" ZeroOrMore];
    Meta = 3, "meta", ["anything" ZeroOrMore];
    Repeat = 4, "repeat", ["n" ExactlyOne, "value" OneOrMore];
    Flatten = 5, "flatten", ["sequences" ZeroOrMore];
    Delta = 6, "delta", ["deltas" ZeroOrMore];
    Sum = 7, "sum", ["a" ExactlyOne, "b" ExactlyOne];
    Annotate = 8, "annotate", ["ann" ZeroOrMore, "value" ExactlyOne];
    MakeString = 9, "make_string", ["text" ZeroOrMore];
    MakeSymbol = 10, "make_symbol", ["text" ZeroOrMore];
    MakeDecimal = 11, "make_decimal", ["coefficient" ExactlyOne, "exponent" ExactlyOne];
    MakeTimestamp = 12, "make_timestamp", [
        "year" ExactlyOne, "month" ZeroOrOne, "day" ZeroOrOne, "hour" ZeroOrOne,
        "minute" ZeroOrOne, "second" ZeroOrOne, "offset_minutes" ZeroOrOne
    ];
    MakeBlob = 13, "make_blob", ["bytes" ZeroOrMore];
    MakeList = 14, "make_list", ["sequences" ZeroOrMore];
    MakeSexp = 15, "make_sexp", ["sequences" ZeroOrMore];
    MakeField = 16, "make_field", ["name" ExactlyOne, "value" ExactlyOne];
    MakeStruct = 17, "make_struct", ["structs" ZeroOrMore];
    ParseIon = 18, "parse_ion", ["data" ExactlyOne];
    SetSymbols = 19, "set_symbols", ["symbols" ZeroOrMore];
    AddSymbols = 20, "add_symbols", ["symbols" ZeroOrMore];
    SetMacros = 21, "set_macros", ["macros" ZeroOrMore];
    AddMacros = 22, "add_macros", ["macros" ZeroOrMore];
    Use = 23, "use", ["catalog_key" ExactlyOne, "version" ZeroOrOne];
}

impl SystemMacro {
    #[inline]
    pub fn address(self) -> usize {
        self as usize
    }

    /// Macros that mutate the encoding context when invoked at top level.
    pub fn is_directive(self) -> bool {
        matches!(
            self,
            Self::SetSymbols | Self::AddSymbols | Self::SetMacros | Self::AddMacros | Self::Use
        )
    }
}

static SYSTEM_MACROS: LazyLock<Vec<Arc<Macro>>> = LazyLock::new(|| {
    SystemMacro::ALL
        .iter()
        .map(|&m| {
            Arc::new(Macro {
                name: Some(Arc::from(m.name())),
                signature: m.signature(),
                body: MacroBody::System(m),
            })
        })
        .collect()
});

/// The system macro table in address order.
pub fn system_macro_table() -> &'static [Arc<Macro>] {
    &SYSTEM_MACROS
}
