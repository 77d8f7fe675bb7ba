//! Error taxonomy shared by every layer of the decoder.
//!
//! Three disjoint kinds:
//! - [`DecodeError`]: the input bytes are malformed or truncated.
//! - [`UsageError`]: the caller drove a cursor incorrectly.
//! - [`MacroError`]: a macro or directive could not be resolved or evaluated.

use crate::token::TokenKind;

/// Malformed input. The data is untrustworthy and the stream should be abandoned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("integer does not fit in 32 bits")]
    IntegerTooLarge,

    #[error("integer does not fit in 64 bits")]
    IntegerOverflow,

    #[error("unexpected end of input at byte {position}")]
    UnexpectedEof { position: usize },

    #[error("invalid opcode 0x{opcode:02X} at byte {position}")]
    InvalidOpcode { opcode: u8, position: usize },

    #[error("invalid UTF-8 text at byte {position}")]
    InvalidUtf8 { position: usize },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(&'static str),

    #[error("invalid float length {0}")]
    InvalidFloatLength(usize),

    #[error("symbol ID {sid} is out of range (max {max})")]
    SymbolOutOfRange { sid: usize, max: usize },

    #[error("invalid symbol table: {0}")]
    InvalidSymbolTable(&'static str),

    #[error("unsupported Ion version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("invalid typed null 0x{0:02X}")]
    InvalidTypedNull(u8),

    #[error("invalid argument presence bits")]
    InvalidPresenceBits,

    #[error("value extends past the end of its container")]
    Truncated,

    #[error("containers nested deeper than {0}")]
    DepthExceeded(usize),
}

/// The cursor was driven in a way its protocol does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("expected {expected} but the current token is {found}")]
    WrongToken {
        expected: TokenKind,
        found: TokenKind,
    },

    #[error("field names are only available inside a struct")]
    NotInStruct,

    #[error("read past the end of the container")]
    PastEnd,

    #[error("current value has no annotations")]
    NoAnnotations,

    #[error("current value is not null")]
    NotNull,
}

/// A macro, macro argument or directive could not be resolved or evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacroError {
    #[error("no macro at address {0}")]
    UndefinedMacro(usize),

    #[error("no macro named `{0}`")]
    UndefinedMacroName(String),

    #[error("expected {expected} arguments, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("`none` accepts no arguments")]
    NoneWithArguments,

    #[error("parameter {0} is not bound in the current environment")]
    UnresolvedParameter(usize),

    #[error("constant {0} is not a macro")]
    NotAMacro(usize),

    #[error("macro invocation was not flattened before evaluation")]
    UnexpectedInvocation,

    #[error("system macro `{0}` is not supported")]
    UnsupportedSystemMacro(&'static str),

    #[error("`{0}` is not supported")]
    UnsupportedFeature(&'static str),

    #[error("invalid macro definition: {0}")]
    InvalidDefinition(String),

    #[error("invalid directive: {0}")]
    InvalidDirective(String),

    #[error("macro expansion exceeded the limit of {0}")]
    LimitExceeded(usize),

    #[error("argument for `{parameter}` does not match its cardinality")]
    Cardinality { parameter: String },

    #[error("`flatten` expects sequences")]
    FlattenNonSequence,

    #[error("`{0}` expects an integer argument")]
    ExpectedInteger(&'static str),

    #[error("`{0}` expects text arguments")]
    ExpectedText(&'static str),
}

/// Any error the decoder can produce.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Macro(#[from] MacroError),
}

impl Error {
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_))
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }

    pub fn is_macro(&self) -> bool {
        matches!(self, Error::Macro(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand for the truncation error at `position`.
#[inline]
pub fn eof(position: usize) -> Error {
    DecodeError::UnexpectedEof { position }.into()
}
