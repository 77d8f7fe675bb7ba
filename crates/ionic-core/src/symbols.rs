//! Symbol tables and resolved symbol tokens.
//!
//! A table maps dense symbol IDs to optional text. ID 0 is reserved and never
//! has text. Tables are immutable once built: extending one produces a new
//! table, so readers holding an `Arc<SymbolTable>` never observe a change.

use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::error::{DecodeError, Result};

/// `$ion_symbol_table`, in both generations.
pub const ION_SYMBOL_TABLE_SID: usize = 3;
pub const IMPORTS_SID: usize = 6;
pub const SYMBOLS_SID: usize = 7;

/// Text of the Ion 1.0 system symbols, in ID order starting at 1.
pub const SYSTEM_SYMBOLS_1_0: [&str; 9] = [
    "$ion",
    "$ion_1_0",
    "$ion_symbol_table",
    "name",
    "version",
    "imports",
    "symbols",
    "max_id",
    "$ion_shared_symbol_table",
];

/// Text of the Ion 1.1 system symbols, in ID order starting at 1.
pub const SYSTEM_SYMBOLS_1_1: [&str; 65] = [
    "$ion",
    "$ion_1_0",
    "$ion_symbol_table",
    "name",
    "version",
    "imports",
    "symbols",
    "max_id",
    "$ion_shared_symbol_table",
    "encoding",
    "$ion_literal",
    "$ion_shared_module",
    "macro",
    "macro_table",
    "symbol_table",
    "module",
    "retain",
    "export",
    "catalog_key",
    "import",
    "",
    "literal",
    "if_none",
    "if_some",
    "if_single",
    "if_multi",
    "for",
    "default",
    "values",
    "annotate",
    "make_string",
    "make_symbol",
    "make_blob",
    "make_decimal",
    "make_timestamp",
    "make_list",
    "make_sexp",
    "make_struct",
    "parse_ion",
    "repeat",
    "delta",
    "flatten",
    "sum",
    "set_symbols",
    "add_symbols",
    "set_macros",
    "add_macros",
    "use",
    "meta",
    "flex_symbol",
    "flex_int",
    "flex_uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "int8",
    "int16",
    "int32",
    "int64",
    "float16",
    "float32",
    "float64",
    "none",
    "make_field",
];

static SYSTEM_1_0: LazyLock<Arc<SymbolTable>> =
    LazyLock::new(|| Arc::new(SymbolTable::from_texts(SYSTEM_SYMBOLS_1_0)));

static SYSTEM_1_1: LazyLock<Arc<SymbolTable>> =
    LazyLock::new(|| Arc::new(SymbolTable::from_texts(SYSTEM_SYMBOLS_1_1)));

/// A symbol as seen by the application: an optional ID and optional text.
///
/// Inline text (1.1 FlexSym, bytecode constants) has no ID. A symbol whose
/// slot was allocated without text has an ID and no text.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct SymbolToken {
    sid: Option<usize>,
    text: Option<Arc<str>>,
}

impl SymbolToken {
    pub fn new(sid: Option<usize>, text: Option<Arc<str>>) -> Self {
        Self { sid, text }
    }

    pub fn with_text(text: impl Into<Arc<str>>) -> Self {
        Self {
            sid: None,
            text: Some(text.into()),
        }
    }

    pub fn sid(&self) -> Option<usize> {
        self.sid
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn text_arc(&self) -> Option<&Arc<str>> {
        self.text.as_ref()
    }

    pub fn is(&self, text: &str) -> bool {
        self.text() == Some(text)
    }
}

impl fmt::Display for SymbolToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.text, self.sid) {
            (Some(t), _) => f.write_str(t),
            (None, Some(sid)) => write!(f, "${sid}"),
            (None, None) => f.write_str("$0"),
        }
    }
}

/// Dense table of symbol text indexed by symbol ID.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SymbolTable {
    entries: Vec<Option<Arc<str>>>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self { entries: vec![None] }
    }
}

impl SymbolTable {
    /// Table holding only the reserved ID 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The Ion 1.0 system symbol table.
    pub fn system_1_0() -> Arc<SymbolTable> {
        Arc::clone(&SYSTEM_1_0)
    }

    /// The Ion 1.1 system symbol table.
    pub fn system_1_1() -> Arc<SymbolTable> {
        Arc::clone(&SYSTEM_1_1)
    }

    /// Text of Ion 1.1 system symbol `sid`.
    pub fn system_text_1_1(sid: usize) -> Option<&'static str> {
        sid.checked_sub(1).and_then(|i| SYSTEM_SYMBOLS_1_1.get(i).copied())
    }

    /// Resolve Ion 1.1 system symbol `sid` into a token.
    pub fn system_token_1_1(sid: usize) -> Result<SymbolToken> {
        SYSTEM_1_1.token(sid)
    }

    /// Reserved ID 0 followed by `texts`.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self::from_entries(texts.into_iter().map(|t| Some(t.into())))
    }

    /// Reserved ID 0 followed by `entries`. `None` allocates a slot without text.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Option<Arc<str>>>,
    {
        let mut table = Self::new();
        table.entries.extend(entries);
        table
    }

    /// A copy of this table with `entries` appended.
    pub fn extended<I>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = Option<Arc<str>>>,
    {
        let mut table = self.clone();
        table.entries.extend(entries);
        table
    }

    /// Number of IDs, including the reserved ID 0.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: ID 0 is always present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Text for `sid`, failing if the ID is not defined.
    #[inline]
    pub fn text(&self, sid: usize) -> Result<Option<&Arc<str>>> {
        match self.entries.get(sid) {
            Some(entry) => Ok(entry.as_ref()),
            None => Err(DecodeError::SymbolOutOfRange {
                sid,
                max: self.entries.len() - 1,
            }
            .into()),
        }
    }

    /// Token for `sid`, failing if the ID is not defined.
    pub fn token(&self, sid: usize) -> Result<SymbolToken> {
        let text = self.text(sid)?.cloned();
        Ok(SymbolToken::new(Some(sid), text))
    }

    /// Lowest ID whose text equals `text`.
    pub fn sid_of(&self, text: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.as_deref() == Some(text))
    }

    /// Iterate over `(sid, text)` pairs, skipping ID 0.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<&str>)> {
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, e)| (i, e.as_deref()))
    }
}
