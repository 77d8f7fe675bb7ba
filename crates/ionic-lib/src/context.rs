//! The encoding context: which symbols and macros are in scope.
//!
//! Ion 1.1 organizes both tables in named modules. The system module `$ion`
//! never changes; directives edit the default module `_`, whose tables are
//! the ones e-expressions and symbol IDs address. Tables are replaced rather
//! than mutated, so cursors holding the previous `Arc` keep a consistent view.

use std::sync::Arc;

use indexmap::IndexMap;
use ionic_bytecode::{Macro, SystemMacro, system_macro_table};
use ionic_core::{DecodeError, MacroError, Result, SymbolTable};

use crate::binary::MacroAddress;

/// Name of the system module.
pub const SYSTEM_MODULE: &str = "$ion";
/// Name of the default module.
pub const DEFAULT_MODULE: &str = "_";

/// Protocol generation in effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Version {
    #[default]
    V1_0,
    V1_1,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Version::V1_0 => "1.0",
            Version::V1_1 => "1.1",
        }
    }
}

/// A symbol table and a macro table under one name.
#[derive(Clone, Debug)]
pub struct Module {
    symbols: Arc<SymbolTable>,
    macros: Arc<[Arc<Macro>]>,
}

impl Module {
    fn new(symbols: Arc<SymbolTable>, macros: Arc<[Arc<Macro>]>) -> Self {
        Self { symbols, macros }
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    pub fn macros(&self) -> &Arc<[Arc<Macro>]> {
        &self.macros
    }

    /// Address and definition of the macro named `name`.
    pub fn macro_named(&self, name: &str) -> Option<(usize, &Arc<Macro>)> {
        self.macros
            .iter()
            .enumerate()
            .find(|(_, m)| m.name() == Some(name))
    }
}

/// Symbols and macros in scope at the current stream position.
#[derive(Clone, Debug)]
pub struct EncodingContext {
    version: Version,
    modules: IndexMap<Arc<str>, Module>,
}

impl Default for EncodingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodingContext {
    /// The Ion 1.0 context every stream starts in.
    pub fn new() -> Self {
        let mut context = Self {
            version: Version::V1_0,
            modules: IndexMap::new(),
        };
        context.reset(Version::V1_0);
        context
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Apply a version marker: both tables return to the defaults of the
    /// announced version.
    pub fn on_version_marker(&mut self, major: u8, minor: u8) -> Result<()> {
        let version = match (major, minor) {
            (1, 0) => Version::V1_0,
            (1, 1) => Version::V1_1,
            _ => return Err(DecodeError::UnsupportedVersion { major, minor }.into()),
        };
        self.reset(version);
        tracing::debug!(version = version.as_str(), "encoding context reset");
        Ok(())
    }

    fn reset(&mut self, version: Version) {
        let (symbols, macros): (Arc<SymbolTable>, Arc<[Arc<Macro>]>) = match version {
            Version::V1_0 => (SymbolTable::system_1_0(), Arc::from(Vec::new())),
            Version::V1_1 => (SymbolTable::system_1_1(), Arc::from(system_macro_table())),
        };
        self.version = version;
        self.modules.clear();
        let system = Module::new(Arc::clone(&symbols), Arc::clone(&macros));
        self.modules.insert(Arc::from(SYSTEM_MODULE), system);
        self.modules
            .insert(Arc::from(DEFAULT_MODULE), Module::new(symbols, macros));
    }

    fn default_module(&self) -> &Module {
        &self.modules[DEFAULT_MODULE]
    }

    fn default_module_mut(&mut self) -> &mut Module {
        self.modules
            .get_mut(DEFAULT_MODULE)
            .expect("default module is always present")
    }

    /// Table that resolves symbol IDs.
    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.default_module().symbols
    }

    /// Table that e-expression addresses index.
    pub fn active_macro_table(&self) -> &Arc<[Arc<Macro>]> {
        &self.default_module().macros
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Modules in definition order.
    pub fn modules(&self) -> impl Iterator<Item = (&str, &Module)> {
        self.modules.iter().map(|(name, m)| (&**name, m))
    }

    /// Replace the default symbol table. ID 0 stays reserved.
    pub fn set_symbols(&mut self, texts: Vec<Option<Arc<str>>>) {
        let count = texts.len();
        self.default_module_mut().symbols = Arc::new(SymbolTable::from_entries(texts));
        tracing::debug!(count, "symbols set");
    }

    /// Append to the default symbol table.
    pub fn add_symbols(&mut self, texts: Vec<Option<Arc<str>>>) {
        let count = texts.len();
        let module = self.default_module_mut();
        module.symbols = Arc::new(module.symbols.extended(texts));
        tracing::debug!(count, total = module.symbols.len(), "symbols added");
    }

    /// Apply a local symbol table: append to the current table, or restart
    /// from the system table.
    pub fn apply_symbol_table(&mut self, append: bool, texts: Vec<Option<Arc<str>>>) {
        let count = texts.len();
        let base = if append {
            Arc::clone(self.symbols())
        } else {
            Arc::clone(self.modules[SYSTEM_MODULE].symbols())
        };
        self.default_module_mut().symbols = Arc::new(base.extended(texts));
        tracing::debug!(count, append, "local symbol table applied");
    }

    /// Replace the default macro table.
    pub fn set_macros(&mut self, macros: Vec<Arc<Macro>>) -> Result<()> {
        check_unique(&[], &macros)?;
        let count = macros.len();
        self.default_module_mut().macros = Arc::from(macros);
        tracing::debug!(count, "macros set");
        Ok(())
    }

    /// Append to the default macro table.
    pub fn add_macros(&mut self, macros: Vec<Arc<Macro>>) -> Result<()> {
        check_unique(self.active_macro_table(), &macros)?;
        let count = macros.len();
        let module = self.default_module_mut();
        let mut table = module.macros.to_vec();
        table.extend(macros);
        module.macros = Arc::from(table);
        tracing::debug!(count, total = module.macros.len(), "macros added");
        Ok(())
    }

    /// Import a module from a catalog. No catalog is available, so this
    /// always fails, even for a module that is already active.
    pub fn use_module(&mut self, _catalog_key: &str) -> Result<()> {
        Err(MacroError::UnsupportedFeature("use").into())
    }

    /// The macro an e-expression address refers to.
    pub fn resolve(&self, address: MacroAddress) -> Result<Arc<Macro>> {
        address.resolve(self.active_macro_table())
    }

    /// Look up a macro by name: in `module` when given, otherwise in the
    /// default module and then the system module.
    pub fn macro_named(&self, module: Option<&str>, name: &str) -> Result<Arc<Macro>> {
        let found = match module {
            Some(SYSTEM_MODULE) => SystemMacro::from_name(name).map(Macro::system),
            Some(module) => self
                .module(module)
                .and_then(|m| m.macro_named(name))
                .map(|(_, m)| Arc::clone(m)),
            None => self
                .default_module()
                .macro_named(name)
                .map(|(_, m)| Arc::clone(m))
                .or_else(|| SystemMacro::from_name(name).map(Macro::system)),
        };
        found.ok_or_else(|| MacroError::UndefinedMacroName(name.to_string()).into())
    }
}

/// Fail when a named macro in `added` collides with `existing` or with an
/// earlier entry of `added`.
fn check_unique(existing: &[Arc<Macro>], added: &[Arc<Macro>]) -> Result<()> {
    for (i, m) in added.iter().enumerate() {
        let Some(name) = m.name() else {
            continue;
        };
        let earlier = existing.iter().chain(&added[..i]);
        // Re-exporting the same definition is not a collision.
        if earlier
            .filter(|other| other.name() == Some(name))
            .any(|other| !Arc::ptr_eq(other, m))
        {
            return Err(MacroError::InvalidDefinition(format!("duplicate macro name `{name}`")).into());
        }
    }
    Ok(())
}
