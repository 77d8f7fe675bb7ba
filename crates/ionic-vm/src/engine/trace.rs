//! Instrumentation hooks for macro flattening.
//!
//! `NoopTracer` methods are empty and inlined, so untraced expansions pay
//! nothing. `PrintTracer` collects one line per event for the CLI.

use ionic_bytecode::Macro;
use ionic_core::Colors;

/// Verbosity level for trace output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Invocations and their results.
    #[default]
    Default,
    /// Also parameter substitutions.
    Verbose,
}

/// Flattener instrumentation.
///
/// - `trace_enter` - before an invocation is expanded
/// - `trace_exit` - after it was expanded
/// - `trace_parameter` - when a parameter reference is substituted
pub trait Tracer {
    fn trace_enter(&mut self, target: &Macro, depth: usize, args: usize);

    fn trace_exit(&mut self, target: &Macro, depth: usize, emitted: usize);

    fn trace_parameter(&mut self, index: usize, values: usize);
}

/// Tracer that does nothing.
#[derive(Debug)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    #[inline(always)]
    fn trace_enter(&mut self, _target: &Macro, _depth: usize, _args: usize) {}

    #[inline(always)]
    fn trace_exit(&mut self, _target: &Macro, _depth: usize, _emitted: usize) {}

    #[inline(always)]
    fn trace_parameter(&mut self, _index: usize, _values: usize) {}
}

/// Tracer that collects indented, optionally colored lines.
#[derive(Debug)]
pub struct PrintTracer {
    verbosity: Verbosity,
    colors: Colors,
    lines: Vec<String>,
    depth: usize,
}

impl PrintTracer {
    pub fn new(verbosity: Verbosity, colors: Colors) -> Self {
        Self {
            verbosity,
            colors,
            lines: Vec::new(),
            depth: 0,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Print all trace lines.
    pub fn print(&self) {
        for line in &self.lines {
            println!("{line}");
        }
    }

    fn push(&mut self, depth: usize, content: String) {
        let indent = "  ".repeat(depth);
        self.lines.push(format!("{indent}{content}"));
    }

    fn name(&self, target: &Macro) -> String {
        let c = self.colors;
        let name = target.name().unwrap_or("<anonymous>");
        format!("({}{}{})", c.key, name, c.reset)
    }
}

impl Tracer for PrintTracer {
    fn trace_enter(&mut self, target: &Macro, depth: usize, args: usize) {
        self.depth = depth;
        let name = self.name(target);
        let kind = if target.system_kind().is_some() {
            "system"
        } else {
            "template"
        };
        self.push(depth - 1, format!("▶ {name} {kind} args={args}"));
    }

    fn trace_exit(&mut self, target: &Macro, depth: usize, emitted: usize) {
        self.depth = depth - 1;
        let name = self.name(target);
        let c = self.colors;
        self.push(
            depth - 1,
            format!("◀ {name} {}+{emitted}{}", c.number, c.reset),
        );
    }

    fn trace_parameter(&mut self, index: usize, values: usize) {
        if self.verbosity == Verbosity::Default {
            return;
        }
        let c = self.colors;
        let plural = if values == 1 { "" } else { "s" };
        self.push(
            self.depth,
            format!("{}%{index}{} → {values} value{plural}", c.dim, c.reset),
        );
    }
}
