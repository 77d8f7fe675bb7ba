//! Flattening engine and bytecode evaluator.
//!
//! The flattener inlines every invocation reachable from an expansion request,
//! so the evaluator walks a single array with no environment lookups.

mod env;
mod evaluator;
mod flatten;
mod system;
mod trace;

#[cfg(test)]
mod env_tests;
#[cfg(test)]
mod evaluator_tests;
#[cfg(test)]
mod test_utils;

pub use evaluator::{Program, TemplateCursor};
pub use flatten::{Expansion, FlattenLimits, Flattener};
pub use trace::{NoopTracer, PrintTracer, Tracer, Verbosity};
