#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Macro expansion for the ionic decoder.
//!
//! This crate flattens macro invocations into a single instruction array and
//! provides a cursor that reads the flattened values back.

pub mod engine;

pub use engine::{
    Expansion, FlattenLimits, Flattener, NoopTracer, PrintTracer, Program, TemplateCursor,
    Tracer, Verbosity,
};
