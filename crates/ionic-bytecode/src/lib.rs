#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Macro bytecode for the ionic decoder.
//!
//! This crate contains:
//! - Instruction words and operations (`Instruction`, `Op`)
//! - Constant pools shared between template bodies and expansions
//! - Macro definitions, signatures and the system macro table
//! - Template compilation and the opcode tables of both generations

pub mod builder;
pub mod constants;
pub mod dump;
pub mod instructions;
pub mod macros;
pub mod opcodes;
pub mod template;

#[cfg(test)]
mod builder_tests;
#[cfg(test)]
mod dump_tests;
#[cfg(test)]
mod instructions_tests;

pub use builder::BytecodeBuilder;
pub use constants::{Constant, ConstantPool};
pub use dump::{dump, dump_code, width_for_count};
pub use instructions::{Instruction, Op, join_u64, split_u64};
pub use macros::{
    Cardinality, Macro, MacroBody, Parameter, ParameterEncoding, SystemMacro, system_macro_table,
};
pub use opcodes::{Category, Length, OPCODES_1_0, OPCODES_1_1, OpcodeInfo};
pub use template::{TemplateExpr, compile_template};
