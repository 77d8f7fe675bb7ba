pub mod dump;
pub mod input;
pub mod macros;

#[cfg(test)]
mod dump_tests;
#[cfg(test)]
mod macros_tests;
