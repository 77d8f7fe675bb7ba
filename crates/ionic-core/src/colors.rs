//! ANSI styling for token dumps and traces.
//!
//! - Key: field names and annotations
//! - Text: strings, symbols and lobs
//! - Number: numeric and temporal scalars
//! - Dim: structure (container markers, positions, opcodes)

/// Palette used by every human-readable printer.
#[derive(Clone, Copy, Debug)]
pub struct Colors {
    pub key: &'static str,
    pub text: &'static str,
    pub number: &'static str,
    pub dim: &'static str,
    pub reset: &'static str,
}

impl Default for Colors {
    fn default() -> Self {
        Self::OFF
    }
}

impl Colors {
    pub const ON: Self = Self {
        key: "\x1b[34m",
        text: "\x1b[32m",
        number: "\x1b[33m",
        dim: "\x1b[2m",
        reset: "\x1b[0m",
    };

    pub const OFF: Self = Self {
        key: "",
        text: "",
        number: "",
        dim: "",
        reset: "",
    };

    pub fn new(enabled: bool) -> Self {
        if enabled { Self::ON } else { Self::OFF }
    }

    pub fn is_enabled(&self) -> bool {
        !self.reset.is_empty()
    }
}
