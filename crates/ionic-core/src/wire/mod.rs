//! Payload decoders for both protocol generations.
//!
//! Each function takes exactly the payload bytes of one value (opcode and
//! length prefix already stripped) and decodes it eagerly.

pub mod v1_0;
pub mod v1_1;

#[cfg(test)]
mod v1_0_tests;

use crate::error::{DecodeError, Result};

/// Validate `bytes` as UTF-8. `position` is reported on failure.
#[inline]
pub fn utf8(bytes: &[u8], position: usize) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| {
        DecodeError::InvalidUtf8 {
            position: position + e.valid_up_to(),
        }
        .into()
    })
}
