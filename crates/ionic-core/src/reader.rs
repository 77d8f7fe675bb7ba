//! The token-oriented cursor contract shared by binary tokenizers and the
//! bytecode evaluator.

use crate::error::{DecodeError, Result, UsageError};
use crate::symbols::SymbolToken;
use crate::token::{IonType, TokenKind};
use crate::value::{Decimal, Int, Timestamp};

/// A pull cursor over one sequence of values.
///
/// `next_token` positions the cursor on the next token. Scalar payloads stay
/// unread until a typed accessor consumes them; `skip` steps over whatever the
/// current token covers. Calling `next_token` while positioned on an unread
/// field name or annotation sequence consumes it implicitly.
///
/// Containers are not part of this trait: each implementation hands out its
/// own child cursor type.
pub trait ValueReader {
    fn next_token(&mut self) -> Result<TokenKind>;

    fn current_token(&self) -> TokenKind;

    /// Step over the current value. On a field name or annotation token the
    /// whole field or annotated value is skipped.
    fn skip(&mut self) -> Result<()>;

    fn is_null(&self) -> bool {
        self.current_token() == TokenKind::Null
    }

    /// Type of the current null.
    fn null_type(&mut self) -> Result<IonType>;

    fn read_bool(&mut self) -> Result<bool>;

    fn read_int(&mut self) -> Result<Int>;

    fn read_i64(&mut self) -> Result<i64> {
        self.read_int()?
            .as_i64()
            .ok_or_else(|| DecodeError::IntegerOverflow.into())
    }

    fn read_f64(&mut self) -> Result<f64>;

    fn read_decimal(&mut self) -> Result<Decimal>;

    fn read_timestamp(&mut self) -> Result<Timestamp>;

    /// Text of the current string. Borrowed until the next call on this cursor.
    fn read_str(&mut self) -> Result<&str>;

    fn read_symbol(&mut self) -> Result<SymbolToken>;

    /// Bytes of the current blob or clob.
    fn read_lob(&mut self) -> Result<&[u8]>;

    /// Consume the current field name.
    fn read_field_name(&mut self) -> Result<SymbolToken>;

    /// Consume the current annotation sequence, appending it to `out`.
    fn read_annotations(&mut self, out: &mut Vec<SymbolToken>) -> Result<()>;
}

/// Fail unless `found` is `expected`.
#[inline]
pub fn expect_token(found: TokenKind, expected: TokenKind) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(UsageError::WrongToken { expected, found }.into())
    }
}

/// Fail unless `found` is one of the lob kinds.
#[inline]
pub fn expect_lob(found: TokenKind) -> Result<()> {
    match found {
        TokenKind::Blob | TokenKind::Clob => Ok(()),
        _ => Err(UsageError::WrongToken {
            expected: TokenKind::Blob,
            found,
        }
        .into()),
    }
}
