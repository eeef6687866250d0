//! Metadata tokens.
//!
//! A token is a 32-bit value whose top byte names a table (or `0x70` for the user string
//! heap) and whose low 24 bits hold a 1-based row index, or a heap offset for user strings.
//! Tokens appear as CIL operands, in the CLR header's entry point and in standalone signature
//! references.
//!
//! ```text
//! 0x06000012
//!   ^^          table  0x06 = MethodDef
//!     ^^^^^^    row    0x12 (1-based)
//! ```

use std::fmt;

use crate::metadata::tables::TableId;

/// Token prefix of `ldstr` operands, addressing the `#US` heap
pub const USER_STRING_TOKEN: u8 = 0x70;

/// A metadata token
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Wrap a raw token value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Build a token from a table byte and a 1-based row
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The top byte
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The table addressed by this token, `None` for heap tokens and unknown tables
    #[must_use]
    pub fn table_id(&self) -> Option<TableId> {
        TableId::from_u8(self.table())
    }

    /// The low 24 bits, a 1-based row for table tokens
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// True for the nil token `0x00000000`
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts() {
        let token = Token::new(0x0600_0012);
        assert_eq!(token.table(), 0x06);
        assert_eq!(token.table_id(), Some(TableId::MethodDef));
        assert_eq!(token.row(), 0x12);
        assert_eq!(Token::from_parts(0x06, 0x12), token);
        assert_eq!(u32::from(token), 0x0600_0012);
    }

    #[test]
    fn user_string_token() {
        let token = Token::from_parts(USER_STRING_TOKEN, 0x1234);
        assert_eq!(token.value(), 0x7000_1234);
        assert_eq!(token.table_id(), None);
    }

    #[test]
    fn formatting() {
        let token = Token(0x0200_0005);
        assert_eq!(format!("{token}"), "0x02000005");
        assert_eq!(
            format!("{token:?}"),
            "Token(0x02000005, table: 0x02, row: 5)"
        );
        assert!(Token(0).is_null());
    }
}
