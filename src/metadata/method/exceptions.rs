//! Exception handling clauses of a fat method body (ECMA-335 II.25.4.6).

use bitflags::bitflags;

use crate::metadata::token::Token;

bitflags! {
    /// The kind bits of an exception clause. A clause with none of them set is a typed `catch`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u32 {
        /// Filter and handler, the filter starts at `class_token_or_filter`
        const FILTER = 0x0001;
        /// `finally`
        const FINALLY = 0x0002;
        /// `fault`, a `finally` that only runs on exceptions
        const FAULT = 0x0004;
        /// Duplicated clause, emitted by some compilers
        const DUPLICATED = 0x0008;
    }
}

/// What a clause does when control leaves its `try` block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionClauseKind {
    /// `catch (T)`
    Catch,
    /// `catch when (filter)`
    Filter,
    /// `finally`
    Finally,
    /// `fault`
    Fault,
}

/// One protected region and its handler, offsets relative to the start of the code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Clause kind bits
    pub flags: ExceptionHandlerFlags,
    /// Start of the `try` block
    pub try_offset: u32,
    /// Length of the `try` block
    pub try_length: u32,
    /// Start of the handler
    pub handler_offset: u32,
    /// Length of the handler
    pub handler_length: u32,
    /// Catch type token, or the filter offset for [`ExceptionClauseKind::Filter`]
    pub class_token_or_filter: u32,
}

impl ExceptionHandler {
    /// The clause kind
    #[must_use]
    pub fn kind(&self) -> ExceptionClauseKind {
        if self.flags.contains(ExceptionHandlerFlags::FILTER) {
            ExceptionClauseKind::Filter
        } else if self.flags.contains(ExceptionHandlerFlags::FINALLY) {
            ExceptionClauseKind::Finally
        } else if self.flags.contains(ExceptionHandlerFlags::FAULT) {
            ExceptionClauseKind::Fault
        } else {
            ExceptionClauseKind::Catch
        }
    }

    /// The caught type of a `catch` clause
    #[must_use]
    pub fn class_token(&self) -> Option<Token> {
        (self.kind() == ExceptionClauseKind::Catch).then_some(Token::new(self.class_token_or_filter))
    }

    /// The start of the filter block of a `filter` clause
    #[must_use]
    pub fn filter_offset(&self) -> Option<u32> {
        (self.kind() == ExceptionClauseKind::Filter).then_some(self.class_token_or_filter)
    }

    /// True if `offset` lies within the protected `try` block
    #[must_use]
    pub fn protects(&self, offset: u32) -> bool {
        offset >= self.try_offset && offset - self.try_offset < self.try_length
    }
}
