// SPDX-License-Identifier: MIT
//! Crate-wide error type

use crate::validation::ValidationError;

/// Payload family a decode error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Metadata,
    FormattingDirective,
    Text,
}

impl PayloadKind {
    pub fn name(&self) -> &'static str {
        match self {
            PayloadKind::Metadata => "metadata",
            PayloadKind::FormattingDirective => "formatting directive",
            PayloadKind::Text => "text",
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur while encoding, decoding, wrapping or storing documents
#[derive(Debug, thiserror::Error)]
pub enum SqdocError {
    #[error("sqdoc: invalid magic")]
    InvalidMagic,

    #[error("sqdoc: unsupported version: {0}")]
    UnsupportedVersion(u16),

    #[error("sqdoc: random-access flag required")]
    MissingRandomAccessFlag,

    #[error("sqdoc: invalid toc")]
    InvalidToc,

    #[error("sqdoc: invalid block range")]
    InvalidBlockRange,

    #[error("sqdoc: overlapping block ranges")]
    OverlappingBlocks,

    #[error("sqdoc: crc mismatch for block {block_id}: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch {
        block_id: u64,
        expected: u32,
        actual: u32,
    },

    #[error("sqdoc: malformed {kind} payload: {reason}")]
    MalformedPayload {
        kind: PayloadKind,
        reason: &'static str,
    },

    #[error("sqdoc: unsupported block kind {kind} for block {block_id}")]
    UnsupportedBlockKind { block_id: u64, kind: u8 },

    #[error("sqdoc: text block {0} missing payload")]
    MissingTextPayload(u64),

    #[error("sqdoc: payload of block {block_id} is too large ({len} bytes)")]
    PayloadTooLarge { block_id: u64, len: usize },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("sqdoc: password required")]
    PasswordRequired,

    #[error("sqdoc: invalid password")]
    InvalidPassword,

    #[error("sqdoc: invalid secure file: {0}")]
    InvalidSecureFile(&'static str),

    #[error("sqdoc: compression error: {0}")]
    Compression(String),

    #[error("sqdoc: encryption error: {0}")]
    Encryption(String),

    #[error("sqdoc: invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SqdocError {
    pub(crate) fn malformed(kind: PayloadKind, reason: &'static str) -> Self {
        SqdocError::MalformedPayload { kind, reason }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SqdocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_names_payload() {
        let err = SqdocError::malformed(PayloadKind::FormattingDirective, "bad stride");
        assert_eq!(
            err.to_string(),
            "sqdoc: malformed formatting directive payload: bad stride"
        );
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let err: SqdocError = ValidationError::DuplicateBlockId(7).into();
        assert_eq!(err.to_string(), "sqdoc: duplicate block id 7");
    }
}
