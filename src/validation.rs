// SPDX-License-Identifier: MIT
//! Document validation, the hard gate in front of every save and after every load

use std::collections::HashSet;

use thiserror::Error;

use crate::model::{BlockKind, Document, StyleRun, TextBlock, DIRECTIVE_BLOCK_ID, METADATA_BLOCK_ID};

/// Why a style run was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("invalid run range {start}..{end}")]
    InvertedRange { start: u32, end: u32 },

    #[error("invalid zero-length run {start}..{end}")]
    ZeroLength { start: u32, end: u32 },

    #[error("run range {start}..{end} outside text length {text_len}")]
    OutOfBounds { start: u32, end: u32, text_len: usize },

    #[error("overlapping style runs around offset {0}")]
    Overlapping(u32),

    #[error("font size must be non-zero")]
    ZeroFontSize,
}

/// Document validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("sqdoc: block[{index}] id {id} is reserved")]
    ReservedBlockId { index: usize, id: u64 },

    #[error("sqdoc: duplicate block id {0}")]
    DuplicateBlockId(u64),

    #[error("sqdoc: unsupported block kind {kind:?} for save (block {id})")]
    UnsupportedBlockKind { id: u64, kind: BlockKind },

    #[error("sqdoc: text block {0} missing payload")]
    MissingTextPayload(u64),

    #[error("sqdoc: text block {0} is not valid UTF-8")]
    InvalidTextUtf8(u64),

    #[error("sqdoc: block {block_id}: {reason}")]
    InvalidRun { block_id: u64, reason: RunError },
}

/// Check every document invariant, returning the first violation
///
/// Metadata strings are `String` and font families are `FontFamily`, so their
/// validity holds by construction.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, in block order.
pub fn validate(doc: &Document) -> Result<(), ValidationError> {
    let mut seen_ids = HashSet::with_capacity(doc.blocks.len());

    for (index, block) in doc.blocks.iter().enumerate() {
        if block.id == METADATA_BLOCK_ID || block.id == DIRECTIVE_BLOCK_ID {
            return Err(ValidationError::ReservedBlockId {
                index,
                id: block.id,
            });
        }
        if !seen_ids.insert(block.id) {
            return Err(ValidationError::DuplicateBlockId(block.id));
        }
        if block.kind != BlockKind::Text {
            return Err(ValidationError::UnsupportedBlockKind {
                id: block.id,
                kind: block.kind,
            });
        }

        let text = block
            .text
            .as_ref()
            .ok_or(ValidationError::MissingTextPayload(block.id))?;
        if std::str::from_utf8(&text.utf8).is_err() {
            return Err(ValidationError::InvalidTextUtf8(block.id));
        }
        validate_runs(text).map_err(|reason| ValidationError::InvalidRun {
            block_id: block.id,
            reason,
        })?;
    }

    Ok(())
}

/// Check run invariants on a sorted copy; the caller's order is left alone
pub fn validate_runs(text: &TextBlock) -> Result<(), RunError> {
    let text_len = text.utf8.len();
    let mut runs: Vec<StyleRun> = text.runs.clone();
    runs.sort_by_key(|r| (r.start, r.end));

    let mut last_end = 0u32;
    for (i, run) in runs.iter().enumerate() {
        if run.start > run.end {
            return Err(RunError::InvertedRange {
                start: run.start,
                end: run.end,
            });
        }
        if run.start == run.end && !(text_len == 0 && run.start == 0) {
            return Err(RunError::ZeroLength {
                start: run.start,
                end: run.end,
            });
        }
        if run.end as usize > text_len {
            return Err(RunError::OutOfBounds {
                start: run.start,
                end: run.end,
                text_len,
            });
        }
        if i > 0 && run.start < last_end {
            return Err(RunError::Overlapping(run.start));
        }
        if run.attr.font_size_pt == 0 {
            return Err(RunError::ZeroFontSize);
        }
        last_end = run.end;
    }

    Ok(())
}
