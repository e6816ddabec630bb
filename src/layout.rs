// SPDX-License-Identifier: MIT
//! Read-only byte map of what `save` would write, for diagnostic display

use serde::Serialize;

use crate::error::Result;
use crate::format::SQDOC_HEADER_SIZE;
use crate::model::{BlockKind, Document, DIRECTIVE_BLOCK_ID, METADATA_BLOCK_ID};
use crate::validation::validate;
use crate::writer::encode_document_detailed;

/// One labelled byte range of an encoded container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutSegment {
    pub name: &'static str,
    pub kind: BlockKind,
    pub block_id: u64,
    pub offset: u64,
    pub length: u32,
}

/// Segment map of an encoded container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutInfo {
    pub header_length: u32,
    pub index_offset: u64,
    pub index_length: u32,
    pub file_size: u64,
    /// Sorted by offset
    pub segments: Vec<LayoutSegment>,
}

fn segment_name(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Metadata => "Metadata",
        BlockKind::Style => "Formatting Directive",
        BlockKind::Text => "Data Block",
        _ => "Block",
    }
}

/// Validate and encode `doc` in memory and describe the resulting byte ranges
///
/// # Errors
///
/// Returns the validation or encoding error `save` would hit.
pub fn inspect_layout(doc: &Document) -> Result<LayoutInfo> {
    validate(doc)?;
    let encoded = encode_document_detailed(doc)?;

    let mut segments = Vec::with_capacity(encoded.entries.len() + 2);
    segments.push(LayoutSegment {
        name: "Header",
        kind: BlockKind::Metadata,
        block_id: METADATA_BLOCK_ID,
        offset: 0,
        length: SQDOC_HEADER_SIZE as u32,
    });
    segments.push(LayoutSegment {
        name: "Index",
        kind: BlockKind::Style,
        block_id: DIRECTIVE_BLOCK_ID,
        offset: encoded.toc_offset,
        length: encoded.toc_length,
    });
    segments.extend(encoded.entries.iter().map(|e| LayoutSegment {
        name: segment_name(e.kind),
        kind: e.kind,
        block_id: e.block_id,
        offset: e.offset,
        length: e.length,
    }));
    segments.sort_by_key(|s| s.offset);

    Ok(LayoutInfo {
        header_length: SQDOC_HEADER_SIZE as u32,
        index_offset: encoded.toc_offset,
        index_length: encoded.toc_length,
        file_size: encoded.blob.len() as u64,
        segments,
    })
}
