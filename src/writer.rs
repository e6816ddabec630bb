// SPDX-License-Identifier: MIT
//! Container writer for creating SQDoc files
//!
//! Layout: header, TOC, then payloads in the order metadata, formatting
//! directive, text blocks in document order.

use tracing::debug;

use crate::error::{Result, SqdocError};
use crate::format::{payload_crc32, SqdocHeader, TocEntry, SQDOC_HEADER_SIZE, TOC_ENTRY_SIZE};
use crate::model::{Block, BlockKind, Document, StyleRun, DIRECTIVE_BLOCK_ID, METADATA_BLOCK_ID};
use crate::payload;
use crate::runs::covering_runs;

/// An encoded container plus the byte ranges it used
#[derive(Debug, Clone)]
pub struct EncodedContainer {
    pub blob: Vec<u8>,
    pub entries: Vec<TocEntry>,
    pub toc_offset: u64,
    pub toc_length: u32,
}

struct PendingPayload {
    block_id: u64,
    kind: BlockKind,
    data: Vec<u8>,
}

/// Encode a document into a container blob
///
/// Does not validate; `save` runs [`crate::validate`] first.
///
/// # Errors
///
/// Fails on non-text blocks, text blocks without a payload, and payloads
/// longer than `u32::MAX` bytes.
pub fn encode_document(doc: &Document) -> Result<Vec<u8>> {
    encode_document_detailed(doc).map(|encoded| encoded.blob)
}

/// Encode a document and return the TOC alongside the blob
pub fn encode_document_detailed(doc: &Document) -> Result<EncodedContainer> {
    let mut payloads = Vec::with_capacity(doc.blocks.len() + 2);

    payloads.push(PendingPayload {
        block_id: METADATA_BLOCK_ID,
        kind: BlockKind::Metadata,
        data: payload::encode_metadata(&doc.metadata)?,
    });

    let covering: Vec<(u64, Vec<StyleRun>)> = doc
        .blocks
        .iter()
        .filter(|b| b.kind == BlockKind::Text)
        .filter_map(|b| {
            b.text
                .as_ref()
                .map(|text| (b.id, covering_runs(text.utf8.len(), &text.runs)))
        })
        .collect();
    let directive =
        payload::collect_directive(covering.iter().map(|(id, runs)| (*id, runs.as_slice())));
    payloads.push(PendingPayload {
        block_id: DIRECTIVE_BLOCK_ID,
        kind: BlockKind::Style,
        data: payload::encode_directive(&directive)?,
    });

    for block in &doc.blocks {
        payloads.push(PendingPayload {
            block_id: block.id,
            kind: block.kind,
            data: encode_block_payload(block)?,
        });
    }

    let toc_count = u32::try_from(payloads.len()).map_err(|_| SqdocError::InvalidToc)?;
    let header = SqdocHeader::new(toc_count);
    let toc_length = u32::try_from(payloads.len() * TOC_ENTRY_SIZE).map_err(|_| SqdocError::InvalidToc)?;

    let data_size: usize = payloads.iter().map(|p| p.data.len()).sum();
    let total_size = SQDOC_HEADER_SIZE + toc_length as usize + data_size;

    let mut entries = Vec::with_capacity(payloads.len());
    let mut offset = (SQDOC_HEADER_SIZE + toc_length as usize) as u64;
    for p in &payloads {
        let length = u32::try_from(p.data.len()).map_err(|_| SqdocError::PayloadTooLarge {
            block_id: p.block_id,
            len: p.data.len(),
        })?;
        entries.push(TocEntry {
            block_id: p.block_id,
            kind: p.kind,
            offset,
            length,
            crc32: payload_crc32(&p.data),
        });
        offset += u64::from(length);
    }

    let mut blob = Vec::with_capacity(total_size);
    header.write_to_buffer(&mut blob);
    for entry in &entries {
        entry.write_to_buffer(&mut blob);
    }
    for p in &payloads {
        blob.extend_from_slice(&p.data);
    }
    debug_assert_eq!(blob.len(), total_size);

    debug!(
        blocks = doc.blocks.len(),
        directive_entries = directive.len(),
        size = blob.len(),
        "Encoded sqdoc container"
    );

    Ok(EncodedContainer {
        blob,
        entries,
        toc_offset: header.toc_offset,
        toc_length,
    })
}

fn encode_block_payload(block: &Block) -> Result<Vec<u8>> {
    match block.kind {
        BlockKind::Text => {
            let text = block
                .text
                .as_ref()
                .ok_or(SqdocError::MissingTextPayload(block.id))?;
            payload::encode_text(text).ok_or(SqdocError::PayloadTooLarge {
                block_id: block.id,
                len: text.utf8.len(),
            })
        }
        other => Err(SqdocError::UnsupportedBlockKind {
            block_id: block.id,
            kind: other.as_u8(),
        }),
    }
}
