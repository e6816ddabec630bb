// SPDX-License-Identifier: MIT
//! Container reader for SQDoc files
//!
//! [`ContainerReader`] parses and checks the header and TOC without touching
//! payload contents; [`decode_document`] builds a [`Document`] on top of it.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Result, SqdocError};
use crate::format::{payload_crc32, SqdocHeader, TocEntry};
use crate::model::{Block, BlockKind, Document, FormattingDirectiveEntry, StyleAttr};
use crate::payload;
use crate::validation::{validate_runs, ValidationError};
use crate::wire::WireReader;

/// Zero-copy view over a checked container
#[derive(Debug)]
pub struct ContainerReader<'a> {
    data: &'a [u8],
    header: SqdocHeader,
    entries: Vec<TocEntry>,
}

impl<'a> ContainerReader<'a> {
    /// Parse header and TOC and check every payload range
    ///
    /// # Errors
    ///
    /// `InvalidMagic`, `UnsupportedVersion`, `MissingRandomAccessFlag`,
    /// `InvalidToc`, `InvalidBlockRange` or `OverlappingBlocks`, in that order.
    pub fn from_slice(data: &'a [u8]) -> Result<Self> {
        let header = SqdocHeader::parse(data)?;

        let file_len = data.len() as u64;
        let toc_end = header
            .toc_offset
            .checked_add(header.toc_length())
            .ok_or(SqdocError::InvalidToc)?;
        if header.toc_offset > file_len || toc_end > file_len {
            return Err(SqdocError::InvalidToc);
        }

        let mut toc = WireReader::new(&data[header.toc_offset as usize..toc_end as usize]);
        let entries = (0..header.toc_count)
            .map(|_| TocEntry::read_from(&mut toc).ok_or(SqdocError::InvalidToc))
            .collect::<Result<Vec<_>>>()?;

        validate_entry_ranges(&entries, file_len)?;

        Ok(Self {
            data,
            header,
            entries,
        })
    }

    pub fn header(&self) -> &SqdocHeader {
        &self.header
    }

    /// TOC entries in file order
    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    /// Get one payload after verifying its CRC32
    pub fn payload(&self, entry: &TocEntry) -> Result<&'a [u8]> {
        let start = usize::try_from(entry.offset).map_err(|_| SqdocError::InvalidBlockRange)?;
        let end = start
            .checked_add(entry.length as usize)
            .ok_or(SqdocError::InvalidBlockRange)?;
        let payload = self
            .data
            .get(start..end)
            .ok_or(SqdocError::InvalidBlockRange)?;

        let actual = payload_crc32(payload);
        if actual != entry.crc32 {
            return Err(SqdocError::CrcMismatch {
                block_id: entry.block_id,
                expected: entry.crc32,
                actual,
            });
        }
        Ok(payload)
    }

    /// Total container size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Every range must lie inside the file and no two may overlap
fn validate_entry_ranges(entries: &[TocEntry], file_len: u64) -> Result<()> {
    let mut ranges = Vec::with_capacity(entries.len());
    for entry in entries {
        let end = entry.end().ok_or(SqdocError::InvalidBlockRange)?;
        if entry.offset > file_len || end > file_len {
            return Err(SqdocError::InvalidBlockRange);
        }
        ranges.push((entry.offset, end));
    }

    ranges.sort_by_key(|&(start, _)| start);
    if ranges.windows(2).any(|w| w[1].0 < w[0].1) {
        return Err(SqdocError::OverlappingBlocks);
    }
    Ok(())
}

/// Decode a container blob into a document
///
/// Style runs are reattached from the formatting directive, sorted by
/// `(start, end)` and checked with [`validate_runs`]. Only then are runs
/// carrying the default attribute dropped: they are gap fill written by the
/// encoder. Block-level checks (ids, kinds) are left to [`crate::validate`],
/// which `load` runs on the result.
///
/// # Errors
///
/// Any header, TOC, range, CRC, payload or run error aborts the whole decode.
pub fn decode_document(blob: &[u8]) -> Result<Document> {
    let reader = ContainerReader::from_slice(blob)?;

    let mut doc = Document::default();
    let mut directive: Vec<FormattingDirectiveEntry> = Vec::new();
    let mut index_by_id: HashMap<u64, usize> = HashMap::new();

    for entry in reader.entries() {
        let data = reader.payload(entry)?;
        match entry.kind {
            BlockKind::Metadata => doc.metadata = payload::decode_metadata(data)?,
            BlockKind::Style => directive = payload::decode_directive(data)?,
            BlockKind::Text => {
                let text = payload::decode_text(data)?;
                index_by_id.insert(entry.block_id, doc.blocks.len());
                doc.blocks.push(Block::text(entry.block_id, text));
            }
            other => {
                debug!(block_id = entry.block_id, kind = ?other, "Skipping block of unhandled kind");
            }
        }
    }

    for entry in directive {
        let Some(&index) = index_by_id.get(&entry.block_id) else {
            debug!(block_id = entry.block_id, "Dropping directive entry for missing block");
            continue;
        };
        if let Some(text) = doc.blocks[index].text.as_mut() {
            text.runs.push(entry.run());
        }
    }

    let default_attr = StyleAttr::default();
    for block in &mut doc.blocks {
        let block_id = block.id;
        let Some(text) = block.text.as_mut() else {
            continue;
        };
        text.runs.sort_by_key(|r| (r.start, r.end));
        validate_runs(text).map_err(|reason| ValidationError::InvalidRun { block_id, reason })?;
        text.runs.retain(|r| r.attr != default_attr);
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{SQDOC_HEADER_SIZE, TOC_ENTRY_SIZE};
    use crate::model::{StyleRun, TextBlock};
    use crate::writer::encode_document;

    fn create_test_data() -> Vec<u8> {
        let mut doc = Document::new("", "toc");
        let attr = StyleAttr {
            bold: true,
            font_size_pt: 12,
            ..StyleAttr::default()
        };
        doc.push_text(1, TextBlock::new("A").with_runs(vec![StyleRun::new(0, 1, attr)]));
        encode_document(&doc).unwrap()
    }

    fn entry_field(index: usize, field_offset: usize) -> usize {
        SQDOC_HEADER_SIZE + index * TOC_ENTRY_SIZE + field_offset
    }

    #[test]
    fn test_reader_from_slice() {
        let data = create_test_data();
        let reader = ContainerReader::from_slice(&data).unwrap();
        assert_eq!(reader.entries().len(), 3);
        assert_eq!(reader.header().toc_count, 3);
        assert_eq!(reader.size(), data.len());
        for entry in reader.entries() {
            assert!(reader.payload(entry).is_ok());
        }
    }

    #[test]
    fn test_invalid_data() {
        let data = vec![0; 16];
        assert!(matches!(
            ContainerReader::from_slice(&data),
            Err(SqdocError::InvalidMagic)
        ));
    }

    #[test]
    fn test_toc_past_end_rejected() {
        let mut data = create_test_data();
        data[38..42].copy_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(
            ContainerReader::from_slice(&data),
            Err(SqdocError::InvalidToc)
        ));

        let mut data = create_test_data();
        data[30..38].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            ContainerReader::from_slice(&data),
            Err(SqdocError::InvalidToc)
        ));
    }

    #[test]
    fn test_payload_past_end_rejected() {
        let mut data = create_test_data();
        let len_field = entry_field(2, 17);
        data[len_field..len_field + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            ContainerReader::from_slice(&data),
            Err(SqdocError::InvalidBlockRange)
        ));
    }

    #[test]
    fn test_overlapping_ranges_rejected() {
        let mut data = create_test_data();
        let meta_offset = data[entry_field(0, 9)..entry_field(0, 17)].to_vec();
        let text_offset = entry_field(2, 9);
        data[text_offset..text_offset + 8].copy_from_slice(&meta_offset);
        assert!(matches!(
            ContainerReader::from_slice(&data),
            Err(SqdocError::OverlappingBlocks)
        ));
    }

    #[test]
    fn test_crc_mismatch_detected() {
        let mut data = create_test_data();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        assert!(matches!(
            decode_document(&data),
            Err(SqdocError::CrcMismatch { block_id: 1, .. })
        ));
    }

    #[test]
    fn test_unknown_kinds_are_skipped() {
        let mut data = create_test_data();
        let kind = entry_field(2, 8);
        data[kind] = 2;
        let doc = decode_document(&data).unwrap();
        assert!(doc.blocks.is_empty());
        assert_eq!(doc.metadata.title, "toc");
    }

    #[test]
    fn test_default_gap_runs_are_elided() {
        let mut doc = Document::new("", "");
        let bold = StyleAttr {
            bold: true,
            ..StyleAttr::default()
        };
        doc.push_text(5, TextBlock::new("abcdef").with_runs(vec![StyleRun::new(2, 4, bold)]));
        let decoded = decode_document(&encode_document(&doc).unwrap()).unwrap();
        assert_eq!(
            decoded.blocks[0].text.as_ref().unwrap().runs,
            vec![StyleRun::new(2, 4, bold)]
        );
    }
}
