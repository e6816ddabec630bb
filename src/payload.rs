// SPDX-License-Identifier: MIT
//! Per-block payload codecs
//!
//! Each payload addressed by a TOC entry is one of three shapes: metadata,
//! formatting directive, or text. Decoders accept the legacy layouts written
//! before the settings bytes, the font-family byte, and the directive block
//! existed. Which layout a payload uses is decided once, up front, and
//! represented as an explicit shape value.

use tracing::debug;

use crate::error::{PayloadKind, Result, SqdocError};
use crate::model::{
    FontFamily, FormattingDirectiveEntry, Metadata, StyleAttr, StyleRun, TextBlock,
    DEFAULT_PARAGRAPH_GAP,
};
use crate::wire::{self, WireReader};

/// Size of one current directive entry
pub const DIRECTIVE_ENTRY_SIZE: usize = 8 + 4 + 4 + 1 + 1 + 2 + 4;

/// Size of one directive entry written before the font-family byte
pub const LEGACY_DIRECTIVE_ENTRY_SIZE: usize = 8 + 4 + 4 + 1 + 2 + 4;

/// Size of one inline run record in a legacy text payload
pub const LEGACY_INLINE_RUN_SIZE: usize = 4 + 4 + 1 + 2 + 4;

/// Settings bytes after the metadata timestamps
const METADATA_SETTINGS_SIZE: usize = 1 + 2 + 1;

const METADATA_FLAG_PAGED: u8 = 1 << 0;

// ============================================================================
// Metadata
// ============================================================================

/// Layout of a metadata payload after its timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataShape {
    /// Ends right after the timestamps
    Legacy,
    /// Carries flags, paragraph gap and preferred font
    Current,
}

impl MetadataShape {
    fn detect(trailing: usize) -> Result<Self> {
        match trailing {
            0 => Ok(MetadataShape::Legacy),
            n if n >= METADATA_SETTINGS_SIZE => Ok(MetadataShape::Current),
            _ => Err(SqdocError::malformed(
                PayloadKind::Metadata,
                "truncated settings",
            )),
        }
    }
}

/// Encode the metadata payload in the current shape
pub fn encode_metadata(metadata: &Metadata) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(
        4 + metadata.author.len() + 4 + metadata.title.len() + 16 + METADATA_SETTINGS_SIZE,
    );
    wire::put_string(&mut out, &metadata.author).ok_or(SqdocError::malformed(
        PayloadKind::Metadata,
        "author too long",
    ))?;
    wire::put_string(&mut out, &metadata.title).ok_or(SqdocError::malformed(
        PayloadKind::Metadata,
        "title too long",
    ))?;
    wire::put_i64(&mut out, metadata.created_unix);
    wire::put_i64(&mut out, metadata.modified_unix);

    let mut settings = 0u8;
    if metadata.paged_mode {
        settings |= METADATA_FLAG_PAGED;
    }
    wire::put_u8(&mut out, settings);
    wire::put_u16(&mut out, metadata.paragraph_gap);
    wire::put_u8(&mut out, metadata.preferred_font_family.as_u8());
    Ok(out)
}

/// Decode a metadata payload of either shape
pub fn decode_metadata(payload: &[u8]) -> Result<Metadata> {
    let malformed = |reason| SqdocError::malformed(PayloadKind::Metadata, reason);
    let mut reader = WireReader::new(payload);

    let author = reader.string().ok_or(malformed("author"))?;
    let title = reader.string().ok_or(malformed("title"))?;
    let created_unix = reader.i64().ok_or(malformed("timestamps"))?;
    let modified_unix = reader.i64().ok_or(malformed("timestamps"))?;

    let mut metadata = Metadata {
        author,
        title,
        created_unix,
        modified_unix,
        ..Metadata::default()
    };

    match MetadataShape::detect(reader.remaining())? {
        MetadataShape::Legacy => {
            metadata.paged_mode = false;
            metadata.paragraph_gap = DEFAULT_PARAGRAPH_GAP;
            metadata.preferred_font_family = FontFamily::Sans;
        }
        MetadataShape::Current => {
            let (Some(settings), Some(gap), Some(font)) = (reader.u8(), reader.u16(), reader.u8())
            else {
                return Err(malformed("settings"));
            };
            metadata.paged_mode = settings & METADATA_FLAG_PAGED != 0;
            metadata.paragraph_gap = gap;
            metadata.preferred_font_family = FontFamily::from_u8_lossy(font);
        }
    }

    Ok(metadata)
}

// ============================================================================
// Formatting directive
// ============================================================================

/// Entry stride of a formatting-directive payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveStride {
    /// 24-byte entries with a font-family byte
    Current,
    /// 23-byte entries without a font-family byte
    Legacy,
}

impl DirectiveStride {
    pub fn entry_size(self) -> usize {
        match self {
            DirectiveStride::Current => DIRECTIVE_ENTRY_SIZE,
            DirectiveStride::Legacy => LEGACY_DIRECTIVE_ENTRY_SIZE,
        }
    }

    /// Pick the stride that exactly divides `body_len` into `count` entries
    fn detect(body_len: usize, count: usize) -> Result<Self> {
        let malformed = |reason| SqdocError::malformed(PayloadKind::FormattingDirective, reason);
        if body_len % count != 0 {
            return Err(malformed("entry length does not divide payload"));
        }
        let size = body_len / count;
        [DirectiveStride::Current, DirectiveStride::Legacy]
            .into_iter()
            .find(|stride| stride.entry_size() == size)
            .ok_or(malformed("unsupported entry size"))
    }
}

/// Flatten per-block covering runs into directive entries sorted by `(block_id, start, end)`
pub fn collect_directive<'a, I>(blocks: I) -> Vec<FormattingDirectiveEntry>
where
    I: IntoIterator<Item = (u64, &'a [StyleRun])>,
{
    let mut out: Vec<FormattingDirectiveEntry> = blocks
        .into_iter()
        .flat_map(|(block_id, runs)| {
            runs.iter().map(move |r| FormattingDirectiveEntry {
                block_id,
                start: r.start,
                end: r.end,
                attr: r.attr,
            })
        })
        .collect();
    out.sort_by_key(|e| (e.block_id, e.start, e.end));
    out
}

/// Encode directive entries with the current 24-byte stride
pub fn encode_directive(entries: &[FormattingDirectiveEntry]) -> Result<Vec<u8>> {
    let count = u32::try_from(entries.len()).map_err(|_| {
        SqdocError::malformed(PayloadKind::FormattingDirective, "too many entries")
    })?;

    let mut out = Vec::with_capacity(4 + entries.len() * DIRECTIVE_ENTRY_SIZE);
    wire::put_u32(&mut out, count);
    for entry in entries {
        wire::put_u64(&mut out, entry.block_id);
        wire::put_u32(&mut out, entry.start);
        wire::put_u32(&mut out, entry.end);
        wire::put_u8(&mut out, entry.attr.flags());
        wire::put_u8(&mut out, entry.attr.font_family.as_u8());
        wire::put_u16(&mut out, entry.attr.font_size_pt);
        wire::put_u32(&mut out, entry.attr.color_rgba);
    }
    Ok(out)
}

/// Decode a directive payload of either stride
pub fn decode_directive(payload: &[u8]) -> Result<Vec<FormattingDirectiveEntry>> {
    let malformed = |reason| SqdocError::malformed(PayloadKind::FormattingDirective, reason);
    let mut reader = WireReader::new(payload);

    let count = reader.u32().ok_or(malformed("missing entry count"))? as usize;
    if count == 0 {
        return Ok(Vec::new());
    }
    let stride = DirectiveStride::detect(reader.remaining(), count)?;
    if stride == DirectiveStride::Legacy {
        debug!(count, "Decoding legacy 23-byte formatting directive entries");
    }

    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let entry = read_directive_entry(&mut reader, stride).ok_or(malformed("truncated entry"))?;
        out.push(entry);
    }
    Ok(out)
}

fn read_directive_entry(
    reader: &mut WireReader<'_>,
    stride: DirectiveStride,
) -> Option<FormattingDirectiveEntry> {
    let block_id = reader.u64()?;
    let start = reader.u32()?;
    let end = reader.u32()?;
    let flags = reader.u8()?;
    let font_family = match stride {
        DirectiveStride::Current => FontFamily::from_u8_lossy(reader.u8()?),
        DirectiveStride::Legacy => FontFamily::Sans,
    };
    let font_size_pt = reader.u16()?;
    let color_rgba = reader.u32()?;

    Some(FormattingDirectiveEntry {
        block_id,
        start,
        end,
        attr: StyleAttr::from_parts(flags, font_family, font_size_pt, color_rgba),
    })
}

// ============================================================================
// Text
// ============================================================================

/// Encode a text payload: `u32` length plus raw UTF-8, nothing else
pub fn encode_text(text: &TextBlock) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(4 + text.utf8.len());
    wire::put_bytes(&mut out, &text.utf8)?;
    Some(out)
}

/// Decode a text payload, including any legacy inline run table
///
/// A legacy run table that ends mid-record keeps the runs parsed so far.
pub fn decode_text(payload: &[u8]) -> Result<TextBlock> {
    let mut reader = WireReader::new(payload);
    let len = reader
        .u32()
        .ok_or(SqdocError::malformed(PayloadKind::Text, "missing length"))?;
    let utf8 = reader
        .bytes(len as usize)
        .ok_or(SqdocError::malformed(PayloadKind::Text, "declared length exceeds payload"))?
        .to_vec();

    let runs = match reader.u32() {
        Some(count) => read_inline_runs(&mut reader, count as usize),
        None => Vec::new(),
    };

    Ok(TextBlock { utf8, runs })
}

fn read_inline_runs(reader: &mut WireReader<'_>, count: usize) -> Vec<StyleRun> {
    let mut runs = Vec::with_capacity(count.min(reader.remaining() / LEGACY_INLINE_RUN_SIZE));
    for _ in 0..count {
        if reader.remaining() < LEGACY_INLINE_RUN_SIZE {
            debug!(
                parsed = runs.len(),
                declared = count,
                "Legacy inline run table ends early, keeping parsed runs"
            );
            break;
        }
        let (Some(start), Some(end), Some(flags), Some(size), Some(color)) = (
            reader.u32(),
            reader.u32(),
            reader.u8(),
            reader.u16(),
            reader.u32(),
        ) else {
            break;
        };
        runs.push(StyleRun::new(
            start,
            end,
            StyleAttr::from_parts(flags, FontFamily::Sans, size, color),
        ));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> Metadata {
        Metadata {
            author: "Alex".into(),
            title: "Draft".into(),
            created_unix: 1_700_000_000,
            modified_unix: 1_700_000_100,
            paged_mode: true,
            paragraph_gap: 12,
            preferred_font_family: FontFamily::Serif,
        }
    }

    fn legacy_metadata_payload() -> Vec<u8> {
        let mut out = Vec::new();
        wire::put_string(&mut out, "Alex").unwrap();
        wire::put_string(&mut out, "Draft").unwrap();
        wire::put_i64(&mut out, 10);
        wire::put_i64(&mut out, 20);
        out
    }

    #[test]
    fn test_metadata_current_shape() {
        let metadata = sample_metadata();
        let payload = encode_metadata(&metadata).unwrap();
        assert_eq!(payload.len(), 4 + 4 + 4 + 5 + 16 + 4);
        assert_eq!(decode_metadata(&payload).unwrap(), metadata);
    }

    #[test]
    fn test_metadata_legacy_shape_defaults_settings() {
        let metadata = decode_metadata(&legacy_metadata_payload()).unwrap();
        assert_eq!(metadata.author, "Alex");
        assert_eq!(metadata.modified_unix, 20);
        assert!(!metadata.paged_mode);
        assert_eq!(metadata.paragraph_gap, DEFAULT_PARAGRAPH_GAP);
        assert_eq!(metadata.preferred_font_family, FontFamily::Sans);
    }

    #[test]
    fn test_metadata_partial_settings_rejected() {
        let mut payload = legacy_metadata_payload();
        payload.extend_from_slice(&[1, 2]);
        assert!(matches!(
            decode_metadata(&payload),
            Err(SqdocError::MalformedPayload {
                kind: PayloadKind::Metadata,
                ..
            })
        ));
    }

    #[test]
    fn test_metadata_unknown_font_coerced() {
        let mut payload = legacy_metadata_payload();
        payload.extend_from_slice(&[0, 8, 0, 77]);
        let metadata = decode_metadata(&payload).unwrap();
        assert_eq!(metadata.preferred_font_family, FontFamily::Sans);
    }

    #[test]
    fn test_metadata_truncated_author_rejected() {
        let mut payload = Vec::new();
        wire::put_u32(&mut payload, 50);
        payload.extend_from_slice(b"short");
        assert!(decode_metadata(&payload).is_err());
    }

    fn entry(block_id: u64, start: u32, end: u32) -> FormattingDirectiveEntry {
        FormattingDirectiveEntry {
            block_id,
            start,
            end,
            attr: StyleAttr {
                italic: true,
                font_family: FontFamily::Monospace,
                font_size_pt: 18,
                color_rgba: 0xAABB_CCDD,
                ..StyleAttr::default()
            },
        }
    }

    #[test]
    fn test_directive_current_stride() {
        let entries = vec![entry(1, 0, 3), entry(2, 4, 9)];
        let payload = encode_directive(&entries).unwrap();
        assert_eq!(payload.len(), 4 + 2 * DIRECTIVE_ENTRY_SIZE);
        assert_eq!(decode_directive(&payload).unwrap(), entries);
    }

    #[test]
    fn test_directive_legacy_stride_defaults_font() {
        let mut payload = Vec::new();
        wire::put_u32(&mut payload, 1);
        wire::put_u64(&mut payload, 7);
        wire::put_u32(&mut payload, 0);
        wire::put_u32(&mut payload, 5);
        wire::put_u8(&mut payload, 0b0001);
        wire::put_u16(&mut payload, 12);
        wire::put_u32(&mut payload, 0x1122_33FF);
        assert_eq!(payload.len(), 4 + LEGACY_DIRECTIVE_ENTRY_SIZE);

        let entries = decode_directive(&payload).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].block_id, 7);
        assert!(entries[0].attr.bold);
        assert_eq!(entries[0].attr.font_family, FontFamily::Sans);
        assert_eq!(entries[0].attr.font_size_pt, 12);
        assert_eq!(entries[0].attr.color_rgba, 0x1122_33FF);
    }

    #[test]
    fn test_directive_unknown_stride_rejected() {
        for body in [22usize, 25, 26] {
            let mut payload = Vec::new();
            wire::put_u32(&mut payload, 1);
            payload.extend(std::iter::repeat_n(0u8, body));
            assert!(
                decode_directive(&payload).is_err(),
                "{body}-byte entry accepted"
            );
        }

        let mut payload = Vec::new();
        wire::put_u32(&mut payload, 2);
        payload.extend_from_slice(&[0u8; 47]);
        assert!(decode_directive(&payload).is_err());
    }

    #[test]
    fn test_directive_entry_sizes() {
        assert_eq!(DIRECTIVE_ENTRY_SIZE, 24);
        assert_eq!(LEGACY_DIRECTIVE_ENTRY_SIZE, 23);
        assert_eq!(DirectiveStride::Current.entry_size(), DIRECTIVE_ENTRY_SIZE);
        assert_eq!(DirectiveStride::Legacy.entry_size(), LEGACY_DIRECTIVE_ENTRY_SIZE);
        assert_eq!(DirectiveStride::detect(48, 2).unwrap(), DirectiveStride::Current);
        assert_eq!(DirectiveStride::detect(46, 2).unwrap(), DirectiveStride::Legacy);
    }

    #[test]
    fn test_directive_empty_and_short() {
        assert!(decode_directive(&0u32.to_le_bytes()).unwrap().is_empty());
        assert!(decode_directive(&[0, 0]).is_err());
    }

    #[test]
    fn test_collect_directive_sorts_by_block_then_range() {
        let attr = StyleAttr::default();
        let second = [StyleRun::new(3, 6, attr), StyleRun::new(0, 3, attr)];
        let first = [StyleRun::new(0, 2, attr)];
        let entries = collect_directive([(9u64, &second[..]), (4u64, &first[..])]);
        let keys: Vec<_> = entries.iter().map(|e| (e.block_id, e.start)).collect();
        assert_eq!(keys, vec![(4, 0), (9, 0), (9, 3)]);
    }

    #[test]
    fn test_text_payload_is_length_plus_bytes() {
        let payload = encode_text(&TextBlock::new("Hello")).unwrap();
        assert_eq!(payload, [&5u32.to_le_bytes()[..], b"Hello"].concat());

        let decoded = decode_text(&payload).unwrap();
        assert_eq!(decoded.utf8, b"Hello");
        assert!(decoded.runs.is_empty());
    }

    fn legacy_text_payload(text: &str, runs: &[(u32, u32, u8, u16, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        wire::put_bytes(&mut out, text.as_bytes()).unwrap();
        wire::put_u32(&mut out, runs.len() as u32);
        for &(start, end, flags, size, color) in runs {
            wire::put_u32(&mut out, start);
            wire::put_u32(&mut out, end);
            wire::put_u8(&mut out, flags);
            wire::put_u16(&mut out, size);
            wire::put_u32(&mut out, color);
        }
        out
    }

    #[test]
    fn test_text_legacy_inline_runs() {
        let payload = legacy_text_payload("abcdef", &[(0, 3, 0b0010, 11, 0xFF), (3, 6, 0, 13, 0xEE)]);
        let decoded = decode_text(&payload).unwrap();
        assert_eq!(decoded.runs.len(), 2);
        assert!(decoded.runs[0].attr.italic);
        assert_eq!(decoded.runs[1].attr.font_size_pt, 13);
        assert!(decoded
            .runs
            .iter()
            .all(|r| r.attr.font_family == FontFamily::Sans));
    }

    #[test]
    fn test_text_legacy_partial_tail_keeps_parsed_runs() {
        let mut payload = legacy_text_payload("abcdef", &[(0, 3, 0, 11, 0xFF), (3, 6, 0, 13, 0xEE)]);
        payload.truncate(payload.len() - 4);
        let decoded = decode_text(&payload).unwrap();
        assert_eq!(decoded.utf8, b"abcdef");
        assert_eq!(decoded.runs.len(), 1);
    }

    #[test]
    fn test_text_declared_length_too_long() {
        let mut payload = Vec::new();
        wire::put_u32(&mut payload, 10);
        payload.extend_from_slice(b"abc");
        assert!(matches!(
            decode_text(&payload),
            Err(SqdocError::MalformedPayload {
                kind: PayloadKind::Text,
                ..
            })
        ));
        assert!(decode_text(&[1, 0]).is_err());
    }
}
