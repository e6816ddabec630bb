// SPDX-License-Identifier: MIT
//! In-memory document model shared with the editor
//!
//! The editor mutates these types directly; the codec only reads them on save
//! and builds fresh ones on load.

use serde::{Deserialize, Serialize};

/// Reserved block ID of the metadata pseudo-block
pub const METADATA_BLOCK_ID: u64 = 0;

/// Reserved block ID of the formatting-directive pseudo-block
pub const DIRECTIVE_BLOCK_ID: u64 = u64::MAX;

/// Paragraph gap used when a file predates the settings bytes
pub const DEFAULT_PARAGRAPH_GAP: u16 = 8;

/// Font size of text with no explicit styling
pub const DEFAULT_FONT_SIZE_PT: u16 = 14;

/// Color of text with no explicit styling
pub const DEFAULT_COLOR_RGBA: u32 = 0x2020_20FF;

/// Font family, persisted as a single byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum FontFamily {
    #[default]
    Sans = 0,
    Serif = 1,
    Monospace = 2,
}

impl FontFamily {
    /// Decode a persisted byte, coercing unknown values to `Sans`
    #[inline]
    pub fn from_u8_lossy(value: u8) -> Self {
        Self::try_from(value).unwrap_or_default()
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FontFamily {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FontFamily::Sans),
            1 => Ok(FontFamily::Serif),
            2 => Ok(FontFamily::Monospace),
            other => Err(other),
        }
    }
}

/// Kind of a block, as stored in the TOC
///
/// Only `Text` is persistable as document content. `Media` and `Script` are
/// reserved slots; `Unknown` carries kinds written by newer encoders so the
/// decoder can skip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Metadata,
    Text,
    Media,
    Style,
    Script,
    Unknown(u8),
}

impl BlockKind {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => BlockKind::Metadata,
            1 => BlockKind::Text,
            2 => BlockKind::Media,
            3 => BlockKind::Style,
            4 => BlockKind::Script,
            other => BlockKind::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            BlockKind::Metadata => 0,
            BlockKind::Text => 1,
            BlockKind::Media => 2,
            BlockKind::Style => 3,
            BlockKind::Script => 4,
            BlockKind::Unknown(other) => other,
        }
    }
}

/// Document-level metadata and display settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub author: String,
    pub title: String,
    pub created_unix: i64,
    pub modified_unix: i64,
    pub paged_mode: bool,
    /// Display hint, in points
    pub paragraph_gap: u16,
    pub preferred_font_family: FontFamily,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            author: String::new(),
            title: String::new(),
            created_unix: 0,
            modified_unix: 0,
            paged_mode: false,
            paragraph_gap: DEFAULT_PARAGRAPH_GAP,
            preferred_font_family: FontFamily::Sans,
        }
    }
}

/// Character attributes of a style run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleAttr {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub highlight: bool,
    pub font_family: FontFamily,
    pub font_size_pt: u16,
    /// Packed R,G,B,A from high to low byte
    pub color_rgba: u32,
}

impl StyleAttr {
    const BOLD: u8 = 1 << 0;
    const ITALIC: u8 = 1 << 1;
    const UNDERLINE: u8 = 1 << 2;
    const HIGHLIGHT: u8 = 1 << 3;

    /// Pack the boolean attributes into the persisted flags byte
    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.bold {
            flags |= Self::BOLD;
        }
        if self.italic {
            flags |= Self::ITALIC;
        }
        if self.underline {
            flags |= Self::UNDERLINE;
        }
        if self.highlight {
            flags |= Self::HIGHLIGHT;
        }
        flags
    }

    /// Rebuild attributes from persisted parts
    pub fn from_parts(flags: u8, font_family: FontFamily, font_size_pt: u16, color_rgba: u32) -> Self {
        Self {
            bold: flags & Self::BOLD != 0,
            italic: flags & Self::ITALIC != 0,
            underline: flags & Self::UNDERLINE != 0,
            highlight: flags & Self::HIGHLIGHT != 0,
            font_family,
            font_size_pt,
            color_rgba,
        }
    }
}

/// The attribute of text with no explicit styling
impl Default for StyleAttr {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            highlight: false,
            font_family: FontFamily::Sans,
            font_size_pt: DEFAULT_FONT_SIZE_PT,
            color_rgba: DEFAULT_COLOR_RGBA,
        }
    }
}

/// Half-open byte range `[start, end)` of a text block with its attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRun {
    pub start: u32,
    pub end: u32,
    pub attr: StyleAttr,
}

impl StyleRun {
    pub fn new(start: u32, end: u32, attr: StyleAttr) -> Self {
        Self { start, end, attr }
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw UTF-8 text plus its style runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub utf8: Vec<u8>,
    pub runs: Vec<StyleRun>,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            utf8: text.into().into_bytes(),
            runs: Vec::new(),
        }
    }

    pub fn with_runs(mut self, runs: Vec<StyleRun>) -> Self {
        self.runs = runs;
        self
    }

    /// Text as `&str`, if the buffer holds valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.utf8).ok()
    }
}

/// One block of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Caller-assigned, unique, non-zero, not `u64::MAX`
    pub id: u64,
    pub kind: BlockKind,
    pub text: Option<TextBlock>,
}

impl Block {
    /// Create a text block
    pub fn text(id: u64, text: TextBlock) -> Self {
        Self {
            id,
            kind: BlockKind::Text,
            text: Some(text),
        }
    }
}

/// Root aggregate: metadata plus ordered blocks
///
/// `Clone` is a deep copy and is what undo snapshots use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: Metadata,
    pub blocks: Vec<Block>,
}

impl Document {
    /// Create an empty document stamped with the current time
    pub fn new(author: impl Into<String>, title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            metadata: Metadata {
                author: author.into(),
                title: title.into(),
                created_unix: now,
                modified_unix: now,
                ..Metadata::default()
            },
            blocks: Vec::new(),
        }
    }

    /// Append a text block and return its ID
    pub fn push_text(&mut self, id: u64, text: TextBlock) -> u64 {
        self.blocks.push(Block::text(id, text));
        id
    }
}

/// Deep copy of a document (undo/redo snapshots)
pub fn clone_document(doc: &Document) -> Document {
    doc.clone()
}

/// Style run addressed by block ID, as persisted in the directive payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingDirectiveEntry {
    pub block_id: u64,
    pub start: u32,
    pub end: u32,
    pub attr: StyleAttr,
}

impl FormattingDirectiveEntry {
    pub fn run(&self) -> StyleRun {
        StyleRun::new(self.start, self.end, self.attr)
    }
}
