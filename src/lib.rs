// SPDX-License-Identifier: MIT
//! # SQDoc
//!
//! Persistence engine for SQDoc rich-text documents: a random-access binary
//! container with per-payload CRC32, an optional compressed and encrypted
//! envelope, and a layout inspector for diagnostics.
//!
//! ## Format Specification
//!
//! ```text
//! SQDoc container v1 (all integers little-endian)
//! ===============================================
//!
//! Header (42 bytes):
//! - Magic: "KeepCalmAndFuckTheRussians" (26 bytes)
//! - Version: 1 (u16)
//! - Flags: 0x0001 RANDOM_ACCESS, required (u16)
//! - TOC offset: 42 (u64)
//! - TOC count (u32)
//!
//! TOC entry (25 bytes):
//! - Block id (u64), kind (u8), offset (u64), length (u32), CRC32 (u32)
//!
//! Payloads, in order:
//! - Metadata (id 0)
//! - Formatting directive (id u64::MAX, kind Style)
//! - Text blocks in document order
//!
//! Secure envelope (optional, wraps a whole container):
//! - Magic: "SQDOC_FUCK_THE_RUSSIANS" (23 bytes)
//! - Version (u16), flags: 0x1 compressed, 0x2 encrypted (u16)
//! - Salt (16 bytes), nonce (12 bytes), payload length (u64)
//! - Payload: zlib, then AES-256-GCM with a PBKDF2-HMAC-SHA256 key
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use sqdoc::{decode_document, encode_document, validate, Document, StyleAttr, StyleRun, TextBlock};
//!
//! let mut doc = Document::new("Alex", "Draft");
//! let bold = StyleAttr { bold: true, ..StyleAttr::default() };
//! doc.push_text(1, TextBlock::new("Hello SQDoc").with_runs(vec![StyleRun::new(0, 5, bold)]));
//! validate(&doc).unwrap();
//!
//! let blob = encode_document(&doc).unwrap();
//! let loaded = decode_document(&blob).unwrap();
//! assert_eq!(loaded.blocks, doc.blocks);
//! ```
//!
//! Files are written with [`save`] / [`save_with_options`] and read back with
//! [`load`] / [`load_with_options`].

pub mod config;
pub mod envelope;
pub mod error;
pub mod format;
pub mod layout;
pub mod model;
pub mod payload;
pub mod reader;
pub mod runs;
pub mod storage;
pub mod validation;
pub mod wire;
pub mod writer;

pub use config::{Config, EncryptionOptions, LoadOptions, SaveOptions};
pub use envelope::EnvelopeInfo;
pub use error::{PayloadKind, Result, SqdocError};
pub use format::{SqdocHeader, TocEntry};
pub use layout::{inspect_layout, LayoutInfo, LayoutSegment};
pub use model::{
    clone_document, Block, BlockKind, Document, FontFamily, FormattingDirectiveEntry, Metadata,
    StyleAttr, StyleRun, TextBlock,
};
pub use reader::{decode_document, ContainerReader};
pub use runs::{covering_runs, effective_styles};
pub use storage::{
    inspect_envelope, load, load_with_options, save, save_with_config, save_with_options,
};
pub use validation::{validate, validate_runs, RunError, ValidationError};
pub use writer::{encode_document, encode_document_detailed, EncodedContainer};
