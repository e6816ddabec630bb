// SPDX-License-Identifier: MIT
//! SQDoc container header and table-of-contents layout

use crate::error::{Result, SqdocError};
use crate::model::BlockKind;
use crate::wire::{self, WireReader};

/// SQDoc magic bytes (26 ASCII bytes)
pub const SQDOC_MAGIC: &[u8; 26] = b"KeepCalmAndFuckTheRussians";

/// SQDoc container version
pub const SQDOC_VERSION: u16 = 1;

/// Header size in bytes
pub const SQDOC_HEADER_SIZE: usize = 42;

/// TOC entry size in bytes
pub const TOC_ENTRY_SIZE: usize = 8 + 1 + 8 + 4 + 4;

/// Header flags
pub mod flags {
    /// No flags
    pub const NONE: u16 = 0x0000;

    /// The TOC is valid and covers the whole file; mandatory on load
    pub const RANDOM_ACCESS: u16 = 0x0001;
}

/// SQDoc file header (42 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqdocHeader {
    pub magic: [u8; 26],
    pub version: u16,
    pub flags: u16,
    pub toc_offset: u64,
    pub toc_count: u32,
}

impl SqdocHeader {
    /// Header for a TOC of `toc_count` entries placed directly after it
    pub fn new(toc_count: u32) -> Self {
        Self {
            magic: *SQDOC_MAGIC,
            version: SQDOC_VERSION,
            flags: flags::RANDOM_ACCESS,
            toc_offset: SQDOC_HEADER_SIZE as u64,
            toc_count,
        }
    }

    /// Parse the header from the start of a container
    ///
    /// Checks run in order: size and magic, version, random-access flag.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SQDOC_HEADER_SIZE || &bytes[..SQDOC_MAGIC.len()] != SQDOC_MAGIC {
            return Err(SqdocError::InvalidMagic);
        }

        let mut reader = WireReader::new(&bytes[SQDOC_MAGIC.len()..SQDOC_HEADER_SIZE]);
        let (Some(version), Some(flags), Some(toc_offset), Some(toc_count)) =
            (reader.u16(), reader.u16(), reader.u64(), reader.u32())
        else {
            return Err(SqdocError::InvalidMagic);
        };

        let header = Self {
            magic: *SQDOC_MAGIC,
            version,
            flags,
            toc_offset,
            toc_count,
        };
        header.validate()?;
        Ok(header)
    }

    /// Validate version and flags
    pub fn validate(&self) -> Result<()> {
        if self.magic != *SQDOC_MAGIC {
            return Err(SqdocError::InvalidMagic);
        }
        if self.version != SQDOC_VERSION {
            return Err(SqdocError::UnsupportedVersion(self.version));
        }
        if !self.is_random_access() {
            return Err(SqdocError::MissingRandomAccessFlag);
        }
        Ok(())
    }

    #[inline]
    pub fn is_random_access(&self) -> bool {
        self.flags & flags::RANDOM_ACCESS != 0
    }

    /// Byte length of the TOC region
    #[inline]
    pub fn toc_length(&self) -> u64 {
        u64::from(self.toc_count) * TOC_ENTRY_SIZE as u64
    }

    /// Write header directly to buffer
    #[inline]
    pub fn write_to_buffer(&self, buffer: &mut Vec<u8>) {
        buffer.reserve(SQDOC_HEADER_SIZE);
        buffer.extend_from_slice(&self.magic);
        wire::put_u16(buffer, self.version);
        wire::put_u16(buffer, self.flags);
        wire::put_u64(buffer, self.toc_offset);
        wire::put_u32(buffer, self.toc_count);
    }
}

/// One table-of-contents entry (25 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    pub block_id: u64,
    pub kind: BlockKind,
    pub offset: u64,
    pub length: u32,
    pub crc32: u32,
}

impl TocEntry {
    /// Exclusive end offset of the payload, `None` on overflow
    #[inline]
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(u64::from(self.length))
    }

    pub fn write_to_buffer(&self, buffer: &mut Vec<u8>) {
        wire::put_u64(buffer, self.block_id);
        wire::put_u8(buffer, self.kind.as_u8());
        wire::put_u64(buffer, self.offset);
        wire::put_u32(buffer, self.length);
        wire::put_u32(buffer, self.crc32);
    }

    /// Read one entry from the cursor
    pub fn read_from(reader: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            block_id: reader.u64()?,
            kind: BlockKind::from_u8(reader.u8()?),
            offset: reader.u64()?,
            length: reader.u32()?,
            crc32: reader.u32()?,
        })
    }
}

/// CRC32 (IEEE) of one payload
#[inline]
pub fn payload_crc32(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}
