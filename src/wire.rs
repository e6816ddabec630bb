// SPDX-License-Identifier: MIT
//! Little-endian primitives shared by every payload codec
//!
//! Writers append to a `Vec<u8>`; [`WireReader`] walks a borrowed slice and
//! returns `None` instead of panicking when the input runs short.

#[inline]
pub fn put_u8(buffer: &mut Vec<u8>, value: u8) {
    buffer.push(value);
}

#[inline]
pub fn put_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn put_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn put_u64(buffer: &mut Vec<u8>, value: u64) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn put_i64(buffer: &mut Vec<u8>, value: i64) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

/// Append a `u32` byte length followed by the raw bytes (no terminator, no padding)
///
/// Returns `None` when the value is longer than `u32::MAX` bytes.
pub fn put_bytes(buffer: &mut Vec<u8>, value: &[u8]) -> Option<()> {
    let len = u32::try_from(value.len()).ok()?;
    put_u32(buffer, len);
    buffer.extend_from_slice(value);
    Some(())
}

/// Append a length-prefixed UTF-8 string
#[inline]
pub fn put_string(buffer: &mut Vec<u8>, value: &str) -> Option<()> {
    put_bytes(buffer, value.as_bytes())
}

/// Cursor over a little-endian byte slice
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of unread bytes
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Current cursor offset from the start of the slice
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Take the next `len` bytes (zero-copy)
    pub fn bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let out = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(out)
    }

    fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.bytes(N)?.try_into().ok()
    }

    pub fn u8(&mut self) -> Option<u8> {
        self.array::<1>().map(|b| b[0])
    }

    pub fn u16(&mut self) -> Option<u16> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> Option<u32> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn u64(&mut self) -> Option<u64> {
        self.array().map(u64::from_le_bytes)
    }

    pub fn i64(&mut self) -> Option<i64> {
        self.array().map(i64::from_le_bytes)
    }

    /// Read a `u32` length prefix and that many bytes
    pub fn len_prefixed(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        let len = self.u32()? as usize;
        match self.bytes(len) {
            Some(bytes) => Some(bytes),
            None => {
                self.pos = start;
                None
            }
        }
    }

    /// Read a length-prefixed string; fails on short input or invalid UTF-8
    pub fn string(&mut self) -> Option<String> {
        let start = self.pos;
        let bytes = self.len_prefixed()?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Some(s.to_owned()),
            Err(_) => {
                self.pos = start;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_are_little_endian() {
        let mut buffer = Vec::new();
        put_u16(&mut buffer, 0x0102);
        put_u32(&mut buffer, 0x0304_0506);
        put_u64(&mut buffer, 0x0708_090A_0B0C_0D0E);
        put_i64(&mut buffer, -2);

        assert_eq!(&buffer[0..2], &[0x02, 0x01]);
        assert_eq!(&buffer[2..6], &[0x06, 0x05, 0x04, 0x03]);
        assert_eq!(
            &buffer[6..14],
            &[0x0E, 0x0D, 0x0C, 0x0B, 0x0A, 0x09, 0x08, 0x07]
        );
        assert_eq!(&buffer[14..22], &[0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);

        let mut reader = WireReader::new(&buffer);
        assert_eq!(reader.u16(), Some(0x0102));
        assert_eq!(reader.u32(), Some(0x0304_0506));
        assert_eq!(reader.u64(), Some(0x0708_090A_0B0C_0D0E));
        assert_eq!(reader.i64(), Some(-2));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_string_layout() {
        let mut buffer = Vec::new();
        put_string(&mut buffer, "héllo").unwrap();
        assert_eq!(&buffer[0..4], &6u32.to_le_bytes());
        assert_eq!(&buffer[4..], "héllo".as_bytes());

        let mut reader = WireReader::new(&buffer);
        assert_eq!(reader.string().as_deref(), Some("héllo"));
    }

    #[test]
    fn test_short_string_fails_without_advancing() {
        let mut buffer = Vec::new();
        put_u32(&mut buffer, 10);
        buffer.extend_from_slice(b"abc");

        let mut reader = WireReader::new(&buffer);
        assert!(reader.string().is_none());
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_reads_past_end_return_none() {
        let mut reader = WireReader::new(&[1, 2, 3]);
        assert!(reader.u32().is_none());
        assert_eq!(reader.u16(), Some(0x0201));
        assert!(reader.u16().is_none());
        assert_eq!(reader.u8(), Some(3));
        assert!(reader.u8().is_none());
    }
}
