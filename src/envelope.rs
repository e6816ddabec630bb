// SPDX-License-Identifier: MIT
//! Secure envelope: optional compression and password encryption around a container
//!
//! ```text
//! magic "SQDOC_FUCK_THE_RUSSIANS"   23 bytes
//! version                          u16
//! flags                            u16  bit0 compressed, bit1 encrypted
//! salt                             16 bytes
//! nonce                            12 bytes
//! payload length                   u64
//! payload                          compressed then encrypted container
//! ```
//!
//! The envelope does not look inside what it wraps.

use std::io::{Read, Write};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::config::{LoadOptions, SaveOptions};
use crate::error::{Result, SqdocError};
use crate::wire::{self, WireReader};

/// Envelope magic bytes
pub const ENVELOPE_MAGIC: &[u8; 23] = b"SQDOC_FUCK_THE_RUSSIANS";

/// Envelope format version
pub const ENVELOPE_VERSION: u16 = 1;

pub const SALT_SIZE: usize = 16;
pub const NONCE_SIZE: usize = 12;

/// Fixed envelope header size in bytes
pub const ENVELOPE_HEADER_SIZE: usize = ENVELOPE_MAGIC.len() + 2 + 2 + SALT_SIZE + NONCE_SIZE + 8;

/// PBKDF2-HMAC-SHA256 rounds
pub const KDF_ITERATIONS: u32 = 200_000;

const KEY_SIZE: usize = 32;

/// Envelope flags
pub mod flags {
    pub const COMPRESSED: u16 = 1 << 0;
    pub const ENCRYPTED: u16 = 1 << 1;
}

/// What the envelope header says, without decrypting anything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct EnvelopeInfo {
    pub wrapped: bool,
    pub compressed: bool,
    pub encrypted: bool,
    /// Zero when not wrapped
    pub version: u16,
}

/// Fixed envelope header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub version: u16,
    pub flags: u16,
    pub salt: [u8; SALT_SIZE],
    pub nonce: [u8; NONCE_SIZE],
    pub payload_len: u64,
}

impl EnvelopeHeader {
    /// Parse the header; the input must start with [`ENVELOPE_MAGIC`]
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if !is_envelope(bytes) {
            return Err(SqdocError::InvalidSecureFile("missing envelope magic"));
        }
        if bytes.len() < ENVELOPE_HEADER_SIZE {
            return Err(SqdocError::InvalidSecureFile("truncated header"));
        }

        let mut reader = WireReader::new(&bytes[ENVELOPE_MAGIC.len()..ENVELOPE_HEADER_SIZE]);
        let version = reader
            .u16()
            .ok_or(SqdocError::InvalidSecureFile("truncated header"))?;
        if version != ENVELOPE_VERSION {
            return Err(SqdocError::UnsupportedVersion(version));
        }
        Self::read_fields(&mut reader, version)
            .ok_or(SqdocError::InvalidSecureFile("truncated header"))
    }

    fn read_fields(reader: &mut WireReader<'_>, version: u16) -> Option<Self> {
        Some(Self {
            version,
            flags: reader.u16()?,
            salt: reader.bytes(SALT_SIZE)?.try_into().ok()?,
            nonce: reader.bytes(NONCE_SIZE)?.try_into().ok()?,
            payload_len: reader.u64()?,
        })
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & flags::COMPRESSED != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & flags::ENCRYPTED != 0
    }

    pub fn write_to_buffer(&self, buffer: &mut Vec<u8>) {
        buffer.reserve(ENVELOPE_HEADER_SIZE);
        buffer.extend_from_slice(ENVELOPE_MAGIC);
        wire::put_u16(buffer, self.version);
        wire::put_u16(buffer, self.flags);
        buffer.extend_from_slice(&self.salt);
        buffer.extend_from_slice(&self.nonce);
        wire::put_u64(buffer, self.payload_len);
    }
}

/// Whether `bytes` starts with the envelope magic
#[inline]
pub fn is_envelope(bytes: &[u8]) -> bool {
    bytes.starts_with(ENVELOPE_MAGIC)
}

/// Read the envelope flags without decrypting
///
/// Input without the envelope magic reports `wrapped: false`.
pub fn inspect_envelope_bytes(bytes: &[u8]) -> Result<EnvelopeInfo> {
    if !is_envelope(bytes) {
        return Ok(EnvelopeInfo::default());
    }
    let header = EnvelopeHeader::parse(bytes)?;
    Ok(EnvelopeInfo {
        wrapped: true,
        compressed: header.is_compressed(),
        encrypted: header.is_encrypted(),
        version: header.version,
    })
}

/// Wrap an encoded container: compress first, then encrypt
///
/// # Errors
///
/// `PasswordRequired` when encryption is requested with a blank password;
/// checked before any compression or crypto runs.
pub fn seal(inner: &[u8], opts: &SaveOptions) -> Result<Vec<u8>> {
    let encrypt = opts.encryption.enabled;
    if encrypt && opts.encryption.password.trim().is_empty() {
        return Err(SqdocError::PasswordRequired);
    }

    let mut header = EnvelopeHeader {
        version: ENVELOPE_VERSION,
        flags: 0,
        salt: [0; SALT_SIZE],
        nonce: [0; NONCE_SIZE],
        payload_len: 0,
    };

    let mut payload = if opts.compression {
        header.flags |= flags::COMPRESSED;
        compress(inner)?
    } else {
        inner.to_vec()
    };

    if encrypt {
        header.flags |= flags::ENCRYPTED;
        let mut rng = rand::rng();
        rng.fill_bytes(&mut header.salt);
        rng.fill_bytes(&mut header.nonce);

        let cipher = cipher_for(&opts.encryption.password, &header.salt)?;
        payload = cipher
            .encrypt(Nonce::from_slice(&header.nonce), payload.as_slice())
            .map_err(|_| SqdocError::Encryption("AES-GCM seal failed".to_string()))?;
    }

    header.payload_len = payload.len() as u64;
    let mut out = Vec::with_capacity(ENVELOPE_HEADER_SIZE + payload.len());
    header.write_to_buffer(&mut out);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Unwrap an envelope: decrypt, then decompress
///
/// # Errors
///
/// `InvalidSecureFile` when the declared length does not match (checked
/// before any crypto), `PasswordRequired` when the file is encrypted and no
/// password was given, `InvalidPassword` on any authentication failure.
pub fn open(bytes: &[u8], opts: &LoadOptions) -> Result<Vec<u8>> {
    let header = EnvelopeHeader::parse(bytes)?;
    let body = &bytes[ENVELOPE_HEADER_SIZE..];
    if body.len() as u64 != header.payload_len {
        return Err(SqdocError::InvalidSecureFile("payload length mismatch"));
    }

    let mut payload = if header.is_encrypted() {
        if opts.password.trim().is_empty() {
            return Err(SqdocError::PasswordRequired);
        }
        let cipher = cipher_for(&opts.password, &header.salt)?;
        cipher
            .decrypt(Nonce::from_slice(&header.nonce), body)
            .map_err(|_| SqdocError::InvalidPassword)?
    } else {
        body.to_vec()
    };

    if header.is_compressed() {
        payload = decompress(&payload)?;
    }
    Ok(payload)
}

/// Derive the AES-256 key from a password and salt
fn cipher_for(password: &str, salt: &[u8]) -> Result<Aes256Gcm> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, KDF_ITERATIONS, &mut key[..]);
    Aes256Gcm::new_from_slice(&key[..])
        .map_err(|_| SqdocError::Encryption("invalid key length".to_string()))
}

/// Compress data using zlib at the fastest level
fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let estimated_size = data.len().saturating_mul(6) / 10;
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(estimated_size.max(256)), Compression::fast());
    encoder
        .write_all(data)
        .map_err(|e| SqdocError::Compression(format!("Write failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| SqdocError::Compression(format!("Finish failed: {}", e)))
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decompressed = Vec::with_capacity(data.len().saturating_mul(3).max(1024));
    ZlibDecoder::new(data)
        .read_to_end(&mut decompressed)
        .map_err(|e| SqdocError::Compression(e.to_string()))?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncryptionOptions;

    fn inner() -> Vec<u8> {
        b"KeepCalmAndFuckTheRussians inner container bytes, repeated repeated repeated".to_vec()
    }

    #[test]
    fn test_header_size() {
        assert_eq!(ENVELOPE_HEADER_SIZE, 63);
    }

    #[test]
    fn test_compression_only_roundtrip() {
        let opts = SaveOptions {
            compression: true,
            ..SaveOptions::default()
        };
        let sealed = seal(&inner(), &opts).unwrap();
        let info = inspect_envelope_bytes(&sealed).unwrap();
        assert!(info.wrapped && info.compressed && !info.encrypted);
        assert_eq!(info.version, ENVELOPE_VERSION);
        assert_eq!(open(&sealed, &LoadOptions::default()).unwrap(), inner());
    }

    #[test]
    fn test_encrypted_roundtrip_and_wrong_password() {
        let opts = SaveOptions {
            compression: true,
            encryption: EncryptionOptions::with_password("hunter2"),
        };
        let sealed = seal(&inner(), &opts).unwrap();
        assert!(inspect_envelope_bytes(&sealed).unwrap().encrypted);

        assert!(matches!(
            open(&sealed, &LoadOptions::default()),
            Err(SqdocError::PasswordRequired)
        ));
        assert!(matches!(
            open(&sealed, &LoadOptions::with_password("hunter3")),
            Err(SqdocError::InvalidPassword)
        ));
        assert_eq!(
            open(&sealed, &LoadOptions::with_password("hunter2")).unwrap(),
            inner()
        );
    }

    #[test]
    fn test_blank_password_rejected_before_crypto() {
        let opts = SaveOptions {
            compression: false,
            encryption: EncryptionOptions::with_password(" \t\n"),
        };
        assert!(matches!(seal(&inner(), &opts), Err(SqdocError::PasswordRequired)));
    }

    #[test]
    fn test_tampered_ciphertext_reports_invalid_password() {
        let opts = SaveOptions {
            compression: false,
            encryption: EncryptionOptions::with_password("pw"),
        };
        let mut sealed = seal(&inner(), &opts).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(
            open(&sealed, &LoadOptions::with_password("pw")),
            Err(SqdocError::InvalidPassword)
        ));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let opts = SaveOptions {
            compression: true,
            ..SaveOptions::default()
        };
        let mut sealed = seal(&inner(), &opts).unwrap();
        sealed.push(0);
        assert!(matches!(
            open(&sealed, &LoadOptions::default()),
            Err(SqdocError::InvalidSecureFile(_))
        ));
    }

    #[test]
    fn test_inspect_plain_and_truncated() {
        assert_eq!(inspect_envelope_bytes(&inner()).unwrap(), EnvelopeInfo::default());
        assert!(matches!(
            inspect_envelope_bytes(&ENVELOPE_MAGIC[..]),
            Err(SqdocError::InvalidSecureFile(_))
        ));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let opts = SaveOptions {
            compression: true,
            ..SaveOptions::default()
        };
        let mut sealed = seal(&inner(), &opts).unwrap();
        sealed[23..25].copy_from_slice(&9u16.to_le_bytes());
        assert!(matches!(
            inspect_envelope_bytes(&sealed),
            Err(SqdocError::UnsupportedVersion(9))
        ));
    }
}
