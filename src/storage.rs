// SPDX-License-Identifier: MIT
//! File persistence for SQDoc documents
//!
//! Saves go through [`AtomicFileWrite`]: the bytes land in a sibling temp
//! file which is renamed over the target only after a complete write, so a
//! failed save never leaves a half-written document behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Config, LoadOptions, SaveOptions};
use crate::envelope::{self, EnvelopeInfo};
use crate::error::{Result, SqdocError};
use crate::model::Document;
use crate::reader::decode_document;
use crate::validation::validate;
use crate::writer::encode_document;

/// Temp file next to a target path, renamed over it on commit
///
/// Dropping without [`AtomicFileWrite::commit`] removes the temp file.
#[derive(Debug)]
pub struct AtomicFileWrite {
    target: PathBuf,
    temp_path: PathBuf,
    file: Option<File>,
    durable: bool,
    committed: bool,
}

impl AtomicFileWrite {
    /// Create the sibling temp file for `target`
    pub fn create(target: &Path, config: &Config) -> Result<Self> {
        let file_name = target
            .file_name()
            .ok_or_else(|| {
                SqdocError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("save path has no file name: {}", target.display()),
                ))
            })?
            .to_string_lossy()
            .into_owned();

        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if config.create_parent_dirs {
            fs::create_dir_all(&parent)?;
        }

        let temp_path = parent.join(format!(
            ".{}.{}.{}",
            file_name,
            Uuid::new_v4(),
            config.temp_suffix
        ));
        let file = File::create(&temp_path)?;
        debug!(temp = %temp_path.display(), "Created temp file");

        Ok(Self {
            target: target.to_path_buf(),
            temp_path,
            file: Some(file),
            durable: config.durable_writes,
            committed: false,
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| SqdocError::Io(std::io::Error::other("temp file already closed")))?;
        file.write_all(bytes)?;
        Ok(())
    }

    /// Flush, optionally fsync, and rename the temp file over the target
    pub fn commit(mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            if self.durable {
                file.sync_all()?;
            }
        }

        fs::rename(&self.temp_path, &self.target)?;
        self.committed = true;

        if self.durable {
            if let Some(parent) = self.target.parent().filter(|p| !p.as_os_str().is_empty()) {
                // Directory fsync is not supported everywhere
                if let Err(e) = File::open(parent).and_then(|dir| dir.sync_all()) {
                    debug!("Parent directory sync skipped: {}", e);
                }
            }
        }
        Ok(())
    }
}

impl Drop for AtomicFileWrite {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        drop(self.file.take());
        if let Err(e) = fs::remove_file(&self.temp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(temp = %self.temp_path.display(), "Failed to remove temp file: {}", e);
            }
        }
    }
}

/// Save a document as a plain container
pub fn save(path: impl AsRef<Path>, doc: &mut Document) -> Result<()> {
    save_with_options(path, doc, &SaveOptions::default())
}

/// Save a document, optionally compressed and/or encrypted
///
/// Storage behaviour comes from [`Config::from_env`].
pub fn save_with_options(
    path: impl AsRef<Path>,
    doc: &mut Document,
    opts: &SaveOptions,
) -> Result<()> {
    save_with_config(path, doc, opts, &Config::from_env())
}

/// Save with an explicit storage configuration
///
/// Stamps `created_unix` when it is zero and always refreshes
/// `modified_unix`. Nothing is written when validation, the password check,
/// or encoding fails.
pub fn save_with_config(
    path: impl AsRef<Path>,
    doc: &mut Document,
    opts: &SaveOptions,
    config: &Config,
) -> Result<()> {
    let path = path.as_ref();
    config.validate()?;

    let now = chrono::Utc::now().timestamp();
    if doc.metadata.created_unix == 0 {
        doc.metadata.created_unix = now;
    }
    doc.metadata.modified_unix = now;

    validate(doc)?;
    if opts.encryption.enabled && opts.encryption.password.trim().is_empty() {
        return Err(SqdocError::PasswordRequired);
    }

    let inner = encode_document(doc)?;
    let bytes = if opts.wraps() {
        envelope::seal(&inner, opts)?
    } else {
        inner
    };

    let mut write = AtomicFileWrite::create(path, config)?;
    write.write_all(&bytes)?;
    write.commit()?;

    info!(
        path = %path.display(),
        size = bytes.len(),
        blocks = doc.blocks.len(),
        compressed = opts.compression,
        encrypted = opts.encryption.enabled,
        "Saved sqdoc"
    );
    Ok(())
}

/// Load a plain or compressed document
pub fn load(path: impl AsRef<Path>) -> Result<Document> {
    load_with_options(path, &LoadOptions::default())
}

/// Load a document, unwrapping a secure envelope when present
///
/// The decoded document is validated before it is returned.
pub fn load_with_options(path: impl AsRef<Path>, opts: &LoadOptions) -> Result<Document> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;

    let doc = if envelope::is_envelope(&bytes) {
        debug!(path = %path.display(), "Unwrapping secure envelope");
        let inner = envelope::open(&bytes, opts)?;
        decode_document(&inner)?
    } else {
        decode_document(&bytes)?
    };
    validate(&doc)?;

    debug!(path = %path.display(), blocks = doc.blocks.len(), "Loaded sqdoc");
    Ok(doc)
}

/// Report whether a file is wrapped, compressed or encrypted without decrypting
pub fn inspect_envelope(path: impl AsRef<Path>) -> Result<EnvelopeInfo> {
    let bytes = fs::read(path)?;
    envelope::inspect_envelope_bytes(&bytes)
}
