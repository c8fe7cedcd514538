//! ZIP assembly for a batch run's outputs.
//!
//! Entries are written flat at the archive root with deflate compression at the
//! `zip` crate's default level. A name that is already taken gets a numeric
//! suffix before its extension (`photo.jpeg`, `photo-1.jpeg`, ...).

use crate::error::Result;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A finalized archive held in memory.
#[derive(Debug, Clone)]
pub struct Archive {
    pub bytes: Vec<u8>,
}

impl Archive {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

pub struct ArchiveAssembler {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    names: HashSet<String>,
    options: SimpleFileOptions,
}

impl Default for ArchiveAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveAssembler {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            names: HashSet::new(),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// Adds one file at the archive root.
    ///
    /// # Arguments
    /// * `name` - Requested entry name
    /// * `data` - File contents
    ///
    /// # Returns
    /// * `Ok(stored_name)` - The name the entry was stored under
    /// * `Err(ZipperError::Archive)` - If the entry cannot be written
    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> Result<String> {
        let stored_name = self.unique_name(name);

        self.writer.start_file(stored_name.as_str(), self.options)?;
        self.writer.write_all(data)?;
        self.names.insert(stored_name.clone());

        Ok(stored_name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Writes the central directory and hands back the finished archive.
    pub fn finish(self) -> Result<Archive> {
        let cursor = self.writer.finish()?;
        Ok(Archive {
            bytes: cursor.into_inner(),
        })
    }

    fn unique_name(&self, name: &str) -> String {
        if !self.names.contains(name) {
            return name.to_string();
        }

        let path = Path::new(name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

        (1..)
            .map(|n| match &extension {
                Some(ext) => format!("{}-{}.{}", stem, n, ext),
                None => format!("{}-{}", stem, n),
            })
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or_else(|| name.to_string())
    }
}
