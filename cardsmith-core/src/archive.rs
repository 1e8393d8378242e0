//! Archive sinks: where the export pipeline puts finished images
//!
//! The pipeline only adds named entries and asks for the packed result. The
//! in-memory sink keeps entries as-is; the ZIP sink writes a deflated archive.

use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Duplicate archive entry: {0}")]
    DuplicateEntry(String),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait ArchiveSink {
    type Output;

    fn contains(&self, name: &str) -> bool;

    fn add_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError>;

    fn pack(self) -> Result<Self::Output, ArchiveError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Entries kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    entries: Vec<ArchiveEntry>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ArchiveSink for MemoryArchive {
    type Output = MemoryArchive;

    fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    fn add_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        if self.contains(name) {
            return Err(ArchiveError::DuplicateEntry(name.to_string()));
        }
        self.entries.push(ArchiveEntry { name: name.to_string(), bytes: bytes.to_vec() });
        Ok(())
    }

    fn pack(self) -> Result<MemoryArchive, ArchiveError> {
        Ok(self)
    }
}

/// Writes entries straight into a ZIP held in memory.
pub struct ZipSink {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    names: Vec<String>,
}

impl ZipSink {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            names: Vec::new(),
        }
    }
}

impl Default for ZipSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveSink for ZipSink {
    type Output = Vec<u8>;

    fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    fn add_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        if self.contains(name) {
            return Err(ArchiveError::DuplicateEntry(name.to_string()));
        }
        // PNGs are already compressed.
        let method = if name.ends_with(".png") { CompressionMethod::Stored } else { CompressionMethod::Deflated };
        let options = SimpleFileOptions::default().compression_method(method);
        self.writer.start_file(name, options)?;
        self.writer.write_all(bytes)?;
        self.names.push(name.to_string());
        Ok(())
    }

    fn pack(self) -> Result<Vec<u8>, ArchiveError> {
        Ok(self.writer.finish()?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_memory_archive_rejects_duplicates() {
        let mut archive = MemoryArchive::new();
        archive.add_entry("pics/CUSTOM/A.png", b"a").unwrap();
        assert!(matches!(archive.add_entry("pics/CUSTOM/A.png", b"b"), Err(ArchiveError::DuplicateEntry(_))));
        let packed = archive.pack().unwrap();
        assert_eq!(packed.len(), 1);
        assert_eq!(packed.entry("pics/CUSTOM/A.png").unwrap().bytes, b"a");
    }

    #[test]
    fn test_zip_sink_produces_readable_archive() {
        let mut sink = ZipSink::new();
        sink.add_entry("pics/CUSTOM/Axehand.png", &[1, 2, 3]).unwrap();
        sink.add_entry("SET.xml", b"<cockatrice_carddatabase/>").unwrap();
        let bytes = sink.pack().unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 2);
        let mut xml = String::new();
        zip.by_name("SET.xml").unwrap().read_to_string(&mut xml).unwrap();
        assert_eq!(xml, "<cockatrice_carddatabase/>");
    }
}
