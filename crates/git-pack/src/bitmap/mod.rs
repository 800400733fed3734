//! Reachability bitmap index: construction and on-disk reading.
//!
//! Building an index is the job of [`writer::BitmapIndexWriter`], which
//! drives the closure loader ([`object_table`]), name-hint collector
//! ([`name_hash`]), commit selector ([`select`]), bitmap builder
//! ([`build`]), and XOR compressor ([`xor`]) in sequence and serializes the
//! result. [`BitmapIndex`] below reads that format back, primarily to
//! support round-trip verification of what the writer produced — this
//! crate does not serve bitmap queries.

pub mod build;
pub mod ewah;
pub mod name_hash;
pub mod object_table;
pub mod select;
pub mod writer;

pub use build::{BitmapIndex as BuiltBitmapIndex, SelectedCommit};
pub use ewah::EwahBitmap;
pub use object_table::{ObjectKind, ObjectRecord, ObjectTable};
pub use writer::BitmapIndexWriter;
pub use xor::{compress, CompressedCommit, MAX_XOR_OFFSET_SEARCH};

pub mod xor;

use git_hash::ObjectId;

use crate::PackError;

pub const BITMAP_SIGNATURE: &[u8; 4] = b"BITM";
pub const BITMAP_VERSION: u16 = 2;
pub const OPT_FULL_DAG: u16 = 0x1;
pub const OPT_HASH_CACHE: u16 = 0x8;
const HEADER_SIZE: usize = 32;
const DIRECTORY_RECORD_SIZE: usize = 28;

/// Parsed index header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapHeader {
    pub version: u16,
    pub options: u16,
    pub entry_count: u32,
    pub checksum: ObjectId,
}

/// One entry in the on-disk selected-commit directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub id: ObjectId,
    pub bitmap_pos: u32,
    pub xor_offset: u8,
    pub flags: u8,
}

/// A read-back view of a bitmap index file.
pub struct BitmapIndex {
    header: BitmapHeader,
    data: Vec<u8>,
    directory: Vec<DirectoryEntry>,
}

impl BitmapIndex {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, PackError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    fn from_bytes(data: Vec<u8>) -> Result<Self, PackError> {
        if data.len() < HEADER_SIZE {
            return Err(PackError::InvalidIndex("file too small for header".into()));
        }
        if &data[0..4] != BITMAP_SIGNATURE {
            return Err(PackError::InvalidIndex("bad BITM signature".into()));
        }
        let version = u16::from_be_bytes([data[4], data[5]]);
        if version != BITMAP_VERSION {
            return Err(PackError::UnsupportedVersion(version as u32));
        }
        let options = u16::from_be_bytes([data[6], data[7]]);
        let entry_count = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
        let checksum = ObjectId::from_bytes(&data[12..32], git_hash::HashAlgorithm::Sha1)?;

        if data.len() < DIRECTORY_RECORD_SIZE * entry_count as usize {
            return Err(PackError::InvalidIndex("truncated file".into()));
        }
        let dir_start = data.len() - DIRECTORY_RECORD_SIZE * entry_count as usize;
        let mut directory = Vec::with_capacity(entry_count as usize);
        for i in 0..entry_count as usize {
            let rec = &data[dir_start + i * DIRECTORY_RECORD_SIZE..dir_start + (i + 1) * DIRECTORY_RECORD_SIZE];
            let id = ObjectId::from_bytes(&rec[0..20], git_hash::HashAlgorithm::Sha1)?;
            let bitmap_pos = u32::from_be_bytes([rec[20], rec[21], rec[22], rec[23]]);
            let xor_offset = rec[24];
            let flags = rec[25];
            directory.push(DirectoryEntry {
                id,
                bitmap_pos,
                xor_offset,
                flags,
            });
        }

        Ok(Self {
            header: BitmapHeader {
                version,
                options,
                entry_count,
                checksum,
            },
            data,
            directory,
        })
    }

    pub fn header(&self) -> BitmapHeader {
        self.header
    }

    /// Selected commit identifiers, in the order they were written.
    pub fn directory(&self) -> &[DirectoryEntry] {
        &self.directory
    }

    /// Read the bitmap payload referenced by a directory entry, without
    /// resolving its XOR chain.
    pub fn raw_bitmap_at(&self, bitmap_pos: u32) -> Result<EwahBitmap, PackError> {
        EwahBitmap::read_at(&self.data, bitmap_pos as usize).map(|(bm, _)| bm)
    }
}
