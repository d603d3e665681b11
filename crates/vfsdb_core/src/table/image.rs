//! On-disk database image.
//!
//! The whole database is one file in the virtual filesystem:
//!
//! ```text
//! | magic (4) | version (2) | length (4) | CBOR payload (N) | crc32 (4) |
//! ```
//!
//! The checksum covers everything before it. All integers are little-endian.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use vfsdb_storage::VirtualFs;

/// Magic bytes at the start of every image.
pub const IMAGE_MAGIC: [u8; 4] = *b"VFDB";
/// Current image format version.
pub const IMAGE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 4 + 2 + 4;
const FOOTER_SIZE: usize = 4;

/// Rows of one table, keyed by primary key.
pub type Rows = BTreeMap<String, Value>;

/// Every table of a database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseImage {
    tables: BTreeMap<String, Rows>,
}

impl DatabaseImage {
    /// Creates an image with the given (empty) tables.
    pub fn with_tables(tables: &[&str]) -> Self {
        let mut image = Self::default();
        for table in tables {
            image.add_table(table);
        }
        image
    }

    /// Adds an empty table. Returns false if it already existed.
    pub fn add_table(&mut self, table: &str) -> bool {
        if self.tables.contains_key(table) {
            return false;
        }
        self.tables.insert(table.to_string(), Rows::new());
        true
    }

    /// Returns true if the table exists.
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Returns the rows of a table.
    pub fn rows(&self, table: &str) -> CoreResult<&Rows> {
        self.tables
            .get(table)
            .ok_or_else(|| CoreError::schema_missing(table))
    }

    /// Returns the rows of a table for modification.
    pub fn rows_mut(&mut self, table: &str) -> CoreResult<&mut Rows> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| CoreError::schema_missing(table))
    }

    /// Returns one row.
    pub fn get(&self, table: &str, key: &str) -> CoreResult<Option<&Value>> {
        Ok(self.rows(table)?.get(key))
    }

    /// Returns the table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Encodes the image into its file format.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut payload = Vec::new();
        ciborium::into_writer(self, &mut payload).map_err(|e| CoreError::codec(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| CoreError::codec("database image too large"))?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + FOOTER_SIZE);
        buf.extend_from_slice(&IMAGE_MAGIC);
        buf.extend_from_slice(&IMAGE_VERSION.to_le_bytes());
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&payload);
        let checksum = compute_crc32(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        Ok(buf)
    }

    /// Decodes an image, validating its framing and checksum.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        if data.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(CoreError::invalid_format("database image too short"));
        }
        if data[0..4] != IMAGE_MAGIC {
            return Err(CoreError::invalid_format("invalid image magic"));
        }
        let version = u16::from_le_bytes([data[4], data[5]]);
        if version != IMAGE_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported image version {version}"
            )));
        }
        let length = u32::from_le_bytes([data[6], data[7], data[8], data[9]]) as usize;
        if data.len() != HEADER_SIZE + length + FOOTER_SIZE {
            return Err(CoreError::invalid_format("image length mismatch"));
        }

        let body_end = HEADER_SIZE + length;
        let stored = u32::from_le_bytes([
            data[body_end],
            data[body_end + 1],
            data[body_end + 2],
            data[body_end + 3],
        ]);
        let computed = compute_crc32(&data[..body_end]);
        if stored != computed {
            return Err(CoreError::ChecksumMismatch {
                expected: stored,
                actual: computed,
            });
        }

        ciborium::from_reader(&data[HEADER_SIZE..body_end])
            .map_err(|e| CoreError::codec(e.to_string()))
    }

    /// Loads the image stored under `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DatabaseNotCreated`] if the file does not exist.
    pub fn load(fs: &dyn VirtualFs, filename: &str) -> CoreResult<Self> {
        if !fs.exists(filename)? {
            return Err(CoreError::DatabaseNotCreated {
                filename: filename.to_string(),
            });
        }
        Self::decode(&fs.read(filename)?)
    }

    /// Stores the image under `filename`, replacing the previous one.
    pub fn store(&self, fs: &dyn VirtualFs, filename: &str) -> CoreResult<()> {
        fs.write(filename, &self.encode()?)?;
        Ok(())
    }
}

/// Computes the CRC32 (IEEE) checksum of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
