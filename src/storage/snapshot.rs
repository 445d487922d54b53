use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, DocumentMetadata, TenantKey};
use crate::index::inverted::Term;
use crate::index::posting::Posting;

/// Everything needed to rebuild one tenant's index exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub tenant: TenantKey,
    pub saved_at: DateTime<Utc>,
    pub postings: Vec<(Term, Vec<Posting>)>,        // Sorted by term, postings by doc id
    pub documents: Vec<(DocId, DocumentMetadata)>,  // Sorted by doc id
    pub applied_batches: Vec<Uuid>,                 // Oldest first
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Lz4,
}

impl CompressionType {
    fn flag(self) -> u16 {
        match self {
            CompressionType::None => 0,
            CompressionType::Lz4 => 1,
        }
    }

    fn from_flag(flag: u16) -> Result<Self> {
        match flag {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Lz4),
            other => Err(Error::persistence(format!("Unknown snapshot compression flag {}", other))),
        }
    }
}

/// Snapshot file header
///
/// Layout: magic (4) | version u16 | compression u16 | crc32 u32 | payload length u64
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u16,
    pub compression: CompressionType,
    pub checksum: u32,     // CRC32 of the stored payload
    pub payload_len: u64,
}

impl SnapshotHeader {
    pub const MAGIC: [u8; 4] = *b"STXS";
    pub const VERSION: u16 = 1;
    pub const SIZE: usize = 20;

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&Self::MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.compression.flag().to_le_bytes());
        out.extend_from_slice(&self.checksum.to_le_bytes());
        out.extend_from_slice(&self.payload_len.to_le_bytes());
    }

    fn read_from(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::persistence("Snapshot is shorter than its header"));
        }
        if data[0..4] != Self::MAGIC {
            return Err(Error::persistence("Snapshot magic mismatch"));
        }

        let version = u16::from_le_bytes([data[4], data[5]]);
        if version > Self::VERSION {
            return Err(Error::persistence(format!(
                "Unsupported snapshot version {}, expected <= {}",
                version,
                Self::VERSION
            )));
        }

        let compression = CompressionType::from_flag(u16::from_le_bytes([data[6], data[7]]))?;
        let checksum = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        let mut len = [0u8; 8];
        len.copy_from_slice(&data[12..20]);

        Ok(SnapshotHeader {
            version,
            compression,
            checksum,
            payload_len: u64::from_le_bytes(len),
        })
    }
}

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

impl IndexSnapshot {
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Serialize to the on-disk format.
    pub fn encode(&self, compression: CompressionType) -> Result<Vec<u8>> {
        let raw = bincode::serialize(self)?;
        let payload = match compression {
            CompressionType::None => raw,
            CompressionType::Lz4 => lz4_flex::compress_prepend_size(&raw),
        };

        let header = SnapshotHeader {
            version: SnapshotHeader::VERSION,
            compression,
            checksum: checksum(&payload),
            payload_len: payload.len() as u64,
        };

        let mut out = Vec::with_capacity(SnapshotHeader::SIZE + payload.len());
        header.write_to(&mut out);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Parse the on-disk format; any damage is reported as a persistence error.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let header = SnapshotHeader::read_from(data)?;
        let payload = &data[SnapshotHeader::SIZE..];

        if payload.len() as u64 != header.payload_len {
            return Err(Error::persistence(format!(
                "Snapshot payload truncated: {} of {} bytes",
                payload.len(),
                header.payload_len
            )));
        }
        if checksum(payload) != header.checksum {
            return Err(Error::persistence("Snapshot checksum mismatch"));
        }

        let raw = match header.compression {
            CompressionType::None => payload.to_vec(),
            CompressionType::Lz4 => lz4_flex::decompress_size_prepended(payload)?,
        };

        bincode::deserialize(&raw)
            .map_err(|e| Error::persistence(format!("Snapshot decode failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::types::{Language, SchemaId, Status};

    fn sample() -> IndexSnapshot {
        IndexSnapshot {
            tenant: TenantKey::from("app"),
            saved_at: Utc::now(),
            postings: vec![(
                Term::from("blue"),
                vec![Posting { doc_id: DocId::from("a"), term_freq: 2 }],
            )],
            documents: vec![(
                DocId::from("a"),
                DocumentMetadata {
                    schema_id: SchemaId::from("s1"),
                    status: Status::Published,
                    language: Language::from("en"),
                },
            )],
            applied_batches: vec![Uuid::new_v4()],
        }
    }

    #[test]
    fn encodes_with_and_without_compression() {
        let snapshot = sample();
        for compression in [CompressionType::None, CompressionType::Lz4] {
            let bytes = snapshot.encode(compression).unwrap();
            assert_eq!(&bytes[0..4], b"STXS");
            assert_eq!(IndexSnapshot::decode(&bytes).unwrap(), snapshot);
        }
    }

    #[test]
    fn detects_flipped_payload_bit() {
        let mut bytes = sample().encode(CompressionType::Lz4).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let err = IndexSnapshot::decode(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Persistence);
    }

    #[test]
    fn detects_truncation_and_bad_magic() {
        let bytes = sample().encode(CompressionType::None).unwrap();
        assert!(IndexSnapshot::decode(&bytes[..bytes.len() - 3]).is_err());
        assert!(IndexSnapshot::decode(&bytes[..10]).is_err());

        let mut wrong = bytes.clone();
        wrong[0] = b'X';
        assert_eq!(IndexSnapshot::decode(&wrong).unwrap_err().kind, ErrorKind::Persistence);
    }

    #[test]
    fn rejects_future_versions() {
        let mut bytes = sample().encode(CompressionType::None).unwrap();
        bytes[4..6].copy_from_slice(&(SnapshotHeader::VERSION + 1).to_le_bytes());
        let err = IndexSnapshot::decode(&bytes).unwrap_err();
        assert!(err.context.contains("Unsupported snapshot version"));
    }
}
