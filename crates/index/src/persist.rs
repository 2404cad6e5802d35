//! Durable snapshot storage.
//!
//! A snapshot is written as a pair of files in one directory:
//!
//! - `radar_index.bin`: magic, dimension, generation, entry count, then
//!   the vectors as little-endian `f32`.
//! - `radar_metadata.json`: generation, build time, dimension and the
//!   ordered summaries.
//!
//! Both carry the generation and count so a reader can tell when the two
//! halves come from different writes.

use crate::error::PersistError;
use crate::snapshot::Snapshot;
use crate::types::Summary;
use crate::vector_index::FlatIndex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const INDEX_FILE: &str = "radar_index.bin";
pub const METADATA_FILE: &str = "radar_metadata.json";

const MAGIC: &[u8; 8] = b"RADRIDX1";
const HEADER_LEN: usize = 8 + 4 + 8 + 8;

#[derive(Debug, Serialize, Deserialize)]
struct Metadata {
    generation: u64,
    #[serde(default)]
    built_at: Option<DateTime<Utc>>,
    dimensions: usize,
    summaries: Vec<Summary>,
}

struct IndexHeader {
    dimensions: usize,
    generation: u64,
    count: usize,
}

#[derive(Debug, Clone)]
pub struct SnapshotPersistence {
    dir: PathBuf,
}

impl SnapshotPersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn exists(&self) -> bool {
        self.index_path().exists() && self.metadata_path().exists()
    }

    /// Write both files. Each goes to a temporary name first and is renamed
    /// into place, so a crash leaves the previous pair readable.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;

        let mut index_bytes =
            Vec::with_capacity(HEADER_LEN + snapshot.index().as_raw().len() * 4);
        index_bytes.extend_from_slice(MAGIC);
        index_bytes.extend_from_slice(&(snapshot.dimensions() as u32).to_le_bytes());
        index_bytes.extend_from_slice(&snapshot.generation().to_le_bytes());
        index_bytes.extend_from_slice(&(snapshot.len() as u64).to_le_bytes());
        for &value in snapshot.index().as_raw() {
            index_bytes.extend_from_slice(&value.to_le_bytes());
        }

        let metadata = Metadata {
            generation: snapshot.generation(),
            built_at: snapshot.built_at(),
            dimensions: snapshot.dimensions(),
            summaries: snapshot.summaries().to_vec(),
        };
        let metadata_bytes = serde_json::to_vec_pretty(&metadata)?;

        write_atomic(&self.index_path(), &index_bytes)?;
        write_atomic(&self.metadata_path(), &metadata_bytes)?;

        debug!(
            generation = snapshot.generation(),
            entries = snapshot.len(),
            dir = %self.dir.display(),
            "Snapshot persisted"
        );
        Ok(())
    }

    /// Load the stored pair. `Ok(None)` when nothing has been written yet.
    pub fn load(&self, expected_dimensions: usize) -> Result<Option<Snapshot>, PersistError> {
        if !self.index_path().exists() && !self.metadata_path().exists() {
            return Ok(None);
        }

        let index_bytes = fs::read(self.index_path())?;
        let metadata: Metadata = serde_json::from_slice(&fs::read(self.metadata_path())?)?;

        let header = parse_header(&index_bytes)?;
        if header.dimensions != expected_dimensions {
            return Err(PersistError::Mismatch(format!(
                "stored dimension {} differs from configured {}",
                header.dimensions, expected_dimensions
            )));
        }
        if header.generation != metadata.generation {
            return Err(PersistError::Mismatch(format!(
                "index generation {} but metadata generation {}",
                header.generation, metadata.generation
            )));
        }
        if header.count != metadata.summaries.len() || metadata.dimensions != header.dimensions {
            return Err(PersistError::Mismatch(format!(
                "index holds {} vectors of {} dimensions, metadata {} summaries of {}",
                header.count,
                header.dimensions,
                metadata.summaries.len(),
                metadata.dimensions
            )));
        }

        let body = &index_bytes[HEADER_LEN..];
        let expected_len = header.count * header.dimensions * 4;
        if body.len() != expected_len {
            return Err(PersistError::Format(format!(
                "vector data is {} bytes, expected {}",
                body.len(),
                expected_len
            )));
        }

        let data: Vec<f32> = body
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        let index = FlatIndex::from_raw(header.dimensions, data)?;
        let snapshot = Snapshot::new(
            metadata.generation,
            metadata.built_at,
            index,
            metadata.summaries,
        )?;
        Ok(Some(snapshot))
    }
}

fn parse_header(bytes: &[u8]) -> Result<IndexHeader, PersistError> {
    if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
        return Err(PersistError::Format("missing index header".to_string()));
    }

    let dimensions = u32::from_le_bytes(read_array(&bytes[8..12])) as usize;
    let generation = u64::from_le_bytes(read_array(&bytes[12..20]));
    let count = u64::from_le_bytes(read_array(&bytes[20..28])) as usize;

    Ok(IndexHeader {
        dimensions,
        generation,
        count,
    })
}

fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
