use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::error::{AppError, Result};

/// On-disk format version of the feature store artifact.
const STORE_VERSION: u32 = 1;

/// One product's feature vector, tagged with the catalog id it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    /// Catalog id of the product the vector was computed from.
    pub product_id: u64,
    /// The feature vector.
    pub vector: Vec<f32>,
}

/// Serialized layout of the store artifact.
#[derive(Debug, Serialize, Deserialize)]
struct StoreArtifact {
    version: u32,
    dimension: u32,
    ids: Vec<u64>,
    vectors: Vec<Vec<f32>>,
}

/// An in-memory set of product feature vectors sharing one fixed dimension.
///
/// Built by ingestion, persisted as a single binary artifact, and loaded
/// read-only by the search service. Records keep the order they were built
/// in (catalog order); search uses that order as its tie-break, so it must
/// survive the save/load round trip.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    dimension: usize,
    ids: Vec<u64>,
    vectors: Vec<Vec<f32>>,
}

impl FeatureStore {
    /// Build a store from ingestion output, keeping record order.
    ///
    /// # Errors
    ///
    /// `EmptyStore` if there are no records, `DimensionMismatch` if the
    /// vectors do not all share one length.
    pub fn build(records: Vec<FeatureRecord>) -> Result<Self> {
        let first = records.first().ok_or(AppError::EmptyStore)?;
        let dimension = first.vector.len();

        let mut ids = Vec::with_capacity(records.len());
        let mut vectors = Vec::with_capacity(records.len());
        for record in records {
            if record.vector.len() != dimension {
                return Err(AppError::DimensionMismatch {
                    expected: dimension,
                    actual: record.vector.len(),
                });
            }
            ids.push(record.product_id);
            vectors.push(record.vector);
        }

        Ok(Self {
            dimension,
            ids,
            vectors,
        })
    }

    /// Write the store to `path` as a versioned binary artifact.
    ///
    /// The bytes go to a temporary file in the destination directory first
    /// and are renamed into place, so a crash mid-write never leaves a
    /// truncated artifact behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let artifact = StoreArtifact {
            version: STORE_VERSION,
            dimension: self.dimension as u32,
            ids: self.ids.clone(),
            vectors: self.vectors.clone(),
        };
        let encoded = bincode::serialize(&artifact)
            .map_err(|e| AppError::Internal(format!("failed to encode feature store: {}", e)))?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&encoded)?;
        tmp.persist(path).map_err(|e| e.error)?;

        log::info!(
            "Saved {} feature vectors (dimension {}) to {}",
            self.len(),
            self.dimension,
            path.display()
        );
        Ok(())
    }

    /// Load a store previously written by [`FeatureStore::save`].
    ///
    /// # Errors
    ///
    /// `CorruptStore` for anything structurally wrong: unreadable bytes, an
    /// unknown version, mismatched id/vector counts, inconsistent vector
    /// lengths, or an empty record set.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::CorruptStore(format!("cannot read {}: {}", path.display(), e)))?;
        let artifact: StoreArtifact = bincode::deserialize(&bytes).map_err(|e| {
            AppError::CorruptStore(format!("cannot decode {}: {}", path.display(), e))
        })?;

        if artifact.version != STORE_VERSION {
            return Err(AppError::CorruptStore(format!(
                "unsupported store version {} (expected {})",
                artifact.version, STORE_VERSION
            )));
        }
        if artifact.ids.len() != artifact.vectors.len() {
            return Err(AppError::CorruptStore(format!(
                "{} ids but {} vectors",
                artifact.ids.len(),
                artifact.vectors.len()
            )));
        }
        if artifact.ids.is_empty() {
            return Err(AppError::CorruptStore(
                "store contains no vectors".to_string(),
            ));
        }

        let dimension = artifact.dimension as usize;
        if let Some(bad) = artifact.vectors.iter().find(|v| v.len() != dimension) {
            return Err(AppError::CorruptStore(format!(
                "vector of length {} in a store of dimension {}",
                bad.len(),
                dimension
            )));
        }

        Ok(Self {
            dimension,
            ids: artifact.ids,
            vectors: artifact.vectors,
        })
    }

    /// The vector length shared by every record.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of records in the store.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate records in store order as `(product_id, vector)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[f32])> + '_ {
        self.ids
            .iter()
            .copied()
            .zip(self.vectors.iter().map(Vec::as_slice))
    }
}
