use std::cmp::Ordering;

use crate::core::store::FeatureStore;
use crate::error::{AppError, Result};
use crate::models::product::{Catalog, Product};

/// Raw cosine similarity is scaled by this factor before being reported.
const SCORE_SCALE: f32 = 100.0;

/// One ranked match: the catalog entry plus its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The matched product as it appears in the catalog.
    pub product: Product,
    /// Cosine similarity scaled by 100; opposed vectors score negative.
    pub similarity: f32,
}

/// Cosine similarity of two equal-length vectors.
///
/// Returns 0.0 when either vector has zero norm (there is no direction to
/// compare). The value is not clamped; float accumulation can leave it a
/// hair outside [-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Rank every stored vector against `query` and return the `top_k` best
/// matches joined with their catalog entries.
///
/// Every record is scored with [`cosine_similarity`] scaled by 100, joined
/// with the catalog, sorted descending, and truncated to `top_k`. Records
/// whose id has no catalog entry are dropped before ranking, so they never
/// occupy a result slot. The sort is stable: records with equal scores keep
/// their store order.
///
/// Purely a read over `store` and `catalog`.
///
/// # Errors
///
/// `DimensionMismatch` if the query vector's length differs from the
/// store's dimension.
pub fn search(
    query: &[f32],
    store: &FeatureStore,
    catalog: &Catalog,
    top_k: usize,
) -> Result<Vec<SearchResult>> {
    if query.len() != store.dimension() {
        return Err(AppError::DimensionMismatch {
            expected: store.dimension(),
            actual: query.len(),
        });
    }

    let mut scored: Vec<(&Product, f32)> = store
        .iter()
        .filter_map(|(id, vector)| {
            let similarity = cosine_similarity(query, vector) * SCORE_SCALE;
            match catalog.get(id) {
                Some(product) => Some((product, similarity)),
                None => {
                    log::debug!("Stored id {} has no catalog entry; dropped from results", id);
                    None
                }
            }
        })
        .collect();

    // Vec::sort_by is stable, so equal scores keep store order.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);

    Ok(scored
        .into_iter()
        .map(|(product, similarity)| SearchResult {
            product: product.clone(),
            similarity,
        })
        .collect())
}
