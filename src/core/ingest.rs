use futures::stream::{self, StreamExt};
use std::path::Path;

use crate::core::cache::ImageCache;
use crate::core::embeddings::EmbeddingProvider;
use crate::core::store::{FeatureRecord, FeatureStore};
use crate::error::{AppError, Result};
use crate::models::product::Catalog;

/// Outcome of one ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Products listed in the catalog.
    pub total: usize,
    /// Products that produced a feature vector.
    pub embedded: usize,
    /// Products skipped because no image was cached, in catalog order.
    pub missing: Vec<u64>,
    /// Products whose image could not be embedded, as `(product_id, reason)`.
    pub failed: Vec<(u64, String)>,
}

enum ItemOutcome {
    Embedded(Vec<f32>),
    Missing,
    Failed(String),
}

/// Build the feature store from the catalog and the image cache.
///
/// Embeds every cached catalog image with `provider`, up to `concurrency`
/// at a time, and writes the resulting store to `store_path`, replacing any
/// previous artifact wholesale. Products without a cached image are skipped
/// with a warning; per-image embed failures are recorded and skipped too.
/// Record order follows catalog order no matter what order the embeddings
/// finish in, so re-running against unchanged inputs writes a byte-identical
/// artifact.
///
/// # Errors
///
/// Fails with `EmptyStore` if no product yields a vector: a run that can
/// satisfy nothing must not replace a good artifact with an empty one.
pub async fn run(
    catalog: &Catalog,
    cache: &ImageCache,
    provider: &dyn EmbeddingProvider,
    store_path: &Path,
    concurrency: usize,
) -> Result<IngestReport> {
    let mut report = IngestReport {
        total: catalog.len(),
        ..IngestReport::default()
    };

    let mut outcomes: Vec<(usize, u64, ItemOutcome)> =
        stream::iter(catalog.iter().enumerate().map(|(idx, product)| {
            let id = product.id;
            async move {
                if !cache.has(id) {
                    log::warn!(
                        "Image file not found for product {} at {}",
                        id,
                        cache.path(id).display()
                    );
                    return (idx, id, ItemOutcome::Missing);
                }
                match embed_one(cache, provider, id).await {
                    Ok(vector) => (idx, id, ItemOutcome::Embedded(vector)),
                    Err(e) => {
                        log::warn!("Could not embed image for product {}: {}", id, e);
                        (idx, id, ItemOutcome::Failed(e.to_string()))
                    }
                }
            }
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    // Embeddings finish in arbitrary order; restoring catalog order here is
    // what makes repeated runs write identical artifacts.
    outcomes.sort_by_key(|(idx, _, _)| *idx);

    let mut records = Vec::new();
    for (_, id, outcome) in outcomes {
        match outcome {
            ItemOutcome::Embedded(vector) => {
                records.push(FeatureRecord {
                    product_id: id,
                    vector,
                });
                report.embedded += 1;
            }
            ItemOutcome::Missing => report.missing.push(id),
            ItemOutcome::Failed(reason) => report.failed.push((id, reason)),
        }
    }

    log::info!(
        "Created {} feature vectors from {} products ({} missing, {} failed)",
        report.embedded,
        report.total,
        report.missing.len(),
        report.failed.len()
    );
    if records.is_empty() {
        log::error!("No feature vectors were created; were the images fetched first?");
    }

    let store = FeatureStore::build(records)?;
    store.save(store_path)?;

    Ok(report)
}

async fn embed_one(
    cache: &ImageCache,
    provider: &dyn EmbeddingProvider,
    id: u64,
) -> Result<Vec<f32>> {
    let bytes = cache.get(id)?;
    let vector = provider.embed(&bytes).await?;
    if vector.is_empty() {
        return Err(AppError::Embedding(
            "provider returned an empty vector".to_string(),
        ));
    }
    Ok(vector)
}
