use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::search::SearchResult;
use crate::models::product::Product;
use crate::state::Config;

/// One entry of the search response: the catalog record with its image link
/// rewritten to this server's static route, plus the similarity score.
///
/// Serializes flat, so clients see exactly the fields the catalog declares
/// (`id`, `name`, `category`, `imageUrl`, anything extra) with `similarity`
/// appended. The response body is a bare array of these, best match first.
#[derive(Debug, Serialize)]
pub(crate) struct ProductMatch {
    #[serde(flatten)]
    product: Product,
    similarity: f32,
}

impl ProductMatch {
    /// Shape one search result for the wire, pointing `imageUrl` at the
    /// local image cache instead of wherever the catalog got it from.
    pub(crate) fn from_result(result: SearchResult, config: &Config) -> Self {
        let mut product = result.product;
        product.image_url = format!(
            "{}/images/{}.jpg",
            config.public_url.trim_end_matches('/'),
            product.id
        );

        Self {
            product,
            similarity: result.similarity,
        }
    }
}

/// Greeting returned by the root route.
#[derive(Debug, Serialize)]
pub(crate) struct ServiceStatus {
    /// Always `"ok"` when the service is up.
    pub(crate) status: &'static str,
    /// Human-readable banner.
    pub(crate) message: &'static str,
}

/// Readiness report returned by the health route.
#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    /// Always `"ok"`; the route only answers once startup loading succeeded.
    pub(crate) status: &'static str,
    /// Crate version baked in at build time.
    pub(crate) version: &'static str,
    /// Products loaded from the catalog.
    pub(crate) products: usize,
    /// Feature vectors loaded from the store.
    pub(crate) vectors: usize,
    /// Vector length of the loaded store.
    pub(crate) dimension: usize,
    /// Name of the active embedding provider.
    pub(crate) provider: String,
    /// When the service finished loading.
    pub(crate) started_at: DateTime<Utc>,
}
