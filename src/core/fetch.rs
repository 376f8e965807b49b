use futures::stream::{self, StreamExt};
use std::time::Duration;

use crate::core::cache::ImageCache;
use crate::error::Result;
use crate::models::product::Catalog;

/// Browser User-Agent sent with image downloads; several product CDNs
/// refuse requests that carry a default client string.
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Outcome of one acquisition run.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Products listed in the catalog.
    pub total: usize,
    /// Images downloaded by this run.
    pub downloaded: usize,
    /// Images already cached and left untouched.
    pub skipped: usize,
    /// Failed downloads as `(product_id, reason)`.
    pub failed: Vec<(u64, String)>,
}

enum Outcome {
    Skipped,
    Downloaded(bytes::Bytes),
    Failed(String, String),
}

/// Download every catalog image that is not already cached.
///
/// Runs up to `concurrency` downloads at once; cache writes stay on the
/// coordinating task. Bytes land at the cache path for the product's id,
/// and products whose image is already present are skipped, so the run is
/// idempotent. Individual download failures are logged and recorded in the
/// report but never stop the run.
pub async fn fetch_images(
    catalog: &Catalog,
    cache: &ImageCache,
    concurrency: usize,
    timeout_secs: u64,
) -> Result<FetchReport> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;

    let mut report = FetchReport {
        total: catalog.len(),
        ..FetchReport::default()
    };

    log::info!("Found {} products to download", report.total);

    let mut outcomes = stream::iter(catalog.iter().map(|product| {
        let client = client.clone();
        let url = product.image_url.clone();
        let id = product.id;
        let cached = cache.has(id);
        async move {
            if cached {
                return (id, Outcome::Skipped);
            }
            match download(&client, &url).await {
                Ok(bytes) => (id, Outcome::Downloaded(bytes)),
                Err(e) => (id, Outcome::Failed(url, e.to_string())),
            }
        }
    }))
    .buffer_unordered(concurrency.max(1));

    while let Some((id, outcome)) = outcomes.next().await {
        match outcome {
            Outcome::Skipped => report.skipped += 1,
            Outcome::Downloaded(bytes) => match cache.put(id, &bytes) {
                Ok(true) => report.downloaded += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    log::warn!("Failed to store image for product {}: {}", id, e);
                    report.failed.push((id, e.to_string()));
                }
            },
            Outcome::Failed(url, reason) => {
                log::warn!(
                    "Failed to download image for product {} from {}: {}",
                    id,
                    url,
                    reason
                );
                report.failed.push((id, reason));
            }
        }
    }

    let satisfied = report.downloaded + report.skipped;
    log::info!(
        "Successfully downloaded {} out of {} images ({} already cached)",
        report.downloaded,
        report.total,
        report.skipped
    );
    if satisfied < report.total {
        log::warn!(
            "{} images are still missing; check the errors above and re-run",
            report.total - satisfied
        );
    }

    Ok(report)
}

async fn download(client: &reqwest::Client, url: &str) -> Result<bytes::Bytes> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?)
}
