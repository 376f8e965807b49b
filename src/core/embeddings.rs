use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::state::Config;

/// Bins per RGB channel for the histogram provider.
const HISTOGRAM_BINS: usize = 8;
/// Vector length of the histogram provider (8 × 8 × 8 RGB bins).
const HISTOGRAM_DIMENSION: usize = HISTOGRAM_BINS * HISTOGRAM_BINS * HISTOGRAM_BINS;

/// A capability that turns raw image bytes into a fixed-length feature vector.
///
/// Vectors are only comparable within one provider (and one version of it);
/// a feature store is meaningful only together with the provider that built
/// it. Implementations must be deterministic: identical bytes in, identical
/// vector out, so that re-running ingestion reproduces the store exactly.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Embed one image.
    ///
    /// # Errors
    ///
    /// Fails if the bytes cannot be decoded as an image or the provider
    /// cannot produce a vector for them.
    async fn embed(&self, bytes: &[u8]) -> Result<Vec<f32>>;

    /// The fixed length of every vector this provider produces.
    fn dimension(&self) -> usize;

    /// Short provider name for logs and the health endpoint.
    fn name(&self) -> &str;
}

/// Build the embedding provider named by the configuration.
///
/// `histogram` (the default) runs locally and needs nothing; `remote` calls
/// an inference endpoint and needs `embedding_endpoint` plus
/// `embedding_dimension`; `stub` is for tests and dry runs.
pub fn from_config(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.embedding_provider.as_str() {
        "histogram" => Ok(Arc::new(HistogramProvider)),
        "stub" => Ok(Arc::new(StubProvider::default())),
        "remote" => {
            let endpoint = config.embedding_endpoint.clone().ok_or_else(|| {
                AppError::Config(
                    "embedding provider 'remote' requires an embedding endpoint".to_string(),
                )
            })?;
            Ok(Arc::new(RemoteProvider::new(
                endpoint,
                config.embedding_dimension,
            )?))
        }
        other => Err(AppError::Config(format!(
            "unknown embedding provider '{}' (expected histogram, remote or stub)",
            other
        ))),
    }
}

/// Color-histogram embeddings: 8×8×8 RGB bins, L2-normalized.
///
/// A deliberately simple visual signature that needs no model runtime:
/// images with similar color distributions land close together under cosine
/// similarity. Decoding and binning run on a blocking thread so the async
/// runtime is never stalled by a large JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramProvider;

#[async_trait]
impl EmbeddingProvider for HistogramProvider {
    async fn embed(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || color_histogram(&bytes)).await?
    }

    fn dimension(&self) -> usize {
        HISTOGRAM_DIMENSION
    }

    fn name(&self) -> &str {
        "histogram"
    }
}

fn color_histogram(bytes: &[u8]) -> Result<Vec<f32>> {
    let img = image::load_from_memory(bytes)?;
    let rgb = img.to_rgb8();

    let mut bins = vec![0f32; HISTOGRAM_DIMENSION];
    for pixel in rgb.pixels() {
        // Top 3 bits of each channel select one of the 512 bins.
        let r = (pixel[0] >> 5) as usize;
        let g = (pixel[1] >> 5) as usize;
        let b = (pixel[2] >> 5) as usize;
        bins[(r * HISTOGRAM_BINS + g) * HISTOGRAM_BINS + b] += 1.0;
    }

    // L2-normalize so vectors are comparable across image sizes.
    let norm = bins.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut bins {
            *x /= norm;
        }
    }

    Ok(bins)
}

/// Embeddings from a remote inference service.
///
/// POSTs the image as a multipart upload and expects a JSON body of the form
/// `{ "embedding": [..] }` with exactly `dimension` values. Stands in for a
/// pretrained model (a CNN's penultimate layer, CLIP, ...) served out of
/// process.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    client: reqwest::Client,
    endpoint: String,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct RemoteEmbedding {
    embedding: Vec<f32>,
}

impl RemoteProvider {
    /// Create a provider calling `endpoint`, which must answer with vectors
    /// of length `dimension`.
    pub fn new(endpoint: String, dimension: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteProvider {
    async fn embed(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("image");
        let form = reqwest::multipart::Form::new().part("image_file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let body: RemoteEmbedding = response.json().await.map_err(|e| {
            AppError::Embedding(format!("bad response from {}: {}", self.endpoint, e))
        })?;

        if body.embedding.len() != self.dimension {
            return Err(AppError::Embedding(format!(
                "remote endpoint returned {} values, expected {}",
                body.embedding.len(),
                self.dimension
            )));
        }

        Ok(body.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "remote"
    }
}

/// Deterministic stand-in provider for tests and dry runs.
///
/// Folds the input bytes into a small fixed-length vector: identical input
/// gives identical output and different inputs almost always differ. Rejects
/// empty input the way the real providers reject undecodable images.
#[derive(Debug, Clone, Copy)]
pub struct StubProvider {
    dimension: usize,
}

impl StubProvider {
    /// Create a stub producing vectors of the given length.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new(8)
    }
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    async fn embed(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        if bytes.is_empty() {
            return Err(AppError::Embedding("empty input".to_string()));
        }

        let mut vector = vec![0f32; self.dimension];
        for (i, &b) in bytes.iter().enumerate() {
            vector[i % self.dimension] += f32::from(b) / 255.0;
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(r: u8, g: u8, b: u8) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([r, g, b]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn test_histogram_is_deterministic() {
        let provider = HistogramProvider;
        let bytes = png_bytes(200, 40, 40);

        let a = provider.embed(&bytes).await.unwrap();
        let b = provider.embed(&bytes).await.unwrap();

        assert_eq!(a.len(), provider.dimension());
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "expected unit norm, got {norm}");
    }

    #[tokio::test]
    async fn test_histogram_separates_colors() {
        let provider = HistogramProvider;
        let red = provider.embed(&png_bytes(255, 0, 0)).await.unwrap();
        let blue = provider.embed(&png_bytes(0, 0, 255)).await.unwrap();

        // Solid colors land in disjoint bins, so the vectors are orthogonal.
        let dot: f32 = red.iter().zip(blue.iter()).map(|(a, b)| a * b).sum();
        assert!(dot.abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_histogram_rejects_garbage() {
        let provider = HistogramProvider;
        let err = provider.embed(b"definitely not an image").await.unwrap_err();
        assert!(matches!(err, AppError::Image(_)));
    }

    #[tokio::test]
    async fn test_stub_is_deterministic_and_rejects_empty() {
        let provider = StubProvider::new(4);
        let a = provider.embed(b"hello").await.unwrap();
        let b = provider.embed(b"hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);

        assert!(provider.embed(b"").await.is_err());
    }

    #[test]
    fn test_remote_provider_requires_endpoint() {
        let config = Config {
            embedding_provider: "remote".to_string(),
            ..Config::default()
        };
        assert!(matches!(from_config(&config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_unknown_provider_name_is_rejected() {
        let config = Config {
            embedding_provider: "resnet50".to_string(),
            ..Config::default()
        };
        let err = from_config(&config).unwrap_err();
        assert!(err.to_string().contains("resnet50"));
    }

    #[test]
    fn test_default_provider_is_histogram() {
        let provider = from_config(&Config::default()).unwrap();
        assert_eq!(provider.name(), "histogram");
        assert_eq!(provider.dimension(), HISTOGRAM_DIMENSION);
    }
}
