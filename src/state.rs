use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::embeddings::{self, EmbeddingProvider};
use crate::core::store::FeatureStore;
use crate::error::Result;
use crate::models::product::Catalog;

/// Configuration for the application
#[derive(Clone, Debug)]
pub struct Config {
    /// Base directory holding the catalog, image cache and feature store
    pub data_dir: PathBuf,
    /// Port the HTTP server listens on
    pub port: u16,
    /// Public base URL used when rewriting result image links
    pub public_url: String,
    /// Number of results returned per query
    pub top_k: usize,
    /// Embedding provider name: histogram, remote or stub
    pub embedding_provider: String,
    /// Endpoint of the remote embedding service, if one is used
    pub embedding_endpoint: Option<String>,
    /// Vector length the remote embedding service produces
    pub embedding_dimension: usize,
    /// Parallel downloads during image acquisition
    pub fetch_concurrency: usize,
    /// Seconds before an image download times out
    pub fetch_timeout_secs: u64,
    /// Parallel embeds during ingestion
    pub embed_concurrency: usize,
    /// Maximum query upload size in bytes
    pub max_upload_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("database"),
            port: 8000,
            public_url: String::from("http://127.0.0.1:8000"),
            top_k: 20,
            embedding_provider: String::from("histogram"),
            embedding_endpoint: None,
            embedding_dimension: 512,
            fetch_concurrency: 8,
            fetch_timeout_secs: 20,
            embed_concurrency: 4,
            max_upload_size: 25 * 1024 * 1024, // 25MB
        }
    }
}

impl Config {
    /// Build the configuration from `VISMATCH_*` environment variables,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            data_dir: env_var("VISMATCH_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            port: parse_var("VISMATCH_PORT", defaults.port),
            public_url: env_var("VISMATCH_PUBLIC_URL").unwrap_or(defaults.public_url),
            top_k: parse_var("VISMATCH_TOP_K", defaults.top_k),
            embedding_provider: env_var("VISMATCH_EMBEDDING_PROVIDER")
                .unwrap_or(defaults.embedding_provider),
            embedding_endpoint: env_var("VISMATCH_EMBEDDING_ENDPOINT"),
            embedding_dimension: parse_var(
                "VISMATCH_EMBEDDING_DIMENSION",
                defaults.embedding_dimension,
            ),
            fetch_concurrency: parse_var("VISMATCH_FETCH_CONCURRENCY", defaults.fetch_concurrency),
            fetch_timeout_secs: parse_var(
                "VISMATCH_FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout_secs,
            ),
            embed_concurrency: parse_var("VISMATCH_EMBED_CONCURRENCY", defaults.embed_concurrency),
            max_upload_size: parse_var("VISMATCH_MAX_UPLOAD_SIZE", defaults.max_upload_size),
        }
    }

    /// Path of the catalog file.
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("products.json")
    }

    /// Directory of the image cache.
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Path of the feature store artifact.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("features.bin")
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env_var(name) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Ignoring unparseable {}={:?}", name, raw);
                default
            }
        },
        None => default,
    }
}

/// Application state shared across handlers: the configuration plus the
/// catalog, feature store and embedding provider loaded at startup.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Embedding provider used for query images
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Feature store, loaded once and read-only while serving
    pub store: FeatureStore,
    /// Product catalog
    pub catalog: Catalog,
    /// When this state was created
    pub started_at: DateTime<Utc>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("embedder", &self.embedder.name())
            .field("store_len", &self.store.len())
            .field("catalog_len", &self.catalog.len())
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl AppState {
    /// Load everything the server needs: catalog, feature store and the
    /// configured embedding provider.
    ///
    /// # Errors
    ///
    /// Fails if the catalog or store cannot be loaded or the provider is
    /// misconfigured; the server refuses to start rather than serve empty
    /// results.
    pub fn load(config: Config) -> Result<Arc<Self>> {
        let catalog = Catalog::load(config.catalog_path())?;
        let store = FeatureStore::load(&config.store_path())?;
        let embedder = embeddings::from_config(&config)?;

        if store.dimension() != embedder.dimension() {
            log::warn!(
                "Store dimension {} differs from provider '{}' dimension {}; \
                 queries will be rejected until the store is rebuilt",
                store.dimension(),
                embedder.name(),
                embedder.dimension()
            );
        }

        Ok(Arc::new(Self {
            config,
            embedder,
            store,
            catalog,
            started_at: Utc::now(),
        }))
    }

    /// Assemble a state from already-loaded parts.
    pub fn with_parts(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        store: FeatureStore,
        catalog: Catalog,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            embedder,
            store,
            catalog,
            started_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_data_paths() {
        let config = Config::default();
        assert_eq!(
            config.catalog_path(),
            PathBuf::from("database/products.json")
        );
        assert_eq!(config.images_dir(), PathBuf::from("database/images"));
        assert_eq!(config.store_path(), PathBuf::from("database/features.bin"));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides_and_fallbacks() {
        std::env::set_var("VISMATCH_PORT", "9100");
        std::env::set_var("VISMATCH_TOP_K", "not-a-number");

        let config = Config::from_env();

        std::env::remove_var("VISMATCH_PORT");
        std::env::remove_var("VISMATCH_TOP_K");

        assert_eq!(config.port, 9100);
        // Unparseable values fall back to the default.
        assert_eq!(config.top_k, 20);
        assert_eq!(config.embedding_provider, "histogram");
    }
}
