//! Core functionality: the feature store and the pipelines around it

/// Write-once local store of raw product images.
pub mod cache;
/// Embedding providers that turn image bytes into feature vectors.
pub mod embeddings;
/// Bulk download of catalog images into the cache.
pub mod fetch;
/// Offline pipeline that builds the feature store.
pub mod ingest;
/// Cosine ranking of a query vector against the store.
pub mod search;
/// The persistent feature store artifact.
pub mod store;
