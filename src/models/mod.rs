//! Data models shared across the pipeline and the API

/// Product catalog types and loading.
pub mod product;
