#![doc(html_root_url = "https://docs.rs/vismatch/0.1.0")]
#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

//! # Vismatch
//!
//! A visual product matcher: catalog images are reduced offline to
//! fixed-length feature vectors, and query images are ranked against the
//! whole store by cosine similarity at request time.
//!
//! ## Features
//!
//! - **Image acquisition**: download catalog images into a write-once local
//!   cache, skipping whatever is already present
//! - **Ingestion**: embed every cached image and persist the vectors as a
//!   single versioned store artifact, reproducibly
//! - **Search**: brute-force cosine ranking of a query vector against the
//!   store, joined with catalog metadata
//! - **Embedding providers**: a local color-histogram provider, a remote
//!   inference client, and a deterministic stub for tests
//! - **Web API**: upload an image (or pass a URL), get back the top matches
//!   with image links served off the local cache
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! vismatch = "0.1"
//! ```
//!
//! Basic usage:
//! ```rust,no_run
//! use vismatch::{create_router, AppState, Config, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     vismatch::init()?;
//!     let state = AppState::load(Config::from_env())?;
//!     let app = create_router(state);
//!     // Hand `app` to axum::serve.
//!     Ok(())
//! }
//! ```

// Internal modules
pub mod api;
pub mod core;
/// Defines the application's error types and result aliases.
pub mod error;
pub mod models;
/// Configuration and shared application state.
pub mod state;

// Public API exports
pub use crate::{
    api::create_router,
    core::embeddings::EmbeddingProvider,
    error::{AppError, Result},
    models::product::{Catalog, Product},
    state::{AppState, Config},
};

/// Build-time information captured by the build script.
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Initialize the application with default settings
///
/// Loads a `.env` file when one is present and sets up logging. It should
/// be called once, early in the application startup process.
///
/// # Errors
///
/// Returns an error if logging initialization fails.
///
/// # Example
///
/// ```no_run
/// use vismatch::init;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     init()?;
///     // Application code here
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    // A missing .env file is fine; real environments set variables directly.
    dotenv::dotenv().ok();

    let env = env_logger::Env::default()
        .default_filter_or("info")
        .default_write_style_or("auto");

    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_module_path(false)
        .format_target(false)
        .init();

    log::info!("Initializing vismatch {}", built_info::PKG_VERSION);
    Ok(())
}
