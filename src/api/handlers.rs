use axum::{
    extract::{Multipart, State},
    Json,
};
use std::sync::Arc;
use std::time::Duration;

use crate::core::{fetch, search};
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::responses::{HealthResponse, ProductMatch, ServiceStatus};

/// Root route: a fixed greeting, doubling as a liveness probe.
pub(crate) async fn service_status() -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "ok",
        message: "Visual Product Matcher API (Feature Vector) is running!",
    })
}

/// Readiness report: what got loaded at startup and how big it is.
pub(crate) async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::built_info::PKG_VERSION,
        products: state.catalog.len(),
        vectors: state.store.len(),
        dimension: state.store.dimension(),
        provider: state.embedder.name().to_string(),
        started_at: state.started_at,
    })
}

/// Query endpoint: accept an image, embed it, rank the whole store against
/// it and return the best matches joined with their catalog entries.
///
/// The multipart form carries either `image_file` (raw image bytes) or
/// `image_url` (fetched server-side); `image_file` wins when both are
/// present. Whatever goes wrong with the query image itself comes back as
/// a 400 with a stable client-facing message.
pub(crate) async fn search_products(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Vec<ProductMatch>>> {
    let mut image_bytes: Option<bytes::Bytes> = None;
    let mut image_url: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image_file" => image_bytes = Some(field.bytes().await?),
            "image_url" => image_url = Some(field.text().await?),
            other => log::debug!("Ignoring unknown form field {:?}", other),
        }
    }

    let bytes = match (image_bytes, image_url) {
        (Some(bytes), _) if !bytes.is_empty() => bytes,
        (_, Some(url)) if !url.is_empty() => fetch_query_image(&url).await?,
        _ => {
            return Err(AppError::Upload(
                "No image_file or image_url provided".to_string(),
            ))
        }
    };

    let query = state.embedder.embed(&bytes).await?;
    let results = search::search(&query, &state.store, &state.catalog, state.config.top_k)?;
    log::info!("Query matched {} products", results.len());

    Ok(Json(
        results
            .into_iter()
            .map(|result| ProductMatch::from_result(result, &state.config))
            .collect(),
    ))
}

async fn fetch_query_image(url: &str) -> Result<bytes::Bytes> {
    let client = reqwest::Client::builder()
        .user_agent(fetch::USER_AGENT)
        .timeout(Duration::from_secs(20))
        .build()?;

    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?)
}
