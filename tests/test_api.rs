use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use vismatch::core::embeddings::{EmbeddingProvider, HistogramProvider};
use vismatch::core::store::{FeatureRecord, FeatureStore};
use vismatch::{create_router, AppState, Catalog, Config, Product};

const BOUNDARY: &str = "vismatch-test-boundary";

fn png_bytes(r: u8, g: u8, b: u8) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(16, 16, image::Rgb([r, g, b]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}

fn product(id: u64, name: &str) -> Product {
    Product {
        id,
        name: name.to_string(),
        category: "test".to_string(),
        image_url: format!("https://example.com/{id}.jpg"),
        extra: serde_json::Map::new(),
    }
}

/// Build a ready-to-serve state over a temp data dir: three products with
/// distinct solid colors, cached images, and vectors embedded exactly the
/// way ingestion would.
async fn serving_state(root: &tempfile::TempDir, top_k: usize) -> Arc<AppState> {
    let provider = HistogramProvider;
    let colors: [(u64, [u8; 3], &str); 3] = [
        (10, [230, 20, 20], "Red Shirt"),
        (20, [20, 230, 20], "Green Mug"),
        (30, [20, 20, 230], "Blue Sofa"),
    ];

    let images_dir = root.path().join("images");
    std::fs::create_dir_all(&images_dir).unwrap();

    let mut records = Vec::new();
    let mut products = Vec::new();
    for (id, [r, g, b], name) in colors {
        let bytes = png_bytes(r, g, b);
        std::fs::write(images_dir.join(format!("{id}.jpg")), &bytes).unwrap();
        records.push(FeatureRecord {
            product_id: id,
            vector: provider.embed(&bytes).await.unwrap(),
        });
        products.push(product(id, name));
    }

    let config = Config {
        data_dir: root.path().to_path_buf(),
        top_k,
        ..Config::default()
    };

    AppState::with_parts(
        config,
        Arc::new(provider),
        FeatureStore::build(records).unwrap(),
        Catalog::from_products(products),
    )
}

fn file_part_body(payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"image_file\"; filename=\"query.png\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn text_part_body(field: &str, value: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(value.as_bytes());
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn search_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/search")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_greeting() {
    let root = tempfile::tempdir().unwrap();
    let app = create_router(serving_state(&root, 20).await);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["message"].as_str().unwrap().contains("running"));
}

#[tokio::test]
async fn test_health_reports_loaded_data() {
    let root = tempfile::tempdir().unwrap();
    let app = create_router(serving_state(&root, 20).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["products"], 3);
    assert_eq!(body["vectors"], 3);
    assert_eq!(body["dimension"], 512);
    assert_eq!(body["provider"], "histogram");
    assert!(body["started_at"].is_string());
}

#[tokio::test]
async fn test_search_returns_ranked_matches() {
    let root = tempfile::tempdir().unwrap();
    let app = create_router(serving_state(&root, 20).await);

    let response = app
        .oneshot(search_request(file_part_body(&png_bytes(230, 20, 20))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 3);

    // The red query matches the red product exactly.
    assert_eq!(results[0]["id"], 10);
    assert_eq!(results[0]["name"], "Red Shirt");
    assert!((results[0]["similarity"].as_f64().unwrap() - 100.0).abs() < 1e-2);

    // Image links point at this server, not the catalog's source URLs.
    assert_eq!(results[0]["imageUrl"], "http://127.0.0.1:8000/images/10.jpg");

    let sims: Vec<f64> = results
        .iter()
        .map(|r| r["similarity"].as_f64().unwrap())
        .collect();
    for pair in sims.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
}

#[tokio::test]
async fn test_results_are_capped_at_configured_top_k() {
    let root = tempfile::tempdir().unwrap();
    let app = create_router(serving_state(&root, 2).await);

    let response = app
        .oneshot(search_request(file_part_body(&png_bytes(230, 20, 20))))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_garbage_upload_is_client_error() {
    let root = tempfile::tempdir().unwrap();
    let app = create_router(serving_state(&root, 20).await);

    let response = app
        .oneshot(search_request(file_part_body(b"not an image at all")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Could not process the uploaded image.");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn test_missing_image_field_is_client_error() {
    let root = tempfile::tempdir().unwrap();
    let app = create_router(serving_state(&root, 20).await);

    let response = app
        .oneshot(search_request(text_part_body("comment", "hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert!(body["message"].as_str().unwrap().contains("image_file"));
}

#[tokio::test]
async fn test_unfetchable_image_url_is_client_error() {
    let root = tempfile::tempdir().unwrap();
    let app = create_router(serving_state(&root, 20).await);

    // Discard port; the connection is refused immediately.
    let response = app
        .oneshot(search_request(text_part_body(
            "image_url",
            "http://127.0.0.1:9/nothing.jpg",
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_of_other_dimension_rejects_queries() {
    // A store built by a different provider than the one now serving.
    let root = tempfile::tempdir().unwrap();
    let store = FeatureStore::build(vec![FeatureRecord {
        product_id: 1,
        vector: vec![1.0, 0.0, 0.0],
    }])
    .unwrap();
    let state = AppState::with_parts(
        Config {
            data_dir: root.path().to_path_buf(),
            ..Config::default()
        },
        Arc::new(HistogramProvider),
        store,
        Catalog::from_products(vec![product(1, "Old")]),
    );
    let app = create_router(state);

    let response = app
        .oneshot(search_request(file_part_body(&png_bytes(1, 2, 3))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Could not process the uploaded image.");
    assert!(body["details"].as_str().unwrap().contains("dimension"));
}

#[tokio::test]
async fn test_images_route_serves_cached_bytes() {
    let root = tempfile::tempdir().unwrap();
    let app = create_router(serving_state(&root, 20).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/images/10.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), png_bytes(230, 20, 20).as_slice());
}
