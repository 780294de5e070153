/// End-to-end tests for the upload API
///
/// Runs the full router on a local port with the disk backend and talks to
/// it over HTTP, including fetching stored images back from their public URL.
use base64::{engine::general_purpose::STANDARD, Engine};
use image_ingest::{server::build_router, AppContext, ServerConfig};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use tempfile::TempDir;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    _blobs: TempDir,
}

async fn spawn_server(overrides: &[(&str, &str)]) -> TestServer {
    let blobs = tempfile::tempdir().unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("INGEST_BLOBSTORE".into(), "disk".into());
    vars.insert(
        "INGEST_BLOBSTORE_DISK_LOCATION".into(),
        blobs.path().to_string_lossy().into_owned(),
    );
    vars.insert("INGEST_PUBLIC_BASE_URL".into(), format!("{}/blob", base_url));
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }

    let config = ServerConfig::from_vars(|key| vars.get(key).cloned()).unwrap();
    let ctx = AppContext::new(config).await.unwrap();
    let app = build_router(ctx);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url,
        client: reqwest::Client::new(),
        _blobs: blobs,
    }
}

impl TestServer {
    async fn upload(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = spawn_server(&[]).await;
    let response = server
        .client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "status": "Server is running!" }));
}

#[tokio::test]
async fn test_upload_round_trip() {
    let server = spawn_server(&[]).await;
    let original: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

    let (status, body) = server
        .upload(
            "/upload-image",
            json!({
                "image": format!("data:image/webp;base64,{}", STANDARD.encode(&original)),
                "filename": "found_backpack.webp",
            }),
        )
        .await;

    assert_eq!(status, 200, "unexpected body: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["size"], 4096);
    assert_eq!(body["originalType"], "webp");
    assert_eq!(body["convertedType"], "png");

    let file_name = body["fileName"].as_str().unwrap();
    assert!(file_name.starts_with("uploaded_images/"));
    assert!(file_name.ends_with("_found_backpack.png"));

    let public_url = body["publicUrl"].as_str().unwrap();
    assert_eq!(public_url, format!("{}/blob/{}", server.base_url, file_name));

    let fetched = server.client.get(public_url).send().await.unwrap();
    assert_eq!(fetched.status().as_u16(), 200);
    assert_eq!(fetched.headers()["content-type"], "image/png");
    assert_eq!(fetched.bytes().await.unwrap().to_vec(), original);
}

#[tokio::test]
async fn test_size_boundary_over_http() {
    let server = spawn_server(&[]).await;

    let exact = vec![0xABu8; 5 * 1024 * 1024];
    let (status, body) = server
        .upload("/upload-images", json!({ "image": STANDARD.encode(&exact) }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["size"], 5_242_880);

    let over = vec![0xABu8; 5 * 1024 * 1024 + 1];
    let (status, body) = server
        .upload("/upload-images", json!({ "image": STANDARD.encode(&over) }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "File too large. Maximum size is 5MB.");
}

#[tokio::test]
async fn test_validation_errors_over_http() {
    let server = spawn_server(&[]).await;

    let (status, body) = server.upload("/upload-image", json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "No base64 image data provided");

    let (status, body) = server.upload("/upload-image", json!({ "image": "" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "No base64 image data provided");

    let (status, body) = server
        .upload("/upload-image", json!({ "image": "data:image/png;base64,@@@" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid base64 image data");
}

#[tokio::test]
async fn test_concurrent_uploads_get_distinct_keys() {
    let server = spawn_server(&[]).await;

    let uploads = (0..16).map(|i| {
        let client = server.client.clone();
        let url = format!("{}/upload-image", server.base_url);
        async move {
            let body: Value = client
                .post(url)
                .json(&json!({
                    "image": STANDARD.encode(format!("frame {}", i)),
                    "filename": format!("zone_{}.jpg", i),
                }))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            body["fileName"].as_str().unwrap().to_string()
        }
    });

    let handles: Vec<_> = uploads.map(tokio::spawn).collect();
    let mut keys = HashSet::new();
    for handle in handles {
        keys.insert(handle.await.unwrap());
    }
    assert_eq!(keys.len(), 16);
}

#[tokio::test]
async fn test_custom_route_configuration() {
    let server = spawn_server(&[("INGEST_UPLOAD_ROUTES", "/api/images")]).await;

    let (status, body) = server
        .upload("/api/images", json!({ "image": STANDARD.encode(b"tag photo") }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);

    let (status, body) = server
        .upload("/upload-image", json!({ "image": STANDARD.encode(b"tag photo") }))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_round_trip_with_url_reserved_filenames() {
    let server = spawn_server(&[]).await;

    for (filename, suffix) in [
        ("lost#1.jpg", "_lost%231.png"),
        ("what?.jpg", "_what%3F.png"),
        ("50%off.jpg", "_50%25off.png"),
    ] {
        let original = format!("photo of {}", filename).into_bytes();
        let (status, body) = server
            .upload(
                "/upload-image",
                json!({ "image": STANDARD.encode(&original), "filename": filename }),
            )
            .await;
        assert_eq!(status, 200, "unexpected body: {}", body);

        let public_url = body["publicUrl"].as_str().unwrap();
        assert!(public_url.ends_with(suffix), "{} for {}", public_url, filename);

        let fetched = server.client.get(public_url).send().await.unwrap();
        assert_eq!(fetched.status().as_u16(), 200, "GET {}", public_url);
        assert_eq!(fetched.bytes().await.unwrap().to_vec(), original);
    }
}
