// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests of the HTTP surface against an in-memory artifact store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;
use wandler_artifact::{ArtifactRegistry, BlobInfo, BlobStore, ManualClock, MemoryBlobStore};
use wandler_core::AppConfig;
use wandler_core::error::{Result, WandlerError};
use wandler_document::testing::{FailingRasterizer, jpeg_fixture, pdf_fixture};
use wandler_document::{PageRasterizer, UnavailableRasterizer};
use wandler_server::{AppServices, router};

const BOUNDARY: &str = "wandler-test-boundary";
const LETTER: (f64, f64) = (612.0, 792.0);

struct Harness {
    app: Router,
    clock: Arc<ManualClock>,
    services: AppServices,
}

fn harness_with(rasterizer: Arc<dyn PageRasterizer>) -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    ));
    let store = Arc::new(MemoryBlobStore::with_clock(clock.clone()));
    let registry = Arc::new(ArtifactRegistry::new(store, clock.clone(), Duration::hours(24)));
    let config = AppConfig {
        public_base_url: "http://wandler.test".into(),
        max_upload_bytes: 5 * 1024 * 1024,
        ..AppConfig::default()
    };
    let services = AppServices::with_parts(config, rasterizer, registry).unwrap();
    Harness {
        app: router(services.clone()),
        clock,
        services,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(FailingRasterizer::default()))
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        filename: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

fn multipart(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                field,
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn pdf_part<'a>(filename: &'a str, bytes: &'a [u8]) -> Part<'a> {
    Part::File {
        field: "pdf_file",
        filename,
        content_type: "application/pdf",
        bytes,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn raw_body(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

fn file_id(body: &Value) -> String {
    body["file_id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn health_and_service_info() {
    let h = harness();

    let response = send(&h.app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["artifacts"], 0);

    let body = json_body(send(&h.app, get("/")).await).await;
    assert_eq!(body["rasterizer"], "failing");
    assert_eq!(body["endpoints"]["pdf_to_jpg"], "POST /pdf-to-jpg");
}

#[tokio::test]
async fn pdf_to_jpg_renders_the_requested_page() {
    let h = harness();
    let pdf = pdf_fixture(&[LETTER, LETTER]);

    let response = send(
        &h.app,
        multipart(
            "/pdf-to-jpg",
            &[pdf_part("report.pdf", &pdf), Part::Text("page_number", "2")],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "converted_page_2_report.jpg");
    assert_eq!(body["page_number"], 2);
    let id = file_id(&body);
    assert_eq!(
        body["download_url"],
        format!("http://wandler.test/artifacts/{id}")
    );

    let download = send(&h.app, get(&format!("/artifacts/{id}"))).await;
    assert_eq!(download.status(), StatusCode::OK);
    assert_eq!(download.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(
        download.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"converted_page_2_report.jpg\""
    );
    let bytes = raw_body(download).await;
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn out_of_range_page_is_a_client_error() {
    let h = harness();
    let pdf = pdf_fixture(&[LETTER]);

    for page in ["0", "2"] {
        let response = send(
            &h.app,
            multipart(
                "/pdf-to-jpg",
                &[pdf_part("one.pdf", &pdf), Part::Text("page_number", page)],
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error_code"], "validation_error");
    }
    assert!(h.services.registry().is_empty());
}

#[tokio::test]
async fn pdf_to_jpg_without_a_backend_fails_instead_of_painting_white() {
    let h = harness_with(Arc::new(UnavailableRasterizer::new("pdfium not installed")));
    let pdf = pdf_fixture(&[LETTER]);

    let response = send(
        &h.app,
        multipart(
            "/pdf-to-jpg",
            &[pdf_part("one.pdf", &pdf), Part::Text("page_number", "1")],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error_code"], "render_error");
    assert!(h.services.registry().is_empty());

    let info = json_body(send(&h.app, get("/")).await).await;
    assert_eq!(info["rasterizer"], "unavailable");
}

#[tokio::test]
async fn wrong_extension_or_missing_file_is_rejected() {
    let h = harness();
    let pdf = pdf_fixture(&[LETTER]);

    let response = send(
        &h.app,
        multipart("/compress-pdf", &[pdf_part("notes.txt", &pdf)]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&h.app, multipart("/compress-pdf", &[Part::Text("x", "y")])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn jpg_to_pdf_merges_by_default_and_splits_on_request() {
    let h = harness();
    let wide = jpeg_fixture(80, 40);
    let tall = jpeg_fixture(40, 80);
    let images = |merge: &'static str| {
        vec![
            Part::File {
                field: "jpg_files",
                filename: "wide.jpg",
                content_type: "image/jpeg",
                bytes: &wide,
            },
            Part::File {
                field: "jpg_files",
                filename: "tall.jpeg",
                content_type: "image/jpeg",
                bytes: &tall,
            },
            Part::Text("merge_all", merge),
        ]
    };

    let body = json_body(send(&h.app, multipart("/jpg-to-pdf", &images("true"))).await).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "merged_2_images.pdf");
    assert_eq!(body["options"]["page_size"], "a4");

    let body = json_body(send(&h.app, multipart("/jpg-to-pdf", &images("false"))).await).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["files"][0]["filename"], "converted_wide.pdf");
    assert_eq!(body["files"][1]["filename"], "converted_tall.pdf");

    assert_eq!(h.services.registry().len(), 3);
}

/// Accepts `limit` blobs, then refuses every further write.
#[derive(Debug)]
struct FullStore {
    inner: MemoryBlobStore,
    limit: usize,
    writes: AtomicUsize,
}

impl BlobStore for FullStore {
    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        if self.writes.fetch_add(1, Ordering::SeqCst) >= self.limit {
            return Err(WandlerError::Storage("no space left".into()));
        }
        self.inner.put(key, data)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.get(key)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.inner.remove(key)
    }

    fn list(&self) -> Result<Vec<BlobInfo>> {
        self.inner.list()
    }
}

#[tokio::test]
async fn split_jpg_to_pdf_stores_all_or_nothing() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    ));
    let store = Arc::new(FullStore {
        inner: MemoryBlobStore::with_clock(clock.clone()),
        limit: 1,
        writes: AtomicUsize::new(0),
    });
    let registry = Arc::new(ArtifactRegistry::new(store.clone(), clock, Duration::hours(24)));
    let services = AppServices::with_parts(
        AppConfig::default(),
        Arc::new(FailingRasterizer::default()),
        registry,
    )
    .unwrap();
    let app = router(services.clone());

    let first = jpeg_fixture(30, 20);
    let second = jpeg_fixture(20, 30);
    let parts = [
        Part::File {
            field: "jpg_files",
            filename: "first.jpg",
            content_type: "image/jpeg",
            bytes: &first,
        },
        Part::File {
            field: "jpg_files",
            filename: "second.jpg",
            content_type: "image/jpeg",
            bytes: &second,
        },
        Part::Text("merge_all", "false"),
    ];

    let response = send(&app, multipart("/jpg-to-pdf", &parts)).await;
    assert!(response.status().is_server_error());
    assert_eq!(json_body(response).await["error_code"], "storage_error");

    assert_eq!(store.writes.load(Ordering::SeqCst), 2);
    assert!(services.registry().is_empty());
    assert!(store.list().unwrap().is_empty());
}

#[tokio::test]
async fn lock_then_unlock_with_password() {
    let h = harness();
    let pdf = pdf_fixture(&[LETTER, LETTER]);

    let body = json_body(
        send(
            &h.app,
            multipart(
                "/lock-pdf",
                &[pdf_part("doc.pdf", &pdf), Part::Text("password", "s3cret-pass")],
            ),
        )
        .await,
    )
    .await;
    assert_eq!(body["filename"], "locked_doc.pdf");
    let locked = raw_body(send(&h.app, get(&format!("/artifacts/{}", file_id(&body)))).await).await;

    let wrong = send(
        &h.app,
        multipart(
            "/unlock-with-password",
            &[pdf_part("doc.pdf", &locked), Part::Text("password", "nope")],
        ),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(wrong).await["error_code"], "incorrect_password");

    let body = json_body(
        send(
            &h.app,
            multipart(
                "/unlock-with-password",
                &[pdf_part("doc.pdf", &locked), Part::Text("password", "s3cret-pass")],
            ),
        )
        .await,
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "unlocked_doc.pdf");
    assert_eq!(body["unlock_method"], "user_password");
    assert_eq!(body["page_count"], 2);
}

#[tokio::test]
async fn failed_automatic_unlock_keeps_the_upload_for_a_retry() {
    let h = harness();
    let pdf = pdf_fixture(&[LETTER]);
    let locked = h
        .services
        .security()
        .lock(&pdf, "correct horse battery")
        .unwrap()
        .bytes;

    let response = send(&h.app, multipart("/unlock-pdf", &[pdf_part("vault.pdf", &locked)])).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["password_required"], true);
    assert_eq!(body["unlock_method"], "failed_automatic");
    assert_eq!(body["filename"], "original_vault.pdf");
    let pending = file_id(&body);

    let body = json_body(
        send(
            &h.app,
            multipart(
                "/unlock-with-password",
                &[
                    Part::Text("file_id", &pending),
                    Part::Text("password", "correct horse battery"),
                ],
            ),
        )
        .await,
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "unlocked_vault.pdf");
}

#[tokio::test]
async fn unprotected_pdf_unlocks_without_a_password() {
    let h = harness();
    let pdf = pdf_fixture(&[LETTER]);

    let body = json_body(send(&h.app, multipart("/unlock-pdf", &[pdf_part("open.pdf", &pdf)])).await).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["unlock_method"], "not_encrypted");
}

#[tokio::test]
async fn compress_reports_sizes() {
    let h = harness();
    let pdf = pdf_fixture(&[LETTER, LETTER, LETTER]);

    let body = json_body(
        send(
            &h.app,
            multipart(
                "/compress-pdf",
                &[pdf_part("big.pdf", &pdf), Part::Text("compression_level", "high")],
            ),
        )
        .await,
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "compressed_high_big.pdf");
    assert_eq!(body["original_size"], pdf.len());
    assert!(body["compressed_size"].as_u64().unwrap() > 0);

    let response = send(
        &h.app,
        multipart(
            "/compress-pdf",
            &[pdf_part("big.pdf", &pdf), Part::Text("compression_level", "extreme")],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pdf_to_powerpoint_reports_degraded_pages() {
    let h = harness_with(Arc::new(FailingRasterizer::failing([1])));
    let pdf = pdf_fixture(&[LETTER, LETTER, LETTER]);

    let response = send(&h.app, multipart("/pdf-to-powerpoint", &[pdf_part("deck.pdf", &pdf)])).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["slide_count"], 3);
    assert_eq!(body["filename"], "converted_deck.pptx");

    let list = json_body(send(&h.app, get("/artifacts")).await).await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["artifacts"][0]["kind"], "pptx");
}

#[tokio::test]
async fn delete_is_final() {
    let h = harness();
    let pdf = pdf_fixture(&[LETTER]);
    let body = json_body(send(&h.app, multipart("/compress-pdf", &[pdf_part("a.pdf", &pdf)])).await).await;
    let id = file_id(&body);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/artifacts/{id}"))
        .body(Body::empty())
        .unwrap();
    let response = send(&h.app, delete).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["file_id"], id.as_str());

    let response = send(&h.app, get(&format!("/download-pdf/{id}"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&h.app, get("/artifacts/not-a-uuid")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expired_artifacts_are_gone_then_forgotten() {
    let h = harness();
    let pdf = pdf_fixture(&[LETTER]);
    let body = json_body(send(&h.app, multipart("/compress-pdf", &[pdf_part("a.pdf", &pdf)])).await).await;
    let id = file_id(&body);

    h.clock.advance(Duration::hours(23));
    assert_eq!(send(&h.app, get(&format!("/artifacts/{id}"))).await.status(), StatusCode::OK);

    h.clock.advance(Duration::hours(2));
    let response = send(&h.app, get(&format!("/artifacts/{id}"))).await;
    assert_eq!(response.status(), StatusCode::GONE);
    assert_eq!(json_body(response).await["error_code"], "gone");

    let response = send(&h.app, get(&format!("/artifacts/{id}"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn manual_cleanup_run_removes_old_artifacts() {
    let h = harness();
    let pdf = pdf_fixture(&[LETTER]);
    let first = json_body(send(&h.app, multipart("/compress-pdf", &[pdf_part("a.pdf", &pdf)])).await).await;
    h.clock.advance(Duration::hours(20));
    let second = json_body(send(&h.app, multipart("/compress-pdf", &[pdf_part("b.pdf", &pdf)])).await).await;
    h.clock.advance(Duration::hours(5));

    let post = |uri: &str| {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    };
    let body = json_body(send(&h.app, post("/cleanup/run")).await).await;
    assert_eq!(body["deleted_count"], 1);
    assert_eq!(body["deleted"][0], first["file_id"]);

    let list = json_body(send(&h.app, get("/artifacts")).await).await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["artifacts"][0]["file_id"], second["file_id"]);

    let status = json_body(send(&h.app, get("/cleanup/status")).await).await;
    assert_eq!(status["sweeper"]["status"], "stopped");

    let started = json_body(send(&h.app, post("/cleanup/start")).await).await;
    assert_eq!(started["sweeper"]["status"], "running");
    let stopped = json_body(send(&h.app, post("/cleanup/stop")).await).await;
    assert_eq!(stopped["sweeper"]["status"], "stopped");
}

#[tokio::test]
async fn remote_pdf_is_fetched_and_converted() {
    let pdf = pdf_fixture(&[LETTER, LETTER]);
    let source = Router::new().route(
        "/papers/lecture.pdf",
        axum::routing::get(move || {
            let pdf = pdf.clone();
            async move { ([(header::CONTENT_TYPE, "application/pdf")], pdf) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, source).await });

    let h = harness();
    let request = |payload: Value| {
        Request::builder()
            .method("POST")
            .uri("/convert/pdf-to-pptx")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    };

    let response = send(
        &h.app,
        request(serde_json::json!({
            "pdf_path": format!("http://{address}/papers/lecture.pdf"),
            "output_name": "Week 1",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["slide_count"], 2);
    assert_eq!(body["include_images"], true);

    let response = send(
        &h.app,
        request(serde_json::json!({ "pdf_path": "file:///etc/passwd" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &h.app,
        request(serde_json::json!({
            "pdf_path": format!("http://{address}/missing.pdf"),
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn filesystem_store_holds_and_releases_blobs() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        storage_dir: dir.path().to_path_buf(),
        auto_start_sweeper: false,
        ..AppConfig::default()
    };
    let services = AppServices::init(config).unwrap();
    let app = router(services);
    let pdf = pdf_fixture(&[LETTER]);

    let body = json_body(send(&app, multipart("/compress-pdf", &[pdf_part("disk.pdf", &pdf)])).await).await;
    let id = file_id(&body);
    assert!(dir.path().join(format!("{id}.pdf")).is_file());

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/artifacts/{id}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, delete).await.status(), StatusCode::OK);
    assert!(!dir.path().join(format!("{id}.pdf")).exists());
}
