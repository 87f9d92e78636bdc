use axum::{
    extract::{Multipart, Query},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::export;
use crate::pipeline::aliases::AliasTable;
use crate::pipeline::batch::{ingest_batch, SourceFile};
use crate::reports::SummaryReport;
use crate::storage::{RecordQuery, Storage};

/// Shared handles injected into every request handler. The storage
/// lifecycle is owned here by the host, not by the pipeline.
#[derive(Clone)]
pub struct AppContext {
    pub storage: Arc<dyn Storage>,
    pub aliases: AliasTable,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "comprobantes",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Upload one or more files (multipart, one file per part) and run them
/// through the normalization pipeline. Always answers with the full batch
/// summary; per-file failures are reported, never fatal to the batch.
async fn upload(
    Extension(ctx): Extension<AppContext>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut files = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field
                    .file_name()
                    .or(field.name())
                    .unwrap_or("unnamed")
                    .to_string();
                match field.bytes().await {
                    Ok(bytes) => files.push(SourceFile {
                        name,
                        contents: bytes.to_vec(),
                    }),
                    Err(e) => {
                        return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
            }
        }
    }

    info!(files = files.len(), "upload received");
    let summary = ingest_batch(ctx.storage.clone(), &ctx.aliases, files).await;
    Json(summary).into_response()
}

/// Filtered, ordered, limited scan over the canonical store.
async fn records(
    Extension(ctx): Extension<AppContext>,
    Query(query): Query<RecordQuery>,
) -> impl IntoResponse {
    match ctx.storage.scan_records(&query).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// The three grouped reports, computed together.
async fn summary(Extension(ctx): Extension<AppContext>) -> impl IntoResponse {
    match ctx.storage.all_records().await {
        Ok(records) => Json(SummaryReport::build(&records)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn export_spreadsheet(
    Extension(ctx): Extension<AppContext>,
    Query(query): Query<RecordQuery>,
) -> impl IntoResponse {
    let records = match ctx.storage.scan_records(&query).await {
        Ok(records) => records,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };
    match export::spreadsheet_bytes(&records) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"comprobantes.csv\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn export_pdf(
    Extension(ctx): Extension<AppContext>,
    Query(query): Query<RecordQuery>,
) -> impl IntoResponse {
    let records = match ctx.storage.scan_records(&query).await {
        Ok(records) => records,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };
    match export::pdf_bytes(&records) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/pdf"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"comprobantes.pdf\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Create the HTTP server with all routes
pub fn create_server(storage: Arc<dyn Storage>, aliases: AliasTable) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let ctx = AppContext { storage, aliases };

    Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/comprobantes", get(records))
        .route("/api/reports/summary", get(summary))
        .route("/api/export/spreadsheet", get(export_spreadsheet))
        .route("/api/export/pdf", get(export_pdf))
        .layer(Extension(ctx))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(
    storage: Arc<dyn Storage>,
    aliases: AliasTable,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(storage, aliases);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/health");
    println!("📤 Upload:       POST http://localhost:{port}/api/upload");
    println!("🔎 Records:      http://localhost:{port}/api/comprobantes");
    println!("📊 Reports:      http://localhost:{port}/api/reports/summary");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
