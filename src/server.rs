//! Axum HTTP service running the batch pipeline on uploaded images

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::batch::{run_batch, BatchOutcome, ImageCollector};
use crate::config::ServerConfig;
use crate::error::ZipperError;
use crate::formats::OutputFormat;
use crate::processing::{ImageInput, TransformConfig};
use crate::progress::NoProgress;
use crate::report::{format_file_size, persist_archive, BatchResponse};

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    /// Held for the duration of a run so runs never overlap
    run_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            run_lock: Mutex::new(()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Create the HTTP router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.body_limit_bytes();

    Router::new()
        .route("/api/images", post(images_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let address = config.address();
    info!("Archives will be written to {}", config.output_path.display());

    let router = create_router(Arc::new(AppState::new(config)));
    let listener = TcpListener::bind(&address).await?;
    info!("Listening on http://{}", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Fields of the `/api/images` multipart form
#[derive(Debug, Default)]
struct ImageForm {
    images: Vec<ImageInput>,
    format: Option<String>,
    quality: Option<String>,
    max_length: Option<u32>,
    max_width: Option<u32>,
    max_height: Option<u32>,
}

impl ImageForm {
    fn transform_config(&self) -> Result<TransformConfig, ZipperError> {
        let format = match self.format.as_deref().map(str::trim) {
            None | Some("") => OutputFormat::Original,
            Some(name) => name.parse()?,
        };
        let quality = match self.quality.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => match text.parse::<i64>() {
                Ok(value) => Some(
                    u8::try_from(value).map_err(|_| ZipperError::InvalidQuality(value))?,
                ),
                Err(_) => None,
            },
        };

        TransformConfig::new(format, quality, self.max_length)?
            .with_bounds(self.max_width, self.max_height)
    }
}

/// Name for an upload sent without a filename, with an extension sniffed from
/// its content when the content is recognizable.
fn fallback_upload_name(index: usize, data: &[u8]) -> String {
    let base = format!("image-{}", index);
    match image::guess_format(data)
        .ok()
        .and_then(|format| format.extensions_str().first())
    {
        Some(ext) => format!("{}.{}", base, ext),
        None => base,
    }
}

/// Empty, zero and non-numeric dimensions mean "no bound".
fn parse_dimension(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok().filter(|&v| v > 0)
}

fn bad_request(message: &str, code: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message, code)))
}

fn zipper_error(e: ZipperError) -> ApiError {
    let status = match &e {
        ZipperError::Decode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Batch run failed: {}", e);
    }
    (status, Json(ErrorResponse::new(&e.to_string(), e.code())))
}

async fn read_form(mut multipart: Multipart) -> Result<ImageForm, ApiError> {
    let mut form = ImageForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&e.to_string(), "MULTIPART_ERROR"))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "images" {
            let file_name = field
                .file_name()
                .filter(|n| !n.trim().is_empty())
                .map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(&e.to_string(), "READ_ERROR"))?;
            let file_name = file_name
                .unwrap_or_else(|| fallback_upload_name(form.images.len() + 1, &data));
            form.images.push(ImageInput::new(file_name, data.to_vec()));
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| bad_request(&e.to_string(), "READ_ERROR"))?;
        match name.as_str() {
            "format" => form.format = Some(text),
            "quality" => form.quality = Some(text),
            "maxLength" => form.max_length = parse_dimension(&text),
            "maxWidth" => form.max_width = parse_dimension(&text),
            "maxHeight" => form.max_height = parse_dimension(&text),
            other => debug!("Ignoring form field {:?}", other),
        }
    }

    Ok(form)
}

/// Convert, resize and zip every uploaded image.
async fn images_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<BatchResponse>, ApiError> {
    let start = Instant::now();
    let form = read_form(multipart).await?;
    let config = form.transform_config().map_err(zipper_error)?;

    let mut collector = ImageCollector::new();
    for input in form.images {
        collector.push(input).map_err(zipper_error)?;
    }
    let inputs = collector.into_inputs();
    let count = inputs.len();

    let _guard = state.run_lock.lock().await;
    let output_path = state.config.output_path.clone();

    let outcome = tokio::task::spawn_blocking(move || -> Result<BatchOutcome, ZipperError> {
        let outcome = run_batch(inputs, &config, &mut NoProgress)?;
        persist_archive(&output_path, &outcome.archive.bytes)?;
        Ok(outcome)
    })
    .await
    .map_err(|e| {
        error!("Batch task panicked: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Batch task failed", "TASK_FAILED")),
        )
    })?
    .map_err(zipper_error)?;

    info!(
        "Zipped {} images: {} -> {} (archive {}) in {:?}",
        count,
        format_file_size(outcome.result.total_original_size),
        format_file_size(outcome.result.total_processed_size),
        format_file_size(outcome.result.archive_size),
        start.elapsed()
    );

    Ok(Json(BatchResponse::from_outcome(&outcome)))
}
