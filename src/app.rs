#![cfg(feature = "web")]

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, RawQuery, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use handlebars::TemplateError;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::capture::{Capturer, ChromeCapturer, printable_url};
use crate::config::Config;
use crate::downloader;
use crate::error::AppError;
use crate::report::{Report, sanitize_rate};
use crate::saving::{UploadError, UploadId, UploadStore};
use crate::view::{Dashboard, ViewParams};

/// Multipart field carrying the workbook
pub const UPLOAD_FIELD: &str = "workbook";

pub struct AppState {
    pub config: Config,
    pub store: UploadStore,
    pub dashboard: Dashboard,
    pub capturer: Arc<dyn Capturer>,
}

impl AppState {
    pub fn new(config: Config, capturer: Arc<dyn Capturer>) -> Result<Self, TemplateError> {
        let dashboard = Dashboard::new(config.default_rate, config.print_width)?;
        Ok(Self {
            store: UploadStore::new(config.upload_dir.clone()),
            dashboard,
            capturer,
            config,
        })
    }
}

/// Build the router with every route of the dashboard
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/", get(serve_dashboard))
        .route("/upload", post(upload_workbook))
        .route("/export/pdf", get(export_pdf))
        .route("/export/xlsx", get(export_xlsx))
        .route("/export/csv", get(export_csv))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let capturer = Arc::new(ChromeCapturer::new(config.chrome_path.clone()));
    let state = Arc::new(AppState::new(config, capturer)?);
    std::fs::create_dir_all(state.store.root())?;

    let listener = TcpListener::bind(state.config.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    info!("Captures load the dashboard from {}", state.config.base_url);
    info!("Uploads are stored in {}", state.store.root().display());

    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn serve_dashboard(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Html<String>, AppError> {
    let params = ViewParams::parse(query.as_deref());
    Ok(Html(state.dashboard.render(&params, &state.store)?))
}

async fn upload_workbook(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut file_data = None;
    let mut rate = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(UPLOAD_FIELD) => file_data = Some(field.bytes().await?),
            Some("rate") => rate = field.text().await?.trim().parse::<f64>().ok(),
            _ => {}
        }
    }

    let file_data = file_data.ok_or(UploadError::Empty)?;
    let id = state.store.save(&file_data)?;

    let params = ViewParams {
        upload: Some(id.to_string()),
        rate,
        ..Default::default()
    };
    Ok(Redirect::to(&format!("/?{}", params.to_query())))
}

/// Read the upload named in `params` and build its report
fn load_report(state: &AppState, params: &ViewParams) -> Result<Report, AppError> {
    let raw = params.upload.as_deref().ok_or(AppError::MissingUpload)?;
    let id = UploadId::parse(raw)?;
    let path = state.store.locate(&id)?;

    let rate = sanitize_rate(params.rate, state.config.default_rate);
    Ok(Report::load(&path, &params.dates, rate)?)
}

fn attachment(body: Vec<u8>, content_type: &str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

async fn export_pdf(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let params = ViewParams::parse(query.as_deref());
    let report = load_report(&state, &params)?;

    // Capture exactly what the dashboard shows for the resolved selection
    let resolved = ViewParams {
        rate: Some(report.breakdown.rate),
        dates: report.selection.dates().collect(),
        ..params
    };
    let url = printable_url(&state.config.base_url, &resolved, state.config.print_width);
    let layout = state.config.layout();
    info!("Capturing {}", url);

    let capturer = Arc::clone(&state.capturer);
    let pdf = tokio::task::spawn_blocking(move || capturer.capture(&url, &layout)).await??;

    Ok(attachment(
        pdf,
        "application/pdf",
        &format!("{}.pdf", report.file_stem()),
    ))
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let params = ViewParams::parse(query.as_deref());
    let report = load_report(&state, &params)?;
    let bytes = downloader::to_xlsx(&report.breakdown)?;

    Ok(attachment(
        bytes,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &format!("{}.xlsx", report.file_stem()),
    ))
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let params = ViewParams::parse(query.as_deref());
    let report = load_report(&state, &params)?;
    let csv = downloader::to_csv(&report.breakdown);

    Ok(attachment(
        csv.into_bytes(),
        "text/csv; charset=utf-8",
        &format!("{}.csv", report.file_stem()),
    ))
}
