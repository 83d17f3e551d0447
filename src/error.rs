#![cfg(feature = "web")]

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use thiserror::Error;

use crate::capture::CaptureError;
use crate::loader::WorkbookError;
use crate::saving::UploadError;

/// Everything a request handler can fail with
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing upload parameter")]
    MissingUpload,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Error reading file: {0}")]
    Workbook(#[from] WorkbookError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("Failed to build breakdown workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to render page: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingUpload => StatusCode::BAD_REQUEST,
            AppError::Upload(UploadError::InvalidId(_) | UploadError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Upload(UploadError::Empty | UploadError::NotXlsx) => StatusCode::BAD_REQUEST,
            AppError::Upload(UploadError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Workbook(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Capture(CaptureError::RuntimeMissing) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Capture(_) => StatusCode::BAD_GATEWAY,
            AppError::Multipart(e) => e.status(),
            AppError::Xlsx(_) | AppError::Render(_) | AppError::Join(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text shown to the user
    ///
    /// Browser failures other than a missing runtime are reported generically;
    /// the details only go to the log.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Capture(CaptureError::RuntimeMissing) => self.to_string(),
            AppError::Capture(_) => {
                "PDF capture failed. Check that REPORT_BASE_URL is reachable from the server."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }
        (status, self.user_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saving::UploadId;
    use std::time::Duration;

    #[test]
    fn capture_failures_map_to_documented_responses() {
        let missing = AppError::from(CaptureError::RuntimeMissing);
        assert_eq!(missing.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(missing.user_message().contains("one-time setup command"));

        let unreachable = AppError::from(CaptureError::Browser("net::ERR_CONNECTION_REFUSED".into()));
        assert_eq!(unreachable.status(), StatusCode::BAD_GATEWAY);
        assert!(unreachable.user_message().starts_with("PDF capture failed"));
        assert!(!unreachable.user_message().contains("ERR_CONNECTION_REFUSED"));

        let timeout = AppError::from(CaptureError::ReadyTimeout(Duration::from_secs(1)));
        assert_eq!(timeout.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn upload_errors_map_to_client_errors() {
        let unknown = AppError::from(UploadError::NotFound(UploadId::generate()));
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::from(UploadError::NotXlsx).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(WorkbookError::MissingColumns).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
