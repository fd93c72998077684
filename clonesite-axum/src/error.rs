use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clonesite_core::errors::SiteError;

#[derive(Debug)]
pub struct SiteAxumError(pub anyhow::Error);

impl From<anyhow::Error> for SiteAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for SiteAxumError {
    fn into_response(self) -> Response {
        // Keep the structured fields of a SiteError, even behind anyhow context
        if let Some(site) = SiteError::from_anyhow(&self.0) {
            let safe = site.sanitize_for_client();
            let status =
                StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, Json(safe.to_json())).into_response();
        }

        tracing::error!(error = %self.0, "unhandled error");
        let site = SiteError::general_error("Something went wrong");
        let status =
            StatusCode::from_u16(site.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(site.to_json())).into_response()
    }
}
