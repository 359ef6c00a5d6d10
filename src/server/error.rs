//! Mapping of request failures onto HTTP responses.

use crate::archive::StoreError;
use crate::codec::CodecError;
use crate::history::HistoryError;
use crate::ingest::IngestError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// A request failure with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        let status = match &err {
            IngestError::Codec(CodecError::Decode(_)) => StatusCode::BAD_REQUEST,
            IngestError::Codec(CodecError::Encode(_)) | IngestError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            IngestError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, err.to_string())
    }
}

impl From<HistoryError> for ApiError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::Filter(e) => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            HistoryError::Storage(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            [("content-type", "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}
