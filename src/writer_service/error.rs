// src/writer_service/error.rs
// IntoResponse mapping for DomainError (spec §6.1/§7), grounded on
// backend/src/api/http/auth.rs's AuthError -> Response pattern.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::{DomainError, ErrorKind};

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "not_found",
        ErrorKind::PreconditionFailed => "precondition_failed",
        ErrorKind::Conflict => "conflict",
        ErrorKind::Invalid => "invalid",
        ErrorKind::StoreBusy => "store_busy",
        ErrorKind::Internal => "internal",
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::PreconditionFailed => StatusCode::CONFLICT,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Invalid => StatusCode::BAD_REQUEST,
        ErrorKind::StoreBusy => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        let body = ErrorBody {
            ok: false,
            error: ErrorDetail {
                kind: kind_name(kind),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
