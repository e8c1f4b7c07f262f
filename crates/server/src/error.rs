use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

use herdbook_api::ServiceError;
use herdbook_registry::IrzError;
use herdbook_store::StoreError;

/// Unified API error type.
///
/// Produces `{"error": "<message>"}` JSON responses.
#[derive(Debug)]
pub struct ApiErr {
    status: StatusCode,
    message: String,
}

impl ApiErr {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }

    /// Upstream registry trouble that is not the caller's fault.
    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }

    /// Build a closure that logs a DB/IO error and returns `500 Internal Server Error`.
    pub fn from_db<E: fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| {
            tracing::error!("{context}: {e}");
            Self::internal("internal server error")
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({"error": self.message})),
        )
            .into_response()
    }
}

impl From<ServiceError> for ApiErr {
    fn from(e: ServiceError) -> Self {
        Self {
            status: StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: e.message().to_string(),
        }
    }
}

impl From<StoreError> for ApiErr {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => Self::conflict("already exists"),
            other => {
                tracing::error!("store error: {other}");
                Self::internal("internal server error")
            }
        }
    }
}

/// Registry failures split two ways: credential problems belong to the
/// caller (401), everything else is the upstream being unwell (502). The
/// raw upstream body is logged but never forwarded.
impl From<IrzError> for ApiErr {
    fn from(e: IrzError) -> Self {
        match e {
            IrzError::TokenExpired | IrzError::Auth(_) => Self::unauthorized(e.to_string()),
            IrzError::Upstream { status, body } => {
                tracing::error!("registry answered HTTP {status}: {body}");
                Self::bad_gateway(format!("registry error (HTTP {status})"))
            }
            IrzError::RetriesExhausted => Self::bad_gateway("registry unavailable"),
            other => {
                tracing::error!("registry request failed: {other}");
                Self::bad_gateway("registry unreachable")
            }
        }
    }
}
