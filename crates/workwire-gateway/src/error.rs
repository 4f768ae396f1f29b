// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error-to-response mapping for the REST surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use workwire_core::WireError;

/// JSON error body, matching the `{success, message}` shape clients expect.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

/// Newtype so `WireError` can cross the axum boundary as a response.
#[derive(Debug)]
pub struct ApiError(pub WireError);

impl From<WireError> for ApiError {
    fn from(err: WireError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WireError::Auth(_) => StatusCode::UNAUTHORIZED,
            WireError::NotFound { .. } => StatusCode::NOT_FOUND,
            WireError::AccessDenied(_) => StatusCode::FORBIDDEN,
            WireError::Validation(_) => StatusCode::BAD_REQUEST,
            WireError::Storage { .. }
            | WireError::Channel { .. }
            | WireError::Config(_)
            | WireError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal failure details are logged, not leaked.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
            "internal error".to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: WireError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(
            status_of(WireError::Auth("no token".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(WireError::conversation_not_found("c")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(WireError::AccessDenied("nope".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(WireError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(WireError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
