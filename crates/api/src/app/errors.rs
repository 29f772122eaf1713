use axum::http::StatusCode;
use axum::response::IntoResponse;

use gatewarden_auth::TranslatedFailure;

use crate::app::dto::FailureBody;

/// Renders a translated failure as `{code, subcode, message}`.
pub fn failure_response(failure: TranslatedFailure) -> axum::response::Response {
    let status = StatusCode::from_u16(failure.status).unwrap_or(StatusCode::UNAUTHORIZED);
    (
        status,
        axum::Json(FailureBody {
            code: status.as_u16(),
            subcode: failure.subcode.as_str(),
            message: failure.message,
        }),
    )
        .into_response()
}

/// Non-authentication errors (unknown route and the like).
pub fn json_error(status: StatusCode, subcode: &'static str, message: &'static str) -> axum::response::Response {
    (
        status,
        axum::Json(FailureBody {
            code: status.as_u16(),
            subcode,
            message,
        }),
    )
        .into_response()
}
