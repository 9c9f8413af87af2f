use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use application::ApplicationError as AppErr;
        use domain::DomainError;

        match error {
            AppErr::Domain(DomainError::InvalidPayload { reason }) => {
                ApiError::new(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", reason)
            }
            AppErr::Domain(DomainError::ChatNotFound(chat_id)) => ApiError::new(
                StatusCode::NOT_FOUND,
                "CHAT_NOT_FOUND",
                format!("chat {} not found", chat_id),
            ),
            AppErr::Domain(DomainError::UserNotFound(user_id)) => ApiError::new(
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                format!("user {} not found", user_id),
            ),
            AppErr::Repository(repo_err) => match repo_err {
                domain::RepositoryError::NotFound => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "requested resource not found",
                ),
                domain::RepositoryError::Conflict => {
                    ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
                }
                domain::RepositoryError::Storage { message } => ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    format!("database error: {}", message),
                ),
            },
            AppErr::Dispatch(err) => ApiError::new(
                StatusCode::BAD_GATEWAY,
                "PUSH_GATEWAY_ERROR",
                format!("push gateway error: {}", err),
            ),
            AppErr::Channel(err) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CHANNEL_ERROR",
                format!("channel error: {}", err),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
