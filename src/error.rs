use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unknown report endpoint '{0}'")]
    UnknownEndpoint(String),

    #[error("unknown search type '{0}'")]
    UnknownSearchType(String),

    /// An interval carried a `date_start` that is not a report timestamp.
    #[error("invalid interval date '{0}'")]
    InvalidIntervalDate(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl ResponseError for ReportError {
    fn status_code(&self) -> StatusCode {
        match self {
            ReportError::UnknownEndpoint(_) | ReportError::UnknownSearchType(_) => {
                StatusCode::NOT_FOUND
            }
            ReportError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ReportError::Database(_) | ReportError::InvalidIntervalDate(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ReportError::Database(e) = self {
            log::error!("DB query error: {:?}", e);
        }

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "status": "error",
            "message": self.to_string(),
        }))
    }
}
