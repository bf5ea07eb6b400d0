use axum::http::StatusCode;

/// Failures surfaced by the API client and the progress core.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("session expired, please sign in again")]
    AuthExpired,

    #[error("too many operations, please try again in 5 minutes")]
    RateLimited,

    #[error("progress for day {day} is missing from the dashboard")]
    DataInconsistency { day: u8 },

    #[error("request failed ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("the start day has already been chosen")]
    StartDayAlreadyChosen,

    #[error("{0}")]
    Invalid(String),

    #[error("not signed in")]
    NotSignedIn,
}

impl ClientError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Message shown to the user when a progress save fails.
    pub fn save_message(&self) -> String {
        match self {
            ClientError::RateLimited => self.to_string(),
            ClientError::AuthExpired => self.to_string(),
            _ => "Failed to save progress".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        let status = match &err {
            ClientError::AuthExpired | ClientError::NotSignedIn => StatusCode::UNAUTHORIZED,
            ClientError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ClientError::StartDayAlreadyChosen => StatusCode::CONFLICT,
            ClientError::Invalid(_) => StatusCode::BAD_REQUEST,
            ClientError::Api { status, .. } if *status == 401 => StatusCode::UNAUTHORIZED,
            ClientError::Api { status, .. } if (400..500).contains(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ClientError::DataInconsistency { .. }
            | ClientError::Api { .. }
            | ClientError::Request(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
