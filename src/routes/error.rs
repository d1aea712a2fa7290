use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::models::notification::{Notification, Notifier, Severity};
use crate::models::permission::TransactionGrant;
use crate::services::backend::BackendError;
use crate::services::csv_export::CsvError;
use crate::services::permissions::AuthError;
use crate::services::validation::ValidationError;
use crate::services::workflow::NavigationError;

const BACKEND_UNAVAILABLE: &str = "The utility backend could not be reached. Try again later.";
const BACKEND_FAILED: &str = "The utility backend could not complete the request.";
const INTERNAL_FAILURE: &str = "Unexpected error. Try again later.";

/// Every failure a handler can report. Rendered as a status code plus a
/// notification the client shows and dismisses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Csv(#[from] CsvError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown screen: {0}")]
    UnknownScreen(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Navigation(_) => StatusCode::CONFLICT,
            ApiError::Backend(_) => StatusCode::BAD_GATEWAY,
            ApiError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownScreen(_) => StatusCode::NOT_FOUND,
        }
    }

    fn severity(&self) -> Severity {
        match self {
            ApiError::Validation(_) | ApiError::Navigation(_) => Severity::Warn,
            _ => Severity::Error,
        }
    }

    /// Text shown to the user. Backend messages pass through unchanged.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Backend(err) => match err {
                BackendError::Network(_) => BACKEND_UNAVAILABLE.to_string(),
                other => other
                    .server_message()
                    .unwrap_or(BACKEND_FAILED)
                    .to_string(),
            },
            ApiError::Csv(_) => INTERNAL_FAILURE.to_string(),
            other => other.to_string(),
        }
    }

    /// Build the notification with the configured lifetime.
    pub fn notification(&self, notifier: &Notifier) -> Notification {
        notifier.notify(self.severity(), self.detail())
    }
}

/// Body carrying a single notification, used for errors and confirmations.
#[derive(Debug, Serialize)]
pub struct NotificationBody {
    pub notification: Notification,
}

/// Marker left on error responses until the notification layer renders them.
#[derive(Debug, Clone)]
struct PendingNotification {
    severity: Severity,
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let mut response = status.into_response();
        response.extensions_mut().insert(PendingNotification {
            severity: self.severity(),
            detail: self.detail(),
        });
        response
    }
}

/// Response layer turning [`ApiError`] markers into notification bodies.
pub async fn render_notifications(State(notifier): State<Notifier>, mut response: Response) -> Response {
    match response.extensions_mut().remove::<PendingNotification>() {
        Some(pending) => {
            let notification = notifier.notify(pending.severity, pending.detail);
            (response.status(), Json(NotificationBody { notification })).into_response()
        }
        None => response,
    }
}

/// Authenticated caller, taken from the bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub grants: Vec<TransactionGrant>,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = state.credentials.authenticate(&parts.headers)?;
        Ok(CurrentUser {
            id: claims.sub,
            grants: claims.transactions,
        })
    }
}
