use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use std::env;
use std::fmt::{self, Debug};

/// Stable error taxonomy surfaced to callers. The first group maps to
/// client-level failures, the second to infrastructure faults whose detail
/// is never exposed over the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    InvalidTransition,
    Expired,
    InsufficientFunds,
    Database,
    Upstream,
    Config,
}

#[derive(Debug)]
pub struct Error {
    pub kind: Kind,
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        config_error(format!("environment variable error: {err}"))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(_: reqwest::Error) -> Self {
        upstream_error()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self.kind {
            Kind::Validation => StatusCode::BAD_REQUEST,
            Kind::NotFound => StatusCode::NOT_FOUND,
            Kind::Forbidden => StatusCode::FORBIDDEN,
            Kind::Conflict | Kind::InvalidTransition => StatusCode::CONFLICT,
            Kind::Expired => StatusCode::GONE,
            Kind::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            Kind::Database | Kind::Upstream | Kind::Config => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal server error".into()
        } else {
            self.message
        };

        let body = Json(json!({
            "kind": self.kind,
            "error": message,
        }));

        (status, body).into_response()
    }
}

pub fn validation_error(message: impl Into<String>) -> Error {
    Error {
        kind: Kind::Validation,
        message: message.into(),
    }
}

pub fn not_found_error(entity: &str) -> Error {
    Error {
        kind: Kind::NotFound,
        message: format!("{entity} not found"),
    }
}

pub fn forbidden_error(message: impl Into<String>) -> Error {
    Error {
        kind: Kind::Forbidden,
        message: message.into(),
    }
}

pub fn conflict_error(message: impl Into<String>) -> Error {
    Error {
        kind: Kind::Conflict,
        message: message.into(),
    }
}

pub fn invalid_transition_error(current: &str, attempted: &str) -> Error {
    Error {
        kind: Kind::InvalidTransition,
        message: format!("cannot move to {attempted} from {current}"),
    }
}

/// Conditional-update variant: the row left the expected state between the
/// precondition check and the write.
pub fn stale_state_error(expected: &str) -> Error {
    Error {
        kind: Kind::InvalidTransition,
        message: format!("ride is no longer {expected}"),
    }
}

pub fn expired_error(message: impl Into<String>) -> Error {
    Error {
        kind: Kind::Expired,
        message: message.into(),
    }
}

pub fn insufficient_funds_error() -> Error {
    Error {
        kind: Kind::InsufficientFunds,
        message: "wallet balance is insufficient".into(),
    }
}

pub fn database_error<T: Debug>(err: T) -> Error {
    Error {
        kind: Kind::Database,
        message: format!("database error: {err:?}"),
    }
}

pub fn upstream_error() -> Error {
    Error {
        kind: Kind::Upstream,
        message: "upstream collaborator error".into(),
    }
}

pub fn config_error(message: impl Into<String>) -> Error {
    Error {
        kind: Kind::Config,
        message: message.into(),
    }
}
