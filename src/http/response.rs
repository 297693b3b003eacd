//! Proxy failure responses.
//!
//! # Responsibilities
//! - Classify why a request could not be proxied
//! - Map each failure to a status code and a client-safe body
//!
//! # Design Decisions
//! - Upstream error details stay in the logs; the client only sees
//!   "Upstream error"
//! - Deadline expiry is an upstream failure (502), not a 504, so every
//!   transport-level problem looks the same to the client

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::store::StoreError;

/// Why a request did not reach (or return from) its upstream.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("route table unavailable: {0}")]
    RoutesUnavailable(#[from] StoreError),

    #[error("no route for path")]
    NoRoute,

    #[error("invalid upstream '{0}'")]
    InvalidTarget(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[source] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(std::time::Duration),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::RoutesUnavailable(_) | ProxyError::InvalidTarget(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::NoRoute => StatusCode::NOT_FOUND,
            ProxyError::Upstream(_) | ProxyError::Timeout(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            ProxyError::RoutesUnavailable(_) => "Failed to load config",
            ProxyError::NoRoute => "API not configured",
            ProxyError::InvalidTarget(_) => "Invalid target URL",
            ProxyError::Upstream(_) | ProxyError::Timeout(_) => "Upstream error",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}
