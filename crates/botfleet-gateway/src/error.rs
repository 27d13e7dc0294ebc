// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission rejections and their HTTP mapping.
//!
//! Response bodies carry only a coarse category (`forbidden`, `not_found`,
//! `bad_request`, `internal`) so a probing client cannot tell which gate
//! rejected it. The precise reason goes to logs and the rejection counter.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use botfleet_core::BotfleetError;
use serde::Serialize;

/// Body returned with every non-2xx admission outcome.
#[derive(Debug, Serialize)]
pub struct RejectBody {
    pub ok: bool,
    pub error: &'static str,
}

/// Rejection raised by the webhook admission pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("missing secret token header")]
    MissingSecret,
    #[error("unknown or inactive bot")]
    BotNotFound,
    #[error("bot platform does not match route")]
    PlatformMismatch,
    #[error("secret token mismatch")]
    InvalidSecret,
    #[error("tenant subscription inactive")]
    SubscriptionInactive,
    #[error("malformed update body")]
    MalformedUpdate,
    #[error("gateway failure")]
    Internal(#[source] BotfleetError),
}

impl AdmissionError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingSecret | Self::InvalidSecret | Self::SubscriptionInactive => {
                StatusCode::FORBIDDEN
            }
            Self::BotNotFound => StatusCode::NOT_FOUND,
            Self::PlatformMismatch | Self::MalformedUpdate => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Coarse category exposed in the response body.
    pub fn category(&self) -> &'static str {
        match self.status() {
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::BAD_REQUEST => "bad_request",
            _ => "internal",
        }
    }

    /// Fine-grained reason used as the rejection metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingSecret => "missing_secret",
            Self::BotNotFound => "bot_not_found",
            Self::PlatformMismatch => "platform_mismatch",
            Self::InvalidSecret => "invalid_secret",
            Self::SubscriptionInactive => "subscription_inactive",
            Self::MalformedUpdate => "malformed_update",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        crate::metrics::record_update_rejected(self.reason());
        let body = RejectBody {
            ok: false,
            error: self.category(),
        };
        (self.status(), Json(body)).into_response()
    }
}
