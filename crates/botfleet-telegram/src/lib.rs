// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram platform integration for Botfleet.
//!
//! `api` talks outward (webhook registration, message sending); `update`
//! models the inbound webhook payload.

pub mod api;
pub mod update;

pub use api::TelegramApi;
pub use update::UpdateEnvelope;
