// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot registry services: the admission cache and the lifecycle orchestrator.

pub mod cache;
pub mod lifecycle;

pub use cache::BotCache;
pub use lifecycle::{BotLifecycle, CreateBot};
