// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service traits implemented across the workspace.

mod outbound;
mod subscription;

pub use outbound::{Messenger, WebhookRegistrar};
pub use subscription::{AlwaysActive, SubscriptionGate};
