// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Botfleet platform.
//!
//! This crate provides the error type, domain types, and service traits used
//! throughout the Botfleet workspace: bot identity and lifecycle status, the
//! cached admission entry, the queued-job payload, and the seams the gateway
//! and lifecycle orchestrator depend on.

pub mod error;
pub mod redact;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BotfleetError;
pub use types::{
    Bot, BotId, BotStatus, CachedBot, IncomingJob, Platform, Prompt, PromptKind, QueueEntry,
    TenantId,
};

// Re-export service traits at crate root.
pub use traits::{AlwaysActive, Messenger, SubscriptionGate, WebhookRegistrar};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_has_two_variants() {
        use std::str::FromStr;

        let variants = [Platform::Telegram, Platform::Vk];
        assert_eq!(variants.len(), 2, "Platform must have exactly 2 variants");

        // Verify Display and FromStr round-trip for all variants.
        for variant in &variants {
            let s = variant.to_string();
            let parsed = Platform::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn status_serialization() {
        let active = BotStatus::Active;
        let json = serde_json::to_string(&active).expect("should serialize");
        assert_eq!(json, "\"active\"");
        let parsed: BotStatus = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(active, parsed);
    }

    #[test]
    fn bot_and_tenant_ids() {
        let bid = BotId("bot-1".into());
        let tid = TenantId("tenant-1".into());

        let bid2 = bid.clone();
        assert_eq!(bid, bid2);
        assert_eq!(bid.to_string(), "bot-1");

        let tid2 = tid.clone();
        assert_eq!(tid, tid2);
        assert_eq!(tid.as_str(), "tenant-1");
    }

    #[test]
    fn service_traits_are_object_safe() {
        // The gateway and lifecycle orchestrator hold these behind Arc<dyn _>;
        // if object safety breaks, this test won't compile.
        fn _assert_gate(_: &dyn SubscriptionGate) {}
        fn _assert_registrar(_: &dyn WebhookRegistrar) {}
        fn _assert_messenger(_: &dyn Messenger) {}
    }
}
