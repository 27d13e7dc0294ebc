// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::BotfleetError;
use crate::types::TenantId;

/// Billing-side check consulted during admission: does this tenant currently
/// have an entitlement to receive traffic?
///
/// The gateway only needs a yes/no answer; plan tiers, grace periods and
/// payment state live behind the implementation.
#[async_trait]
pub trait SubscriptionGate: Send + Sync {
    async fn is_active(&self, tenant_id: &TenantId) -> Result<bool, BotfleetError>;
}

/// Gate that admits every tenant. Used when billing integration is not
/// configured, and as the default in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysActive;

#[async_trait]
impl SubscriptionGate for AlwaysActive {
    async fn is_active(&self, _tenant_id: &TenantId) -> Result<bool, BotfleetError> {
        Ok(true)
    }
}
