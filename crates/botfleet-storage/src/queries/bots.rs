// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot registry CRUD operations.
//!
//! Status transitions are compare-and-swap: the caller states the expected
//! current status and learns from the row count whether it won the race.

use std::str::FromStr;

use botfleet_core::types::{Bot, BotId, BotStatus, Platform, Prompt, TenantId};
use botfleet_core::BotfleetError;
use rusqlite::params;

use crate::database::{now_iso, Database};

fn bot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bot> {
    let platform_raw: String = row.get(3)?;
    let platform = Platform::from_str(&platform_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let status_raw: String = row.get(5)?;
    let status = BotStatus::from_str(&status_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let prompts_raw: String = row.get(6)?;
    let prompts: Vec<Prompt> = serde_json::from_str(&prompts_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Bot {
        id: BotId(row.get(0)?),
        tenant_id: TenantId(row.get(1)?),
        name: row.get(2)?,
        platform,
        token: row.get(4)?,
        status,
        prompts,
        webhook_secret: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Insert a new bot row.
pub async fn insert_bot(db: &Database, bot: &Bot) -> Result<(), BotfleetError> {
    let prompts_json = serde_json::to_string(&bot.prompts)
        .map_err(|e| BotfleetError::Internal(format!("failed to serialize prompts: {e}")))?;
    let bot = bot.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO bots (id, tenant_id, name, platform, token, status, prompts,
                                   webhook_secret, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    bot.id.as_str(),
                    bot.tenant_id.as_str(),
                    bot.name,
                    bot.platform.to_string(),
                    bot.token,
                    bot.status.to_string(),
                    prompts_json,
                    bot.webhook_secret,
                    bot.created_at,
                    bot.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a bot by ID.
pub async fn get_bot(db: &Database, id: &BotId) -> Result<Option<Bot>, BotfleetError> {
    let id = id.as_str().to_string();
    db.connection()
        .call(move |conn| {
            use rusqlite::OptionalExtension;
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, name, platform, token, status, prompts,
                        webhook_secret, created_at, updated_at
                 FROM bots WHERE id = ?1",
            )?;
            let bot = stmt.query_row(params![id], bot_from_row).optional()?;
            Ok(bot)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List bots, optionally filtered by tenant.
pub async fn list_bots(
    db: &Database,
    tenant_id: Option<&TenantId>,
) -> Result<Vec<Bot>, BotfleetError> {
    let tenant_id = tenant_id.map(|t| t.as_str().to_string());
    db.connection()
        .call(move |conn| {
            let mut bots = Vec::new();
            match &tenant_id {
                Some(tenant) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, tenant_id, name, platform, token, status, prompts,
                                webhook_secret, created_at, updated_at
                         FROM bots WHERE tenant_id = ?1 ORDER BY created_at DESC",
                    )?;
                    let rows = stmt.query_map(params![tenant], bot_from_row)?;
                    for row in rows {
                        bots.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, tenant_id, name, platform, token, status, prompts,
                                webhook_secret, created_at, updated_at
                         FROM bots ORDER BY created_at DESC",
                    )?;
                    let rows = stmt.query_map([], bot_from_row)?;
                    for row in rows {
                        bots.push(row?);
                    }
                }
            }
            Ok(bots)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all active bots on the given platform. Used for cache warm-up.
pub async fn list_active_bots(db: &Database, platform: Platform) -> Result<Vec<Bot>, BotfleetError> {
    let platform = platform.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, name, platform, token, status, prompts,
                        webhook_secret, created_at, updated_at
                 FROM bots WHERE status = 'active' AND platform = ?1
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![platform], bot_from_row)?;
            let mut bots = Vec::new();
            for row in rows {
                bots.push(row?);
            }
            Ok(bots)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Compare-and-swap a bot's status: transition `from -> to` only if the row
/// is still in `from`. Returns `true` if this call performed the transition.
pub async fn update_status_cas(
    db: &Database,
    id: &BotId,
    from: BotStatus,
    to: BotStatus,
) -> Result<bool, BotfleetError> {
    let id = id.as_str().to_string();
    let from = from.to_string();
    let to = to.to_string();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE bots SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = ?4",
                params![to, now, id, from],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace a bot's platform token. Refused while the bot is active, so a
/// registered webhook can never point at a credential we no longer hold.
/// Returns `true` if the row was updated.
pub async fn update_token(db: &Database, id: &BotId, token: &str) -> Result<bool, BotfleetError> {
    let id = id.as_str().to_string();
    let token = token.to_string();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE bots SET token = ?1, updated_at = ?2
                 WHERE id = ?3 AND status != 'active'",
                params![token, now, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Store the encrypted webhook secret for a bot. Returns `true` if the row
/// was updated.
pub async fn update_webhook_secret(
    db: &Database,
    id: &BotId,
    encrypted: &str,
) -> Result<bool, BotfleetError> {
    let id = id.as_str().to_string();
    let encrypted = encrypted.to_string();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE bots SET webhook_secret = ?1, updated_at = ?2 WHERE id = ?3",
                params![encrypted, now, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a bot row. Returns `true` if a row was removed.
pub async fn delete_bot(db: &Database, id: &BotId) -> Result<bool, BotfleetError> {
    let id = id.as_str().to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM bots WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use botfleet_core::types::PromptKind;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    fn make_bot(id: &str) -> Bot {
        Bot {
            id: BotId(id.to_string()),
            tenant_id: TenantId("tenant-1".to_string()),
            name: "support bot".to_string(),
            platform: Platform::Telegram,
            token: "1234567890:TESTTOKENTESTTOKENTESTTOKENTESTTOKE".to_string(),
            status: BotStatus::Created,
            prompts: vec![Prompt {
                name: "tone".to_string(),
                kind: PromptKind::Context,
                content: "Answer briefly.".to_string(),
            }],
            webhook_secret: None,
            created_at: now_iso(),
            updated_at: now_iso(),
        }
    }

    #[tokio::test]
    async fn insert_and_get_roundtrips() {
        let (db, _dir) = setup_db().await;
        let bot = make_bot("bot-1");

        insert_bot(&db, &bot).await.unwrap();
        let retrieved = get_bot(&db, &bot.id).await.unwrap().unwrap();

        assert_eq!(retrieved.id, bot.id);
        assert_eq!(retrieved.tenant_id, bot.tenant_id);
        assert_eq!(retrieved.platform, Platform::Telegram);
        assert_eq!(retrieved.status, BotStatus::Created);
        assert_eq!(retrieved.prompts.len(), 1);
        assert_eq!(retrieved.prompts[0].name, "tone");
        assert!(retrieved.webhook_secret.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_nonexistent_bot_returns_none() {
        let (db, _dir) = setup_db().await;
        let result = get_bot(&db, &BotId("no-such-bot".into())).await.unwrap();
        assert!(result.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_bots_with_tenant_filter() {
        let (db, _dir) = setup_db().await;
        let b1 = make_bot("b1");
        let mut b2 = make_bot("b2");
        b2.tenant_id = TenantId("tenant-2".to_string());

        insert_bot(&db, &b1).await.unwrap();
        insert_bot(&db, &b2).await.unwrap();

        let all = list_bots(&db, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let t1 = list_bots(&db, Some(&TenantId("tenant-1".into()))).await.unwrap();
        assert_eq!(t1.len(), 1);
        assert_eq!(t1[0].id, b1.id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_active_filters_status_and_platform() {
        let (db, _dir) = setup_db().await;

        let mut active_tg = make_bot("active-tg");
        active_tg.status = BotStatus::Active;
        let created_tg = make_bot("created-tg");
        let mut active_vk = make_bot("active-vk");
        active_vk.status = BotStatus::Active;
        active_vk.platform = Platform::Vk;

        insert_bot(&db, &active_tg).await.unwrap();
        insert_bot(&db, &created_tg).await.unwrap();
        insert_bot(&db, &active_vk).await.unwrap();

        let bots = list_active_bots(&db, Platform::Telegram).await.unwrap();
        assert_eq!(bots.len(), 1);
        assert_eq!(bots[0].id, active_tg.id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cas_transition_succeeds_exactly_once() {
        let (db, _dir) = setup_db().await;
        let bot = make_bot("cas-bot");
        insert_bot(&db, &bot).await.unwrap();

        let won = update_status_cas(&db, &bot.id, BotStatus::Created, BotStatus::Active)
            .await
            .unwrap();
        assert!(won);

        // A second racer with the same expectation loses.
        let lost = update_status_cas(&db, &bot.id, BotStatus::Created, BotStatus::Active)
            .await
            .unwrap();
        assert!(!lost);

        let current = get_bot(&db, &bot.id).await.unwrap().unwrap();
        assert_eq!(current.status, BotStatus::Active);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cas_with_wrong_expected_status_fails() {
        let (db, _dir) = setup_db().await;
        let bot = make_bot("cas-wrong");
        insert_bot(&db, &bot).await.unwrap();

        let won = update_status_cas(&db, &bot.id, BotStatus::Archived, BotStatus::Active)
            .await
            .unwrap();
        assert!(!won);

        let current = get_bot(&db, &bot.id).await.unwrap().unwrap();
        assert_eq!(current.status, BotStatus::Created);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_token_blocked_while_active() {
        let (db, _dir) = setup_db().await;
        let bot = make_bot("tok-bot");
        insert_bot(&db, &bot).await.unwrap();

        assert!(update_token(&db, &bot.id, "new-token").await.unwrap());

        update_status_cas(&db, &bot.id, BotStatus::Created, BotStatus::Active)
            .await
            .unwrap();
        assert!(!update_token(&db, &bot.id, "other-token").await.unwrap());

        let current = get_bot(&db, &bot.id).await.unwrap().unwrap();
        assert_eq!(current.token, "new-token");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_webhook_secret_roundtrips() {
        let (db, _dir) = setup_db().await;
        let bot = make_bot("sec-bot");
        insert_bot(&db, &bot).await.unwrap();

        assert!(update_webhook_secret(&db, &bot.id, "bm9uY2U=:Y3Q=:dGFn")
            .await
            .unwrap());

        let current = get_bot(&db, &bot.id).await.unwrap().unwrap();
        assert_eq!(current.webhook_secret.as_deref(), Some("bm9uY2U=:Y3Q=:dGFn"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_bot_removes_row() {
        let (db, _dir) = setup_db().await;
        let bot = make_bot("del-bot");
        insert_bot(&db, &bot).await.unwrap();

        assert!(delete_bot(&db, &bot.id).await.unwrap());
        assert!(!delete_bot(&db, &bot.id).await.unwrap());
        assert!(get_bot(&db, &bot.id).await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
