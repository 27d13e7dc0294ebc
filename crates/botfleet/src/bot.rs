// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `botfleet bot` command family.
//!
//! Admin surface for provisioning: create, inspect and transition bot
//! records through the lifecycle orchestrator. Activation registers the
//! webhook against the platform (a logged no-op outside production).

use std::sync::Arc;

use botfleet_config::BotfleetConfig;
use botfleet_core::types::{Bot, BotId, Platform, TenantId};
use botfleet_core::BotfleetError;
use botfleet_registry::{BotCache, BotLifecycle, CreateBot};
use botfleet_secrets::SecretManager;
use botfleet_storage::queries::bots;
use botfleet_storage::Database;
use botfleet_telegram::TelegramApi;
use clap::Subcommand;

/// Bot administration subcommands.
#[derive(Subcommand, Debug)]
pub enum BotCommand {
    /// Register a new bot (initial status: created).
    Add {
        /// Tenant that owns the bot.
        #[arg(long)]
        tenant: String,
        /// Display name, 2-100 characters.
        #[arg(long)]
        name: String,
        /// Platform credential token.
        #[arg(long)]
        token: String,
        /// Messaging platform.
        #[arg(long, default_value = "telegram")]
        platform: Platform,
    },
    /// List bots, optionally for a single tenant.
    List {
        /// Restrict the listing to one tenant.
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Show a single bot in full.
    Show {
        /// Bot id.
        id: String,
    },
    /// Activate a bot: register its webhook and start admitting traffic.
    Activate {
        /// Bot id.
        id: String,
    },
    /// Deactivate a bot and remove its webhook.
    Deactivate {
        /// Bot id.
        id: String,
    },
    /// Replace the platform token. Refused while the bot is active.
    SetToken {
        /// Bot id.
        id: String,
        /// New platform credential token.
        token: String,
    },
    /// Delete a bot, deactivating it first if necessary.
    Remove {
        /// Bot id.
        id: String,
    },
}

/// Run a `botfleet bot` subcommand.
pub async fn run(command: BotCommand, config: BotfleetConfig) -> Result<(), BotfleetError> {
    let secrets = SecretManager::from_passphrase(
        &config.encryption.passphrase,
        config.encryption.kdf_memory_cost,
        config.encryption.kdf_iterations,
        config.encryption.kdf_parallelism,
    )?;
    let db = crate::open_database(&config).await?;
    let telegram = TelegramApi::new(
        &config.gateway.public_base_url,
        config.telegram.api_url.as_deref(),
        config.environment.is_production(),
    )?;
    let cache = BotCache::new(db.clone(), secrets.clone(), config.cache.ttl_secs);
    let lifecycle = BotLifecycle::new(db.clone(), secrets, Arc::new(telegram), cache);

    let result = dispatch(command, &db, &lifecycle).await;
    // Close the database cleanly even when the command failed.
    let close_result = db.close().await;
    result?;
    close_result
}

async fn dispatch(
    command: BotCommand,
    db: &Database,
    lifecycle: &BotLifecycle,
) -> Result<(), BotfleetError> {
    match command {
        BotCommand::Add {
            tenant,
            name,
            token,
            platform,
        } => {
            let bot = lifecycle
                .create(CreateBot {
                    tenant_id: TenantId(tenant),
                    name,
                    platform,
                    token,
                    prompts: Vec::new(),
                })
                .await?;
            println!("created bot {} ({})", bot.id, bot.name);
            println!("  tenant:   {}", bot.tenant_id);
            println!("  platform: {}", bot.platform);
            println!("  status:   {}", bot.status);
            println!();
            println!("Activate with: botfleet bot activate {}", bot.id);
        }
        BotCommand::List { tenant } => {
            let tenant = tenant.map(TenantId);
            let all = bots::list_bots(db, tenant.as_ref()).await?;
            if all.is_empty() {
                println!("no bots");
            } else {
                println!(
                    "{:<36}  {:<8}  {:<8}  {}",
                    "ID", "STATUS", "PLATFORM", "NAME (TENANT)"
                );
                for bot in &all {
                    println!(
                        "{:<36}  {:<8}  {:<8}  {} ({})",
                        bot.id.as_str(),
                        bot.status.to_string(),
                        bot.platform.to_string(),
                        bot.name,
                        bot.tenant_id
                    );
                }
            }
        }
        BotCommand::Show { id } => {
            let bot_id = BotId(id);
            let bot = bots::get_bot(db, &bot_id)
                .await?
                .ok_or_else(|| BotfleetError::BotNotFound(bot_id.as_str().to_string()))?;
            print_bot(&bot);
        }
        BotCommand::Activate { id } => {
            let bot_id = BotId(id);
            lifecycle.activate(&bot_id).await?;
            println!("bot {bot_id} active");
        }
        BotCommand::Deactivate { id } => {
            let bot_id = BotId(id);
            lifecycle.deactivate(&bot_id).await?;
            println!("bot {bot_id} archived");
        }
        BotCommand::SetToken { id, token } => {
            let bot_id = BotId(id);
            lifecycle.set_token(&bot_id, &token).await?;
            println!("token updated for bot {bot_id}");
        }
        BotCommand::Remove { id } => {
            let bot_id = BotId(id);
            lifecycle.delete(&bot_id).await?;
            println!("bot {bot_id} removed");
        }
    }
    Ok(())
}

fn print_bot(bot: &Bot) {
    println!("id:             {}", bot.id);
    println!("tenant:         {}", bot.tenant_id);
    println!("name:           {}", bot.name);
    println!("platform:       {}", bot.platform);
    println!("status:         {}", bot.status);
    println!("token:          {}", mask_token(&bot.token));
    println!(
        "webhook secret: {}",
        if bot.webhook_secret.is_some() {
            "provisioned"
        } else {
            "not provisioned"
        }
    );
    println!("created:        {}", bot.created_at);
    println!("updated:        {}", bot.updated_at);
    if !bot.prompts.is_empty() {
        println!("prompts:");
        for prompt in &bot.prompts {
            println!(
                "  [{}] {}: {}",
                prompt.kind,
                prompt.name,
                truncate(&prompt.content, 60)
            );
        }
    }
}

/// The numeric prefix of a bot token identifies the bot and is safe to
/// show; everything after the colon is credential material.
fn mask_token(token: &str) -> String {
    match token.split_once(':') {
        Some((id, _)) => format!("{id}:***"),
        None => "***".to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}
