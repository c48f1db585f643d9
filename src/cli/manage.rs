use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;

use crate::{
    daemon::storage::{entities::Settings, kv::KeyValueStore, usage::UsageStore},
    utils::clock::DefaultClock,
};

#[derive(Subcommand, Debug)]
pub enum WhitelistCommand {
    #[command(about = "Stop recording a domain")]
    Add { domain: String },
    #[command(about = "Record a domain again")]
    Remove { domain: String },
    #[command(about = "List domains that are never recorded")]
    List {},
}

pub async fn process_whitelist_command(
    store: impl KeyValueStore,
    command: WhitelistCommand,
) -> Result<()> {
    let usage = UsageStore::new(store, Arc::new(DefaultClock));
    match command {
        WhitelistCommand::Add { domain } => {
            if usage.add_to_whitelist(domain.trim()).await? {
                println!("Added {}", domain.trim());
            } else {
                println!("{} is already excluded", domain.trim());
            }
        }
        WhitelistCommand::Remove { domain } => {
            if usage.remove_from_whitelist(domain.trim()).await? {
                println!("Removed {}", domain.trim());
            } else {
                println!("{} wasn't excluded", domain.trim());
            }
        }
        WhitelistCommand::List {} => {
            for domain in usage.whitelist().await? {
                println!("{domain}");
            }
        }
    }
    Ok(())
}

/// Prints settings, updating them first when a new value is given.
pub async fn process_settings_command(
    store: impl KeyValueStore,
    tracking_delay: Option<u32>,
) -> Result<()> {
    let usage = UsageStore::new(store, Arc::new(DefaultClock));
    if let Some(tracking_delay_seconds) = tracking_delay {
        usage
            .set_settings(Settings {
                tracking_delay_seconds,
            })
            .await?;
    }
    let settings = usage.settings().await?;
    println!("tracking-delay\t{}s", settings.tracking_delay_seconds);
    Ok(())
}
