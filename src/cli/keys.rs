use crate::{services::api_keys, Config, Database};
use anyhow::Result;
use std::path::Path;

use super::KeyCommand;

pub async fn run(config_path: &Path, command: KeyCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open(&config.database.path)?;
    db.migrate()?;

    match command {
        KeyCommand::Create { tenant, name } => {
            let (raw, key) = api_keys::create_key(&db, &tenant, &name)?;
            println!("Created key {} ({}) for tenant '{}'.", key.id, key.prefix, key.tenant_id);
            println!("Store it now; it will not be shown again:\n\n  {}\n", raw);
        }
        KeyCommand::List { tenant } => {
            let keys = api_keys::list_keys(&db, tenant.as_deref())?;
            println!(
                "{:<6} {:<20} {:<20} {:<16} {:<20}",
                "ID", "TENANT", "NAME", "PREFIX", "LAST USED"
            );
            println!("{}", "-".repeat(84));
            for key in keys {
                println!(
                    "{:<6} {:<20} {:<20} {:<16} {:<20}",
                    key.id,
                    key.tenant_id,
                    key.name,
                    key.prefix,
                    key.last_used_at.as_deref().unwrap_or("never")
                );
            }
        }
        KeyCommand::Revoke { id } => {
            if api_keys::revoke_key(&db, id)? {
                tracing::info!("Key {} revoked", id);
            } else {
                tracing::warn!("Key {} not found", id);
            }
        }
    }

    Ok(())
}
