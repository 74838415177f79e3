use crate::services::secrets::SecretCipher;
use crate::{web, Config, Database};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub async fn run(config_path: &Path, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = Config::load(config_path)?;
    let cipher = Arc::new(SecretCipher::from_env_or(config.secrets.key.as_deref())?);
    let db = Database::open_with_pool_size(&config.database.path, config.database.pool_size)?;

    db.migrate()?;

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    web::serve(config, db, cipher, &addr).await?;

    Ok(())
}
