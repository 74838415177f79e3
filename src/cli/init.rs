use crate::services::secrets::SecretCipher;
use crate::Config;
use anyhow::Result;
use std::path::PathBuf;

pub async fn run(path: PathBuf, force: bool) -> Result<()> {
    std::fs::create_dir_all(&path)?;
    std::fs::create_dir_all(path.join("data"))?;

    let config_path = path.join("greenleaf.toml");
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite (this rotates the secret key and makes stored secrets unreadable)",
            config_path.display()
        );
    }

    let config = Config::starter_toml(&SecretCipher::generate_key_base64());
    std::fs::write(&config_path, config)?;

    tracing::info!("Created {:?}", config_path);
    tracing::info!("Run 'greenleaf migrate' to set up the database");
    tracing::info!("Run 'greenleaf keys create --tenant <id> --name <name>' to issue an API key");

    Ok(())
}
