use clap::Parser;
use greenleaf_hooks::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "greenleaf=info,greenleaf_hooks=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { path, force }) => {
            greenleaf_hooks::cli::init::run(path, force).await?;
        }
        Some(Commands::Serve { host, port }) => {
            greenleaf_hooks::cli::serve::run(&cli.config, host, port).await?;
        }
        Some(Commands::Migrate { command }) => {
            greenleaf_hooks::cli::migrate::run(&cli.config, command).await?;
        }
        Some(Commands::Keys { command }) => {
            greenleaf_hooks::cli::keys::run(&cli.config, command).await?;
        }
        Some(Commands::Catalog { json }) => {
            greenleaf_hooks::cli::catalog::run(json)?;
        }
        Some(Commands::Sign { secret, file }) => {
            greenleaf_hooks::cli::sign::sign(&secret, &file)?;
        }
        Some(Commands::Verify {
            secret,
            signature,
            file,
        }) => {
            greenleaf_hooks::cli::sign::verify(&secret, &signature, &file)?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
