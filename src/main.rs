use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ecomguard::app::AppContext;
use ecomguard::cli::{commands, Cli, Commands, SettingsAction};
use ecomguard::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // classify needs neither config nor storage
    if let Commands::Classify { path } = &cli.command {
        commands::classify(path)?;
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Scan {
            url,
            file,
            out,
            chrome,
            open,
        } => {
            commands::scan(&ctx, &url, file.as_deref(), out.as_deref(), chrome, open).await?;
        }
        Commands::Watch { url, chrome, out } => {
            commands::watch(&ctx, &url, chrome, out.as_deref()).await?;
        }
        Commands::Classify { .. } => {}
        Commands::Stats { reset } => {
            commands::stats(&ctx, reset)?;
        }
        Commands::History { limit } => {
            commands::history(&ctx, limit)?;
        }
        Commands::Settings { action } => match action {
            SettingsAction::Show => commands::show_settings(&ctx)?,
            SettingsAction::Set { key, value } => commands::set_setting(&ctx, &key, &value)?,
            SettingsAction::Reset => commands::reset_settings(&ctx)?,
        },
    }

    ctx.shutdown().await;
    Ok(())
}
