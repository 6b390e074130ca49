//! reelforge - backend API for an AI short-video generator.
//!
//! A small HTTP service that forwards user prompts to third-party AI and
//! media services and relays normalized results back to the caller.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelforge::api::run_server;
use reelforge::config::Config;

#[derive(Parser)]
#[command(name = "reelforge")]
#[command(about = "Backend API for an AI short-video generator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration file
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reelforge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            tracing::info!(config = %config, "Loading configuration");

            let (mut config, key_sources) = Config::from_file_with_env(&config)?;
            for (slot, source) in &key_sources {
                tracing::info!(slot = %slot, source = %source, "Resolved secret");
            }

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }

            run_server(config).await
        }

        Commands::Check { config } => {
            tracing::info!(config = %config, "Checking configuration");

            let (config, key_sources) = Config::from_file_with_env(&config)?;

            println!("Configuration OK");
            println!("  listen:        {}", config.server.listen);
            println!("  image backend: {}", config.image.url);
            println!(
                "  chat backend:  {} (model {})",
                config.chat.url, config.chat.model
            );
            println!("  media host:    {}", config.media.cloud_name);
            for (slot, source) in &key_sources {
                println!("  {} secret: {}", slot, source);
            }

            Ok(())
        }
    }
}
