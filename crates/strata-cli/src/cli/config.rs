use anyhow::Result;
use clap::{Args, Subcommand};
use strata::services::ConfigService;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration (file plus environment overrides)
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key (storage.root, server.bind, server.public_url)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Print the config file location
    Path,
}

pub async fn execute(args: ConfigArgs) -> Result<()> {
    let config_service = ConfigService::from_default_location()?;

    match args.command {
        ConfigCommands::Show => {
            let config = config_service.load()?;
            print!("{}", toml::to_string_pretty(&config)?);
            println!(
                "# effective storage root: {}",
                config_service.resolve_storage_root()?.display()
            );
        },

        ConfigCommands::Get { key } => {
            let value = config_service.get(&key)?;
            println!("{}", value);
        },

        ConfigCommands::Set { key, value } => {
            config_service.set(&key, value.clone())?;
            println!("Set {} = {}", key, value);
        },

        ConfigCommands::Path => {
            println!("{}", config_service.config_path().display());
        },
    }

    Ok(())
}
