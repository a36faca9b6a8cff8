use clap::Parser;

use callgrade::cli::{Cli, Commands};
use callgrade::commands;
use callgrade::config::Config;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("callgrade=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Records {
        search: None,
        asc: false,
    }) {
        Commands::Upload { files } => commands::upload_files(&config, &files),
        Commands::Records { search, asc } => {
            commands::show_records(&config, search.as_deref(), asc)
        }
        Commands::Show { name } => commands::show_dispatcher(&config, &name),
        Commands::Play {
            audio,
            transcript,
            id,
        } => commands::play_call(&config, &audio, transcript.as_deref(), id.as_deref()),
        Commands::Status => commands::show_status(&config),
    }
}
