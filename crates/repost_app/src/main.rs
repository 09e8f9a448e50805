mod cli;
mod commands;
mod logging;
mod settings;

use anyhow::Result;
use clap::Parser;
use engine_logging::engine_info;
use log::LevelFilter;

use crate::cli::{Cli, Command};
use crate::commands::RunOptions;
use crate::settings::AppSettings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    let mut settings = AppSettings::load(cli.config.as_deref())?;
    let overrides = settings.apply_overrides(|name| std::env::var(name).ok())?;

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        logging::parse_level(&settings.log.level)
    };
    logging::initialize(level, settings.log.file.as_deref());
    for name in overrides {
        engine_info!("Setting taken from environment: {name}");
    }

    match cli.command {
        Command::Parse { urls } => commands::parse(&urls),
        Command::Check { title, body, tags } => commands::check(&settings, &title, &body, &tags),
        Command::Run {
            url,
            rewrite,
            regenerate,
            outbox,
            no_finalize,
        } => {
            let options = RunOptions {
                rewrite,
                regenerate,
                outbox,
                finalize: !no_finalize,
                verbose: cli.verbose,
            };
            commands::run(&settings, &url, options).await
        }
        Command::History {
            limit,
            remove,
            clear,
        } => commands::history(&settings, limit, remove.as_deref(), clear),
    }
}
