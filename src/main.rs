//! localturk - HTTP Server Entry Point
//!
//! Serves tasks from a CSV file through an HTML template, or with
//! `--write-template` prints a starter template for a tasks file.

use clap::Parser;
use localturk::{api, config::Cli, render, store::CsvStore, Config, TabularStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "localturk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if cli.write_template {
        // The only positional is the tasks file in this mode.
        let columns = CsvStore::new().read_headers(&cli.template).await?;
        print!("{}", render::sample_template(&columns));
        return Ok(());
    }

    let config = Config::from_cli(cli)?;
    info!(
        "Loaded configuration: tasks={} outputs={} template={} static={}",
        config.tasks.display(),
        config.outputs.display(),
        config.template.display(),
        config.static_dir.display()
    );

    api::serve(config).await?;

    Ok(())
}
