//! devcamper-seed - load or wipe the sample data set.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};

use devcamper_api::app::services::{geocoder_from_config, open_store};
use devcamper_infra::AppConfig;
use devcamper_infra::seed::{self, SeedData};

/// Import or destroy the DevCamper sample data.
#[derive(Parser, Debug)]
#[command(name = "devcamper-seed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding users.json, bootcamps.json, courses.json and reviews.json
    #[arg(long, default_value = "./data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert every seed document (passwords are hashed on the way in)
    Import,
    /// Remove every user, bootcamp, course and review
    Destroy,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();
    devcamper_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.database_url.is_none() {
        bail!("DATABASE_URL must be set; the in-memory store does not outlive this process");
    }
    let store = open_store(&config).await.context("failed to open the document store")?;

    match cli.command {
        Command::Import => {
            let data = SeedData::load_dir(&cli.data_dir)?;
            let geocoder = geocoder_from_config(&config);
            let report = seed::import(&*store, &*geocoder, data, Utc::now()).await?;
            println!(
                "Data imported: {} users, {} bootcamps, {} courses, {} reviews",
                report.users, report.bootcamps, report.courses, report.reviews
            );
        }
        Command::Destroy => {
            let report = seed::destroy(&*store).await?;
            println!(
                "Data destroyed: {} users, {} bootcamps, {} courses, {} reviews",
                report.users, report.bootcamps, report.courses, report.reviews
            );
        }
    }
    Ok(())
}
