//! Overwrite every warehouse table from its CSV, in mapping order. The run
//! aborts before the first load if any expected file is missing.

use anyhow::Result;
use clap::Parser;
use olistloader::{config::AppConfig, fetch, olist, warehouse};
use reqwest::Client;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
struct Args {
    /// Directory datasets are downloaded and cached under
    #[arg(long, default_value = "cache")]
    cache_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    let client = Client::new();
    let dataset_dir =
        fetch::resolve_dataset(&client, &config.hub, olist::DATASET_SLUG, &args.cache_dir)
            .await?;

    let wh = warehouse::Warehouse::connect(&config.warehouse).await?;
    let outcomes = warehouse::load_mapping(
        &wh,
        &dataset_dir,
        olist::BQ_DATASET_ID,
        olist::TABLE_MAPPING,
    )
    .await?;

    let rows: usize = outcomes.iter().map(|o| o.rows).sum();
    info!(
        project = wh.project_id(),
        dataset = olist::BQ_DATASET_ID,
        tables = outcomes.len(),
        rows,
        "all tables refreshed"
    );
    Ok(())
}
