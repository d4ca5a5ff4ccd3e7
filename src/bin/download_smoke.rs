//! Smoke-test the dataset download: resolve the Olist dataset from the hub,
//! check every expected CSV landed, and sanity-check the orders file.

use anyhow::Result;
use clap::Parser;
use olistloader::{config::HubConfig, fetch, frame::CsvFrame, olist, validate};
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

    // credentials first, so a misconfigured run dies before any network call
    let hub = HubConfig::from_env()?;

    let client = Client::new();
    let dataset_dir =
        fetch::resolve_dataset(&client, &hub, olist::DATASET_SLUG, &args.cache_dir).await?;
    info!(path = %dataset_dir.display(), "resolved dataset");

    validate::ensure_files_present(&dataset_dir, olist::EXPECTED_FILES)?;
    info!(files = olist::EXPECTED_FILES.len(), "all expected csv files exist");

    let orders = CsvFrame::read_csv(&dataset_dir.join(olist::ORDERS_FILE))?;
    info!(
        rows = orders.num_rows(),
        columns = ?orders.column_names(),
        "orders file loaded"
    );

    validate::check_frame_shape(&orders, olist::MIN_ORDER_ROWS, olist::ORDERS_KEY_COLUMN)?;
    let unique = orders.distinct_count(olist::ORDERS_KEY_COLUMN)?;
    info!(unique_order_ids = unique, "key column present");

    info!("smoke test passed");
    Ok(())
}
