//! Stresstester for the customer/event document search service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use argh::FromArgs;
use tracing::info;

use search_stresstest::config::Config;
use search_stresstest::http::SearchRemote;
use search_stresstest::samples::{SampleTable, Variant};
use search_stresstest::{health, observability, stresstest};

/// Stresstester for the customer/event search service
#[derive(Debug, FromArgs)]
pub struct Args {
    /// path to the yaml configuration file
    #[argh(option, short = 'c')]
    pub config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let config_file = std::fs::File::open(&args.config).context("failed to open config file")?;
    let config: Config =
        serde_yaml::from_reader(config_file).context("failed to parse config YAML")?;

    observability::init_tracing();

    let remote = SearchRemote::new(&config.remote)?;
    let customers = Arc::new(SampleTable::load(Variant::Customer, &config.customer_csv)?);
    let events = Arc::new(SampleTable::load(Variant::Event, &config.event_csv)?);
    info!(
        customers = customers.len(),
        events = events.len(),
        "sample corpora loaded"
    );

    health::probe(&remote).await;

    stresstest::run(remote, customers, events, &config).await
}
