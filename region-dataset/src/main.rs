use anyhow::{Context, Result};
use clap::Parser;
use prettytable::{cell, row, Table};
use region_dataset::{config::Config, PathOverrides};
use std::{env, path::PathBuf, sync::Arc};
use tracing::{info, trace_span, Instrument};
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
/// Build region proposal training pairs
struct Args {
    #[clap(long, default_value = "region-dataset.json5")]
    /// configuration file
    pub config: PathBuf,
    #[clap(long)]
    /// load the cached dataset from this path
    pub load: Option<PathBuf>,
    #[clap(long)]
    /// save the built dataset to this path
    pub save: Option<PathBuf>,
}

#[tokio::main]
pub async fn main() -> Result<()> {
    // setup tracing
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    // parse arguments
    let Args { config, load, save } = Args::parse();
    let config = Arc::new(
        Config::open(&config)
            .with_context(|| format!("failed to load config file '{}'", config.display()))?,
    );
    let overrides = PathOverrides {
        load_path: load,
        save_path: save,
    };

    let pairs = region_dataset::start(config, overrides)
        .instrument(trace_span!("region_dataset"))
        .await?;

    // print the class histogram
    {
        let mut table = Table::new();
        table.add_row(row!["class", "samples"]);
        pairs.class_counts().into_iter().for_each(|(class, count)| {
            table.add_row(row![class, count]);
        });
        table.printstd();
    }

    info!(
        "{} pairs with {} features each, {} failed regions",
        pairs.len(),
        pairs.features.first().map_or(0, |feature| feature.len()),
        pairs.failures.len()
    );

    Ok(())
}
