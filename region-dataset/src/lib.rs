//! Region proposal training-set builder.
//!
//! The pipeline proposes candidate regions per image with selective search,
//! labels them against ground truth boxes by IoU, undersamples the
//! background class and extracts Local Binary Pattern histograms, yielding
//! `(feature, class, delta)` triples for classifier training.

pub mod balance;
pub mod common;
pub mod config;
pub mod data;
pub mod dataset;
pub mod feature;
pub mod labeler;
pub mod lbp;
pub mod pairs;
pub mod proposal;

use crate::{
    common::*,
    config::Config,
    dataset::RegionDataset,
    pairs::{FeatureTargetPairs, PairGenerator},
    proposal::SelectiveSearch,
};

/// Optional overrides of the cached dataset paths.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub load_path: Option<PathBuf>,
    pub save_path: Option<PathBuf>,
}

/// The entry of the dataset program.
///
/// It builds or loads the region dataset and generates the training pairs.
pub async fn start(config: Arc<Config>, overrides: PathOverrides) -> Result<FeatureTargetPairs> {
    let PathOverrides {
        load_path,
        save_path,
    } = overrides;
    let load_path = load_path.unwrap_or_else(|| config.cache.load_path.clone());
    let save_path = save_path.unwrap_or_else(|| config.cache.save_path.clone());

    // load data source
    info!("loading data source");
    let source = data::load_source(&config.dataset).await?;
    info!(
        "found {} images and {} classes",
        source.records().len(),
        source.classes().len()
    );

    // build or load dataset
    let proposer = Arc::new(SelectiveSearch::new(config.proposal.clone()));
    let labeler = Arc::new(labeler::RegionLabeler::from_config(&config.labeling)?);
    let dataset = RegionDataset::prepare(
        source.clone(),
        proposer,
        labeler,
        &load_path,
        &save_path,
        config.max_workers,
    )
    .await?;
    info!(
        "dataset has {} images and {} labeled regions",
        dataset.len(),
        dataset.num_regions()
    );

    // generate pairs
    let generator = PairGenerator::from_config(&config, source.image_root())?;
    let pairs = generator.generate(&dataset).await?;

    Ok(pairs)
}
