//! Data sources of training images and ground truth boxes.

mod csv;
mod decode;
mod memory;
mod record;
mod source;
mod voc;

pub use self::csv::*;
pub use decode::*;
pub use memory::*;
pub use record::*;
pub use source::*;
pub use voc::*;

use crate::{
    common::*,
    config::{DatasetConfig, DatasetKind},
};

/// Load the data source described by the configuration.
pub async fn load_source(config: &DatasetConfig) -> Result<Arc<dyn TrainingSource>> {
    let DatasetConfig {
        class_whitelist,
        kind,
    } = config;

    let source: Arc<dyn TrainingSource> = match kind {
        DatasetKind::Voc {
            classes_file,
            dataset_dir,
        } => Arc::new(VocDataset::load(dataset_dir, classes_file, class_whitelist.clone()).await?),
        DatasetKind::Csv {
            image_dir,
            label_file,
            classes_file,
        } => Arc::new(
            CsvDataset::load(image_dir, label_file, classes_file, class_whitelist.clone()).await?,
        ),
    };

    Ok(source)
}
