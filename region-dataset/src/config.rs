//! Program configuration format.

use crate::common::*;

pub use dataset::*;
pub use feature::*;
pub use labeling::*;
pub use proposal::*;

/// The main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub proposal: ProposalConfig,
    #[serde(default)]
    pub labeling: LabelingConfig,
    #[serde(default)]
    pub balance: BalanceConfig,
    #[serde(default)]
    pub feature: FeatureConfig,
    /// The maximum number of parallel workers. Defaults to the number of CPUs.
    #[serde(default)]
    pub max_workers: Option<NonZeroUsize>,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

mod dataset {
    use super::*;

    /// Dataset options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatasetConfig {
        /// Optional list of whitelisted classes.
        #[serde(default)]
        pub class_whitelist: Option<HashSet<String>>,
        /// The dataset configuration.
        pub kind: DatasetKind,
    }

    /// Variants of dataset and options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "type")]
    pub enum DatasetKind {
        /// PASCAL VOC dataset options.
        Voc {
            classes_file: PathBuf,
            dataset_dir: PathBuf,
        },
        /// CSV dataset options.
        Csv {
            image_dir: PathBuf,
            label_file: PathBuf,
            classes_file: PathBuf,
        },
    }
}

/// Locations of the cached region dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// The dataset file to load if it exists.
    #[serde(default = "default_dataset_path")]
    pub load_path: PathBuf,
    /// The dataset file written after every build.
    #[serde(default = "default_dataset_path")]
    pub save_path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            load_path: default_dataset_path(),
            save_path: default_dataset_path(),
        }
    }
}

mod proposal {
    use super::*;

    /// Selective search options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ProposalConfig {
        /// Felzenszwalb segmentation scale. Higher means larger segments.
        pub scale: R64,
        /// Gaussian smoothing applied before segmentation.
        pub sigma: R64,
        /// The minimum segment size in pixels.
        pub min_size: usize,
        /// Regions smaller than this ratio of the image area are dropped.
        pub min_area_ratio: R64,
        /// Regions at least this ratio of the image area are dropped.
        pub max_area_ratio: R64,
    }

    impl Default for ProposalConfig {
        fn default() -> Self {
            Self {
                scale: r64(200.0),
                sigma: r64(0.8),
                min_size: 20,
                min_area_ratio: r64(0.001),
                max_area_ratio: r64(1.0),
            }
        }
    }
}

mod labeling {
    use super::*;

    /// IoU thresholds used to label candidates.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct LabelingConfig {
        /// Candidates with best IoU above this are positives.
        pub positive_iou: R64,
        /// Candidates with best IoU at or below this are background.
        pub negative_iou: R64,
        pub iou_epsilon: R64,
    }

    impl Default for LabelingConfig {
        fn default() -> Self {
            Self {
                positive_iou: r64(0.7),
                negative_iou: r64(0.3),
                iou_epsilon: r64(DEFAULT_IOU_EPSILON),
            }
        }
    }
}

/// Undersampling options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub seed: u64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

mod feature {
    use super::*;

    /// Local Binary Pattern feature options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct FeatureConfig {
        /// The number of circularly symmetric neighbour points.
        pub points: usize,
        /// The radius of the circle.
        pub radius: R64,
        /// The number of histogram bins.
        pub bins: usize,
        pub failure_policy: FailurePolicy,
    }

    impl Default for FeatureConfig {
        fn default() -> Self {
            Self {
                points: 16,
                radius: r64(3.0),
                bins: 16,
                failure_policy: FailurePolicy::Skip,
            }
        }
    }

    /// What to do when the features of a region cannot be extracted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum FailurePolicy {
        /// Log the region and continue.
        Skip,
        /// Stop with an error.
        Abort,
    }
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("dataset.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let text = r#"{
            // only the dataset section is mandatory
            dataset: {
                kind: {
                    type: "Csv",
                    image_dir: "images",
                    label_file: "labels.csv",
                    classes_file: "classes.txt",
                },
            },
        }"#;
        let config: Config = json5::from_str(text).unwrap();

        assert_eq!(config.cache.load_path, Path::new("dataset.json"));
        assert_eq!(config.cache.save_path, Path::new("dataset.json"));
        assert_eq!(config.labeling.positive_iou, 0.7);
        assert_eq!(config.labeling.negative_iou, 0.3);
        assert_eq!(config.proposal.min_size, 20);
        assert_eq!(config.feature.points, 16);
        assert_eq!(config.feature.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.balance.seed, 42);
        assert!(config.max_workers.is_none());
    }

    #[test]
    fn parse_voc_config() {
        let text = r#"{
            dataset: {
                class_whitelist: ["cat"],
                kind: { type: "Voc", dataset_dir: "VOC2012", classes_file: "voc.txt" },
            },
            cache: { load_path: "cache.json", save_path: "cache.json" },
            feature: { failure_policy: "Abort" },
            max_workers: 4,
        }"#;
        let config: Config = json5::from_str(text).unwrap();

        assert!(matches!(config.dataset.kind, DatasetKind::Voc { .. }));
        assert_eq!(config.feature.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.feature.bins, 16);
        assert_eq!(config.max_workers.map(NonZeroUsize::get), Some(4));
    }
}
