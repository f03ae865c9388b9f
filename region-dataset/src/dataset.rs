//! The persisted dataset of labeled candidate regions.

use crate::{
    common::*,
    data::{Delta, FileRecord, PixelBox, TrainingSource},
    labeler::{LabeledImage, RegionLabeler},
    proposal::CandidateProposer,
};

/// Labeled candidates of all images, stored as index-aligned per-image
/// sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionDataset {
    pub image_paths: Vec<PathBuf>,
    #[serde(rename = "gtBboxes")]
    pub gt_bboxes: Vec<Vec<PixelBox>>,
    pub classes: Vec<Vec<Class>>,
    pub deltas: Vec<Vec<Delta>>,
    pub rois: Vec<Vec<PixelBox>>,
    /// The unfiltered IoU matrix of each image, candidates by ground truths.
    pub ious: Vec<Array2<f64>>,
}

/// The labeled candidates of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntry {
    pub image_path: PathBuf,
    pub gt_bboxes: Vec<PixelBox>,
    pub labeled: LabeledImage,
}

/// A borrowed view of one image in the dataset.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    pub image_path: &'a Path,
    pub gt_bboxes: &'a [PixelBox],
    pub classes: &'a [Class],
    pub deltas: &'a [Delta],
    pub rois: &'a [PixelBox],
    pub ious: &'a Array2<f64>,
}

/// The on-disk encoding, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Bincode,
}

impl FileFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Bincode,
        }
    }
}

impl RegionDataset {
    /// Load the dataset at `load_path` if it exists, otherwise build it
    /// from the source and save it to `save_path`.
    pub async fn prepare(
        source: Arc<dyn TrainingSource>,
        proposer: Arc<dyn CandidateProposer>,
        labeler: Arc<RegionLabeler>,
        load_path: &Path,
        save_path: &Path,
        max_workers: Option<NonZeroUsize>,
    ) -> Result<Self> {
        if let Some(dataset) = Self::load(load_path).await? {
            info!(
                "loaded {} images from '{}'",
                dataset.len(),
                load_path.display()
            );
            return Ok(dataset);
        }

        info!(
            "no dataset found at '{}', building from scratch",
            load_path.display()
        );
        let since = Instant::now();
        let dataset = Self::build(source, proposer, labeler, max_workers).await?;
        info!(
            "built {} images in {:.2}s",
            dataset.len(),
            since.elapsed().as_secs_f64()
        );

        dataset.save(save_path).await?;
        info!("saved dataset to '{}'", save_path.display());

        Ok(dataset)
    }

    /// Label the candidates of every image of the source.
    ///
    /// Images are processed in parallel, and the output keeps the record
    /// order of the source. Any failure aborts the build.
    pub async fn build(
        source: Arc<dyn TrainingSource>,
        proposer: Arc<dyn CandidateProposer>,
        labeler: Arc<RegionLabeler>,
        max_workers: Option<NonZeroUsize>,
    ) -> Result<Self> {
        let max_workers = max_workers
            .map(NonZeroUsize::get)
            .unwrap_or_else(num_cpus::get);
        let image_root: Arc<Path> = source.image_root().into();
        let records: Vec<Arc<FileRecord>> = source.records().to_vec();
        let num_records = records.len();

        let entries: Vec<ImageEntry> = stream::iter(records.into_iter().enumerate())
            .par_map(max_workers, move |(index, record)| {
                let image_root = image_root.clone();
                let proposer = proposer.clone();
                let labeler = labeler.clone();

                move || -> Result<_> {
                    let entry = label_record(&record, &image_root, &*proposer, &labeler)
                        .with_context(|| {
                            format!("failed to label image '{}'", record.path.display())
                        })?;
                    debug!(
                        "labeled image {}/{} '{}' with {} regions",
                        index + 1,
                        num_records,
                        record.path.display(),
                        entry.labeled.rois.len()
                    );
                    Ok(entry)
                }
            })
            .try_collect()
            .await?;

        let dataset = entries.into_iter().fold(Self::default(), |mut dataset, entry| {
            dataset.push(entry);
            dataset
        });

        Ok(dataset)
    }

    /// Append the entry of one image.
    pub fn push(&mut self, entry: ImageEntry) {
        let ImageEntry {
            image_path,
            gt_bboxes,
            labeled:
                LabeledImage {
                    rois,
                    classes,
                    deltas,
                    ious,
                },
        } = entry;

        self.image_paths.push(image_path);
        self.gt_bboxes.push(gt_bboxes);
        self.classes.push(classes);
        self.deltas.push(deltas);
        self.rois.push(rois);
        self.ious.push(ious);
    }

    /// The number of images.
    pub fn len(&self) -> usize {
        self.image_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_paths.is_empty()
    }

    /// The total number of kept regions over all images.
    pub fn num_regions(&self) -> usize {
        self.rois.iter().map(|rois| rois.len()).sum()
    }

    pub fn get(&self, index: usize) -> Option<ImageView<'_>> {
        (index < self.len()).then(|| ImageView {
            image_path: &self.image_paths[index],
            gt_bboxes: &self.gt_bboxes[index],
            classes: &self.classes[index],
            deltas: &self.deltas[index],
            rois: &self.rois[index],
            ious: &self.ious[index],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = ImageView<'_>> {
        (0..self.len()).filter_map(move |index| self.get(index))
    }

    /// Check that all per-image sequences are aligned.
    pub fn validate(&self) -> Result<()> {
        let num_images = self.len();
        ensure!(
            [
                self.gt_bboxes.len(),
                self.classes.len(),
                self.deltas.len(),
                self.rois.len(),
                self.ious.len(),
            ]
            .iter()
            .all(|&len| len == num_images),
            "the dataset sequences have different numbers of images"
        );

        for (index, view) in self.iter().enumerate() {
            let num_rois = view.rois.len();
            ensure!(
                view.classes.len() == num_rois && view.deltas.len() == num_rois,
                "the regions, classes and deltas of image {} '{}' are not aligned",
                index,
                view.image_path.display()
            );
            let (num_candidates, num_gt) = view.ious.dim();
            ensure!(
                num_gt == view.gt_bboxes.len() && num_candidates >= num_rois,
                "the IoU matrix of image {} '{}' has invalid shape {:?}",
                index,
                view.image_path.display(),
                view.ious.dim()
            );
        }

        Ok(())
    }

    /// Write the dataset to a file. A `.json` extension selects JSON,
    /// otherwise the binary encoding is used.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let bytes = match FileFormat::from_path(path) {
            FileFormat::Json => serde_json::to_vec(self)?,
            FileFormat::Bincode => bincode::serialize(self)?,
        };

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("failed to write dataset '{}'", path.display()))?;

        Ok(())
    }

    /// Read a dataset file. Returns `None` if the file does not exist.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(Error::from(err)
                    .context(format!("failed to read dataset '{}'", path.display())))
            }
        };

        let dataset: Self = match FileFormat::from_path(path) {
            FileFormat::Json => serde_json::from_slice(&bytes)?,
            FileFormat::Bincode => bincode::deserialize(&bytes)?,
        };
        dataset
            .validate()
            .with_context(|| format!("corrupted dataset '{}'", path.display()))?;

        Ok(Some(dataset))
    }
}

fn label_record(
    record: &FileRecord,
    image_root: &Path,
    proposer: &dyn CandidateProposer,
    labeler: &RegionLabeler,
) -> Result<ImageEntry> {
    let image = record.load(image_root)?;
    let candidates = proposer.propose(&image.image)?;
    let labeled = labeler.label(&image.bboxes, &candidates);
    let gt_bboxes = image.bboxes.iter().map(|label| label.rect).collect();

    Ok(ImageEntry {
        image_path: image.path,
        gt_bboxes,
        labeled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    fn sample_dataset() -> RegionDataset {
        let mut dataset = RegionDataset::default();
        dataset.push(ImageEntry {
            image_path: PathBuf::from("a.png"),
            gt_bboxes: vec![PixelBox::from_xyxy([10, 10, 50, 50])],
            labeled: LabeledImage {
                rois: vec![
                    PixelBox::from_xyxy([10, 10, 50, 50]),
                    PixelBox::from_xyxy([60, 60, 90, 90]),
                ],
                classes: vec![Class::new("cat"), Class::Background],
                deltas: vec![[0; 4], [-50, -50, -40, -40]],
                ious: Array2::from_shape_vec((3, 1), vec![1.0, 0.0, 0.5]).unwrap(),
            },
        });
        dataset
    }

    #[test]
    fn json_has_six_keys() {
        let value = serde_json::to_value(sample_dataset()).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["classes", "deltas", "gtBboxes", "image_paths", "ious", "rois"]
        );
        assert_eq!(value["classes"][0], serde_json::json!(["cat", "0"]));
        assert_eq!(value["rois"][0][1], serde_json::json!([60, 60, 90, 90]));
    }

    #[test]
    fn validate_detects_misaligned_sequences() {
        let mut dataset = sample_dataset();
        assert!(dataset.validate().is_ok());

        dataset.deltas[0].pop();
        assert!(dataset.validate().is_err());

        let mut dataset = sample_dataset();
        dataset.ious.clear();
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn format_by_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.json")), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("a.JSON")), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("a.bin")), FileFormat::Bincode);
        assert_eq!(FileFormat::from_path(Path::new("dataset")), FileFormat::Bincode);
    }

    #[test]
    fn json_keeps_exact_ious() {
        let mut dataset = sample_dataset();
        dataset.ious[0] = Array2::from_shape_vec(
            (3, 1),
            vec![0.9999999902343751, 1.0 / 3.0, 0.1 + 0.2],
        )
        .unwrap();

        let text = serde_json::to_string(&dataset).unwrap();
        let loaded: RegionDataset = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded, dataset);
    }

    #[tokio::test]
    async fn default_cache_file_is_keyed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CacheConfig::default().save_path);
        let dataset = sample_dataset();
        dataset.save(&path).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 6);
        for key in ["image_paths", "gtBboxes", "classes", "deltas", "rois", "ious"] {
            assert!(object.contains_key(key), "missing key {}", key);
        }

        let loaded = RegionDataset::load(&path).await.unwrap().unwrap();
        assert_eq!(loaded, dataset);
    }

    #[tokio::test]
    async fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = RegionDataset::load(&dir.path().join("none.bin")).await.unwrap();
        assert!(loaded.is_none());
    }
}
