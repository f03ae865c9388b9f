use super::*;
use crate::common::*;

/// The dataset described by a CSV label file.
///
/// Each row has the columns `image,x1,y1,x2,y2,class`. Rows of the same image
/// are grouped in the order the image first appears.
#[derive(Debug, Clone)]
pub struct CsvDataset {
    pub classes: IndexSet<String>,
    pub image_dir: PathBuf,
    pub records: Vec<Arc<FileRecord>>,
}

impl TrainingSource for CsvDataset {
    fn classes(&self) -> &IndexSet<String> {
        &self.classes
    }

    fn records(&self) -> &[Arc<FileRecord>] {
        &self.records
    }

    fn image_root(&self) -> &Path {
        &self.image_dir
    }
}

impl CsvDataset {
    pub async fn load(
        image_dir: impl AsRef<Path>,
        label_file: impl AsRef<Path>,
        classes_file: impl AsRef<Path>,
        class_whitelist: Option<HashSet<String>>,
    ) -> Result<Self> {
        let image_dir = image_dir.as_ref().to_owned();
        let label_file = label_file.as_ref().to_owned();

        // load classes file
        let classes = load_classes_file(classes_file).await?;

        // parse label file
        let samples = {
            let image_dir = image_dir.clone();
            tokio::task::spawn_blocking(move || load_csv_samples(image_dir, label_file)).await??
        };

        // group boxes by image
        let mut groups: IndexMap<PathBuf, Vec<CsvSample>> = IndexMap::new();
        for sample in samples {
            groups.entry(sample.image.clone()).or_default().push(sample);
        }

        let records: Vec<_> = groups
            .into_iter()
            .map(|(image, samples)| -> Result<_> {
                let bboxes: Vec<_> = samples
                    .into_iter()
                    .filter(|sample| {
                        accept_class(&sample.class, &classes, class_whitelist.as_ref())
                    })
                    .map(|sample| -> Result<_> {
                        let CsvSample {
                            x1,
                            y1,
                            x2,
                            y2,
                            class,
                            row,
                            ..
                        } = sample;
                        let label = Label::try_from_xyxy([x1, y1, x2, y2], Class::new(class))
                            .with_context(|| format!("invalid box at row {}", row))?;
                        Ok(label)
                    })
                    .try_collect()?;

                Ok(Arc::new(FileRecord {
                    path: image,
                    bboxes,
                }))
            })
            .try_collect()?;

        Ok(Self {
            classes,
            image_dir,
            records,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
struct CsvRow {
    image: PathBuf,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CsvSample {
    row: usize,
    image: PathBuf,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    class: String,
}

fn load_csv_samples(image_dir: PathBuf, label_file: PathBuf) -> Result<Vec<CsvSample>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(::csv::Trim::All)
        .from_path(&label_file)
        .with_context(|| format!("failed to open label file '{}'", label_file.display()))?;

    let samples: Vec<_> = reader
        .deserialize()
        .map(|result| -> Result<_> {
            let row: CsvRow = result?;
            let image_file = image_dir.join(&row.image);
            ensure!(
                image_file.is_file(),
                "the image file '{}' does not exist",
                image_file.display()
            );
            Ok(row)
        })
        .enumerate()
        .map(|(index, result)| -> Result<_> {
            let CsvRow {
                image,
                x1,
                y1,
                x2,
                y2,
                class,
            } = result?;
            Ok(CsvSample {
                row: index + 1,
                image,
                x1,
                y1,
                x2,
                y2,
                class,
            })
        })
        .try_collect()?;

    Ok(samples)
}
