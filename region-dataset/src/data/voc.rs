use super::*;
use crate::common::*;

/// The PASCAL VOC dataset.
///
/// Annotations are read from `Annotations/*.xml` and images from `JPEGImages`.
#[derive(Debug, Clone)]
pub struct VocDataset {
    pub classes: IndexSet<String>,
    pub image_dir: PathBuf,
    pub records: Vec<Arc<FileRecord>>,
}

impl TrainingSource for VocDataset {
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

impl VocDataset {
    pub async fn load(
        dataset_dir: impl AsRef<Path>,
        classes_file: impl AsRef<Path>,
        class_whitelist: Option<HashSet<String>>,
    ) -> Result<Self> {
        let dataset_dir = dataset_dir.as_ref().to_owned();
        let image_dir = dataset_dir.join("JPEGImages");

        // load classes file
        let classes = load_classes_file(classes_file).await?;

        // list annotation files
        let xml_files = {
            let pattern = format!("{}/Annotations/*.xml", dataset_dir.display());
            tokio::task::spawn_blocking(move || -> Result<_> {
                let mut xml_files: Vec<_> = glob::glob(&pattern)?.try_collect()?;
                xml_files.sort();
                Ok(xml_files)
            })
            .await??
        };

        // parse annotation files
        let annotations: Vec<_> = stream::iter(xml_files)
            .par_then(None, |annotation_file| async move {
                let xml_content = tokio::fs::read_to_string(&annotation_file)
                    .await
                    .with_context(|| {
                        format!(
                            "failed to read annotation file '{}'",
                            annotation_file.display()
                        )
                    })?;
                let annotation: VocAnnotation = serde_xml_rs::from_str(&xml_content)
                    .with_context(|| {
                        format!(
                            "failed to parse annotation file '{}'",
                            annotation_file.display()
                        )
                    })?;
                Fallible::Ok(annotation)
            })
            .try_collect()
            .await?;

        // build records
        let records: Vec<_> = annotations
            .into_iter()
            .map(|annotation| -> Result<_> {
                let VocAnnotation { filename, object } = annotation;
                let bboxes: Vec<_> = object
                    .into_iter()
                    .filter(|obj| accept_class(&obj.name, &classes, class_whitelist.as_ref()))
                    .map(|obj| -> Result<_> {
                        let VocBndBox {
                            xmin,
                            ymin,
                            xmax,
                            ymax,
                        } = obj.bndbox;
                        let xyxy = [xmin, ymin, xmax, ymax].map(|value| value.round() as i32);
                        let label = Label::try_from_xyxy(xyxy, Class::new(obj.name))
                            .with_context(|| format!("invalid box in annotation of '{}'", filename))?;
                        Ok(label)
                    })
                    .try_collect()?;

                Ok(Arc::new(FileRecord {
                    path: PathBuf::from(filename),
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

#[derive(Debug, Clone, Deserialize)]
struct VocAnnotation {
    filename: String,
    #[serde(default)]
    object: Vec<VocObject>,
}

#[derive(Debug, Clone, Deserialize)]
struct VocObject {
    name: String,
    bndbox: VocBndBox,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct VocBndBox {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANNOTATION: &str = r#"<annotation>
        <folder>VOC2012</folder>
        <filename>2007_000027.jpg</filename>
        <size><width>486</width><height>500</height><depth>3</depth></size>
        <object>
            <name>person</name>
            <pose>Unspecified</pose>
            <truncated>0</truncated>
            <difficult>0</difficult>
            <bndbox><xmin>174</xmin><ymin>101</ymin><xmax>349</xmax><ymax>351</ymax></bndbox>
        </object>
        <object>
            <name>dog</name>
            <bndbox><xmin>10.6</xmin><ymin>20</ymin><xmax>30</xmax><ymax>40</ymax></bndbox>
        </object>
    </annotation>"#;

    #[test]
    fn parse_annotation() {
        let annotation: VocAnnotation = serde_xml_rs::from_str(ANNOTATION).unwrap();
        assert_eq!(annotation.filename, "2007_000027.jpg");
        assert_eq!(annotation.object.len(), 2);
        assert_eq!(annotation.object[0].name, "person");
        assert_eq!(annotation.object[1].bndbox.xmin, 10.6);
    }

    #[tokio::test]
    async fn voc_dataset_test() {
        let dir = tempfile::tempdir().unwrap();
        let annotation_dir = dir.path().join("Annotations");
        fs::create_dir_all(&annotation_dir).unwrap();
        fs::write(annotation_dir.join("2007_000027.xml"), ANNOTATION).unwrap();
        let classes_file = dir.path().join("classes.txt");
        fs::write(&classes_file, "person\ndog\n").unwrap();

        let whitelist: HashSet<_> = ["dog".to_string()].into_iter().collect();
        let dataset = VocDataset::load(dir.path(), &classes_file, Some(whitelist))
            .await
            .unwrap();

        assert_eq!(dataset.image_root(), dir.path().join("JPEGImages"));
        assert_eq!(dataset.records.len(), 1);
        let record = &dataset.records[0];
        assert_eq!(record.path, Path::new("2007_000027.jpg"));
        assert_eq!(record.bboxes.len(), 1);
        assert_eq!(record.bboxes[0].class, Class::new("dog"));
        assert_eq!(record.bboxes[0].rect.xyxy(), [11, 20, 30, 40]);
    }
}
