use super::*;
use crate::common::*;

/// An in-memory list of records.
#[derive(Debug, Clone)]
pub struct MemorySource {
    pub classes: IndexSet<String>,
    pub image_root: PathBuf,
    pub records: Vec<Arc<FileRecord>>,
}

impl MemorySource {
    /// Build a source from records. The class list is collected from the
    /// ground truth boxes in order of appearance.
    pub fn new(image_root: impl Into<PathBuf>, records: Vec<FileRecord>) -> Self {
        let classes: IndexSet<_> = records
            .iter()
            .flat_map(|record| &record.bboxes)
            .filter(|label| !label.class.is_background())
            .map(|label| label.class.to_string())
            .collect();
        let records = records.into_iter().map(Arc::new).collect();

        Self {
            classes,
            image_root: image_root.into(),
            records,
        }
    }
}

impl TrainingSource for MemorySource {
    fn classes(&self) -> &IndexSet<String> {
        &self.classes
    }

    fn records(&self) -> &[Arc<FileRecord>] {
        &self.records
    }

    fn image_root(&self) -> &Path {
        &self.image_root
    }
}
