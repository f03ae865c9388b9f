use super::FileRecord;
use crate::common::*;

/// The source of training records.
pub trait TrainingSource
where
    Self: Debug + Sync + Send,
{
    /// The list of class names of the dataset.
    fn classes(&self) -> &IndexSet<String>;

    /// Get the list of records in the dataset.
    fn records(&self) -> &[Arc<FileRecord>];

    /// The directory that record paths are relative to.
    fn image_root(&self) -> &Path;
}

/// Read a classes file with one class name per line.
pub async fn load_classes_file<P>(path: P) -> Result<IndexSet<String>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read classes file '{}'", path.display()))?;
    parse_classes(&content)
        .with_context(|| format!("invalid classes file '{}'", path.display()))
}

pub(crate) fn parse_classes(content: &str) -> Result<IndexSet<String>> {
    let lines: Vec<_> = content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();
    let classes: IndexSet<_> = lines.iter().map(|line| line.to_string()).collect();

    ensure!(
        classes.len() == lines.len(),
        "duplicated class names are not allowed"
    );
    ensure!(!classes.is_empty(), "no classes found");
    ensure!(
        !classes.contains(label::BACKGROUND),
        "the class name '{}' is reserved for background",
        label::BACKGROUND
    );

    Ok(classes)
}

/// Check a class name against the class list and the optional whitelist.
pub(crate) fn accept_class(
    name: &str,
    classes: &IndexSet<String>,
    whitelist: Option<&HashSet<String>>,
) -> bool {
    classes.contains(name) && whitelist.map_or(true, |whitelist| whitelist.contains(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_classes_file() {
        let classes = parse_classes("cat\n\n dog \nbird\n").unwrap();
        assert_eq!(
            classes.into_iter().collect::<Vec<_>>(),
            vec!["cat", "dog", "bird"]
        );
    }

    #[test]
    fn reserved_and_duplicated_classes_are_rejected() {
        assert!(parse_classes("cat\n0\n").is_err());
        assert!(parse_classes("cat\ncat\n").is_err());
        assert!(parse_classes("\n\n").is_err());
    }

    #[test]
    fn whitelist_filters_classes() {
        let classes = parse_classes("cat\ndog\n").unwrap();
        let whitelist: HashSet<_> = ["dog".to_string()].into_iter().collect();
        assert!(accept_class("cat", &classes, None));
        assert!(!accept_class("cat", &classes, Some(&whitelist)));
        assert!(accept_class("dog", &classes, Some(&whitelist)));
        assert!(!accept_class("bird", &classes, None));
    }
}
