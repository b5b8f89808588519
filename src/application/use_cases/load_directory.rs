use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::application::FileReader;
use crate::domain::{DomainError, Node};

/// What to do when a reader fails on a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderErrorPolicy {
    /// Stop and return the reader's error.
    #[default]
    Abort,
    /// Log the failure and continue with the next file.
    Skip,
}

pub struct LoadDirectoryOptions {
    directory_path: PathBuf,
    default_reader: Option<Arc<dyn FileReader>>,
    file_ext_to_reader: HashMap<String, Arc<dyn FileReader>>,
    error_policy: ReaderErrorPolicy,
}

impl LoadDirectoryOptions {
    pub fn new(directory_path: impl Into<PathBuf>) -> Self {
        Self {
            directory_path: directory_path.into(),
            default_reader: None,
            file_ext_to_reader: HashMap::new(),
            error_policy: ReaderErrorPolicy::default(),
        }
    }

    pub fn with_default_reader(mut self, reader: Arc<dyn FileReader>) -> Self {
        self.default_reader = Some(reader);
        self
    }

    pub fn with_reader(mut self, extension: &str, reader: Arc<dyn FileReader>) -> Self {
        self.file_ext_to_reader
            .insert(extension.to_lowercase(), reader);
        self
    }

    pub fn with_readers(mut self, readers: HashMap<String, Arc<dyn FileReader>>) -> Self {
        for (extension, reader) in readers {
            self.file_ext_to_reader
                .insert(extension.to_lowercase(), reader);
        }
        self
    }

    pub fn with_error_policy(mut self, policy: ReaderErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn directory_path(&self) -> &Path {
        &self.directory_path
    }

    fn reader_for(&self, path: &Path) -> Option<&Arc<dyn FileReader>> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.file_ext_to_reader.get(&ext.to_lowercase()))
            .or(self.default_reader.as_ref())
    }
}

/// Walks a directory and dispatches every file to the reader registered for
/// its extension.
#[derive(Debug, Default)]
pub struct SimpleDirectoryReader;

impl SimpleDirectoryReader {
    pub fn new() -> Self {
        Self
    }

    pub async fn load_data(&self, options: &LoadDirectoryOptions) -> Result<Vec<Node>, DomainError> {
        let root = options.directory_path().canonicalize().map_err(|e| {
            DomainError::invalid_input(format!(
                "Invalid directory {}: {}",
                options.directory_path().display(),
                e
            ))
        })?;

        if !root.is_dir() {
            return Err(DomainError::invalid_input(format!(
                "Not a directory: {}",
                root.display()
            )));
        }

        // Symlinks are followed; broken links and unreadable entries are logged
        // and left out.
        let files: Vec<PathBuf> = WalkDir::new(&root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();

        debug!("Found {} files in {}", files.len(), root.display());

        let mut documents = Vec::new();

        for path in files {
            let reader = match options.reader_for(&path) {
                Some(reader) => reader,
                None => {
                    debug!("No reader for {}, skipping", path.display());
                    continue;
                }
            };

            match Self::read_file(reader.as_ref(), &path).await {
                Ok(docs) => {
                    debug!("Read {} documents from {}", docs.len(), path.display());
                    documents.extend(docs);
                }
                Err(e) => match options.error_policy {
                    ReaderErrorPolicy::Abort => return Err(e),
                    ReaderErrorPolicy::Skip => {
                        warn!("Failed to read file {}: {}", path.display(), e);
                    }
                },
            }
        }

        info!(
            "Loaded {} documents from {}",
            documents.len(),
            root.display()
        );

        Ok(documents)
    }

    async fn read_file(reader: &dyn FileReader, path: &Path) -> Result<Vec<Node>, DomainError> {
        let content = tokio::fs::read(path).await?;
        let mut documents = reader.load_data_as_content(&content).await?;

        let file_path = path.to_string_lossy().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        for document in &mut documents {
            document
                .metadata
                .insert("file_path".to_string(), Value::String(file_path.clone()));
            document
                .metadata
                .insert("file_name".to_string(), Value::String(file_name.clone()));
        }

        Ok(documents)
    }
}
