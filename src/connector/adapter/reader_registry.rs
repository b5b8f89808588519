use std::collections::HashMap;
use std::sync::Arc;

use super::{JsonReader, MarkdownReader, TextFileReader};
use crate::application::FileReader;

/// Built-in extension to reader mapping.
pub fn default_file_ext_to_reader() -> HashMap<String, Arc<dyn FileReader>> {
    let mut readers: HashMap<String, Arc<dyn FileReader>> = HashMap::new();
    readers.insert("txt".to_string(), Arc::new(TextFileReader::new()));
    readers.insert("md".to_string(), Arc::new(MarkdownReader::new()));
    readers.insert("json".to_string(), Arc::new(JsonReader::new()));
    readers
}
