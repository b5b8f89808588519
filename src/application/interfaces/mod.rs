mod file_reader;
mod vector_store;

pub use file_reader::*;
pub use vector_store::*;
