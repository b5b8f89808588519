mod astra_collection;
mod astra_data_api_client;
mod astra_filter;
mod astra_vector_store;
mod data_api;
mod in_memory_data_api;
mod json_reader;
mod markdown_reader;
mod reader_registry;
mod text_file_reader;
mod zip_reader;

pub use astra_collection::*;
pub use astra_data_api_client::*;
pub use astra_filter::*;
pub use astra_vector_store::*;
pub use data_api::*;
pub use in_memory_data_api::*;
pub use json_reader::*;
pub use markdown_reader::*;
pub use reader_registry::*;
pub use text_file_reader::*;
pub use zip_reader::*;
