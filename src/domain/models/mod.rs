mod metadata_filter;
mod node;
mod node_metadata;
mod vector_store_query;

pub use metadata_filter::*;
pub use node::*;
pub use node_metadata::*;
pub use vector_store_query::*;
