use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Read every file of a directory into documents and print them
    Read {
        directory: PathBuf,

        /// Log and skip files whose reader fails instead of aborting
        #[arg(long)]
        skip_errors: bool,
    },

    /// Create a vector collection
    CreateCollection {
        name: String,

        #[arg(short, long)]
        dimension: usize,

        /// cosine, euclidean or dot_product
        #[arg(short, long, default_value = "cosine")]
        metric: String,
    },

    /// Add nodes (with embeddings) from a JSON array file
    Add {
        collection: String,

        nodes: PathBuf,
    },

    /// Delete the record with the given id
    Delete {
        collection: String,

        id: String,
    },

    /// Similarity query
    Query {
        collection: String,

        /// Query embedding as a JSON array, e.g. "[0.1, 0.2]"
        #[arg(short, long)]
        embedding: Option<String>,

        #[arg(short = 'k', long, default_value = "2")]
        top_k: usize,

        /// Metadata filters as JSON, e.g. '{"filters": [{"key": "a", "operator": "==", "value": 1}]}'
        #[arg(short, long)]
        filters: Option<String>,
    },
}
