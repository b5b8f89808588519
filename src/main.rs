use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use astraindex::cli::Commands;
use astraindex::{
    default_file_ext_to_reader, AstraVectorStore, AstraVectorStoreConfig,
    CreateCollectionOptions, LoadDirectoryOptions, MetadataFilters, Node, ReaderErrorPolicy,
    SimilarityMetric, SimpleDirectoryReader, TextFileReader, VectorStore, VectorStoreQuery,
    ZipReader,
};

#[derive(Parser)]
#[command(name = "astraindex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Record field holding the node id
    #[arg(long, global = true, default_value = "_id")]
    id_key: String,

    /// Record field holding the node text
    #[arg(long, global = true, default_value = "content")]
    content_key: String,

    /// Allow nested objects and arrays in node metadata
    #[arg(long, global = true)]
    nested_metadata: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AstraVectorStoreConfig {
        id_key: cli.id_key.clone(),
        content_key: cli.content_key.clone(),
        flat_metadata: !cli.nested_metadata,
    };

    match cli.command {
        Commands::Read {
            directory,
            skip_errors,
        } => {
            let policy = if skip_errors {
                ReaderErrorPolicy::Skip
            } else {
                ReaderErrorPolicy::Abort
            };
            let options = LoadDirectoryOptions::new(directory)
                .with_default_reader(Arc::new(TextFileReader::new()))
                .with_readers(default_file_ext_to_reader())
                .with_reader("zip", Arc::new(ZipReader::new()))
                .with_error_policy(policy);

            let documents = SimpleDirectoryReader::new().load_data(&options).await?;
            for doc in documents {
                println!("document ({}): {}", doc.id(), doc.text());
            }
        }

        Commands::CreateCollection {
            name,
            dimension,
            metric,
        } => {
            let metric = SimilarityMetric::parse(&metric)
                .ok_or_else(|| anyhow!("Unknown similarity metric: {}", metric))?;
            let store = AstraVectorStore::from_env(config)?;
            store
                .create_and_connect(&name, &CreateCollectionOptions::vector(dimension, metric))
                .await?;
            info!("Created collection {} ({} dimensions, {})", name, dimension, metric);
        }

        Commands::Add {
            collection,
            nodes: path,
        } => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let nodes: Vec<Node> = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid node file {}", path.display()))?;

            let store = AstraVectorStore::from_env(config)?;
            store.connect(&collection).await?;
            let ids = store.add(&nodes).await?;

            println!("Added {} nodes to {}", ids.len(), collection);
            for id in ids {
                println!("  {}", id);
            }
        }

        Commands::Delete { collection, id } => {
            let store = AstraVectorStore::from_env(config)?;
            store.connect(&collection).await?;
            store.delete(&id).await?;
            println!("Deleted {} from {}", id, collection);
        }

        Commands::Query {
            collection,
            embedding,
            top_k,
            filters,
        } => {
            let mut query = VectorStoreQuery::new().with_top_k(top_k);
            if let Some(raw) = embedding {
                let embedding: Vec<f32> =
                    serde_json::from_str(&raw).context("Invalid --embedding JSON")?;
                query = query.with_embedding(embedding);
            }
            if let Some(raw) = filters {
                let filters: MetadataFilters =
                    serde_json::from_str(&raw).context("Invalid --filters JSON")?;
                query = query.with_filters(filters);
            }

            let store = AstraVectorStore::from_env(config)?;
            store.connect(&collection).await?;
            let result = store.query(&query).await?;

            if result.is_empty() {
                println!("No results found.");
            } else {
                println!("Found {} results:\n", result.len());
                for (i, ((id, node), similarity)) in result
                    .ids
                    .iter()
                    .zip(result.nodes.iter())
                    .zip(result.similarities.iter())
                    .enumerate()
                {
                    println!("{}. {} (similarity: {:.3})", i + 1, id, similarity);
                    let preview: String = node
                        .text()
                        .lines()
                        .take(10)
                        .map(|l| format!("   | {}", l))
                        .collect::<Vec<_>>()
                        .join("\n");
                    println!("{}", preview);
                    println!();
                }
            }
        }
    }

    Ok(())
}
