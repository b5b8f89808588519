pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use application::{
    FileReader, LoadDirectoryOptions, ReaderErrorPolicy, SimpleDirectoryReader, VectorStore,
};

pub use connector::{
    default_file_ext_to_reader, to_astra_filter, AstraDataApiClient, AstraDbParams,
    AstraVectorStore, AstraVectorStoreConfig, Collection, CreateCollectionOptions, DataApi,
    Database, DeleteOneOptions, FindOptions, InMemoryDataApi, IndexingOptions, JsonReader,
    MarkdownReader, SimilarityMetric, Sort, SortOrder, TextFileReader, ZipReader,
};

pub use domain::{
    DomainError, FilterCondition, FilterOperator, MetadataFilter, MetadataFilters, MetadataMode,
    Node, NodeKind, VectorStoreQuery, VectorStoreQueryResult,
};
