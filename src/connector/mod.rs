//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Astra DB Data API client and the vector store built on it
//! - In-memory Data API for tests and offline runs
//! - File readers (text, Markdown, JSON, zip placeholder)

pub mod adapter;

pub use adapter::*;
