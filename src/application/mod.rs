//! # Application Layer
//!
//! Reader and vector store interfaces, and the directory ingestion use case.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
