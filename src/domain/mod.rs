//! # Domain Layer
//!
//! Nodes, metadata filters and query types shared by readers and vector
//! stores. Independent of any remote database or file format.

mod error;
pub mod models;

pub use error::*;
pub use models::*;
