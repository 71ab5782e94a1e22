//! Recursive filesystem scanner and analyzer.
//!
//! [`Walker`](crate::core::walker::Walker) yields classified, filtered records lazily;
//! [`Scanner`](crate::core::scanner::Scanner) runs a whole scan on a bounded worker pool
//! and folds everything into a [`models::ScanReport`].
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod models;

pub use error::ScanError;
