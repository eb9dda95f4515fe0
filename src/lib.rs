//! Finsearch - multi-modal search over SEC filing chunks
//!
//! Ranks chunks of 10-K filings by BM25 keyword relevance, by embedding
//! similarity, or by a weighted fusion of both, with optional filtering by
//! ticker or CIK.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod identity;
pub mod search;
pub mod storage;

pub use error::{FinsearchError, Result};
