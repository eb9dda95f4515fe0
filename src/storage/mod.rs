//! Storage layer for finsearch
//!
//! Read-only access to the filing corpus

pub mod database;

pub use database::{Database, DbPool, DbStats};
