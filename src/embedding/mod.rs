//! Query embedding and stored-vector support
//!
//! - `EmbeddingProvider` trait for abstraction over embedding backends
//! - `OpenAiProvider` for OpenAI-compatible embedding endpoints
//! - Vector blob encoding plus the `vec_distance_cosine` SQL function
mod provider;
mod vector;

pub use provider::{EmbeddingError, EmbeddingProvider, OpenAiProvider};
pub use vector::{
    cosine_distance, decode_vector, encode_vector, register_distance_function, DISTANCE_FUNCTION,
};
