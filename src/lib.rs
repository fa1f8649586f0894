//! Semantic retrieval service: query text → embedding → similarity search →
//! context string plus source list, served over HTTP for a downstream
//! generation step.

pub mod core;
pub mod embedding;
pub mod index;
pub mod retrieval;
pub mod server;
pub mod state;
pub mod vector_math;
