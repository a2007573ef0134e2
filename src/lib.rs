//! Retrieval-augmented medical question answering over a folder of PDFs.
//!
//! `store-index` builds the vector store offline; the `medical-chatbot`
//! server answers questions against it over HTTP.

pub mod answer;
pub mod core;
pub mod embedding;
pub mod ingest;
pub mod llm;
pub mod query;
pub mod rag;
pub mod server;
pub mod state;
