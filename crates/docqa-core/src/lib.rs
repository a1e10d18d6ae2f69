//! # docqa core
//!
//! Shared logic for docqa: data models, deterministic text segmentation,
//! lexical relevance ranking, and the error taxonomy.
//!
//! This crate contains no tokio, HTTP, or filesystem dependencies. The
//! networked pieces (request executor, backend orchestrator, HTTP server)
//! live in the `docqa` application crate.

pub mod error;
pub mod models;
pub mod rank;
pub mod segment;
