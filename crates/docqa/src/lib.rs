//! # docqa
//!
//! Document question answering: upload a plain-text document, ask
//! natural-language questions, get answers grounded in the document's
//! content from a remote inference backend.
//!
//! The pure pipeline pieces (segmentation, ranking, error taxonomy) live in
//! the `docqa-core` crate; this crate adds everything networked.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────────┐   ┌─────────────┐
//! │  upload  │──▶│ Segmenter │──▶│   Session    │   │  inference  │
//! └──────────┘   └───────────┘   │  (Document)  │   │   backend   │
//!                                └──────┬───────┘   └──────▲──────┘
//!                                       │                  │
//! ┌──────────┐   ┌───────────┐   ┌──────▼───────┐   ┌──────┴──────┐
//! │ question │──▶│  Ranker   │──▶│ Orchestrator │──▶│  Executor   │
//! └──────────┘   └───────────┘   └──────────────┘   └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`executor`] | Single outbound call with deadline and failure classification |
//! | [`orchestrator`] | Health probe, grounding prompt, model fallback chain |
//! | [`session`] | In-memory document session |
//! | [`server`] | HTTP API |

pub mod config;
pub mod executor;
pub mod orchestrator;
pub mod server;
pub mod session;
