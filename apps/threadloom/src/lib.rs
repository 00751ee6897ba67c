//! # threadloom
//!
//! Application layer around `threadloom-core`: configuration, the ingestion
//! pipeline, the CLI and the read-only HTTP API.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                 apps/threadloom (THE BINARY)              │
//! │                                                           │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────┐  │
//! │  │    CLI      │    │  HTTP API   │    │  Ingestion   │  │
//! │  │   (clap)    │    │   (axum)    │    │ (tokio pool) │  │
//! │  └──────┬──────┘    └──────┬──────┘    └──────┬───────┘  │
//! │         └──────────────────┼──────────────────┘          │
//! │                            ▼                             │
//! │                   ┌─────────────────┐                    │
//! │                   │ threadloom-core │                    │
//! │                   └─────────────────┘                    │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;

pub use config::Config;
pub use error::AppError;
