//! # Ingestion
//!
//! Decodes record stream files on a bounded worker pool and folds the
//! documents into a single registry.
//!
//! - `reader` - file discovery and parallel decoding
//! - `filter` - keyword filter for bulk ingest
//! - `pipeline` - bulk ingest and the four-phase dataset load

pub mod filter;
pub mod pipeline;
pub mod reader;

pub use filter::KeywordFilter;
pub use pipeline::{
    Dataset, LoadReport, Loader, PhaseReport, UserReport, ingest, load_dataset,
};
pub use reader::{DecodedFile, collect_files, decode_files};
