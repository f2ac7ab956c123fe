//! Harvest module - staged configuration snapshot pipeline.
//!
//! This module provides the core abstractions for the console harvester:
//! - **Traits**: [`HarvestStage`], [`ConfigExtractor`] for building modular pipelines
//! - **Discovery**: projects and their categorized resources
//! - **Extractors**: per-category configuration readers
//! - **Records**: typed configs and the three-level [`ExtractionOutcome`]
//! - **Pipeline**: async orchestrator via [`pipeline::HarvestPipeline`]

pub mod discover;
pub mod extractors;
pub mod pipeline;
pub mod record;
pub mod summary;
pub mod traits;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used types
pub use traits::{ConfigExtractor, DiscoveryError, ExtractionError, HarvestStage};

pub use discover::{ProjectDiscoverer, ResourceDiscoverer};
pub use extractors::{default_extractors, ApplicationExtractor, DatabaseExtractor, ServiceExtractor};
pub use pipeline::{HarvestPipeline, HarvestResult, HarvestStats, PipelineError, PipelineStage};
pub use record::{
    ApplicationConfig, DatabaseConfig, ExtractionOutcome, Linkage, ResourceConfig, ServiceConfig,
};
pub use summary::{render_report, SnapshotBuilder};
