//! Stage abstractions and error types for the harvest pipeline.
//!
//! Every stage runs against the shared [`Session`] and turns one input into
//! one output:
//! - project discovery: `() → Vec<Project>`
//! - resource discovery: `Project → ResourceSet`
//! - configuration extraction: `Resource → ResourceConfig`, one
//!   [`ConfigExtractor`] per resource category

use crate::harvest::record::ResourceConfig;
use crate::model::{Resource, ResourceCategory};
use crate::session::{Session, SessionError};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// Stage Traits
// ============================================================================

/// Generic pipeline stage that transforms Input → Output.
///
/// Stages only read from the session; navigation moves its current view but
/// never touches data produced by earlier stages.
#[async_trait]
pub trait HarvestStage: Send + Sync {
    /// Input consumed by this stage
    type Input: Sync + ?Sized;

    /// Output produced by this stage
    type Output: Send;

    /// Error type for stage failures
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs the stage once for `input`.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the stage cannot produce any output for `input`.
    /// Degraded output is still `Ok`.
    async fn execute(
        &self,
        session: &Session,
        input: &Self::Input,
    ) -> Result<Self::Output, Self::Error>;

    /// Human-readable name used in logs and stats.
    fn stage_name(&self) -> &'static str;
}

/// Extracts the configuration of resources listed under one category.
pub trait ConfigExtractor:
    HarvestStage<Input = Resource, Output = ResourceConfig, Error = ExtractionError>
{
    /// Category whose resources this extractor handles.
    fn category(&self) -> ResourceCategory;
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while listing projects or resources.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The listing page could not be loaded
    #[error("Failed to load {page}: {source}")]
    PageLoad {
        page: String,
        #[source]
        source: SessionError,
    },

    /// Any other session failure, including a missing sign-in
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Hard extraction failures. Soft failures never surface here; they end up
/// as notes on a degraded config instead.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The resource's detail page could not be loaded
    #[error("Failed to load {url}: {source}")]
    PageLoad {
        url: String,
        #[source]
        source: SessionError,
    },

    /// No extractor is registered for the resource's category
    #[error("No configuration extractor for category '{0}'")]
    UnsupportedCategory(ResourceCategory),
}
