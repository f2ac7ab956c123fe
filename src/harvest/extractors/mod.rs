//! Per-category configuration extractors.
//!
//! Each extractor loads a resource's detail page once, reads its form
//! through a declarative field table and then walks any sub-views
//! (environment variables, compose editor). Only a failure to load the
//! detail page is hard; everything after that degrades into notes.
//!
//! Field and editor values are always read live from the browser, never
//! from the serialized page.

pub mod application;
pub mod database;
pub mod env_vars;
pub mod service;

use super::traits::{ConfigExtractor, ExtractionError};
use crate::dom::{self, CompiledSelectors, FieldError, FormReadout, FormSection, PageSelectors};
use crate::model::Resource;
use crate::session::{Session, SessionError};
use crate::traits::Locator;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub use application::{ApplicationExtractor, APPLICATION_FORM};
pub use database::{DatabaseExtractor, DATABASE_FORM};
pub use env_vars::{read_environment, EnvironmentReadout};
pub use service::ServiceExtractor;

/// Failure of an optional sub-view step.
#[derive(Error, Debug)]
pub(crate) enum StepError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{0} disappeared before it could be read")]
    Vanished(String),
}

/// Extractors for the three built-in categories.
pub fn default_extractors(
    selectors: &Arc<PageSelectors>,
    compiled: &Arc<CompiledSelectors>,
) -> Vec<Box<dyn ConfigExtractor>> {
    vec![
        Box::new(ApplicationExtractor::new(selectors.clone())),
        Box::new(DatabaseExtractor::new(selectors.clone())),
        Box::new(ServiceExtractor::new(selectors.clone(), compiled.clone())),
    ]
}

fn page_load(resource: &Resource, source: SessionError) -> ExtractionError {
    ExtractionError::PageLoad {
        url: resource.url.clone(),
        source,
    }
}

/// Opens the resource's detail page.
pub(crate) async fn open_page(
    session: &Session,
    resource: &Resource,
) -> Result<(), ExtractionError> {
    session
        .goto(&resource.url)
        .await
        .map_err(|e| page_load(resource, e))
}

/// Opens the resource's detail page and returns its markup.
pub(crate) async fn load_page(
    session: &Session,
    resource: &Resource,
) -> Result<String, ExtractionError> {
    open_page(session, resource).await?;
    session.content().await.map_err(|e| page_load(resource, e))
}

/// Reads every field of `sections` from the current page.
pub(crate) async fn read_form(session: &Session, sections: &[FormSection]) -> FormReadout {
    let mut readout = FormReadout::default();
    for section in sections {
        for field in section.fields {
            let locator = Locator::css(field.selector);
            let read = match session.read_field_value(&locator).await {
                Ok(Some(state)) => dom::coerce(&state, field.kind).map(Some),
                Ok(None) => {
                    debug!(field = field.label, "Field not present on page");
                    Ok(None)
                }
                Err(e) => Err(FieldError::Unreadable(e.to_string())),
            };
            readout.insert(section.name, field, read);
        }
    }
    readout
}

/// Verbatim content of the editor addressed by `locator`.
pub(crate) async fn read_editor(session: &Session, locator: &Locator) -> Result<String, StepError> {
    session
        .read_field_value(locator)
        .await?
        .map(|editor| editor.value)
        .ok_or_else(|| StepError::Vanished(locator.to_string()))
}

pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}
