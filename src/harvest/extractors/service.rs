use super::env_vars::read_environment;
use super::{load_page, read_editor, split_lines, StepError};
use crate::dom::{element_text, CompiledSelectors, FieldValue, FieldValues, PageSelectors};
use crate::harvest::record::{ResourceConfig, ServiceConfig};
use crate::harvest::traits::{ConfigExtractor, ExtractionError, HarvestStage};
use crate::model::{Resource, ResourceCategory};
use crate::session::Session;
use async_trait::async_trait;
use chrono::Utc;
use scraper::Html;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Reads a multi-container service through its compose editor.
pub struct ServiceExtractor {
    selectors: Arc<PageSelectors>,
    compiled: Arc<CompiledSelectors>,
}

impl ServiceExtractor {
    pub fn new(selectors: Arc<PageSelectors>, compiled: Arc<CompiledSelectors>) -> Self {
        Self { selectors, compiled }
    }

    async fn read_compose(&self, session: &Session) -> Result<String, StepError> {
        session.click(&self.selectors.compose_button).await?;
        let read = self.read_open_editor(session).await;
        self.dismiss(session).await;
        read
    }

    async fn read_open_editor(&self, session: &Session) -> Result<String, StepError> {
        session
            .wait_for(&self.selectors.compose_editor, session.timeouts().modal)
            .await?;
        read_editor(session, &self.selectors.compose_editor).await
    }

    // A modal that refuses to close does not spoil what was read from it.
    async fn dismiss(&self, session: &Session) {
        if let Err(e) = session.press_key("Escape").await {
            debug!(error = %e, "Compose editor did not dismiss");
        }
    }
}

#[async_trait]
impl HarvestStage for ServiceExtractor {
    type Input = Resource;
    type Output = ResourceConfig;
    type Error = ExtractionError;

    #[instrument(skip_all, fields(service = %resource.name))]
    async fn execute(
        &self,
        session: &Session,
        resource: &Resource,
    ) -> Result<ResourceConfig, ExtractionError> {
        let markup = load_page(session, resource).await?;
        let general = service_general(&markup, &self.compiled, resource);

        let mut notes = Vec::new();
        let docker_compose = match self.read_compose(session).await {
            Ok(text) => Some(split_lines(&text)),
            Err(e) => {
                warn!(error = %e, "Compose definition could not be read");
                notes.push(format!("dockerCompose: {}", e));
                None
            }
        };

        let environment = read_environment(session, &self.selectors).await;
        debug!("Service configuration read");

        Ok(ResourceConfig::Service(ServiceConfig {
            url: resource.url.clone(),
            extracted_at: Utc::now(),
            general,
            docker_compose,
            environment_variables: environment.payload.as_deref().map(split_lines),
            environment_variables_note: environment.note,
            environment_variables_error: environment.error,
            notes,
            ..Default::default()
        }))
    }

    fn stage_name(&self) -> &'static str {
        "service_config"
    }
}

impl ConfigExtractor for ServiceExtractor {
    fn category(&self) -> ResourceCategory {
        ResourceCategory::services()
    }
}

fn service_general(
    markup: &str,
    selectors: &CompiledSelectors,
    resource: &Resource,
) -> FieldValues {
    let document = Html::parse_document(markup);
    let title = document
        .select(&selectors.page_title)
        .next()
        .map(element_text)
        .filter(|title| !title.is_empty())
        .map(FieldValue::Text);

    let mut general = FieldValues::new();
    general.insert("name".to_string(), title);
    general.insert("url".to_string(), Some(FieldValue::Text(resource.url.clone())));
    general
}
