use super::env_vars::read_environment;
use super::{open_page, read_form};
use crate::dom::{FieldSpec, FormSection, PageSelectors};
use crate::harvest::record::{ApplicationConfig, ResourceConfig};
use crate::harvest::traits::{ConfigExtractor, ExtractionError, HarvestStage};
use crate::model::{Resource, ResourceCategory};
use crate::session::Session;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const GENERAL: &[FieldSpec] = &[
    FieldSpec::text("name", "#name"),
    FieldSpec::text("description", "#description"),
    FieldSpec::select("buildPack", "#build_pack"),
    FieldSpec::text("domains", "#fqdn"),
];

const DOCKER: &[FieldSpec] = &[
    FieldSpec::text("imageName", "#docker_registry_image_name"),
    FieldSpec::text("imageTag", "#docker_registry_image_tag"),
];

const BUILD: &[FieldSpec] = &[
    FieldSpec::text("baseDirectory", "#base_directory"),
    FieldSpec::text("publishDirectory", "#publish_directory"),
    FieldSpec::text("installCommand", "#install_command"),
    FieldSpec::text("buildCommand", "#build_command"),
    FieldSpec::text("startCommand", "#start_command"),
    FieldSpec::text("dockerfileLocation", "#dockerfile_location"),
];

const NETWORK: &[FieldSpec] = &[
    FieldSpec::text("portsExposes", "#ports_exposes"),
    FieldSpec::text("portsMappings", "#ports_mappings"),
    FieldSpec::multiline("customLabels", "#custom_labels"),
    FieldSpec::checkbox("readonlyLabels", "#is_container_label_readonly_enabled"),
    FieldSpec::checkbox("httpBasicAuth", "#is_http_basic_auth_enabled"),
];

const DEPLOYMENT: &[FieldSpec] = &[
    FieldSpec::text("preDeploymentCommand", "#pre_deployment_command"),
    FieldSpec::text("preDeploymentContainer", "#pre_deployment_command_container"),
    FieldSpec::text("postDeploymentCommand", "#post_deployment_command"),
    FieldSpec::text("postDeploymentContainer", "#post_deployment_command_container"),
];

/// Form layout of an application's configuration page.
pub const APPLICATION_FORM: &[FormSection] = &[
    FormSection::new("general", GENERAL),
    FormSection::new("docker", DOCKER),
    FormSection::new("build", BUILD),
    FormSection::new("network", NETWORK),
    FormSection::new("deployment", DEPLOYMENT),
];

pub struct ApplicationExtractor {
    selectors: Arc<PageSelectors>,
}

impl ApplicationExtractor {
    pub fn new(selectors: Arc<PageSelectors>) -> Self {
        Self { selectors }
    }
}

#[async_trait]
impl HarvestStage for ApplicationExtractor {
    type Input = Resource;
    type Output = ResourceConfig;
    type Error = ExtractionError;

    #[instrument(skip_all, fields(application = %resource.name))]
    async fn execute(
        &self,
        session: &Session,
        resource: &Resource,
    ) -> Result<ResourceConfig, ExtractionError> {
        open_page(session, resource).await?;
        let mut form = read_form(session, APPLICATION_FORM).await;
        for note in &form.notes {
            warn!(note = %note, "Field could not be read");
        }

        let environment = read_environment(session, &self.selectors).await;
        debug!("Application configuration read");

        Ok(ResourceConfig::Application(ApplicationConfig {
            url: resource.url.clone(),
            extracted_at: Utc::now(),
            general: form.take("general"),
            docker: form.take("docker"),
            build: form.take("build"),
            network: form.take("network"),
            deployment: form.take("deployment"),
            environment_variables: environment.payload,
            environment_variables_note: environment.note,
            environment_variables_error: environment.error,
            notes: form.notes,
            ..Default::default()
        }))
    }

    fn stage_name(&self) -> &'static str {
        "application_config"
    }
}

impl ConfigExtractor for ApplicationExtractor {
    fn category(&self) -> ResourceCategory {
        ResourceCategory::applications()
    }
}
