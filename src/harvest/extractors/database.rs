use super::env_vars::read_environment;
use super::{open_page, read_form};
use crate::dom::{FieldSpec, FormSection, PageSelectors};
use crate::harvest::record::{DatabaseConfig, ResourceConfig};
use crate::harvest::traits::{ConfigExtractor, ExtractionError, HarvestStage};
use crate::model::{Resource, ResourceCategory};
use crate::session::Session;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

// Credential fields are named per engine; each selector list covers the
// engines the console supports.
const GENERAL: &[FieldSpec] = &[
    FieldSpec::text("name", "#name"),
    FieldSpec::text("description", "#description"),
    FieldSpec::text("image", "#image"),
    FieldSpec::text(
        "user",
        "#postgres_user, #mysql_user, #mariadb_user, #mongo_initdb_root_username",
    ),
    FieldSpec::text(
        "password",
        "#postgres_password, #mysql_password, #mariadb_password, \
         #mongo_initdb_root_password, #redis_password, #dragonfly_password, #keydb_password",
    ),
    FieldSpec::text(
        "database",
        "#postgres_db, #mysql_database, #mariadb_database, #mongo_initdb_database",
    ),
    FieldSpec::text("initialArguments", "#postgres_initdb_args"),
    FieldSpec::text("hostAuthMethod", "#postgres_host_auth_method"),
];

const NETWORK: &[FieldSpec] = &[
    FieldSpec::text("portsMappings", "#ports_mappings"),
    FieldSpec::checkbox("isPublic", "#is_public"),
    FieldSpec::text("publicPort", "#public_port"),
    FieldSpec::checkbox("enableSsl", "#enable_ssl"),
];

const ADVANCED: &[FieldSpec] = &[
    FieldSpec::multiline(
        "customConfiguration",
        "#postgres_conf, #mysql_conf, #mariadb_conf, #mongo_conf, #redis_conf, #keydb_conf",
    ),
    FieldSpec::checkbox("logDrain", "#is_log_drain_enabled"),
];

/// Form layout of a database's configuration page.
pub const DATABASE_FORM: &[FormSection] = &[
    FormSection::new("general", GENERAL),
    FormSection::new("network", NETWORK),
    FormSection::new("advanced", ADVANCED),
];

pub struct DatabaseExtractor {
    selectors: Arc<PageSelectors>,
}

impl DatabaseExtractor {
    pub fn new(selectors: Arc<PageSelectors>) -> Self {
        Self { selectors }
    }
}

#[async_trait]
impl HarvestStage for DatabaseExtractor {
    type Input = Resource;
    type Output = ResourceConfig;
    type Error = ExtractionError;

    #[instrument(skip_all, fields(database = %resource.name))]
    async fn execute(
        &self,
        session: &Session,
        resource: &Resource,
    ) -> Result<ResourceConfig, ExtractionError> {
        open_page(session, resource).await?;
        let mut form = read_form(session, DATABASE_FORM).await;
        for note in &form.notes {
            warn!(note = %note, "Field could not be read");
        }

        let environment = read_environment(session, &self.selectors).await;
        debug!("Database configuration read");

        Ok(ResourceConfig::Database(DatabaseConfig {
            url: resource.url.clone(),
            extracted_at: Utc::now(),
            general: form.take("general"),
            network: form.take("network"),
            advanced: form.take("advanced"),
            environment_variables: environment.payload,
            environment_variables_note: environment.note,
            environment_variables_error: environment.error,
            notes: form.notes,
            ..Default::default()
        }))
    }

    fn stage_name(&self) -> &'static str {
        "database_config"
    }
}

impl ConfigExtractor for DatabaseExtractor {
    fn category(&self) -> ResourceCategory {
        ResourceCategory::databases()
    }
}
