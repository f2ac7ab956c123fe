//! Configuration records produced by the extractors.

use crate::dom::FieldValues;
use crate::model::{
    ConfigEntry, ExtractionFailure, Project, Resource, ResourceCategory, ResourceStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Links a config back to the resource listing it came from.
///
/// Extractors leave this empty; the pipeline fills it from the discovered
/// [`Resource`] once extraction returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Linkage {
    pub project_name: Option<String>,
    pub category: Option<ResourceCategory>,
    pub status: Option<ResourceStatus>,
    pub fqdn: Option<String>,
}

impl Linkage {
    fn new(project: &Project, resource: &Resource) -> Self {
        Self {
            project_name: Some(project.title.clone()),
            category: Some(resource.category.clone()),
            status: Some(resource.status),
            fqdn: resource.fqdn.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfig {
    pub application_name: Option<String>,
    #[serde(flatten)]
    pub linkage: Linkage,
    pub url: String,
    pub extracted_at: DateTime<Utc>,
    pub general: FieldValues,
    pub docker: FieldValues,
    pub build: FieldValues,
    pub network: FieldValues,
    pub deployment: FieldValues,
    /// Raw developer-view text.
    pub environment_variables: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables_error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    pub database_name: Option<String>,
    #[serde(flatten)]
    pub linkage: Linkage,
    pub url: String,
    pub extracted_at: DateTime<Utc>,
    pub general: FieldValues,
    pub network: FieldValues,
    pub advanced: FieldValues,
    pub environment_variables: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables_error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub service_name: Option<String>,
    #[serde(flatten)]
    pub linkage: Linkage,
    pub url: String,
    pub extracted_at: DateTime<Utc>,
    pub general: FieldValues,
    /// Compose definition, one entry per line.
    pub docker_compose: Option<Vec<String>>,
    /// Developer-view text, one entry per line.
    pub environment_variables: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables_error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// One extracted configuration, tagged by the kind of page it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceConfig {
    Application(ApplicationConfig),
    Database(DatabaseConfig),
    Service(ServiceConfig),
}

impl ResourceConfig {
    /// Attaches the listing data of `resource` discovered in `project`.
    pub fn link(&mut self, project: &Project, resource: &Resource) {
        let linkage = Linkage::new(project, resource);
        let name = Some(resource.name.clone());
        match self {
            ResourceConfig::Application(config) => {
                config.application_name = name;
                config.linkage = linkage;
            }
            ResourceConfig::Database(config) => {
                config.database_name = name;
                config.linkage = linkage;
            }
            ResourceConfig::Service(config) => {
                config.service_name = name;
                config.linkage = linkage;
            }
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ResourceConfig::Application(config) => config.application_name.as_deref(),
            ResourceConfig::Database(config) => config.database_name.as_deref(),
            ResourceConfig::Service(config) => config.service_name.as_deref(),
        }
    }

    pub fn linkage(&self) -> &Linkage {
        match self {
            ResourceConfig::Application(config) => &config.linkage,
            ResourceConfig::Database(config) => &config.linkage,
            ResourceConfig::Service(config) => &config.linkage,
        }
    }

    /// Notes left by soft failures.
    pub fn notes(&self) -> &[String] {
        match self {
            ResourceConfig::Application(config) => &config.notes,
            ResourceConfig::Database(config) => &config.notes,
            ResourceConfig::Service(config) => &config.notes,
        }
    }

    /// True when a soft failure left part of the config unread.
    ///
    /// An expected absence (`environmentVariablesNote`) does not degrade.
    pub fn is_degraded(&self) -> bool {
        let env_error = match self {
            ResourceConfig::Application(config) => &config.environment_variables_error,
            ResourceConfig::Database(config) => &config.environment_variables_error,
            ResourceConfig::Service(config) => &config.environment_variables_error,
        };
        !self.notes().is_empty() || env_error.is_some()
    }
}

/// What came of extracting one resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Complete(ResourceConfig),
    Degraded(ResourceConfig),
    Failed(ExtractionFailure),
}

impl ExtractionOutcome {
    pub fn from_config(config: ResourceConfig) -> Self {
        if config.is_degraded() {
            ExtractionOutcome::Degraded(config)
        } else {
            ExtractionOutcome::Complete(config)
        }
    }
}

impl From<ExtractionOutcome> for ConfigEntry {
    fn from(outcome: ExtractionOutcome) -> Self {
        match outcome {
            ExtractionOutcome::Complete(config) | ExtractionOutcome::Degraded(config) => {
                ConfigEntry::Config(config)
            }
            ExtractionOutcome::Failed(failure) => ConfigEntry::Failure(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::FieldValue;

    fn project() -> Project {
        Project {
            title: "Production".to_string(),
            description: None,
            url: "/project/p1".to_string(),
        }
    }

    fn resource() -> Resource {
        Resource {
            name: "web".to_string(),
            url: "/application/w1".to_string(),
            description: Some("frontend".to_string()),
            fqdn: Some("https://web.example.com".to_string()),
            status: ResourceStatus::Running,
            tags: vec![],
            category: ResourceCategory::applications(),
        }
    }

    #[test]
    fn test_link_fills_linkage() {
        let mut config = ResourceConfig::Application(ApplicationConfig {
            url: "/application/w1".to_string(),
            ..Default::default()
        });
        assert_eq!(config.name(), None);

        config.link(&project(), &resource());

        assert_eq!(config.name(), Some("web"));
        let linkage = config.linkage();
        assert_eq!(linkage.project_name.as_deref(), Some("Production"));
        assert_eq!(linkage.status, Some(ResourceStatus::Running));
        assert_eq!(linkage.fqdn.as_deref(), Some("https://web.example.com"));
    }

    #[test]
    fn test_serializes_flat_camel_case() {
        let mut general = FieldValues::new();
        general.insert("name".to_string(), Some(FieldValue::Text("web".to_string())));
        let mut config = ResourceConfig::Application(ApplicationConfig {
            url: "/application/w1".to_string(),
            general,
            environment_variables_note: Some("menu not found".to_string()),
            ..Default::default()
        });
        config.link(&project(), &resource());

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["kind"], "application");
        assert_eq!(json["applicationName"], "web");
        assert_eq!(json["projectName"], "Production");
        assert_eq!(json["category"], "Applications");
        assert_eq!(json["status"], "running");
        assert_eq!(json["general"]["name"], "web");
        assert_eq!(json["environmentVariables"], serde_json::Value::Null);
        assert_eq!(json["environmentVariablesNote"], "menu not found");
        assert!(json.get("environmentVariablesError").is_none());
        assert!(json.get("notes").is_none());

        let back: ResourceConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_degradation() {
        let noted = ResourceConfig::Database(DatabaseConfig {
            environment_variables_note: Some("menu not found".to_string()),
            ..Default::default()
        });
        assert!(!noted.is_degraded());
        assert!(matches!(
            ExtractionOutcome::from_config(noted),
            ExtractionOutcome::Complete(_)
        ));

        let errored = ResourceConfig::Service(ServiceConfig {
            environment_variables_error: Some("timed out".to_string()),
            ..Default::default()
        });
        assert!(errored.is_degraded());

        let with_notes = ResourceConfig::Application(ApplicationConfig {
            notes: vec!["network.portsExposes: mismatch".to_string()],
            ..Default::default()
        });
        assert!(matches!(
            ExtractionOutcome::from_config(with_notes),
            ExtractionOutcome::Degraded(_)
        ));
    }

    #[test]
    fn test_outcome_into_entry() {
        let failure = ExtractionFailure::for_resource(&project(), &resource(), "page timed out");
        let entry: ConfigEntry = ExtractionOutcome::Failed(failure.clone()).into();
        assert_eq!(entry, ConfigEntry::Failure(failure));
    }
}
