use crate::harvest::record::ResourceConfig;
use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

pub const APPLICATIONS: &str = "Applications";
pub const DATABASES: &str = "Databases";
pub const SERVICES: &str = "Services";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
}

/// Section heading a resource was listed under.
///
/// Open-ended: any heading found on a project page becomes a category.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceCategory(String);

impl ResourceCategory {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn applications() -> Self {
        Self::new(APPLICATIONS)
    }

    pub fn databases() -> Self {
        Self::new(DATABASES)
    }

    pub fn services() -> Self {
        Self::new(SERVICES)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourceCategory {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceCategory {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Running,
    Exited,
    Warning,
    #[default]
    Unknown,
}

impl ResourceStatus {
    /// Classifies a status badge from its style classes.
    pub fn from_classes<'a>(classes: impl IntoIterator<Item = &'a str>) -> Self {
        for class in classes {
            if class.contains("success") {
                return ResourceStatus::Running;
            }
            if class.contains("error") {
                return ResourceStatus::Exited;
            }
            if class.contains("warning") {
                return ResourceStatus::Warning;
            }
        }
        ResourceStatus::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    /// Second description line; a domain for applications, an internal
    /// connection string for databases.
    pub fqdn: Option<String>,
    pub status: ResourceStatus,
    pub tags: Vec<String>,
    pub category: ResourceCategory,
}

/// Resources of one project, grouped by the heading they were listed under.
///
/// Categories keep the order their headings first appeared on the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "ResourceSetRepr", from = "ResourceSetRepr")]
pub struct ResourceSet {
    categories: Vec<(ResourceCategory, Vec<Resource>)>,
}

impl ResourceSet {
    /// Builds the set from `(heading, resources)` pairs in document order.
    /// Repeated headings append; empty groups are dropped.
    pub fn from_sections(
        sections: impl IntoIterator<Item = (ResourceCategory, Vec<Resource>)>,
    ) -> Self {
        let mut set = Self::default();
        for (category, resources) in sections {
            if resources.is_empty() {
                continue;
            }
            match set.categories.iter_mut().find(|(c, _)| *c == category) {
                Some((_, listed)) => listed.extend(resources),
                None => set.categories.push((category, resources)),
            }
        }
        set
    }

    /// Resources listed under `category`, empty when the heading was absent.
    pub fn get(&self, category: &str) -> &[Resource] {
        self.categories
            .iter()
            .find(|(c, _)| c.as_str() == category)
            .map(|(_, listed)| listed.as_slice())
            .unwrap_or(&[])
    }

    pub fn applications(&self) -> &[Resource] {
        self.get(APPLICATIONS)
    }

    pub fn databases(&self) -> &[Resource] {
        self.get(DATABASES)
    }

    pub fn services(&self) -> &[Resource] {
        self.get(SERVICES)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceCategory, &[Resource])> {
        self.categories.iter().map(|(c, r)| (c, r.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.categories.iter().map(|(_, r)| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct ResourceSetRepr {
    categories: OrderedCategories,
    #[serde(default)]
    applications: Vec<Resource>,
    #[serde(default)]
    databases: Vec<Resource>,
    #[serde(default)]
    services: Vec<Resource>,
}

impl From<ResourceSet> for ResourceSetRepr {
    fn from(set: ResourceSet) -> Self {
        Self {
            applications: set.applications().to_vec(),
            databases: set.databases().to_vec(),
            services: set.services().to_vec(),
            categories: OrderedCategories(set.categories),
        }
    }
}

impl From<ResourceSetRepr> for ResourceSet {
    fn from(repr: ResourceSetRepr) -> Self {
        Self::from_sections(repr.categories.0)
    }
}

/// JSON object whose keys keep their order in both directions.
struct OrderedCategories(Vec<(ResourceCategory, Vec<Resource>)>);

impl Serialize for OrderedCategories {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(c, r)| (c, r)))
    }
}

impl<'de> Deserialize<'de> for OrderedCategories {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CategoriesVisitor;

        impl<'de> Visitor<'de> for CategoriesVisitor {
            type Value = OrderedCategories;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category to resources")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut categories = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    categories.push(entry);
                }
                Ok(OrderedCategories(categories))
            }
        }

        deserializer.deserialize_map(CategoriesVisitor)
    }
}

/// Stands in for a project or resource whose extraction raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionFailure {
    pub entity_name: String,
    pub entity_url: String,
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ResourceCategory>,
    pub error_message: String,
    pub timestamp: DateTime<Utc>,
}

impl ExtractionFailure {
    pub fn for_project(project: &Project, error: impl fmt::Display) -> Self {
        Self {
            entity_name: project.title.clone(),
            entity_url: project.url.clone(),
            project_name: project.title.clone(),
            category: None,
            error_message: error.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn for_resource(project: &Project, resource: &Resource, error: impl fmt::Display) -> Self {
        Self {
            entity_name: resource.name.clone(),
            entity_url: resource.url.clone(),
            project_name: project.title.clone(),
            category: Some(resource.category.clone()),
            error_message: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub running: usize,
    pub exited: usize,
    pub warning: usize,
    pub unknown: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectTotals {
    pub resources: usize,
    pub categories: BTreeMap<ResourceCategory, usize>,
    pub status: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectResources {
    pub project: Project,
    pub resources: ResourceSet,
    pub totals: ProjectTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectEntry {
    Discovered(ProjectResources),
    Failed(ExtractionFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigEntry {
    Config(ResourceConfig),
    Failure(ExtractionFailure),
}

/// All extraction attempts for one category across a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigCollection {
    pub category: ResourceCategory,
    pub entries: Vec<ConfigEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub total: usize,
    pub complete: usize,
    pub degraded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTotals {
    pub projects: usize,
    pub projects_failed: usize,
    pub resources: usize,
    pub categories: BTreeMap<ResourceCategory, CategoryTotals>,
}

/// Complete result of one harvest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub totals: RunTotals,
    pub projects: Vec<ProjectEntry>,
    pub configs: Vec<ConfigCollection>,
}
