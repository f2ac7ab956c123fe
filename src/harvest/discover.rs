//! Project and resource discovery stages.

use super::traits::{DiscoveryError, HarvestStage};
use crate::dom::{extract_card, parse_sections, CompiledSelectors, PageSelectors};
use crate::model::{Project, Resource, ResourceCategory, ResourceSet};
use crate::session::Session;
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use tracing::{debug, info};

/// Lists the projects shown on the console dashboard.
pub struct ProjectDiscoverer {
    selectors: Arc<PageSelectors>,
    compiled: Arc<CompiledSelectors>,
}

impl ProjectDiscoverer {
    pub fn new(selectors: Arc<PageSelectors>, compiled: Arc<CompiledSelectors>) -> Self {
        Self { selectors, compiled }
    }
}

#[async_trait]
impl HarvestStage for ProjectDiscoverer {
    type Input = ();
    type Output = Vec<Project>;
    type Error = DiscoveryError;

    async fn execute(
        &self,
        session: &Session,
        _input: &(),
    ) -> Result<Vec<Project>, DiscoveryError> {
        session.require_authenticated()?;

        let page = &self.selectors.projects_path;
        session
            .goto(page)
            .await
            .map_err(|source| DiscoveryError::PageLoad {
                page: page.clone(),
                source,
            })?;
        let markup = session.content().await?;

        let projects = parse_projects(&markup, &self.compiled);
        info!(count = projects.len(), "Projects discovered");
        Ok(projects)
    }

    fn stage_name(&self) -> &'static str {
        "project_discovery"
    }
}

/// Reads every project card on the dashboard, skipping cards without a
/// title or link.
pub fn parse_projects(markup: &str, selectors: &CompiledSelectors) -> Vec<Project> {
    let document = Html::parse_document(markup);
    document
        .select(&selectors.project_card)
        .filter_map(|card| extract_card(card, selectors))
        .map(|card| Project {
            title: card.name,
            description: card.description,
            url: card.url,
        })
        .collect()
}

/// Lists the resources of one project, grouped by section heading.
pub struct ResourceDiscoverer {
    compiled: Arc<CompiledSelectors>,
}

impl ResourceDiscoverer {
    pub fn new(compiled: Arc<CompiledSelectors>) -> Self {
        Self { compiled }
    }
}

#[async_trait]
impl HarvestStage for ResourceDiscoverer {
    type Input = Project;
    type Output = ResourceSet;
    type Error = DiscoveryError;

    async fn execute(
        &self,
        session: &Session,
        project: &Project,
    ) -> Result<ResourceSet, DiscoveryError> {
        session
            .goto(&project.url)
            .await
            .map_err(|source| DiscoveryError::PageLoad {
                page: project.url.clone(),
                source,
            })?;
        let markup = session.content().await?;

        let resources = build_resource_set(&markup, &self.compiled);
        for (category, listed) in resources.iter() {
            debug!(
                project = %project.title,
                category = %category,
                count = listed.len(),
                "Section parsed"
            );
        }
        info!(
            project = %project.title,
            resources = resources.len(),
            categories = resources.iter().count(),
            "Resources discovered"
        );
        Ok(resources)
    }

    fn stage_name(&self) -> &'static str {
        "resource_discovery"
    }
}

/// Groups the cards of a project page under the heading they follow.
pub fn build_resource_set(markup: &str, selectors: &CompiledSelectors) -> ResourceSet {
    let sections = parse_sections(markup, selectors).into_iter().map(|section| {
        let category = ResourceCategory::new(section.heading);
        let resources = section
            .cards
            .into_iter()
            .map(|card| Resource {
                name: card.name,
                url: card.url,
                description: card.description,
                fqdn: card.fqdn,
                status: card.status,
                tags: card.tags,
                category: category.clone(),
            })
            .collect();
        (category, resources)
    });
    ResourceSet::from_sections(sections)
}
