//! Snapshot assembly and the human-readable run report.

use super::record::ExtractionOutcome;
use crate::model::{
    CategoryTotals, ConfigCollection, ConfigEntry, ExtractionFailure, Project, ProjectEntry,
    ProjectResources, ProjectTotals, ResourceCategory, ResourceSet, ResourceStatus, RunTotals,
    Snapshot,
};
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Accumulates project and config entries in discovery order.
#[derive(Debug)]
pub struct SnapshotBuilder {
    timestamp: DateTime<Utc>,
    projects: Vec<ProjectEntry>,
    configs: Vec<ConfigCollection>,
}

impl SnapshotBuilder {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            projects: Vec::new(),
            configs: Vec::new(),
        }
    }

    pub fn project_discovered(&mut self, project: Project, resources: ResourceSet) {
        let totals = project_totals(&resources);
        self.projects.push(ProjectEntry::Discovered(ProjectResources {
            project,
            resources,
            totals,
        }));
    }

    pub fn project_failed(&mut self, failure: ExtractionFailure) {
        self.projects.push(ProjectEntry::Failed(failure));
    }

    /// Collections come out in the order their category was first recorded.
    pub fn record(&mut self, category: &ResourceCategory, outcome: ExtractionOutcome) {
        let position = self.configs.iter().position(|c| c.category == *category);
        let collection = match position {
            Some(i) => &mut self.configs[i],
            None => {
                self.configs.push(ConfigCollection {
                    category: category.clone(),
                    entries: Vec::new(),
                });
                let last = self.configs.len() - 1;
                &mut self.configs[last]
            }
        };
        collection.entries.push(outcome.into());
    }

    pub fn finish(self) -> Snapshot {
        let totals = run_totals(&self.projects, &self.configs);
        Snapshot {
            timestamp: self.timestamp,
            totals,
            projects: self.projects,
            configs: self.configs,
        }
    }
}

pub fn project_totals(resources: &ResourceSet) -> ProjectTotals {
    let mut totals = ProjectTotals::default();
    for (category, listed) in resources.iter() {
        totals.categories.insert(category.clone(), listed.len());
        totals.resources += listed.len();
        for resource in listed {
            match resource.status {
                ResourceStatus::Running => totals.status.running += 1,
                ResourceStatus::Exited => totals.status.exited += 1,
                ResourceStatus::Warning => totals.status.warning += 1,
                ResourceStatus::Unknown => totals.status.unknown += 1,
            }
        }
    }
    totals
}

pub fn run_totals(projects: &[ProjectEntry], configs: &[ConfigCollection]) -> RunTotals {
    let mut totals = RunTotals {
        projects: projects.len(),
        ..Default::default()
    };
    for entry in projects {
        match entry {
            ProjectEntry::Discovered(discovered) => totals.resources += discovered.totals.resources,
            ProjectEntry::Failed(_) => totals.projects_failed += 1,
        }
    }
    for collection in configs {
        let category = totals
            .categories
            .entry(collection.category.clone())
            .or_insert_with(CategoryTotals::default);
        for entry in &collection.entries {
            category.total += 1;
            match entry {
                ConfigEntry::Config(config) if config.is_degraded() => category.degraded += 1,
                ConfigEntry::Config(_) => category.complete += 1,
                ConfigEntry::Failure(_) => category.failed += 1,
            }
        }
    }
    totals
}

/// Plain-text summary of a finished run.
pub fn render_report(snapshot: &Snapshot) -> String {
    let totals = &snapshot.totals;
    let mut report = String::new();

    let _ = writeln!(report, "Harvest snapshot {}", snapshot.timestamp.to_rfc3339());
    let _ = writeln!(
        report,
        "Projects: {} ({} failed)",
        totals.projects, totals.projects_failed
    );
    let _ = writeln!(report, "Resources: {}", totals.resources);

    for entry in &snapshot.projects {
        match entry {
            ProjectEntry::Discovered(discovered) => {
                let status = &discovered.totals.status;
                let _ = writeln!(
                    report,
                    "  {}: {} resources ({} running, {} exited, {} warning, {} unknown)",
                    discovered.project.title,
                    discovered.totals.resources,
                    status.running,
                    status.exited,
                    status.warning,
                    status.unknown
                );
            }
            ProjectEntry::Failed(failure) => {
                let _ = writeln!(
                    report,
                    "  {}: FAILED {}",
                    failure.entity_name, failure.error_message
                );
            }
        }
    }

    if !totals.categories.is_empty() {
        let _ = writeln!(report, "Configurations:");
    }
    for (category, counts) in &totals.categories {
        let _ = writeln!(
            report,
            "  {}: {} extracted, {} complete, {} degraded, {} failed",
            category, counts.total, counts.complete, counts.degraded, counts.failed
        );
    }
    for collection in &snapshot.configs {
        for entry in &collection.entries {
            if let ConfigEntry::Failure(failure) = entry {
                let _ = writeln!(
                    report,
                    "  ! {} / {}: {}",
                    failure.project_name, failure.entity_name, failure.error_message
                );
            }
        }
    }

    report
}
