//! Harvest pipeline orchestrator.
//!
//! [`HarvestPipeline`] drives one run through its stages:
//! authenticate → discover projects → per project, discover resources →
//! per resource, extract configuration → persist. Stages run one at a time
//! against the single shared [`Session`].
//!
//! Failures are contained at the narrowest level that can absorb them:
//! - a field or sub-view that cannot be read degrades its config
//! - a resource whose page does not load becomes an [`ExtractionFailure`]
//! - a project whose page does not load becomes an [`ExtractionFailure`]
//! - only a failed sign-in or an empty project list aborts the run

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::discover::{ProjectDiscoverer, ResourceDiscoverer};
use super::extractors::default_extractors;
use super::record::ExtractionOutcome;
use super::summary::SnapshotBuilder;
use super::traits::{ConfigExtractor, ExtractionError, HarvestStage};
use crate::config::Credentials;
use crate::dom::{CompiledSelectors, PageSelectors, SelectorError};
use crate::model::{ExtractionFailure, Project, Resource, ResourceCategory, Snapshot};
use crate::session::{Authenticator, Session, SessionError};
use crate::sink::{SinkError, SnapshotSink};

// ============================================================================
// Pipeline Types
// ============================================================================

/// Progress of a run. Stages only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PipelineStage {
    #[default]
    NotStarted,
    Authenticated,
    ProjectsDiscovered,
    ResourcesDiscovered,
    ConfigsExtracted,
    Done,
}

#[derive(Debug, Default)]
struct StageTracker {
    stage: PipelineStage,
}

impl StageTracker {
    fn advance(&mut self, next: PipelineStage) {
        if next > self.stage {
            debug!(from = ?self.stage, to = ?next, "Pipeline stage advanced");
            self.stage = next;
        }
    }
}

/// Complete harvest result with the snapshot and statistics.
#[derive(Debug)]
pub struct HarvestResult {
    pub snapshot: Snapshot,

    /// Locators of every artifact the sink accepted
    pub artifacts: Vec<String>,

    pub stats: HarvestStats,

    /// Last stage reached
    pub stage: PipelineStage,
}

/// Statistics about the harvest run.
#[derive(Debug, Default, Clone)]
pub struct HarvestStats {
    /// Total time spent on the entire run (milliseconds)
    pub total_duration_ms: u64,

    /// Time spent signing in (milliseconds)
    pub authentication_duration_ms: u64,

    /// Time spent listing projects (milliseconds)
    pub discovery_duration_ms: u64,

    /// Time spent on resource discovery and extraction (milliseconds)
    pub extraction_duration_ms: u64,

    pub projects_processed: usize,
    pub projects_failed: usize,
    pub resources_processed: usize,
    pub configs_degraded: usize,
    pub configs_failed: usize,

    /// Artifacts the sink rejected
    pub artifacts_failed: usize,
}

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that abort a run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The console did not accept the credentials
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(#[source] SessionError),

    /// The dashboard listed no projects
    #[error("No projects found on the console dashboard")]
    NoProjects,

    /// Stage execution exceeded timeout
    #[error("Stage '{stage}' timed out after {timeout_secs}s")]
    StageTimeout { stage: String, timeout_secs: u64 },

    /// A stage returned an error
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The run could not get hold of the browser
    #[error("Executor unavailable: {0}")]
    ExecutorClosed(String),
}

impl PipelineError {
    /// Message recorded on an [`ExtractionFailure`] for this error.
    fn failure_message(&self) -> String {
        match self {
            PipelineError::StageFailed { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Orchestrates one harvest run over a signed-out [`Session`].
///
/// # Example
///
/// ```ignore
/// let pipeline = HarvestPipeline::new(PageSelectors::default())?
///     .with_sink(Arc::new(JsonFileSink::new("snapshots")))
///     .with_stage_timeout(Duration::from_secs(120));
///
/// let result = pipeline.execute(&mut session, &credentials).await?;
/// println!("{}", render_report(&result.snapshot));
/// ```
pub struct HarvestPipeline {
    authenticator: Authenticator,
    projects: ProjectDiscoverer,
    resources: ResourceDiscoverer,
    extractors: Vec<Box<dyn ConfigExtractor>>,
    sink: Option<Arc<dyn SnapshotSink>>,

    /// Timeout for each stage invocation (default: 5 minutes)
    stage_timeout: Duration,

    capture_failures: bool,
}

impl HarvestPipeline {
    /// Creates a pipeline with the built-in extractors and no sink.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any document selector fails to parse.
    pub fn new(selectors: PageSelectors) -> Result<Self, SelectorError> {
        let compiled = Arc::new(CompiledSelectors::compile(&selectors)?);
        let selectors = Arc::new(selectors);
        Ok(Self {
            authenticator: Authenticator::new(selectors.clone()),
            projects: ProjectDiscoverer::new(selectors.clone(), compiled.clone()),
            resources: ResourceDiscoverer::new(compiled.clone()),
            extractors: default_extractors(&selectors, &compiled),
            sink: None,
            stage_timeout: Duration::from_secs(300),
            capture_failures: false,
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Registers `extractor`, replacing any extractor for the same category.
    pub fn with_extractor(mut self, extractor: Box<dyn ConfigExtractor>) -> Self {
        let category = extractor.category();
        self.extractors.retain(|existing| existing.category() != category);
        self.extractors.push(extractor);
        self
    }

    /// Sets the timeout for each stage invocation.
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Saves a screenshot through the sink whenever a resource fails hard.
    pub fn with_capture_failures(mut self, capture: bool) -> Self {
        self.capture_failures = capture;
        self
    }

    /// Runs every stage and persists the result.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] only when sign-in fails, project discovery
    /// fails or finds nothing. Project and resource failures are recorded in
    /// the snapshot instead.
    #[instrument(skip_all, fields(console = %session.base_url()))]
    pub async fn execute(
        &self,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<HarvestResult, PipelineError> {
        let start = Instant::now();
        let mut stats = HarvestStats::default();
        let mut tracker = StageTracker::default();
        let mut builder = SnapshotBuilder::new(Utc::now());

        // ====================================================================
        // Stage 1: Authentication
        // ====================================================================

        info!("Starting authentication stage");
        let auth_start = Instant::now();

        timeout(
            self.stage_timeout,
            self.authenticator.authenticate(session, credentials),
        )
        .await
        .map_err(|_| self.timed_out("authentication"))?
        .map_err(PipelineError::AuthenticationFailed)?;

        stats.authentication_duration_ms = auth_start.elapsed().as_millis() as u64;
        tracker.advance(PipelineStage::Authenticated);
        info!(duration_ms = stats.authentication_duration_ms, "Authentication completed");

        let session: &Session = session;

        // ====================================================================
        // Stage 2: Project discovery
        // ====================================================================

        let discovery_start = Instant::now();
        let projects = self.run_stage(&self.projects, session, &()).await?;
        if projects.is_empty() {
            return Err(PipelineError::NoProjects);
        }

        stats.discovery_duration_ms = discovery_start.elapsed().as_millis() as u64;
        tracker.advance(PipelineStage::ProjectsDiscovered);
        info!(
            duration_ms = stats.discovery_duration_ms,
            projects = projects.len(),
            "Project discovery completed"
        );

        // ====================================================================
        // Stage 3: Resources and configurations, one project at a time
        // ====================================================================

        let extraction_start = Instant::now();
        for project in &projects {
            stats.projects_processed += 1;

            let resources = match self.run_stage(&self.resources, session, project).await {
                Ok(resources) => resources,
                Err(e) => {
                    warn!(project = %project.title, error = %e, "Project skipped");
                    stats.projects_failed += 1;
                    builder.project_failed(ExtractionFailure::for_project(
                        project,
                        e.failure_message(),
                    ));
                    continue;
                }
            };
            tracker.advance(PipelineStage::ResourcesDiscovered);

            for (category, listed) in resources.iter() {
                for resource in listed {
                    stats.resources_processed += 1;
                    let outcome = self.extract(session, project, resource).await;
                    match &outcome {
                        ExtractionOutcome::Complete(_) => {}
                        ExtractionOutcome::Degraded(_) => stats.configs_degraded += 1,
                        ExtractionOutcome::Failed(_) => stats.configs_failed += 1,
                    }
                    builder.record(category, outcome);
                }
            }
            tracker.advance(PipelineStage::ConfigsExtracted);

            builder.project_discovered(project.clone(), resources);
        }

        stats.extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;
        info!(
            duration_ms = stats.extraction_duration_ms,
            resources = stats.resources_processed,
            degraded = stats.configs_degraded,
            failed = stats.configs_failed,
            "Extraction completed"
        );

        // ====================================================================
        // Stage 4: Persistence
        // ====================================================================

        let snapshot = builder.finish();
        let artifacts = self.persist(&snapshot, &mut stats);

        tracker.advance(PipelineStage::Done);
        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            duration_ms = stats.total_duration_ms,
            projects = stats.projects_processed,
            projects_failed = stats.projects_failed,
            artifacts = artifacts.len(),
            "Harvest completed"
        );

        Ok(HarvestResult {
            snapshot,
            artifacts,
            stats,
            stage: tracker.stage,
        })
    }

    async fn run_stage<S>(
        &self,
        stage: &S,
        session: &Session,
        input: &S::Input,
    ) -> Result<S::Output, PipelineError>
    where
        S: HarvestStage + ?Sized,
    {
        timeout(self.stage_timeout, stage.execute(session, input))
            .await
            .map_err(|_| self.timed_out(stage.stage_name()))?
            .map_err(|e| PipelineError::StageFailed {
                stage: stage.stage_name().to_string(),
                source: Box::new(e),
            })
    }

    fn timed_out(&self, stage: &str) -> PipelineError {
        PipelineError::StageTimeout {
            stage: stage.to_string(),
            timeout_secs: self.stage_timeout.as_secs(),
        }
    }

    fn extractor_for(&self, category: &ResourceCategory) -> Option<&dyn ConfigExtractor> {
        self.extractors
            .iter()
            .find(|extractor| extractor.category() == *category)
            .map(|extractor| &**extractor)
    }

    async fn extract(
        &self,
        session: &Session,
        project: &Project,
        resource: &Resource,
    ) -> ExtractionOutcome {
        let Some(extractor) = self.extractor_for(&resource.category) else {
            let error = ExtractionError::UnsupportedCategory(resource.category.clone());
            debug!(resource = %resource.name, error = %error, "Resource skipped");
            return ExtractionOutcome::Failed(ExtractionFailure::for_resource(
                project, resource, error,
            ));
        };

        match self.run_stage(extractor, session, resource).await {
            Ok(mut config) => {
                config.link(project, resource);
                let outcome = ExtractionOutcome::from_config(config);
                if let ExtractionOutcome::Degraded(config) = &outcome {
                    warn!(
                        resource = %resource.name,
                        notes = config.notes().len(),
                        "Configuration extracted with gaps"
                    );
                }
                outcome
            }
            Err(e) => {
                warn!(resource = %resource.name, error = %e, "Configuration extraction failed");
                self.capture_failure(session, resource).await;
                ExtractionOutcome::Failed(ExtractionFailure::for_resource(
                    project,
                    resource,
                    e.failure_message(),
                ))
            }
        }
    }

    async fn capture_failure(&self, session: &Session, resource: &Resource) {
        if !self.capture_failures {
            return;
        }
        let Some(sink) = &self.sink else {
            return;
        };
        let label = format!("{}-failure", resource.name);
        match session.capture_image().await {
            Ok(image) => match sink.write_image(&image, &label) {
                Ok(location) => info!(location = %location, "Failure screenshot saved"),
                Err(e) => warn!(error = %e, "Failure screenshot could not be saved"),
            },
            Err(e) => warn!(error = %e, "Failure screenshot could not be taken"),
        }
    }

    /// Writes the project overview and one artifact per non-empty category.
    fn persist(&self, snapshot: &Snapshot, stats: &mut HarvestStats) -> Vec<String> {
        let Some(sink) = &self.sink else {
            return Vec::new();
        };

        let mut artifacts = Vec::new();
        let overview = json!({
            "timestamp": snapshot.timestamp,
            "totals": snapshot.totals,
            "projects": snapshot.projects,
        });
        let written = sink.write_overview(&overview);
        record_artifact("projects overview", written, &mut artifacts, stats);

        for collection in &snapshot.configs {
            if collection.entries.is_empty() {
                continue;
            }
            let category = collection.category.to_string();
            let written = serde_json::to_value(&collection.entries)
                .map_err(SinkError::from)
                .and_then(|data| sink.write_snapshot(&data, &category));
            record_artifact(&category, written, &mut artifacts, stats);
        }
        artifacts
    }
}

fn record_artifact(
    category: &str,
    written: Result<String, SinkError>,
    artifacts: &mut Vec<String>,
    stats: &mut HarvestStats,
) {
    match written {
        Ok(location) => {
            info!(category, location = %location, "Snapshot persisted");
            artifacts.push(location);
        }
        Err(e) => {
            warn!(category, error = %e, "Snapshot could not be persisted");
            stats.artifacts_failed += 1;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::FixtureBrowser;
    use crate::config::Timeouts;
    use crate::harvest::extractors::env_vars::MENU_NOT_FOUND;
    use crate::harvest::fixtures::{self, application_page, card, project_page, projects_page};
    use crate::harvest::record::ResourceConfig;
    use crate::model::{ConfigEntry, ProjectEntry, ResourceStatus};
    use crate::sink::{JsonFileSink, MemorySink};
    use async_trait::async_trait;

    fn session(browser: FixtureBrowser) -> (Session, Arc<FixtureBrowser>) {
        let browser = Arc::new(browser);
        let session = Session::new(browser.clone(), fixtures::base(), Timeouts::immediate());
        (session, browser)
    }

    fn credentials() -> Credentials {
        Credentials::new("admin@example.com", "secret")
    }

    fn pipeline(sink: Arc<MemorySink>) -> HarvestPipeline {
        HarvestPipeline::new(PageSelectors::default())
            .unwrap()
            .with_sink(sink)
    }

    fn configs<'a>(snapshot: &'a Snapshot, category: &str) -> &'a [ConfigEntry] {
        snapshot
            .configs
            .iter()
            .find(|c| c.category.as_str() == category)
            .map(|c| c.entries.as_slice())
            .unwrap_or(&[])
    }

    #[tokio::test]
    async fn test_end_to_end_single_project() {
        let sink = Arc::new(MemorySink::new());
        let (mut session, _) = session(fixtures::console());

        let result = pipeline(sink.clone())
            .execute(&mut session, &credentials())
            .await
            .unwrap();

        assert_eq!(result.stage, PipelineStage::Done);
        let snapshot = &result.snapshot;
        let ProjectEntry::Discovered(production) = &snapshot.projects[0] else {
            panic!("expected a discovered project");
        };
        assert_eq!(production.project.title, "Production");
        assert_eq!(production.project.url, "/project/p1");

        let web = &production.resources.applications()[0];
        assert_eq!(web.name, "web");
        assert_eq!(web.status, ResourceStatus::Running);
        assert!(web.tags.is_empty());
        let db = &production.resources.databases()[0];
        assert_eq!(db.name, "db");
        assert_eq!(db.status, ResourceStatus::Unknown);
        assert_eq!(db.category.as_str(), "Databases");

        let json = serde_json::to_value(&production.resources).unwrap();
        assert_eq!(json["applications"][0]["status"], "running");
        assert_eq!(json["databases"][0]["tags"], json!([]));

        let ConfigEntry::Config(app) = &configs(snapshot, "Applications")[0] else {
            panic!("expected an application config");
        };
        assert_eq!(app.name(), Some("web"));
        assert_eq!(app.linkage().project_name.as_deref(), Some("Production"));
        assert_eq!(configs(snapshot, "Databases").len(), 1);

        let written: Vec<_> = sink.snapshots().into_iter().map(|(c, _)| c).collect();
        assert_eq!(written, vec!["projects", "Applications", "Databases"]);
        assert_eq!(result.artifacts.len(), 3);
        assert_eq!(result.stats.resources_processed, 2);
    }

    #[tokio::test]
    async fn test_failing_project_does_not_stop_the_run() {
        let browser = fixtures::console()
            .with_page(
                "/projects",
                projects_page(&[
                    ("Production", "/project/p1"),
                    ("Staging", "/project/p2"),
                    ("Preview", "/project/p3"),
                ]),
            )
            .with_failing_path("/project/p2")
            .with_page(
                "/project/p3",
                project_page(&[(
                    "Applications",
                    vec![card("preview", "/application/w3", "badge-warning", &[])],
                )]),
            )
            .with_page("/application/w3", application_page("preview", None));
        let (mut session, _) = session(browser);

        let result = pipeline(Arc::new(MemorySink::new()))
            .execute(&mut session, &credentials())
            .await
            .unwrap();

        assert_eq!(result.stage, PipelineStage::Done);
        let projects = &result.snapshot.projects;
        assert_eq!(projects.len(), 3);
        assert!(matches!(projects[0], ProjectEntry::Discovered(_)));
        let ProjectEntry::Failed(failure) = &projects[1] else {
            panic!("expected the second project to fail");
        };
        assert_eq!(failure.entity_name, "Staging");
        assert!(failure.error_message.contains("connection reset"));
        assert!(matches!(projects[2], ProjectEntry::Discovered(_)));

        assert_eq!(result.snapshot.totals.projects_failed, 1);
        assert_eq!(configs(&result.snapshot, "Applications").len(), 2);
    }

    #[tokio::test]
    async fn test_two_tier_resource_failures() {
        let broken = application_page("api", None).replace(
            r#"<input id="ports_exposes" value="3000">"#,
            r#"<span id="ports_exposes">3000</span>"#,
        );
        let browser = fixtures::console()
            .with_page(
                "/project/p1",
                project_page(&[(
                    "Applications",
                    vec![
                        card("web", "/application/w1", "badge-success", &[]),
                        card("api", "/application/w2", "badge-success", &[]),
                    ],
                )]),
            )
            .with_failing_path("/application/w1")
            .with_page("/application/w2", broken);
        let sink = Arc::new(MemorySink::new());
        let (mut session, _) = session(browser);

        let result = pipeline(sink.clone())
            .with_capture_failures(true)
            .execute(&mut session, &credentials())
            .await
            .unwrap();

        let entries = configs(&result.snapshot, "Applications");
        let ConfigEntry::Failure(hard) = &entries[0] else {
            panic!("expected a hard failure for web");
        };
        assert_eq!(hard.entity_name, "web");
        assert_eq!(hard.project_name, "Production");
        assert_eq!(hard.category, Some(ResourceCategory::applications()));

        let ConfigEntry::Config(ResourceConfig::Application(soft)) = &entries[1] else {
            panic!("expected a degraded config for api");
        };
        assert_eq!(soft.network["portsExposes"], None);
        assert!(soft.general["name"].is_some());
        assert_eq!(soft.notes.len(), 1);

        let totals = &result.snapshot.totals.categories[&ResourceCategory::applications()];
        assert_eq!((totals.degraded, totals.failed), (1, 1));
        assert_eq!(sink.image_labels(), vec!["web-failure"]);
    }

    #[tokio::test]
    async fn test_absent_environment_menu_is_not_degraded() {
        let browser = fixtures::console()
            .with_page("/application/w1", application_page("web", None));
        let (mut session, _) = session(browser);

        let result = pipeline(Arc::new(MemorySink::new()))
            .execute(&mut session, &credentials())
            .await
            .unwrap();

        let ConfigEntry::Config(ResourceConfig::Application(app)) =
            &configs(&result.snapshot, "Applications")[0]
        else {
            panic!("expected an application config");
        };
        assert_eq!(app.environment_variables, None);
        assert_eq!(app.environment_variables_note.as_deref(), Some(MENU_NOT_FOUND));
        assert_eq!(result.stats.configs_degraded, 0);
    }

    #[tokio::test]
    async fn test_totals_match_discovered_resources() {
        let (mut session, _) = session(fixtures::console());

        let result = pipeline(Arc::new(MemorySink::new()))
            .execute(&mut session, &credentials())
            .await
            .unwrap();

        for entry in &result.snapshot.projects {
            if let ProjectEntry::Discovered(discovered) = entry {
                assert_eq!(discovered.totals.resources, discovered.resources.len());
                assert_eq!(
                    discovered.totals.categories.values().sum::<usize>(),
                    discovered.resources.len()
                );
            }
        }
        assert_eq!(result.snapshot.totals.resources, 2);
    }

    #[tokio::test]
    async fn test_unsupported_category_is_recorded() {
        let browser = fixtures::console().with_page(
            "/project/p1",
            project_page(&[("Volumes", vec![card("data", "/volume/v1", "", &[])])]),
        );
        let (mut session, _) = session(browser);

        let result = pipeline(Arc::new(MemorySink::new()))
            .execute(&mut session, &credentials())
            .await
            .unwrap();

        let ConfigEntry::Failure(failure) = &configs(&result.snapshot, "Volumes")[0] else {
            panic!("expected a failure entry");
        };
        assert!(failure.error_message.contains("No configuration extractor"));
    }

    #[tokio::test]
    async fn test_configs_follow_page_heading_order() {
        let browser = fixtures::console().with_page(
            "/project/p1",
            project_page(&[
                ("Services", vec![card("stack", "/service/s1", "", &[])]),
                ("Applications", vec![card("web", "/application/w1", "", &[])]),
            ]),
        );
        let (mut session, _) = session(browser);

        let result = pipeline(Arc::new(MemorySink::new()))
            .execute(&mut session, &credentials())
            .await
            .unwrap();

        let order: Vec<_> = result
            .snapshot
            .configs
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(order, vec!["Services", "Applications"]);
    }

    #[tokio::test]
    async fn test_projects_category_does_not_replace_overview() {
        let output = tempfile::tempdir().unwrap();
        let browser = fixtures::console().with_page(
            "/project/p1",
            project_page(&[("Projects", vec![card("nested", "/project/p9", "", &[])])]),
        );
        let (mut session, _) = session(browser);

        let result = HarvestPipeline::new(PageSelectors::default())
            .unwrap()
            .with_sink(Arc::new(JsonFileSink::new(output.path())))
            .execute(&mut session, &credentials())
            .await
            .unwrap();

        assert_eq!(result.artifacts.len(), 2);
        assert_eq!(result.stats.artifacts_failed, 0);
        let files = std::fs::read_dir(output.path()).unwrap().count();
        assert_eq!(files, result.artifacts.len());
        assert!(result.artifacts[0].contains("projects_overview_"));
        let projects: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&result.artifacts[1]).unwrap()).unwrap();
        assert!(projects[0]["errorMessage"].is_string());
    }

    #[tokio::test]
    async fn test_rejected_login_is_fatal() {
        let sink = Arc::new(MemorySink::new());
        let login = r#"<form>
            <input name="email"><input name="password"><button type="submit">Login</button>
          </form>"#;
        let browser = fixtures::console().with_page("/login", login);
        let (mut session, _) = session(browser);

        let err = pipeline(sink.clone())
            .execute(&mut session, &credentials())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::AuthenticationFailed(_)));
        assert!(sink.snapshots().is_empty());
    }

    #[tokio::test]
    async fn test_empty_dashboard_is_fatal() {
        let browser = fixtures::console().with_page("/projects", projects_page(&[]));
        let (mut session, _) = session(browser);

        let err = pipeline(Arc::new(MemorySink::new()))
            .execute(&mut session, &credentials())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::NoProjects));
    }

    struct RejectingSink;

    impl SnapshotSink for RejectingSink {
        fn write_snapshot(
            &self,
            _data: &serde_json::Value,
            _category: &str,
        ) -> Result<String, SinkError> {
            Err(std::io::Error::other("disk full").into())
        }

        fn write_image(&self, _bytes: &[u8], _label: &str) -> Result<String, SinkError> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    #[tokio::test]
    async fn test_sink_failures_do_not_abort() {
        let (mut session, _) = session(fixtures::console());

        let result = HarvestPipeline::new(PageSelectors::default())
            .unwrap()
            .with_sink(Arc::new(RejectingSink))
            .execute(&mut session, &credentials())
            .await
            .unwrap();

        assert!(result.artifacts.is_empty());
        assert_eq!(result.stats.artifacts_failed, 3);
        assert_eq!(result.snapshot.projects.len(), 1);
    }

    struct SlowExtractor;

    #[async_trait]
    impl HarvestStage for SlowExtractor {
        type Input = Resource;
        type Output = ResourceConfig;
        type Error = ExtractionError;

        async fn execute(
            &self,
            _session: &Session,
            _resource: &Resource,
        ) -> Result<ResourceConfig, ExtractionError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(ExtractionError::UnsupportedCategory(ResourceCategory::databases()))
        }

        fn stage_name(&self) -> &'static str {
            "slow_database"
        }
    }

    impl ConfigExtractor for SlowExtractor {
        fn category(&self) -> ResourceCategory {
            ResourceCategory::databases()
        }
    }

    #[tokio::test]
    async fn test_stage_timeout_fails_only_that_resource() {
        let (mut session, _) = session(fixtures::console());

        let result = HarvestPipeline::new(PageSelectors::default())
            .unwrap()
            .with_extractor(Box::new(SlowExtractor))
            .with_stage_timeout(Duration::from_millis(200))
            .execute(&mut session, &credentials())
            .await
            .unwrap();

        let ConfigEntry::Failure(failure) = &configs(&result.snapshot, "Databases")[0] else {
            panic!("expected a timed out database");
        };
        assert!(failure.error_message.contains("slow_database"));
        assert!(matches!(
            configs(&result.snapshot, "Applications")[0],
            ConfigEntry::Config(_)
        ));
    }
}
