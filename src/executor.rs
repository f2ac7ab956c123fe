use crate::config::{Credentials, HarvesterConfig, Timeouts};
use crate::dom::SelectorError;
use crate::harvest::{HarvestPipeline, HarvestResult, PipelineError};
use crate::session::Session;
use crate::sink::SnapshotSink;
use crate::traits::{Browser, BrowserError};
use reqwest::Url;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, instrument};

/// Owns the browser and runs harvests against it one at a time.
pub struct HarvesterExecutor {
    browser: Arc<dyn Browser>,
    pipeline: HarvestPipeline,
    base_url: Url,
    timeouts: Timeouts,
    semaphore: Arc<Semaphore>,
}

impl HarvesterExecutor {
    pub fn new(
        browser: Arc<dyn Browser>,
        config: &HarvesterConfig,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<Self, SelectorError> {
        let pipeline = HarvestPipeline::new(config.selectors.clone())?
            .with_sink(sink)
            .with_capture_failures(config.capture_failures);
        Ok(Self::with_pipeline(
            browser,
            config.base_url.clone(),
            config.timeouts,
            pipeline,
        ))
    }

    pub fn with_pipeline(
        browser: Arc<dyn Browser>,
        base_url: Url,
        timeouts: Timeouts,
        pipeline: HarvestPipeline,
    ) -> Self {
        Self {
            browser,
            pipeline,
            base_url,
            timeouts,
            // one session per browser
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    #[instrument(skip(self, credentials))]
    pub async fn execute(&self, credentials: &Credentials) -> Result<HarvestResult, PipelineError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| PipelineError::ExecutorClosed(format!("Semaphore error: {}", e)))?;

        info!("Starting harvest for console: {}", self.base_url);

        let mut session = Session::new(self.browser.clone(), self.base_url.clone(), self.timeouts);
        let result = self.pipeline.execute(&mut session, credentials).await;

        info!("Finished harvest for console: {}", self.base_url);
        result
    }

    /// Waits for any running harvest, refuses new ones and closes the browser.
    pub async fn shutdown(&self) -> Result<(), BrowserError> {
        if let Ok(permit) = self.semaphore.acquire().await {
            self.semaphore.close();
            drop(permit);
        }
        self.browser.close().await
    }
}
