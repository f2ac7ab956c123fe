pub mod browser;
pub mod config;
pub mod dom;
pub mod executor;
pub mod harvest;
pub mod logging;
pub mod model;
pub mod session;
pub mod sink;
pub mod traits;

// Re-export common types for convenience
pub use config::{ConfigError, Credentials, HarvesterConfig, Timeouts};
pub use executor::*;
pub use harvest::{render_report, HarvestPipeline, HarvestResult, PipelineError, ResourceConfig};
pub use model::*;
pub use session::{Authenticator, Session, SessionError};
pub use sink::{JsonFileSink, MemorySink, SnapshotSink};
pub use traits::*;
