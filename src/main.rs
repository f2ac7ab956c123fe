use config_harvester::browser::{WebDriverBrowser, WebDriverOptions};
use config_harvester::logging::{self, LoggingConfig};
use config_harvester::{
    render_report, Credentials, HarvesterConfig, HarvesterExecutor, JsonFileSink,
};

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, warn, Level};

#[derive(Parser, Debug)]
#[command(
    name = "config-harvester",
    version,
    about = "Snapshot the configuration of every project in an admin console"
)]
struct CliArgs {
    /// Console base URL
    #[arg(long, env = "HARVESTER_URL")]
    url: String,

    /// Login identity
    #[arg(long, env = "HARVESTER_EMAIL")]
    email: String,

    /// Login secret
    #[arg(long, env = "HARVESTER_PASSWORD", hide_env_values = true)]
    password: String,

    /// Directory receiving the snapshot files
    #[arg(long, env = "HARVESTER_OUTPUT_DIR", default_value = "snapshots")]
    output_dir: PathBuf,

    /// WebDriver server endpoint (chromedriver, geckodriver)
    #[arg(long, env = "HARVESTER_WEBDRIVER_URL", default_value = "http://localhost:4444")]
    webdriver_url: String,

    /// Browser requested from the WebDriver server
    #[arg(long, default_value = "chrome")]
    browser: String,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// JSON file overriding document selectors
    #[arg(long)]
    selectors: Option<PathBuf>,

    /// Save a screenshot whenever a resource fails to load
    #[arg(long)]
    capture_failures: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    // .env only fills variables the environment does not already set
    let dotenv = dotenvy::dotenv();
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    if let Err(e) = &dotenv {
        debug!(error = %e, "No .env file loaded");
    }

    let exit_code = match run(&args).await {
        Ok(report) => {
            println!("{}", report);
            0
        }
        Err(e) => {
            error!("Harvest failed: {}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(args: &CliArgs) -> Result<String, Box<dyn std::error::Error>> {
    let mut config = HarvesterConfig::new(&args.url, &args.output_dir)?
        .with_capture_failures(args.capture_failures);
    if let Some(path) = &args.selectors {
        config = config.with_selector_file(path)?;
    }

    let options = WebDriverOptions {
        browser_name: args.browser.clone(),
        headless: !args.headed,
        settle_timeout: config.timeouts.settle,
        ..Default::default()
    };
    let browser = Arc::new(WebDriverBrowser::connect(&args.webdriver_url, options).await?);
    let sink = Arc::new(JsonFileSink::new(&config.output_dir));
    let executor = HarvesterExecutor::new(browser, &config, sink)?;

    let credentials = Credentials::new(args.email.clone(), args.password.clone());
    let result = executor.execute(&credentials).await;

    if let Err(e) = executor.shutdown().await {
        warn!(error = %e, "Browser session did not close cleanly");
    }

    let result = result?;
    if result.stats.artifacts_failed > 0 {
        warn!(failed = result.stats.artifacts_failed, "Some snapshot files were not written");
    }
    Ok(render_report(&result.snapshot))
}

fn init_logging_from_args(args: &CliArgs) {
    let mut config = LoggingConfig::from_env();
    if let Some(level) = &args.log_level {
        config.level = logging::parse_level(level);
    } else if args.verbose {
        config.level = Level::DEBUG;
    }
    if args.json_logs {
        config.use_json = true;
    }
    logging::init_logging(config);
}
