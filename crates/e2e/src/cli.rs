//! Command line of the harness binary

use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::SuiteConfig;
use crate::error::E2eResult;
use crate::runner::ScenarioFilter;

/// Set to `1` to let the harness start browsers
pub const LIVE_ENV: &str = "DOCSEARCH_E2E_LIVE";

/// Whether `DOCSEARCH_E2E_LIVE=1` is set
pub fn live_enabled() -> bool {
    std::env::var(LIVE_ENV).as_deref() == Ok("1")
}

#[derive(Parser, Debug)]
#[command(name = "docsearch-e2e")]
#[command(about = "E2E suite for the DocSearch modal")]
pub struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "DOCSEARCH_E2E_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the documentation site
    #[arg(long)]
    pub base_url: Option<String>,

    /// Run only this group ("open modal", "search", ...)
    #[arg(short, long)]
    pub group: Option<String>,

    /// Run only scenarios with this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Run only scenarios whose name contains this text
    #[arg(short, long)]
    pub name: Option<String>,

    /// Scenarios to run concurrently
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Directory with extra YAML scenarios
    #[arg(short, long)]
    pub scenarios: Option<PathBuf>,

    /// Output directory for results
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// List the selected scenarios and exit
    #[arg(long)]
    pub list: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

/// What the harness should do with its command line
#[derive(Debug)]
pub enum Invocation {
    Run(Args),
    Skip(String),
}

/// Decide between running and skipping before arguments are enforced.
///
/// Plain `cargo test` hands its filters and libtest flags to every test
/// target, so unless the suite is live an unparsable command line is a skip.
pub fn invocation<I, T>(argv: I, live: bool) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let skip = || Invocation::Skip(format!("set {}=1 to run it", LIVE_ENV));
    match Args::try_parse_from(argv) {
        Ok(args) if live || args.list => Ok(Invocation::Run(args)),
        Ok(_) => Ok(skip()),
        Err(_) if !live => Ok(skip()),
        Err(e) => Err(e),
    }
}

impl Args {
    /// Apply command line overrides, the highest-precedence config layer
    pub fn apply(&self, config: &mut SuiteConfig) -> E2eResult<()> {
        if let Some(base_url) = &self.base_url {
            config.site.base_url = base_url.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(browser) = &self.browser {
            config.browser.browser = browser.parse()?;
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(dir) = &self.scenarios {
            config.scenarios_dir = Some(dir.clone());
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        config.validate()
    }

    pub fn filter(&self) -> ScenarioFilter {
        ScenarioFilter {
            group: self.group.clone(),
            tag: self.tag.clone(),
            name: self.name.clone(),
        }
    }
}
