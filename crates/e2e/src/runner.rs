//! Main test runner that orchestrates the site server, scenarios and Playwright

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};
use crate::playwright::{PlaywrightHandle, ScriptOutcome, StepResult};
use crate::scenario::{Scenario, Step};
use crate::server::{self, ServerHandle};
use crate::suite;

/// What kind of expectation a failed scenario missed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An element never reached the expected visibility, focus or text
    Element,
    /// The search response never arrived
    Network,
    /// The page could not be loaded
    Navigation,
    /// The script itself broke (crash, timeout, missing tooling)
    Runner,
}

impl FailureKind {
    /// Classify the failure of `step` from its error message
    pub fn classify(step: &Step, message: &str) -> Self {
        match step {
            Step::Navigate { .. } | Step::WaitForLoad { .. } => FailureKind::Navigation,
            Step::FillAwaitingResponse { .. } | Step::Group { .. }
                if message.contains("waitForResponse") =>
            {
                FailureKind::Network
            }
            Step::Group { .. } if message.contains("page.goto") => FailureKind::Navigation,
            _ => FailureKind::Element,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    /// Name of the failing step, if the script got that far
    pub step: Option<String>,
    pub message: String,
    /// Steps that completed before the failure
    pub trail: Vec<String>,
    pub screenshot: Option<PathBuf>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub group: String,
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub failure: Option<Failure>,
}

impl ScenarioResult {
    pub fn full_name(&self) -> String {
        format!("{} > {}", self.group, self.name)
    }

    fn from_outcome(scenario: &Scenario, outcome: ScriptOutcome, duration_ms: u64) -> Self {
        let failure = outcome.failed_step().map(|failed| {
            let message = failed.error.clone().unwrap_or_default();
            let kind = scenario
                .steps
                .get(failed.index)
                .map(|step| FailureKind::classify(step, &message))
                .unwrap_or(FailureKind::Runner);
            Failure {
                kind,
                step: Some(failed.step_name.clone()),
                message,
                trail: outcome
                    .steps
                    .iter()
                    .take_while(|s| s.success)
                    .map(|s| s.step_name.clone())
                    .collect(),
                screenshot: outcome.failure_screenshot.clone(),
            }
        });

        Self {
            group: scenario.group.clone(),
            name: scenario.name.clone(),
            success: failure.is_none(),
            duration_ms,
            steps: outcome.steps,
            failure,
        }
    }

    fn from_error(scenario: &Scenario, err: &E2eError, duration_ms: u64) -> Self {
        Self {
            group: scenario.group.clone(),
            name: scenario.name.clone(),
            success: false,
            duration_ms,
            steps: vec![],
            failure: Some(Failure {
                kind: match err {
                    E2eError::Navigation(_) => FailureKind::Navigation,
                    _ => FailureKind::Runner,
                },
                step: None,
                message: err.to_string(),
                trail: vec![],
                screenshot: None,
            }),
        }
    }

    /// Turn a failed result into an error naming the unmet expectation
    pub fn ensure_passed(&self) -> E2eResult<()> {
        match &self.failure {
            None => Ok(()),
            Some(failure) => Err(E2eError::StepFailed {
                step: format!(
                    "{} / {}",
                    self.full_name(),
                    failure.step.as_deref().unwrap_or("<setup>")
                ),
                reason: failure.message.clone(),
            }),
        }
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl TestSuiteResult {
    /// The suite passes only if every scenario passed
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Selects scenarios by group, tag and name; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct ScenarioFilter {
    pub group: Option<String>,
    pub tag: Option<String>,
    /// Case-insensitive substring of `group > name`
    pub name: Option<String>,
}

impl ScenarioFilter {
    pub fn matches(&self, scenario: &Scenario) -> bool {
        let group = self
            .group
            .as_ref()
            .map_or(true, |g| scenario.group.eq_ignore_ascii_case(g));
        let tag = self
            .tag
            .as_ref()
            .map_or(true, |t| scenario.tags.iter().any(|st| st == t));
        let name = self.name.as_ref().map_or(true, |n| {
            scenario
                .full_name()
                .to_lowercase()
                .contains(&n.to_lowercase())
        });
        group && tag && name
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: SuiteConfig,

    /// Running site server (if the runner started one)
    server: Option<ServerHandle>,
}

impl TestRunner {
    pub fn new(config: SuiteConfig) -> Self {
        Self {
            config,
            server: None,
        }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Serve the site if configured, otherwise make sure it answers
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(()); // Already running
        }

        match self.config.server.clone() {
            Some(server_config) => {
                let server = ServerHandle::spawn(server_config).await?;
                self.config.site.base_url = server.base_url().to_string();
                self.server = Some(server);
            }
            None => server::probe(&self.config.root_url()).await?,
        }
        Ok(())
    }

    /// Stop the server
    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Built-in scenarios followed by those in the scenarios directory
    pub fn scenarios(&self) -> E2eResult<Vec<Scenario>> {
        let mut scenarios = suite::builtin(&self.config)?;
        if let Some(dir) = &self.config.scenarios_dir {
            scenarios.extend(Scenario::load_all(dir, &self.config)?);
        }
        Ok(scenarios)
    }

    /// Run every scenario the filter selects
    pub async fn run(&mut self, filter: &ScenarioFilter) -> E2eResult<TestSuiteResult> {
        let scenarios: Vec<Scenario> = self
            .scenarios()?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();
        self.run_scenarios(scenarios).await
    }

    /// Run scenarios, up to `workers` at a time, each in its own browser
    pub async fn run_scenarios(&mut self, scenarios: Vec<Scenario>) -> E2eResult<TestSuiteResult> {
        self.config.validate()?;
        let started_at = Utc::now();
        let start = Instant::now();

        // Ensure the site is up
        self.start_server().await?;

        let playwright = Arc::new(PlaywrightHandle::new(
            &self.config.site.base_url,
            &self.config.project_dir,
            &self.config.output_dir,
            self.config.browser.clone(),
        )?);

        info!(
            "Running {} scenario(s) against {} with {} worker(s)...",
            scenarios.len(),
            self.config.site.base_url,
            self.config.workers
        );

        let permits = Arc::new(Semaphore::new(self.config.workers));
        let mut tasks = JoinSet::new();
        let scenarios: Vec<Arc<Scenario>> = scenarios.into_iter().map(Arc::new).collect();

        for (index, scenario) in scenarios.iter().enumerate() {
            let playwright = Arc::clone(&playwright);
            let permits = Arc::clone(&permits);
            let scenario = Arc::clone(scenario);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (index, run_one(&playwright, &scenario).await)
            });
        }

        let mut finished = Vec::with_capacity(scenarios.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(done) => finished.push(done),
                Err(e) => error!("Scenario task failed: {}", e),
            }
        }
        let results = in_catalogue_order(&scenarios, finished);

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("Test Results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        Ok(TestSuiteResult {
            started_at,
            base_url: self.config.site.base_url.clone(),
            total: results.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

/// Put finished `(index, result)` pairs back in catalogue order. A scenario
/// whose task never reported counts as a runner failure.
fn in_catalogue_order<S: AsRef<Scenario>>(
    scenarios: &[S],
    finished: Vec<(usize, ScenarioResult)>,
) -> Vec<ScenarioResult> {
    let mut slots: Vec<Option<ScenarioResult>> = vec![None; scenarios.len()];
    for (index, result) in finished {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(result);
        }
    }

    slots
        .into_iter()
        .zip(scenarios)
        .map(|(slot, scenario)| {
            slot.unwrap_or_else(|| {
                let err = E2eError::Playwright("scenario task aborted".to_string());
                ScenarioResult::from_error(scenario.as_ref(), &err, 0)
            })
        })
        .collect()
}

async fn run_one(playwright: &PlaywrightHandle, scenario: &Scenario) -> ScenarioResult {
    debug!("Running scenario: {}", scenario.full_name());
    let start = Instant::now();
    let outcome = playwright.run(scenario).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    let result = match outcome {
        Ok(outcome) => ScenarioResult::from_outcome(scenario, outcome, duration_ms),
        Err(e) => ScenarioResult::from_error(scenario, &e, duration_ms),
    };

    match &result.failure {
        None => info!("✓ {} ({} ms)", result.full_name(), result.duration_ms),
        Some(failure) => {
            error!(
                "✗ {} - {}",
                result.full_name(),
                failure.step.as_deref().unwrap_or("<setup>")
            );
            error!("    {:?}: {}", failure.kind, failure.message);
            if !failure.trail.is_empty() {
                error!("    after: {}", failure.trail.join(" -> "));
            }
            if let Some(path) = &failure.screenshot {
                error!("    screenshot: {}", path.display());
            }
        }
    }
    result
}
