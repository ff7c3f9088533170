//! Playwright browser automation
//!
//! Each scenario is compiled into one Node.js script that launches its own
//! browser, runs every step in order and reports progress on stdout as one
//! JSON line per step. Nothing is shared between scripts, so every scenario
//! starts from a clean browser context.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};
use crate::scenario::{Scenario, Step};

/// Marks the stdout lines that carry step events
const EVENT_PREFIX: &str = "__docsearch_e2e__ ";

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid ANSI pattern"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Bound for actions and polling assertions
    pub timeout_ms: u64,

    /// Bound for waiting on a search response
    pub network_timeout_ms: u64,

    /// Hard limit for a whole scenario script
    pub scenario_timeout_ms: u64,

    /// Save a full-page screenshot when a step fails
    pub screenshot_on_failure: bool,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            timeout_ms: 5000,
            network_timeout_ms: 10_000,
            scenario_timeout_ms: 120_000,
            screenshot_on_failure: true,
        }
    }
}

/// Result of executing a test step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub index: usize,
    pub step_name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// What one scenario script reported
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    /// Steps that ran, in order; the last one is the failure if any failed
    pub steps: Vec<StepResult>,
    pub failure_screenshot: Option<PathBuf>,
}

impl ScriptOutcome {
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| !s.success)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EventStatus {
    Passed,
    Failed,
}

#[derive(Debug, Deserialize)]
struct StepEvent {
    step: usize,
    status: EventStatus,
    duration_ms: u64,
    #[serde(default)]
    error: Option<String>,
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    /// Base URL of the site under test
    base_url: String,

    /// Node project that provides the Playwright packages
    project_dir: PathBuf,

    /// Directory for failure screenshots
    screenshot_dir: PathBuf,

    config: PlaywrightConfig,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(
        base_url: &str,
        project_dir: &Path,
        output_dir: &Path,
        config: PlaywrightConfig,
    ) -> E2eResult<Self> {
        Self::check_playwright_installed(project_dir)?;

        let handle = Self::unverified(base_url, project_dir, output_dir, config);
        std::fs::create_dir_all(&handle.screenshot_dir)?;
        Ok(handle)
    }

    /// A handle that generates scripts without checking for Playwright
    pub fn unverified(
        base_url: &str,
        project_dir: &Path,
        output_dir: &Path,
        config: PlaywrightConfig,
    ) -> Self {
        Self {
            base_url: base_url.to_string(),
            project_dir: project_dir.to_path_buf(),
            screenshot_dir: output_dir.join("screenshots"),
            config,
        }
    }

    /// Check if Playwright is installed
    fn check_playwright_installed(project_dir: &Path) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Where the failure screenshot of `scenario` goes
    pub fn screenshot_path(&self, scenario: &Scenario) -> Option<PathBuf> {
        self.config
            .screenshot_on_failure
            .then(|| self.screenshot_dir.join(format!("{}.png", slug(&scenario.full_name()))))
    }

    /// Build the Playwright script for a scenario
    pub fn build_script(&self, scenario: &Scenario) -> E2eResult<String> {
        let mut script = String::new();
        let timeout = self.config.timeout_ms;

        // Header
        write!(
            script,
            r#"// {title}
const playwright = require('playwright');
const {{ expect: baseExpect }} = require('@playwright/test');
const expect = baseExpect.configure({{ timeout: {timeout} }});

function report(event) {{
  console.log({prefix} + JSON.stringify(event));
}}

(async () => {{
  const browser = await playwright[{browser}].launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    baseURL: {base_url},
    viewport: {{ width: {width}, height: {height} }},
  }});
  const page = await context.newPage();
  page.setDefaultTimeout({timeout});
  const urls = {{}};
  let current = 0;
  let started = Date.now();

  try {{
"#,
            title = scenario.full_name().replace('\n', " "),
            prefix = js(EVENT_PREFIX)?,
            browser = js(self.config.browser.as_str())?,
            headless = self.config.headless,
            base_url = js(&self.base_url)?,
            width = self.config.viewport_width,
            height = self.config.viewport_height,
            timeout = timeout,
        )
        .map_err(fmt_error)?;

        for (i, step) in scenario.steps.iter().enumerate() {
            write!(
                script,
                "\n    // Step {}: {}\n    current = {}; started = Date.now();\n",
                i + 1,
                step.name().replace('\n', " "),
                i
            )
            .map_err(fmt_error)?;
            self.step_to_js(step, &mut script, 2)?;
            writeln!(
                script,
                "    report({{ step: {}, status: 'passed', duration_ms: Date.now() - started }});",
                i
            )
            .map_err(fmt_error)?;
        }

        let screenshot = match self.screenshot_path(scenario) {
            Some(path) => format!(
                "    await page.screenshot({{ path: {}, fullPage: true }}).catch(() => {{}});\n",
                js(&path.to_string_lossy())?
            ),
            None => String::new(),
        };

        // Footer
        write!(
            script,
            r#"  }} catch (error) {{
    report({{
      step: current,
      status: 'failed',
      duration_ms: Date.now() - started,
      error: String((error && error.message) || error),
    }});
{screenshot}    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})().catch((error) => {{
  console.error(error);
  process.exit(2);
}});
"#,
            screenshot = screenshot,
        )
        .map_err(fmt_error)?;

        Ok(script)
    }

    /// Append the JavaScript for one step, wrapped in its own block
    fn step_to_js(&self, step: &Step, out: &mut String, depth: usize) -> E2eResult<()> {
        let pad = "  ".repeat(depth);
        let line = |out: &mut String, code: String| -> E2eResult<()> {
            writeln!(out, "{}{}", pad, code).map_err(fmt_error)
        };

        match step {
            Step::Navigate { url } => {
                line(out, "{".to_string())?;
                line(out, format!("  const response = await page.goto({});", js(url)?))?;
                line(
                    out,
                    format!(
                        "  if (response && !response.ok()) throw new Error('navigation to ' + {} + ' returned HTTP ' + response.status());",
                        js(url)?
                    ),
                )?;
                line(out, "}".to_string())?;
            }
            Step::WaitForLoad { state } => {
                line(out, format!("await page.waitForLoadState({});", js(state.as_str())?))?;
            }
            Step::Click { selector, force, position } => {
                let mut options = serde_json::Map::new();
                if *force {
                    options.insert("force".to_string(), serde_json::Value::Bool(true));
                }
                if let Some(position) = position {
                    options.insert("position".to_string(), serde_json::to_value(position)?);
                }
                line(
                    out,
                    format!(
                        "await page.locator({}).first().click({});",
                        js(selector)?,
                        serde_json::Value::Object(options)
                    ),
                )?;
            }
            Step::Fill { selector, value } => {
                line(
                    out,
                    format!("await page.locator({}).first().fill({});", js(selector)?, js(value)?),
                )?;
            }
            Step::FillAwaitingResponse { selector, value, url_pattern, timeout_ms } => {
                let timeout = timeout_ms.unwrap_or(self.config.network_timeout_ms);
                line(out, "{".to_string())?;
                line(out, format!("  const pattern = new RegExp({});", js(url_pattern)?))?;
                line(
                    out,
                    format!(
                        "  const response = page.waitForResponse((r) => pattern.test(r.url()), {{ timeout: {} }});",
                        timeout
                    ),
                )?;
                // the fill below may throw before the response settles
                line(out, "  response.catch(() => {});".to_string())?;
                line(
                    out,
                    format!("  await page.locator({}).first().fill({});", js(selector)?, js(value)?),
                )?;
                line(out, "  await response;".to_string())?;
                line(out, "}".to_string())?;
            }
            Step::Press { key } => {
                line(out, format!("await page.keyboard.press({});", js(key)?))?;
            }
            Step::Sleep { ms } => {
                line(out, format!("await page.waitForTimeout({});", ms))?;
            }
            Step::Wait { selector, state, timeout_ms } => {
                line(
                    out,
                    format!(
                        "await page.locator({}).first().waitFor({{ state: {}, timeout: {} }});",
                        js(selector)?,
                        js(state.as_str())?,
                        timeout_ms.unwrap_or(self.config.timeout_ms)
                    ),
                )?;
            }
            Step::AssertVisible { selector } => {
                line(
                    out,
                    format!("await expect(page.locator({}).first()).toBeVisible();", js(selector)?),
                )?;
            }
            Step::AssertHidden { selector } => {
                line(
                    out,
                    format!(
                        "await expect(page.locator({}).locator('visible=true')).toHaveCount(0);",
                        js(selector)?
                    ),
                )?;
            }
            Step::AssertFocused { selector } => {
                line(
                    out,
                    format!("await expect(page.locator({}).first()).toBeFocused();", js(selector)?),
                )?;
            }
            Step::AssertTextVisible { text } => {
                line(
                    out,
                    format!("await expect(page.getByText({}).first()).toBeVisible();", js(text)?),
                )?;
            }
            Step::AssertClass { selector, class, present } => {
                let pattern = format!(r"(^|\s){}(\s|$)", regex::escape(class));
                let negate = if *present { "" } else { "not." };
                line(
                    out,
                    format!(
                        "await expect(page.locator({}).first()).{}toHaveClass(new RegExp({}));",
                        js(selector)?,
                        negate,
                        js(&pattern)?
                    ),
                )?;
            }
            Step::RecordUrl { name } => {
                line(out, format!("urls[{}] = page.url();", js(name)?))?;
            }
            Step::AssertUrlChanged { from } => {
                line(out, format!("await expect(page).not.toHaveURL(urls[{}]);", js(from)?))?;
            }
            Step::Group { steps, .. } => {
                for inner in steps {
                    self.step_to_js(inner, out, depth)?;
                }
            }
            Step::Log { message } => {
                line(out, format!("console.log('[TEST] ' + {});", js(message)?))?;
            }
        }
        Ok(())
    }

    /// Run one scenario in a fresh browser
    pub async fn run(&self, scenario: &Scenario) -> E2eResult<ScriptOutcome> {
        let script = self.build_script(scenario)?;

        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("scenario.js");
        tokio::fs::write(&script_path, &script).await?;

        debug!("Running Playwright script for '{}': {}", scenario.full_name(), script_path.display());

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .current_dir(&self.project_dir)
            .env("NODE_PATH", self.project_dir.join("node_modules"))
            .kill_on_drop(true);
        let output = cmd.output();

        let limit = Duration::from_millis(self.config.scenario_timeout_ms);
        let output = tokio::time::timeout(limit, output).await.map_err(|_| {
            E2eError::Timeout(format!(
                "scenario '{}' after {} ms",
                scenario.full_name(),
                self.config.scenario_timeout_ms
            ))
        })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let steps = parse_events(&stdout, &scenario.steps)?;

        let failed = steps.iter().any(|s| !s.success);
        if !failed && (!output.status.success() || steps.len() != scenario.steps.len()) {
            return Err(E2eError::Playwright(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }

        let failure_screenshot = if failed {
            match self.screenshot_path(scenario) {
                Some(path) if path.exists() => Some(path),
                Some(path) => {
                    warn!("No failure screenshot at {}", path.display());
                    None
                }
                None => None,
            }
        } else {
            None
        };

        Ok(ScriptOutcome {
            steps,
            failure_screenshot,
        })
    }
}

/// Collect step events from script output, ignoring every other line
pub fn parse_events(stdout: &str, steps: &[Step]) -> E2eResult<Vec<StepResult>> {
    let mut results = Vec::new();
    for line in stdout.lines() {
        let Some(payload) = line.strip_prefix(EVENT_PREFIX) else {
            continue;
        };
        let event: StepEvent = serde_json::from_str(payload)?;
        let step_name = steps
            .get(event.step)
            .map(Step::name)
            .ok_or_else(|| E2eError::Playwright(format!("event for unknown step {}", event.step)))?;
        results.push(StepResult {
            index: event.step,
            step_name,
            success: matches!(event.status, EventStatus::Passed),
            duration_ms: event.duration_ms,
            error: event.error.map(|e| clean_error(&e)),
        });
    }
    Ok(results)
}

/// Strip terminal colors from Playwright's assertion messages
pub fn clean_error(message: &str) -> String {
    ANSI_ESCAPE.replace_all(message, "").trim().to_string()
}

/// Encode a string as a JavaScript string literal
fn js(value: &str) -> E2eResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn fmt_error(e: std::fmt::Error) -> E2eError {
    E2eError::Playwright(format!("script generation failed: {}", e))
}

/// File-name-safe version of a scenario name
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}
