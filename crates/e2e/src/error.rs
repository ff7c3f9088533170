//! Error types for the DocSearch E2E suite

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Site server failed to start: {0}")]
    ServerStartup(String),

    #[error("Site server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Playwright not found. Install with: npm install -D @playwright/test && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid scenario '{scenario}': {reason}")]
    InvalidScenario { scenario: String, reason: String },

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl E2eError {
    pub(crate) fn invalid(scenario: &str, reason: impl Into<String>) -> Self {
        E2eError::InvalidScenario {
            scenario: scenario.to_string(),
            reason: reason.into(),
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
