//! Scenarios and the step vocabulary they are written in

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::debug;

use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};
use crate::helpers::ScenarioBuilder;
use crate::model::{CloseTrigger, NavKey, OpenTrigger};

/// A named sequence of steps run in one fresh browser context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Group this scenario belongs to ("open modal", "search", ...)
    pub group: String,

    pub name: String,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

impl Scenario {
    /// `group > name`, unique within a suite
    pub fn full_name(&self) -> String {
        format!("{} > {}", self.group, self.name)
    }
}

/// A single primitive browser action or assertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a URL (relative to the base URL)
    Navigate { url: String },

    /// Wait until the page reaches a load state
    WaitForLoad {
        #[serde(default)]
        state: LoadState,
    },

    /// Click an element
    Click {
        selector: String,
        /// Skip Playwright's actionability checks
        #[serde(default)]
        force: bool,
        /// Click at this offset from the element's top-left corner
        #[serde(default)]
        position: Option<Position>,
    },

    /// Fill an input field
    Fill { selector: String, value: String },

    /// Fill an input field and block until a response whose URL matches
    /// `url_pattern` arrives. The response listener is attached before the
    /// input changes.
    FillAwaitingResponse {
        selector: String,
        value: String,
        url_pattern: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Press a key or combination on the page keyboard
    Press { key: String },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Wait for an element to reach a state
    Wait {
        selector: String,
        #[serde(default)]
        state: WaitState,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    AssertVisible { selector: String },

    /// Passes when the element is invisible or absent
    AssertHidden { selector: String },

    AssertFocused { selector: String },

    /// Some element containing `text` is visible
    AssertTextVisible { text: String },

    /// Whether the element's class list contains `class`
    AssertClass {
        selector: String,
        class: String,
        #[serde(default = "default_true")]
        present: bool,
    },

    /// Remember the current URL under `name`
    RecordUrl { name: String },

    /// The current URL differs from the one recorded under `from`
    AssertUrlChanged { from: String },

    /// Run several steps as one reported step; it fails if any part fails
    Group { label: String, steps: Vec<Step> },

    /// Log a message (for debugging)
    Log { message: String },
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Load,
    DomContentLoaded,
    #[default]
    NetworkIdle,
}

impl LoadState {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadState::Load => "load",
            LoadState::DomContentLoaded => "domcontentloaded",
            LoadState::NetworkIdle => "networkidle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Step {
    /// Short label used in reports
    pub fn name(&self) -> String {
        match self {
            Step::Navigate { url } => format!("navigate:{}", url),
            Step::WaitForLoad { state } => format!("wait_for_load:{}", state.as_str()),
            Step::Click { selector, .. } => format!("click:{}", selector),
            Step::Fill { selector, .. } => format!("fill:{}", selector),
            Step::FillAwaitingResponse { selector, value, .. } => {
                format!("query:{}={:?}", selector, value)
            }
            Step::Press { key } => format!("press:{}", key),
            Step::Sleep { ms } => format!("sleep:{}ms", ms),
            Step::Wait { selector, state, .. } => {
                format!("wait:{}:{}", selector, state.as_str())
            }
            Step::AssertVisible { selector } => format!("assert_visible:{}", selector),
            Step::AssertHidden { selector } => format!("assert_hidden:{}", selector),
            Step::AssertFocused { selector } => format!("assert_focused:{}", selector),
            Step::AssertTextVisible { text } => format!("assert_text:{:?}", text),
            Step::AssertClass { selector, class, present } => {
                let op = if *present { "has" } else { "lacks" };
                format!("assert_class:{}:{}:{}", selector, op, class)
            }
            Step::RecordUrl { name } => format!("record_url:{}", name),
            Step::AssertUrlChanged { from } => format!("assert_url_changed:{}", from),
            Step::Group { label, .. } => label.clone(),
            Step::Log { message } => {
                let end = message
                    .char_indices()
                    .nth(30)
                    .map(|(i, _)| i)
                    .unwrap_or(message.len());
                format!("log:{}", &message[..end])
            }
        }
    }
}

/// One step of a scenario file: a helper call or a raw step
#[derive(Debug, Clone)]
pub enum ScriptedStep {
    Helper(HelperCall),
    Step(Step),
}

// dispatch on `action` so a bad field reports its own error
impl<'de> Deserialize<'de> for ScriptedStep {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        let is_helper = match value.get("action").and_then(serde_yaml::Value::as_str) {
            Some(action) => HelperCall::ACTIONS.contains(&action),
            None => return Err(D::Error::missing_field("action")),
        };
        if is_helper {
            HelperCall::deserialize(value)
                .map(ScriptedStep::Helper)
                .map_err(D::Error::custom)
        } else {
            Step::deserialize(value)
                .map(ScriptedStep::Step)
                .map_err(D::Error::custom)
        }
    }
}

/// Interaction helpers callable from scenario files
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HelperCall {
    Visit,
    WaitForReady,
    OpenModal {
        #[serde(default = "default_open_trigger")]
        trigger: OpenTrigger,
    },
    CloseModal {
        #[serde(default = "default_close_trigger")]
        trigger: CloseTrigger,
    },
    RunQuery { query: String },
    ExpectResults,
    ExpectNoResults,
    ResetQuery,
    NavigateHits { keys: Vec<NavKey> },
    ClickHit {
        #[serde(default)]
        group: usize,
        #[serde(default)]
        item: usize,
    },
    RememberUrl { name: String },
    ExpectUrlChanged { from: String },
    SaveRecent { index: usize },
    RemoveRecent { index: usize },
    RemoveFavorite { index: usize },
    ExpectHistory,
    AssertModalVisible,
    AssertModalHidden,
}

fn default_open_trigger() -> OpenTrigger {
    OpenTrigger::Click
}

fn default_close_trigger() -> CloseTrigger {
    CloseTrigger::Escape
}

impl HelperCall {
    /// `action` names that select a helper rather than a raw step
    pub const ACTIONS: [&'static str; 18] = [
        "visit",
        "wait_for_ready",
        "open_modal",
        "close_modal",
        "run_query",
        "expect_results",
        "expect_no_results",
        "reset_query",
        "navigate_hits",
        "click_hit",
        "remember_url",
        "expect_url_changed",
        "save_recent",
        "remove_recent",
        "remove_favorite",
        "expect_history",
        "assert_modal_visible",
        "assert_modal_hidden",
    ];

    fn apply(&self, builder: &mut ScenarioBuilder) -> E2eResult<()> {
        match self {
            HelperCall::Visit => builder.visit(),
            HelperCall::WaitForReady => builder.wait_for_ready(),
            HelperCall::OpenModal { trigger } => builder.open_modal(*trigger)?,
            HelperCall::CloseModal { trigger } => builder.close_modal(*trigger)?,
            HelperCall::RunQuery { query } => builder.run_query(query)?,
            HelperCall::ExpectResults => builder.expect_results()?,
            HelperCall::ExpectNoResults => builder.expect_no_results()?,
            HelperCall::ResetQuery => builder.reset_query()?,
            HelperCall::NavigateHits { keys } => builder.navigate_hits(keys)?,
            HelperCall::ClickHit { group, item } => builder.click_hit(*group, *item)?,
            HelperCall::RememberUrl { name } => builder.remember_url(name),
            HelperCall::ExpectUrlChanged { from } => builder.expect_url_changed(from)?,
            HelperCall::SaveRecent { index } => builder.save_recent(*index)?,
            HelperCall::RemoveRecent { index } => builder.remove_recent(*index)?,
            HelperCall::RemoveFavorite { index } => builder.remove_favorite(*index)?,
            HelperCall::ExpectHistory => builder.expect_history()?,
            HelperCall::AssertModalVisible => builder.assert_modal_visible(),
            HelperCall::AssertModalHidden => builder.assert_modal_hidden(),
        };
        Ok(())
    }
}

/// A scenario as written in a YAML file
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioFile {
    pub name: String,

    #[serde(default = "default_group")]
    pub group: String,

    #[serde(default)]
    pub tags: Vec<String>,

    pub steps: Vec<ScriptedStep>,
}

fn default_group() -> String {
    "custom".to_string()
}

impl ScenarioFile {
    /// Parse a scenario file from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Lower helper calls through the builder so model checks apply
    pub fn into_scenario(self, config: &SuiteConfig) -> E2eResult<Scenario> {
        let mut builder = ScenarioBuilder::new(&self.group, &self.name, config);
        builder.tags(self.tags.iter().map(String::as_str));
        for step in &self.steps {
            match step {
                ScriptedStep::Helper(call) => call.apply(&mut builder)?,
                ScriptedStep::Step(step) => {
                    builder.raw(step.clone());
                }
            }
        }
        Ok(builder.build())
    }
}

impl Scenario {
    /// Parse and lower a scenario from a YAML file
    pub fn from_file(path: &Path, config: &SuiteConfig) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let file = ScenarioFile::from_yaml(&content).map_err(|e| {
            E2eError::ScenarioParse(format!("{}: {}", path.display(), e))
        })?;
        file.into_scenario(config)
    }

    /// Load all scenarios from a directory of `.yaml`/`.yml` files
    pub fn load_all(dir: &Path, config: &SuiteConfig) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        let mut scenarios = Vec::with_capacity(paths.len());
        for path in paths {
            debug!("Loading scenario file {}", path.display());
            scenarios.push(Self::from_file(&path, config)?);
        }
        Ok(scenarios)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_steps() {
        let yaml = r#"
- action: navigate
  url: /
- action: click
  selector: .DocSearch-Container
  force: true
  position: { x: 10, y: 10 }
- action: assert_class
  selector: body
  class: DocSearch--active
  present: false
"#;
        let steps: Vec<Step> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[1],
            Step::Click {
                selector: ".DocSearch-Container".to_string(),
                force: true,
                position: Some(Position { x: 10, y: 10 }),
            }
        );
        assert!(matches!(&steps[2], Step::AssertClass { present: false, .. }));
    }

    #[test]
    fn test_assert_class_defaults_to_present() {
        let step: Step = serde_yaml::from_str(
            "action: assert_class\nselector: body\nclass: DocSearch--active\n",
        )
        .unwrap();
        assert!(matches!(step, Step::AssertClass { present: true, .. }));
    }

    #[test]
    fn test_scripted_steps_prefer_helpers() {
        let yaml = r#"
name: escape closes
steps:
  - action: visit
  - action: open_modal
    trigger: ctrl_k
  - action: press
    key: Escape
  - action: close_modal
"#;
        let file = ScenarioFile::from_yaml(yaml).unwrap();
        assert_eq!(file.group, "custom");
        assert!(matches!(file.steps[0], ScriptedStep::Helper(HelperCall::Visit)));
        assert!(matches!(
            file.steps[1],
            ScriptedStep::Helper(HelperCall::OpenModal { trigger: OpenTrigger::CtrlK })
        ));
        assert!(matches!(&file.steps[2], ScriptedStep::Step(Step::Press { key }) if key == "Escape"));
        assert!(matches!(
            file.steps[3],
            ScriptedStep::Helper(HelperCall::CloseModal { trigger: CloseTrigger::Escape })
        ));
    }

    #[test]
    fn test_step_names() {
        let step = Step::Click {
            selector: ".DocSearch-Button".to_string(),
            force: false,
            position: None,
        };
        assert_eq!(step.name(), "click:.DocSearch-Button");

        let log = Step::Log { message: "ü".repeat(40) };
        assert_eq!(log.name().chars().count(), "log:".len() + 30);
    }

    #[test]
    fn test_helper_field_errors_are_reported() {
        let yaml = r#"
name: typo
steps:
  - action: open_modal
    trigger: ctrlk
"#;
        let err = ScenarioFile::from_yaml(yaml).unwrap_err().to_string();
        assert!(err.contains("unknown variant `ctrlk`"), "{}", err);
        assert!(!err.contains("untagged"), "{}", err);
    }

    #[test]
    fn test_raw_step_errors_are_reported() {
        let err = ScenarioFile::from_yaml("name: x\nsteps:\n  - action: press\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("missing field `key`"), "{}", err);

        let err = ScenarioFile::from_yaml("name: x\nsteps:\n  - action: hover\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("unknown variant `hover`"), "{}", err);

        let err = ScenarioFile::from_yaml("name: x\nsteps:\n  - key: Enter\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("missing field `action`"), "{}", err);
    }

    #[test]
    fn test_every_helper_action_is_a_helper() {
        for action in HelperCall::ACTIONS {
            let yaml = format!("action: {}", action);
            let parsed: Result<HelperCall, _> = serde_yaml::from_str(&yaml);
            // fields may be missing, but the variant must exist
            if let Err(e) = parsed {
                assert!(!e.to_string().contains("unknown variant"), "{}: {}", action, e);
            }
        }
    }
}
