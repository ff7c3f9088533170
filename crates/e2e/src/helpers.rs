//! Interaction helpers
//!
//! `ScenarioBuilder` turns named widget interactions (open the modal, run a
//! query, save a recent search, ...) into primitive [`Step`]s. It tracks a
//! [`WidgetModel`] alongside, so every helper both knows what the page should
//! look like afterwards and can refuse calls that make no sense in the
//! current state. Refusals surface as [`E2eError::InvalidScenario`] while the
//! scenario is being built, long before a browser starts.

use std::collections::HashSet;

use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};
use crate::model::{
    CloseTrigger, HitRef, ModalState, NavKey, OpenTrigger, Selection, WidgetModel,
};
use crate::scenario::{LoadState, Position, Scenario, Step, WaitState};
use crate::selectors;

/// Offset inside the backdrop that is safely outside the modal
const OUTSIDE_CLICK: Position = Position { x: 10, y: 10 };

#[derive(Debug)]
pub struct ScenarioBuilder {
    group: String,
    name: String,
    tags: Vec<String>,
    steps: Vec<Step>,
    model: WidgetModel,
    recorded_urls: HashSet<String>,
    root_path: String,
    search_host_pattern: String,
    network_timeout_ms: u64,
    listener_settle_ms: u64,
}

impl ScenarioBuilder {
    pub fn new(group: &str, name: &str, config: &SuiteConfig) -> Self {
        Self {
            group: group.to_string(),
            name: name.to_string(),
            tags: Vec::new(),
            steps: Vec::new(),
            model: WidgetModel::default(),
            recorded_urls: HashSet::new(),
            root_path: config.site.root_path.clone(),
            search_host_pattern: config.site.search_host_pattern.clone(),
            network_timeout_ms: config.browser.network_timeout_ms,
            listener_settle_ms: config.site.listener_settle_ms,
        }
    }

    pub fn model(&self) -> &WidgetModel {
        &self.model
    }

    pub fn tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a str>) -> &mut Self {
        self.tags.extend(tags.into_iter().map(String::from));
        self
    }

    /// Append a step as-is. The model does not see it.
    pub fn raw(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    fn group(&mut self, label: String, steps: Vec<Step>) -> &mut Self {
        self.steps.push(Step::Group { label, steps });
        self
    }

    fn invalid(&self, reason: impl Into<String>) -> E2eError {
        E2eError::invalid(&format!("{} > {}", self.group, self.name), reason)
    }

    fn require_open(&self, action: &str) -> E2eResult<()> {
        if self.model.modal.is_open() {
            Ok(())
        } else {
            Err(self.invalid(format!("{} needs the modal open", action)))
        }
    }

    fn require_query(&self, action: &str) -> E2eResult<String> {
        self.require_open(action)?;
        self.model
            .query
            .clone()
            .ok_or_else(|| self.invalid(format!("{} needs a query", action)))
    }

    fn require_start_screen(&self, action: &str) -> E2eResult<()> {
        self.require_open(action)?;
        match &self.model.query {
            None => Ok(()),
            Some(q) => Err(self.invalid(format!(
                "{} needs an empty query, found {:?}",
                action, q
            ))),
        }
    }

    /// Load the root page and wait until the widget is usable
    pub fn visit(&mut self) -> &mut Self {
        self.steps.push(Step::Navigate {
            url: self.root_path.clone(),
        });
        self.model.modal = ModalState::Closed;
        self.model.clear_query();
        self.wait_for_ready()
    }

    /// Block until the search button is on the page
    pub fn wait_for_ready(&mut self) -> &mut Self {
        self.steps.push(Step::Wait {
            selector: selectors::BUTTON.to_string(),
            state: WaitState::Visible,
            timeout_ms: None,
        });
        self
    }

    /// Let the page attach its own key listeners.
    ///
    /// The widget has no readiness signal, so this is `networkidle` plus a
    /// configurable settle time.
    pub fn await_listeners(&mut self) -> &mut Self {
        self.steps.push(Step::WaitForLoad {
            state: LoadState::NetworkIdle,
        });
        if self.listener_settle_ms > 0 {
            self.steps.push(Step::Sleep {
                ms: self.listener_settle_ms,
            });
        }
        self
    }

    fn modal_visible_steps() -> Vec<Step> {
        vec![
            Step::AssertVisible {
                selector: selectors::MODAL.to_string(),
            },
            Step::AssertClass {
                selector: selectors::PAGE_ROOT.to_string(),
                class: selectors::ACTIVE_CLASS.to_string(),
                present: true,
            },
        ]
    }

    fn modal_hidden_steps() -> Vec<Step> {
        vec![
            Step::AssertHidden {
                selector: selectors::MODAL.to_string(),
            },
            Step::AssertClass {
                selector: selectors::PAGE_ROOT.to_string(),
                class: selectors::ACTIVE_CLASS.to_string(),
                present: false,
            },
        ]
    }

    pub fn assert_modal_visible(&mut self) -> &mut Self {
        self.group("assert_modal_visible".to_string(), Self::modal_visible_steps())
    }

    pub fn assert_modal_hidden(&mut self) -> &mut Self {
        self.group("assert_modal_hidden".to_string(), Self::modal_hidden_steps())
    }

    /// Open the modal. Visibility and input focus are checked as one step.
    pub fn open_modal(&mut self, trigger: OpenTrigger) -> E2eResult<&mut Self> {
        if self.model.modal.is_open() {
            return Err(self.invalid(format!(
                "open_modal({}) while the modal is already open",
                trigger.label()
            )));
        }
        if trigger == OpenTrigger::Slash {
            self.await_listeners();
        }

        let action = match trigger.shortcut() {
            Some(shortcut) => Step::Press {
                key: shortcut.key().to_string(),
            },
            None => Step::Click {
                selector: selectors::BUTTON.to_string(),
                force: false,
                position: None,
            },
        };
        self.model.apply(trigger.event());

        let mut steps = vec![action];
        steps.extend(Self::modal_visible_steps());
        steps.push(Step::AssertFocused {
            selector: selectors::INPUT.to_string(),
        });
        Ok(self.group(format!("open_modal({})", trigger.label()), steps))
    }

    /// Close the modal; it must disappear and the page marker must clear
    pub fn close_modal(&mut self, trigger: CloseTrigger) -> E2eResult<&mut Self> {
        if !self.model.modal.is_open() {
            return Err(self.invalid(format!(
                "close_modal({}) while the modal is closed",
                trigger.label()
            )));
        }

        let action = match (trigger, trigger.shortcut()) {
            (_, Some(shortcut)) => Step::Press {
                key: shortcut.key().to_string(),
            },
            (CloseTrigger::OutsideClick, None) => Step::Click {
                selector: selectors::CONTAINER.to_string(),
                force: true,
                position: Some(OUTSIDE_CLICK),
            },
            (_, None) => Step::Press {
                key: "Escape".to_string(),
            },
        };
        self.model.apply(trigger.event());

        let mut steps = vec![action];
        steps.extend(Self::modal_hidden_steps());
        Ok(self.group(format!("close_modal({})", trigger.label()), steps))
    }

    /// Type `query` and return once the search API has answered
    pub fn run_query(&mut self, query: &str) -> E2eResult<&mut Self> {
        self.require_open("run_query")?;
        if query.is_empty() {
            return Err(self.invalid("run_query with an empty query; use reset_query"));
        }
        self.steps.push(Step::FillAwaitingResponse {
            selector: selectors::INPUT.to_string(),
            value: query.to_string(),
            url_pattern: self.search_host_pattern.clone(),
            timeout_ms: Some(self.network_timeout_ms),
        });
        self.model.set_query(query);
        Ok(self)
    }

    pub fn expect_results(&mut self) -> E2eResult<&mut Self> {
        self.require_query("expect_results")?;
        self.steps.push(Step::AssertVisible {
            selector: selectors::HITS.to_string(),
        });
        Ok(self)
    }

    pub fn expect_no_results(&mut self) -> E2eResult<&mut Self> {
        let query = self.require_query("expect_no_results")?;
        let steps = vec![
            Step::AssertTextVisible {
                text: selectors::NO_RESULTS_TEXT.to_string(),
            },
            Step::AssertHidden {
                selector: selectors::HITS.to_string(),
            },
        ];
        Ok(self.group(format!("expect_no_results({:?})", query), steps))
    }

    /// Clear the query with the reset control; the start screen comes back
    pub fn reset_query(&mut self) -> E2eResult<&mut Self> {
        self.require_query("reset_query")?;
        self.steps.push(Step::Click {
            selector: selectors::RESET.to_string(),
            force: false,
            position: None,
        });
        self.model.clear_query();
        self.steps.push(Step::AssertHidden {
            selector: selectors::HITS.to_string(),
        });
        self.expect_history()
    }

    /// Move through the hits with the keyboard. `Enter`, if present, must
    /// come last; it picks the highlighted hit and leaves the page.
    pub fn navigate_hits(&mut self, keys: &[NavKey]) -> E2eResult<&mut Self> {
        self.require_query("navigate_hits")?;
        if keys.is_empty() {
            return Err(self.invalid("navigate_hits without keys"));
        }
        if let Some(pos) = keys.iter().position(|k| *k == NavKey::Enter) {
            if pos + 1 != keys.len() {
                return Err(self.invalid("navigate_hits: keys after Enter"));
            }
        }

        let steps = keys
            .iter()
            .map(|key| Step::Press {
                key: key.key().to_string(),
            })
            .collect();
        for key in keys {
            self.model.navigate(*key);
        }
        let label = keys.iter().map(|k| k.key()).collect::<Vec<_>>().join(", ");
        Ok(self.group(format!("navigate_hits({})", label), steps))
    }

    /// Click a hit with the pointer; the page navigates away
    pub fn click_hit(&mut self, group: usize, item: usize) -> E2eResult<&mut Self> {
        let query = self.require_query("click_hit")?;
        self.steps.push(Step::Click {
            selector: selectors::hit_item(group, item),
            force: false,
            position: None,
        });
        self.model.select(Selection {
            query,
            hit: HitRef::at(group, item),
        });
        Ok(self)
    }

    pub fn remember_url(&mut self, name: &str) -> &mut Self {
        self.recorded_urls.insert(name.to_string());
        self.steps.push(Step::RecordUrl {
            name: name.to_string(),
        });
        self
    }

    pub fn expect_url_changed(&mut self, from: &str) -> E2eResult<&mut Self> {
        if !self.recorded_urls.contains(from) {
            return Err(self.invalid(format!("no URL remembered as {:?}", from)));
        }
        self.steps.push(Step::AssertUrlChanged {
            from: from.to_string(),
        });
        Ok(self)
    }

    /// Pin recent search `index` as a favorite
    pub fn save_recent(&mut self, index: usize) -> E2eResult<&mut Self> {
        self.require_start_screen("save_recent")?;
        if self.model.history.save(index).is_none() {
            return Err(self.invalid(format!("no recent search at {}", index)));
        }
        self.click_item_action(
            selectors::recent_item(index),
            selectors::SAVE_RECENT_TITLE,
        );
        self.expect_history()
    }

    pub fn remove_recent(&mut self, index: usize) -> E2eResult<&mut Self> {
        self.require_start_screen("remove_recent")?;
        if self.model.history.remove_recent(index).is_none() {
            return Err(self.invalid(format!("no recent search at {}", index)));
        }
        self.click_item_action(
            selectors::recent_item(index),
            selectors::REMOVE_RECENT_TITLE,
        );
        self.expect_history()
    }

    pub fn remove_favorite(&mut self, index: usize) -> E2eResult<&mut Self> {
        self.require_start_screen("remove_favorite")?;
        if self.model.history.remove_favorite(index).is_none() {
            return Err(self.invalid(format!("no favorite search at {}", index)));
        }
        self.click_item_action(
            selectors::favorite_item(index),
            selectors::REMOVE_FAVORITE_TITLE,
        );
        self.expect_history()
    }

    // the action buttons only show on hover
    fn click_item_action(&mut self, item: String, title: &str) {
        self.steps.push(Step::Click {
            selector: selectors::item_action(&item, title),
            force: true,
            position: None,
        });
    }

    /// Assert the start screen shows exactly what the model remembers
    pub fn expect_history(&mut self) -> E2eResult<&mut Self> {
        self.require_start_screen("expect_history")?;
        let history = &self.model.history;

        let steps = if history.is_empty() {
            vec![Step::AssertTextVisible {
                text: selectors::NO_RECENT_TEXT.to_string(),
            }]
        } else {
            let recent = history.recent().len();
            let favorites = history.favorites().len();
            let mut steps: Vec<Step> = (0..recent)
                .map(|i| Step::AssertVisible {
                    selector: selectors::recent_item(i),
                })
                .chain((0..favorites).map(|i| Step::AssertVisible {
                    selector: selectors::favorite_item(i),
                }))
                .collect();
            steps.push(Step::AssertHidden {
                selector: selectors::recent_item(recent),
            });
            steps.push(Step::AssertHidden {
                selector: selectors::favorite_item(favorites),
            });
            steps
        };

        let label = format!(
            "expect_history(recent={}, favorites={})",
            history.recent().len(),
            history.favorites().len()
        );
        Ok(self.group(label, steps))
    }

    pub fn build(self) -> Scenario {
        Scenario {
            group: self.group,
            name: self.name,
            tags: self.tags,
            steps: self.steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ScenarioBuilder {
        ScenarioBuilder::new("test", "helpers", &SuiteConfig::default())
    }

    fn labels(scenario: &Scenario) -> Vec<String> {
        scenario.steps.iter().map(Step::name).collect()
    }

    #[test]
    fn test_open_modal_is_one_step() {
        let mut b = builder();
        b.visit().open_modal(OpenTrigger::CtrlK).unwrap();
        let scenario = b.build();

        let Step::Group { label, steps } = scenario.steps.last().unwrap() else {
            panic!("expected a group");
        };
        assert_eq!(label, "open_modal(Ctrl+K)");
        assert_eq!(steps[0], Step::Press { key: "Control+k".to_string() });
        assert!(steps.contains(&Step::AssertFocused {
            selector: selectors::INPUT.to_string()
        }));
        assert!(steps.contains(&Step::AssertVisible {
            selector: selectors::MODAL.to_string()
        }));
    }

    #[test]
    fn test_slash_waits_for_listeners_first() {
        let mut b = builder();
        b.visit().open_modal(OpenTrigger::Slash).unwrap();
        let names = labels(&b.build());
        assert_eq!(
            &names[2..],
            &[
                "wait_for_load:networkidle".to_string(),
                "sleep:1000ms".to_string(),
                "open_modal(/)".to_string(),
            ]
        );
    }

    #[test]
    fn test_zero_settle_skips_sleep() {
        let mut config = SuiteConfig::default();
        config.site.listener_settle_ms = 0;
        let mut b = ScenarioBuilder::new("test", "slash", &config);
        b.visit().open_modal(OpenTrigger::Slash).unwrap();
        assert!(!b.build().steps.iter().any(|s| matches!(s, Step::Sleep { .. })));
    }

    #[test]
    fn test_close_requires_open_modal() {
        let mut b = builder();
        b.visit();
        let err = b.close_modal(CloseTrigger::Escape).unwrap_err();
        assert!(matches!(err, E2eError::InvalidScenario { .. }));
    }

    #[test]
    fn test_open_twice_is_rejected() {
        let mut b = builder();
        b.visit().open_modal(OpenTrigger::Click).unwrap();
        assert!(b.open_modal(OpenTrigger::MetaK).is_err());
    }

    #[test]
    fn test_close_clears_active_marker() {
        let mut b = builder();
        b.visit()
            .open_modal(OpenTrigger::Click)
            .unwrap()
            .close_modal(CloseTrigger::OutsideClick)
            .unwrap();
        let scenario = b.build();
        let Step::Group { steps, .. } = scenario.steps.last().unwrap() else {
            panic!("expected a group");
        };
        assert!(matches!(&steps[0], Step::Click { force: true, position: Some(_), .. }));
        assert!(steps.contains(&Step::AssertClass {
            selector: "body".to_string(),
            class: "DocSearch--active".to_string(),
            present: false,
        }));
    }

    #[test]
    fn test_query_needs_open_modal() {
        let mut b = builder();
        b.visit();
        assert!(b.run_query("g").is_err());
        b.open_modal(OpenTrigger::Click).unwrap();
        assert!(b.run_query("").is_err());
        b.run_query("g").unwrap();
        assert_eq!(b.model().query.as_deref(), Some("g"));
    }

    #[test]
    fn test_query_uses_search_pattern() {
        let mut b = builder();
        b.visit().open_modal(OpenTrigger::Click).unwrap().run_query("g").unwrap();
        let scenario = b.build();
        assert!(matches!(
            scenario.steps.last(),
            Some(Step::FillAwaitingResponse { value, url_pattern, .. })
                if value == "g" && url_pattern == r"-dsn\.algolia\.net"
        ));
    }

    #[test]
    fn test_reset_restores_empty_state() {
        let mut b = builder();
        b.visit()
            .open_modal(OpenTrigger::Click)
            .unwrap()
            .run_query("g")
            .unwrap()
            .reset_query()
            .unwrap();
        let scenario = b.build();
        let Step::Group { label, steps } = scenario.steps.last().unwrap() else {
            panic!("expected a group");
        };
        assert_eq!(label, "expect_history(recent=0, favorites=0)");
        assert_eq!(
            steps,
            &[Step::AssertTextVisible {
                text: "No recent searches".to_string()
            }]
        );
    }

    #[test]
    fn test_enter_must_be_last() {
        let mut b = builder();
        b.visit().open_modal(OpenTrigger::Click).unwrap().run_query("g").unwrap();
        assert!(b.navigate_hits(&[NavKey::Enter, NavKey::ArrowDown]).is_err());
        assert!(b.navigate_hits(&[]).is_err());
        b.navigate_hits(&[NavKey::ArrowDown, NavKey::Enter]).unwrap();
        assert_eq!(b.model().modal, ModalState::Closed);
        assert_eq!(b.model().history.recent().len(), 1);
    }

    #[test]
    fn test_history_assertions_follow_model() {
        let mut b = builder();
        b.visit()
            .open_modal(OpenTrigger::Click)
            .unwrap()
            .run_query("g")
            .unwrap()
            .click_hit(0, 0)
            .unwrap();
        b.visit().open_modal(OpenTrigger::Click).unwrap().save_recent(0).unwrap();

        let scenario = b.build();
        let Step::Group { label, steps } = scenario.steps.last().unwrap() else {
            panic!("expected a group");
        };
        assert_eq!(label, "expect_history(recent=0, favorites=1)");
        assert!(steps.contains(&Step::AssertVisible {
            selector: "#docsearch-favoriteSearches-item-0".to_string()
        }));
        assert!(steps.contains(&Step::AssertHidden {
            selector: "#docsearch-recentSearches-item-0".to_string()
        }));
    }

    #[test]
    fn test_history_edits_need_entries() {
        let mut b = builder();
        b.visit().open_modal(OpenTrigger::Click).unwrap();
        assert!(b.save_recent(0).is_err());
        assert!(b.remove_recent(0).is_err());
        assert!(b.remove_favorite(0).is_err());
    }

    #[test]
    fn test_url_must_be_remembered() {
        let mut b = builder();
        assert!(b.expect_url_changed("before").is_err());
        b.remember_url("before");
        assert!(b.expect_url_changed("before").is_ok());
    }
}
