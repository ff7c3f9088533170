//! The built-in DocSearch scenarios

use crate::config::SuiteConfig;
use crate::error::E2eResult;
use crate::helpers::ScenarioBuilder;
use crate::model::{CloseTrigger, NavKey, OpenTrigger};
use crate::scenario::Scenario;

pub const OPEN_MODAL: &str = "open modal";
pub const CLOSE_MODAL: &str = "close modal";
pub const SEARCH: &str = "search";
pub const RESULT_NAVIGATION: &str = "result navigation";
pub const RECENT_AND_FAVORITES: &str = "recent and favorites";

pub const GROUPS: [&str; 5] = [
    OPEN_MODAL,
    CLOSE_MODAL,
    SEARCH,
    RESULT_NAVIGATION,
    RECENT_AND_FAVORITES,
];

/// Matches nearly every page of any index
pub const BROAD_QUERY: &str = "g";

/// Matches nothing
pub const UNMATCHED_QUERY: &str = "zzz";

/// URL name remembered before picking a hit
const BEFORE_SELECTION: &str = "before-selection";

/// Every built-in scenario, grouped, in a stable order
pub fn builtin(config: &SuiteConfig) -> E2eResult<Vec<Scenario>> {
    let mut scenarios = Vec::new();
    scenarios.extend(open_modal(config)?);
    scenarios.extend(close_modal(config)?);
    scenarios.extend(search(config)?);
    scenarios.extend(result_navigation(config)?);
    scenarios.extend(recent_and_favorites(config)?);
    Ok(scenarios)
}

fn open_modal(config: &SuiteConfig) -> E2eResult<Vec<Scenario>> {
    OpenTrigger::ALL
        .into_iter()
        .map(|trigger| {
            let mut b = ScenarioBuilder::new(
                OPEN_MODAL,
                &format!("opens with {}", trigger.label()),
                config,
            );
            b.tags(["modal", "smoke"]);
            b.visit().open_modal(trigger)?;
            Ok(b.build())
        })
        .collect()
}

fn close_modal(config: &SuiteConfig) -> E2eResult<Vec<Scenario>> {
    let mut scenarios = Vec::new();

    for trigger in [
        CloseTrigger::Escape,
        CloseTrigger::OutsideClick,
        CloseTrigger::CtrlK,
        CloseTrigger::MetaK,
    ] {
        let mut b = ScenarioBuilder::new(
            CLOSE_MODAL,
            &format!("closes with {}", trigger.label()),
            config,
        );
        b.tags(["modal"]);
        b.visit()
            .open_modal(OpenTrigger::Click)?
            .close_modal(trigger)?;
        scenarios.push(b.build());
    }

    // the shortcut that opened the modal closes it again
    for (open, close) in [
        (OpenTrigger::CtrlK, CloseTrigger::CtrlK),
        (OpenTrigger::MetaK, CloseTrigger::MetaK),
    ] {
        let mut b = ScenarioBuilder::new(
            CLOSE_MODAL,
            &format!("{} toggles", open.label()),
            config,
        );
        b.tags(["modal"]);
        b.visit().open_modal(open)?.close_modal(close)?;
        scenarios.push(b.build());
    }

    Ok(scenarios)
}

fn search(config: &SuiteConfig) -> E2eResult<Vec<Scenario>> {
    let mut scenarios = Vec::new();

    let mut b = ScenarioBuilder::new(SEARCH, "broad query shows results", config);
    b.tags(["search", "smoke"]);
    b.visit()
        .open_modal(OpenTrigger::Click)?
        .run_query(BROAD_QUERY)?
        .expect_results()?;
    scenarios.push(b.build());

    let mut b = ScenarioBuilder::new(SEARCH, "unmatched query shows no results", config);
    b.tags(["search"]);
    b.visit()
        .open_modal(OpenTrigger::Click)?
        .run_query(UNMATCHED_QUERY)?
        .expect_no_results()?;
    scenarios.push(b.build());

    let mut b = ScenarioBuilder::new(SEARCH, "reset restores the empty state", config);
    b.tags(["search"]);
    b.visit()
        .open_modal(OpenTrigger::Click)?
        .run_query(BROAD_QUERY)?
        .expect_results()?
        .reset_query()?;
    scenarios.push(b.build());

    Ok(scenarios)
}

fn result_navigation(config: &SuiteConfig) -> E2eResult<Vec<Scenario>> {
    let mut scenarios = Vec::new();

    let mut b = ScenarioBuilder::new(
        RESULT_NAVIGATION,
        "keyboard selection opens the second hit",
        config,
    );
    b.tags(["navigation", "smoke"]);
    b.visit()
        .open_modal(OpenTrigger::Click)?
        .run_query(BROAD_QUERY)?
        .expect_results()?
        .remember_url(BEFORE_SELECTION)
        .navigate_hits(&[
            NavKey::ArrowDown,
            NavKey::ArrowDown,
            NavKey::ArrowUp,
            NavKey::Enter,
        ])?
        .expect_url_changed(BEFORE_SELECTION)?;
    scenarios.push(b.build());

    let mut b = ScenarioBuilder::new(
        RESULT_NAVIGATION,
        "pointer selection is remembered",
        config,
    );
    b.tags(["navigation", "history"]);
    b.visit()
        .open_modal(OpenTrigger::Click)?
        .run_query(BROAD_QUERY)?
        .expect_results()?
        .remember_url(BEFORE_SELECTION)
        .click_hit(0, 0)?
        .expect_url_changed(BEFORE_SELECTION)?
        .wait_for_ready()
        .open_modal(OpenTrigger::Click)?
        .expect_history()?;
    scenarios.push(b.build());

    Ok(scenarios)
}

/// Shared setup of the recent-and-favorites group: one remembered search,
/// modal reopened on the start screen
fn with_recent_search(config: &SuiteConfig, name: &str) -> E2eResult<ScenarioBuilder> {
    let mut b = ScenarioBuilder::new(RECENT_AND_FAVORITES, name, config);
    b.tags(["history"]);
    b.visit()
        .open_modal(OpenTrigger::Click)?
        .run_query(BROAD_QUERY)?
        .remember_url(BEFORE_SELECTION)
        .click_hit(0, 0)?
        .expect_url_changed(BEFORE_SELECTION)?
        .wait_for_ready()
        .open_modal(OpenTrigger::Click)?;
    Ok(b)
}

fn recent_and_favorites(config: &SuiteConfig) -> E2eResult<Vec<Scenario>> {
    let mut scenarios = Vec::new();

    let mut b = with_recent_search(config, "shows the recent search")?;
    b.expect_history()?;
    scenarios.push(b.build());

    let mut b = with_recent_search(config, "saves a recent search as favorite")?;
    b.save_recent(0)?;
    scenarios.push(b.build());

    let mut b = with_recent_search(config, "removing the last recent search empties history")?;
    b.remove_recent(0)?;
    scenarios.push(b.build());

    let mut b = with_recent_search(config, "removing the last favorite empties history")?;
    b.save_recent(0)?.remove_favorite(0)?;
    scenarios.push(b.build());

    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_builds() {
        let scenarios = builtin(&SuiteConfig::default()).unwrap();
        assert_eq!(scenarios.len(), 6 + 6 + 3 + 2 + 4);

        let names: HashSet<String> = scenarios.iter().map(Scenario::full_name).collect();
        assert_eq!(names.len(), scenarios.len(), "scenario names must be unique");

        for scenario in &scenarios {
            assert!(GROUPS.contains(&scenario.group.as_str()));
            assert!(!scenario.steps.is_empty());
        }
    }
}
