//! Checks on the built-in scenario catalogue and the scripts it compiles to.
//! None of these start a browser.

use std::path::Path;

use docsearch_e2e::playwright::{PlaywrightConfig, PlaywrightHandle};
use docsearch_e2e::suite::{self, GROUPS};
use docsearch_e2e::{Scenario, ScenarioFilter, Step, SuiteConfig};

fn catalogue() -> Vec<Scenario> {
    suite::builtin(&SuiteConfig::default()).expect("built-in scenarios build")
}

fn in_group<'a>(scenarios: &'a [Scenario], group: &str) -> Vec<&'a Scenario> {
    scenarios.iter().filter(|s| s.group == group).collect()
}

fn group_labels(scenario: &Scenario) -> Vec<&str> {
    scenario
        .steps
        .iter()
        .filter_map(|s| match s {
            Step::Group { label, .. } => Some(label.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn every_group_has_scenarios() {
    let scenarios = catalogue();
    for group in GROUPS {
        assert!(!in_group(&scenarios, group).is_empty(), "empty group {}", group);
    }
}

#[test]
fn every_scenario_starts_from_the_root_page() {
    for scenario in catalogue() {
        assert_eq!(
            scenario.steps.first(),
            Some(&Step::Navigate { url: "/".to_string() }),
            "{}",
            scenario.full_name()
        );
    }
}

#[test]
fn open_scenarios_cover_every_trigger() {
    let scenarios = catalogue();
    let labels: Vec<&str> = in_group(&scenarios, suite::OPEN_MODAL)
        .into_iter()
        .flat_map(group_labels)
        .collect();
    for trigger in ["click", "Ctrl+K", "Ctrl+Shift+K", "Cmd+K", "Cmd+Shift+K", "/"] {
        assert!(
            labels.contains(&format!("open_modal({})", trigger).as_str()),
            "missing open trigger {}",
            trigger
        );
    }
}

#[test]
fn shortcut_toggle_scenarios_open_and_close_with_the_same_key() {
    let scenarios = catalogue();
    let toggle = scenarios
        .iter()
        .find(|s| s.group == suite::CLOSE_MODAL && s.name == "Ctrl+K toggles")
        .expect("toggle scenario");
    assert_eq!(group_labels(toggle), vec!["open_modal(Ctrl+K)", "close_modal(Ctrl+K)"]);
}

#[test]
fn recent_group_shares_its_setup() {
    let scenarios = catalogue();
    let group = in_group(&scenarios, suite::RECENT_AND_FAVORITES);
    let first = group[0];
    let setup_len = first
        .steps
        .iter()
        .rposition(|s| matches!(s, Step::Group { label, .. } if label == "open_modal(click)"))
        .expect("setup reopens the modal")
        + 1;

    for scenario in &group {
        assert_eq!(&scenario.steps[..setup_len], &first.steps[..setup_len]);
        assert!(scenario.steps.len() > setup_len, "{} has no body", scenario.name);
    }
}

#[test]
fn history_removal_scenarios_end_empty() {
    let scenarios = catalogue();
    for scenario in in_group(&scenarios, suite::RECENT_AND_FAVORITES)
        .into_iter()
        .filter(|s| s.name.starts_with("removing"))
    {
        assert_eq!(
            group_labels(scenario).last(),
            Some(&"expect_history(recent=0, favorites=0)"),
            "{}",
            scenario.name
        );
    }
}

#[test]
fn every_query_waits_for_the_search_response_it_triggers() {
    let handle = PlaywrightHandle::unverified(
        "http://localhost:3000",
        Path::new("."),
        Path::new("test-results"),
        PlaywrightConfig::default(),
    );

    for scenario in catalogue() {
        let script = handle.build_script(&scenario).unwrap();
        let mut rest = script.as_str();
        while let Some(listen) = rest.find("page.waitForResponse") {
            let after = &rest[listen..];
            let fill = after.find(".fill(").expect("fill after listener");
            let settle = after.find("await response;").expect("await after fill");
            assert!(fill < settle, "{}", scenario.full_name());
            rest = &after[settle..];
        }
    }
}

#[test]
fn filters_select_groups_and_tags() {
    let scenarios = catalogue();
    let smoke = ScenarioFilter {
        tag: Some("smoke".to_string()),
        ..Default::default()
    };
    let selected: Vec<_> = scenarios.iter().filter(|s| smoke.matches(s)).collect();
    assert!(selected.iter().any(|s| s.group == suite::OPEN_MODAL));
    assert!(selected.iter().any(|s| s.group == suite::SEARCH));
    assert!(selected.iter().all(|s| s.group != suite::RECENT_AND_FAVORITES));
}
