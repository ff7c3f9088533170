//! Opt-in run of the smoke scenarios against a live site.
//!
//! Needs Node, Playwright and a reachable site:
//!
//!   DOCSEARCH_E2E_LIVE=1 DOCSEARCH_E2E_BASE_URL=http://localhost:3000 \
//!     cargo test --package docsearch-e2e --test live

use docsearch_e2e::cli;
use docsearch_e2e::{ScenarioFilter, SuiteConfig, TestRunner};

#[tokio::test]
async fn smoke_scenarios_pass_against_live_site() {
    if !cli::live_enabled() {
        eprintln!("skipping live DocSearch smoke run");
        return;
    }

    let mut config = SuiteConfig::load(None).expect("config");
    config.output_dir = std::env::temp_dir().join("docsearch-e2e-live");

    let mut runner = TestRunner::new(config);
    let filter = ScenarioFilter {
        tag: Some("smoke".to_string()),
        ..Default::default()
    };
    let results = runner.run(&filter).await.expect("suite ran");

    for result in &results.results {
        result.ensure_passed().expect("scenario passed");
    }
    assert!(results.success());
}
