//! DocSearch E2E Test Suite
//!
//! This crate drives a real browser against a documentation site and checks
//! the behaviour of its DocSearch modal:
//! - Opening and closing the modal by click and keyboard shortcuts
//! - Running queries, synchronised on the search API response
//! - Navigating to results by keyboard and pointer
//! - Recent and favorite searches surviving across modal sessions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_server() / probe site root                     │
//! │    ├── scenarios() = suite::builtin() + YAML scenarios      │
//! │    └── run() -> TestSuiteResult (N workers)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioBuilder (helpers)          WidgetModel             │
//! │    ├── visit / wait_for_ready         ├── ModalState        │
//! │    ├── open_modal / close_modal       ├── query, active hit │
//! │    ├── run_query                      └── SearchHistory     │
//! │    └── history helpers  ──> Vec<Step>                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PlaywrightHandle                                           │
//! │    └── one Node script per scenario, one JSON event/step    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod helpers;
pub mod model;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod selectors;
pub mod server;
pub mod suite;

pub use config::SuiteConfig;
pub use error::{E2eError, E2eResult};
pub use helpers::ScenarioBuilder;
pub use runner::{ScenarioFilter, TestRunner, TestSuiteResult};
pub use scenario::{Scenario, Step};
