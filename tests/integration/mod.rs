//! Integration tests for the strata snapshot engine

mod config_integration;
mod directory_ordering;
mod example_scenario;
mod export_roundtrip;
mod merge_workflow;
mod snapshot_history;
