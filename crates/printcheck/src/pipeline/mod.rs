//! One case per fixture: distribute, retrieve, inspect, compare.

pub mod fixture;
pub mod report;
pub mod runner;

pub use fixture::Fixture;
pub use report::{CaseOutcome, CaseReport, SuiteReport};
pub use runner::{run_configured_suite, SuiteRunner};
