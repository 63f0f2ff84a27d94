//! # nlstdio-harness
//!
//! Fixture-driven conformance checks for the nlstdio core: JSON fixture
//! sets are executed against the printf family and the multibyte codec,
//! and the verdicts are rendered as markdown or JSON reports.

pub mod fixtures;
pub mod report;
pub mod runner;
pub mod verify;

pub use fixtures::{FixtureCase, FixtureSet};
pub use report::ConformanceReport;
pub use runner::TestRunner;
pub use verify::{VerificationResult, VerificationSummary};
