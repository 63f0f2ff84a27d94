//! Comparison of observed outcomes against fixture expectations.

use serde::{Deserialize, Serialize};

use crate::fixtures::FixtureCase;

/// What one call produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observed {
    pub output: String,
    pub ret: Option<i64>,
    pub error: Option<String>,
}

/// Verdict for one fixture case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// `family::function::case`.
    pub trace_id: String,
    pub family: String,
    pub symbol: String,
    pub case_name: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
    /// Why the case failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl VerificationResult {
    /// Compare `observed` with `case`. A case without `expected_return`
    /// does not check the return value.
    #[must_use]
    pub fn compare(family: &str, case: &FixtureCase, observed: &Observed) -> Self {
        let mut mismatches = Vec::new();
        if observed.output != case.expected_output {
            mismatches.push(format!(
                "output: expected {:?}, got {:?}",
                case.expected_output, observed.output
            ));
        }
        if case.expected_return.is_some() && observed.ret != case.expected_return {
            mismatches.push(format!(
                "return: expected {:?}, got {:?}",
                case.expected_return, observed.ret
            ));
        }
        if observed.error != case.expected_error {
            mismatches.push(format!(
                "error: expected {:?}, got {:?}",
                case.expected_error, observed.error
            ));
        }
        Self::new(
            family,
            case,
            mismatches.is_empty(),
            observed.output.clone(),
            (!mismatches.is_empty()).then(|| mismatches.join("; ")),
        )
    }

    /// A case that could not run at all (bad inputs, unknown function).
    #[must_use]
    pub fn aborted(family: &str, case: &FixtureCase, reason: String) -> Self {
        Self::new(family, case, false, String::new(), Some(reason))
    }

    fn new(family: &str, case: &FixtureCase, passed: bool, actual: String, diff: Option<String>) -> Self {
        Self {
            trace_id: format!("{family}::{}::{}", case.function, case.name),
            family: family.to_string(),
            symbol: case.function.clone(),
            case_name: case.name.clone(),
            passed,
            expected: case.expected_output.clone(),
            actual,
            diff,
        }
    }
}

/// Pass/fail totals over a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            results,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}
