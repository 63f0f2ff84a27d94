//! Report generation for conformance results.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::verify::VerificationSummary;

/// A conformance report over one harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Report title.
    pub title: String,
    /// Fixture files the run loaded.
    pub sources: Vec<String>,
    /// Verification summary.
    pub summary: VerificationSummary,
}

impl ConformanceReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        for source in &self.sources {
            out.push_str(&format!("- Fixture: `{source}`\n"));
        }
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.summary.failed));

        out.push_str("| Trace | Family | Symbol | Case | Status |\n");
        out.push_str("|-------|--------|--------|------|--------|\n");
        for r in &self.summary.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "| `{}` | {} | {} | {} | {} |\n",
                r.trace_id, r.family, r.symbol, r.case_name, status
            ));
        }

        let failures: Vec<_> = self.summary.failures().collect();
        if !failures.is_empty() {
            out.push_str("\n## Failures\n\n");
            for r in failures {
                out.push_str(&format!(
                    "- `{}`: {}\n",
                    r.trace_id,
                    r.diff.as_deref().unwrap_or("mismatch")
                ));
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }

    /// Write the report to `path`: JSON for a `.json` extension, markdown
    /// otherwise.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let body = if path.extension().is_some_and(|ext| ext == "json") {
            self.to_json()
        } else {
            self.to_markdown()
        };
        std::fs::write(path, body)
    }
}
