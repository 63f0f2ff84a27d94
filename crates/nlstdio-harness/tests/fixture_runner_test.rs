//! Runs every shipped fixture set against the core.

use std::path::{Path, PathBuf};

use nlstdio_harness::fixtures;
use nlstdio_harness::{ConformanceReport, TestRunner, VerificationSummary};

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn run_all() -> (Vec<String>, VerificationSummary) {
    let sets = fixtures::load_dir(&fixture_dir())
        .unwrap_or_else(|e| panic!("failed to load fixtures: {e}"));
    let runner = TestRunner::new();
    let mut results = Vec::new();
    let mut sources = Vec::new();
    for (path, set) in &sets {
        results.extend(runner.run(set));
        sources.push(path.display().to_string());
    }
    (sources, VerificationSummary::from_results(results))
}

#[test]
fn fixture_sets_are_present() {
    let sets = fixtures::load_dir(&fixture_dir()).expect("fixtures load");
    let families: Vec<_> = sets.iter().map(|(_, s)| s.family.as_str()).collect();
    assert!(families.contains(&"stdio/printf"), "families: {families:?}");
    assert!(families.contains(&"multibyte"), "families: {families:?}");
    for (path, set) in &sets {
        assert_eq!(set.version, "v1", "{}", path.display());
        assert!(!set.cases.is_empty(), "{} has no cases", path.display());
    }
}

#[test]
fn every_fixture_case_passes() {
    let (_, summary) = run_all();
    let failures: Vec<String> = summary
        .failures()
        .map(|r| format!("{}: {}", r.trace_id, r.diff.as_deref().unwrap_or("mismatch")))
        .collect();
    assert!(failures.is_empty(), "fixture failures:\n{}", failures.join("\n"));
    assert!(summary.total >= 30, "only {} cases ran", summary.total);
}

#[test]
fn every_runner_function_is_covered() {
    let sets = fixtures::load_dir(&fixture_dir()).expect("fixtures load");
    for function in [
        "snprintf",
        "sniprintf",
        "asprintf",
        "decode_string",
        "encode_string",
        "decode_one",
    ] {
        assert!(
            sets.iter()
                .flat_map(|(_, s)| &s.cases)
                .any(|c| c.function == function),
            "no fixture exercises {function}"
        );
    }
}

#[test]
fn report_renders_for_the_shipped_fixtures() {
    let (sources, summary) = run_all();
    let report = ConformanceReport {
        title: "nlstdio conformance".into(),
        sources,
        summary,
    };
    let md = report.to_markdown();
    assert!(md.contains("stdio/printf::snprintf::signed_width_and_flags"));
    assert!(md.contains("multibyte::decode_one::utf8_resumes_across_calls"));

    let json: serde_json::Value = serde_json::from_str(&report.to_json()).expect("valid JSON");
    assert_eq!(json["summary"]["failed"], 0);
}
