//! Metric extraction from benchmark output.
//!
//! A `MetricExtractor` is built from a table of `ExtractionRule`s. Each rule
//! names a literal label that precedes a decimal number somewhere in the
//! output; the first occurrence in document order wins and anything around
//! it is ignored. Numbers follow a fixed grammar: digits, a point, digits.
//! No sign, no exponent, no thousands separators.
//!
//! What happens when the number runs straight into other characters (for
//! example `10.5x`) depends on the `NumberPolicy`:
//!
//! - `Prefix` takes the longest valid numeric prefix, so `10.5x` reads as
//!   `10.5`.
//! - `Strict` takes the whole whitespace-delimited token and rejects it with
//!   `MalformedMetric` unless the entire token is a valid number.
//!
//! The policies also differ in what counts as an occurrence. Under `Prefix`
//! an occurrence is the label followed by a number, so a label followed by
//! `n/a` is skipped and a later numeric occurrence is used. Under `Strict`
//! every occurrence of the label counts, so the same `n/a` is reported as
//! `MalformedMetric` and later occurrences are never consulted.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, RigError};
use crate::types::node::RunDescriptor;


// ---------------------------------------------------------------------------
// ExtractionRule / NumberPolicy
// ---------------------------------------------------------------------------

/// One metric to look for: the record name, the label text that precedes
/// the value, and the unit reported alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub name: String,
    pub label: String,
    pub unit: String,
}

impl ExtractionRule {
    pub fn new(name: &str, label: &str, unit: &str) -> Self {
        ExtractionRule {
            name: name.to_string(),
            label: label.to_string(),
            unit: unit.to_string(),
        }
    }

    /// Metrics reported by the HPCG 2.4 YAML summary.
    pub fn hpcg_defaults() -> Vec<ExtractionRule> {
        vec![
            ExtractionRule::new("HPCG Throughput", "GFLOP/s rating of: ", "Gflops"),
            ExtractionRule::new(
                "HPCG Historical Rating",
                "Rating (for historical value) is: ",
                "Gflops",
            ),
            ExtractionRule::new("Memory Bandwidth", "Raw Total B/W: ", "GB/s"),
            ExtractionRule::new("Memory Read Bandwidth", "Raw Read B/W: ", "GB/s"),
            ExtractionRule::new("Memory Write Bandwidth", "Raw Write B/W: ", "GB/s"),
            ExtractionRule::new("Execution Time", "execution time (sec) is: ", "seconds"),
        ]
    }
}

/// How to treat characters glued to the end of a number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberPolicy {
    /// Use the longest valid numeric prefix.
    #[default]
    Prefix,
    /// Require the whole token to be a valid number.
    Strict,
}


// ---------------------------------------------------------------------------
// MetricRecord
// ---------------------------------------------------------------------------

/// One extracted measurement, ready for the reporting side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub metadata: BTreeMap<String, String>,
}


// ---------------------------------------------------------------------------
// ExtractionReport
// ---------------------------------------------------------------------------

/// Per-rule outcome of running every rule over one output text.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// Records for the rules that matched, in rule order.
    pub records: Vec<MetricRecord>,
    /// Errors for the rules that did not, in rule order.
    pub failures: Vec<RigError>,
}

impl ExtractionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// All records, or the first failure.
    pub fn into_result(self) -> Result<Vec<MetricRecord>> {
        match self.failures.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.records),
        }
    }
}


// ---------------------------------------------------------------------------
// MetricExtractor
// ---------------------------------------------------------------------------

struct CompiledRule {
    rule: ExtractionRule,
    pattern: Regex,
}

/// Applies a rule table to benchmark output.
pub struct MetricExtractor {
    rules: Vec<CompiledRule>,
    policy: NumberPolicy,
    number: Regex,
}

impl MetricExtractor {
    pub fn new(rules: Vec<ExtractionRule>, policy: NumberPolicy) -> Result<MetricExtractor> {
        let capture = match policy {
            NumberPolicy::Prefix => r"(\d+\.\d+)",
            NumberPolicy::Strict => r"(\S+)",
        };
        let rules = rules
            .into_iter()
            .map(|rule| {
                let source = format!("{}[ \\t]*{}", regex::escape(&rule.label), capture);
                Regex::new(&source)
                    .map(|pattern| CompiledRule { rule, pattern })
                    .map_err(|e| RigError::Config(format!("bad metric pattern: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;
        let number = Regex::new(r"^\d+\.\d+$")
            .map_err(|e| RigError::Config(format!("bad number pattern: {}", e)))?;
        Ok(MetricExtractor {
            rules,
            policy,
            number,
        })
    }

    /// The built-in HPCG table with the lenient prefix policy.
    pub fn hpcg() -> Result<MetricExtractor> {
        Self::new(ExtractionRule::hpcg_defaults(), NumberPolicy::Prefix)
    }

    pub fn policy(&self) -> NumberPolicy {
        self.policy
    }

    pub fn rules(&self) -> impl Iterator<Item = &ExtractionRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    /// Attempt every rule independently so one missing metric does not hide
    /// the others.
    pub fn extract_all(&self, output: &str, run: &RunDescriptor) -> ExtractionReport {
        let metadata = run.metadata();
        let mut report = ExtractionReport::default();
        for compiled in &self.rules {
            match self.extract_rule(compiled, output, &metadata) {
                Ok(record) => {
                    debug!(metric = %record.name, value = record.value, "extracted metric");
                    report.records.push(record);
                }
                Err(e) => {
                    warn!(metric = %compiled.rule.name, error = %e, "metric extraction failed");
                    report.failures.push(e);
                }
            }
        }
        report
    }

    /// Every metric, or the first rule that failed.
    pub fn extract(&self, output: &str, run: &RunDescriptor) -> Result<Vec<MetricRecord>> {
        self.extract_all(output, run).into_result()
    }

    fn extract_rule(
        &self,
        compiled: &CompiledRule,
        output: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<MetricRecord> {
        let rule = &compiled.rule;
        let raw = compiled
            .pattern
            .captures(output)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| RigError::MetricNotFound {
                label: rule.label.clone(),
            })?;

        let malformed = || RigError::MalformedMetric {
            label: rule.label.clone(),
            raw_text: raw.to_string(),
        };
        if self.policy == NumberPolicy::Strict && !self.number.is_match(raw) {
            return Err(malformed());
        }
        let value: f64 = raw.parse().map_err(|_| malformed())?;

        Ok(MetricRecord {
            name: rule.name.clone(),
            value,
            unit: rule.unit.clone(),
            metadata: metadata.clone(),
        })
    }
}

/// Extract the HPCG metrics from `output`, failing on the first missing one.
pub fn parse_output(output: &str, run: &RunDescriptor) -> Result<Vec<MetricRecord>> {
    MetricExtractor::hpcg()?.extract(output, run)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::node::Node;

    const SAMPLE: &str = include_str!("../../tests/data/hpcg-sample.txt");

    fn run(n: usize) -> RunDescriptor {
        RunDescriptor::new(
            (0..n)
                .map(|i| Node::new(&format!("vm-{}", i), &format!("10.0.0.{}", i + 1), 4))
                .collect(),
        )
    }

    fn throughput_only(policy: NumberPolicy) -> MetricExtractor {
        MetricExtractor::new(
            vec![ExtractionRule::new("HPCG Throughput", "GFLOP/s rating of: ", "Gflops")],
            policy,
        )
        .unwrap()
    }

    // -- Sample output --

    #[test]
    fn sample_yields_six_records() {
        let records = parse_output(SAMPLE, &run(2)).unwrap();
        assert_eq!(records.len(), 6);
        let throughput = records.iter().find(|r| r.name == "HPCG Throughput").unwrap();
        assert!((throughput.value - 10.50).abs() < 1e-9);
        assert_eq!(throughput.unit, "Gflops");
    }

    #[test]
    fn sample_values_per_metric() {
        let records = parse_output(SAMPLE, &run(2)).unwrap();
        let by_name: BTreeMap<&str, f64> =
            records.iter().map(|r| (r.name.as_str(), r.value)).collect();
        assert_eq!(by_name["Memory Bandwidth"], 55.6868);
        assert_eq!(by_name["Memory Read Bandwidth"], 45.2316);
        assert_eq!(by_name["Memory Write Bandwidth"], 10.4552);
        assert_eq!(by_name["HPCG Historical Rating"], 7.54046);
        assert_eq!(by_name["Execution Time"], 153.805);
    }

    #[test]
    fn every_record_carries_identical_metadata() {
        let records = parse_output(SAMPLE, &run(3)).unwrap();
        for record in &records {
            assert_eq!(record.metadata, records[0].metadata);
            assert_eq!(record.metadata["num_machines"], "3");
        }
    }

    #[test]
    fn extraction_is_idempotent() {
        let extractor = MetricExtractor::hpcg().unwrap();
        let first = extractor.extract(SAMPLE, &run(2)).unwrap();
        let second = extractor.extract(SAMPLE, &run(2)).unwrap();
        assert_eq!(first, second);
    }

    // -- Missing and repeated labels --

    #[test]
    fn missing_throughput_fails_only_that_metric() {
        let trimmed: String = SAMPLE
            .lines()
            .filter(|l| !l.contains("GFLOP/s rating of"))
            .map(|l| format!("{}\n", l))
            .collect();
        let report = MetricExtractor::hpcg().unwrap().extract_all(&trimmed, &run(2));
        assert_eq!(report.records.len(), 5);
        assert_eq!(report.failures.len(), 1);
        match &report.failures[0] {
            RigError::MetricNotFound { label } => assert_eq!(label, "GFLOP/s rating of: "),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(parse_output(&trimmed, &run(2)).is_err());
    }

    #[test]
    fn label_without_number_is_not_found() {
        let text = "HPCG result is INVALID with a GFLOP/s rating of: n/a";
        let err = throughput_only(NumberPolicy::Prefix)
            .extract(text, &run(1))
            .unwrap_err();
        assert!(matches!(err, RigError::MetricNotFound { .. }));
    }

    #[test]
    fn first_occurrence_wins() {
        let text = "noise\nGFLOP/s rating of: 1.25\nmore\nGFLOP/s rating of: 9.75\n";
        let records = throughput_only(NumberPolicy::Prefix)
            .extract(text, &run(1))
            .unwrap();
        assert_eq!(records[0].value, 1.25);
    }

    #[test]
    fn prefix_policy_skips_non_numeric_occurrence() {
        let text = "GFLOP/s rating of: n/a\nretry\nGFLOP/s rating of: 4.25\n";
        let records = throughput_only(NumberPolicy::Prefix)
            .extract(text, &run(1))
            .unwrap();
        assert_eq!(records[0].value, 4.25);
    }

    #[test]
    fn strict_policy_stops_at_first_occurrence() {
        let text = "GFLOP/s rating of: n/a\nretry\nGFLOP/s rating of: 4.25\n";
        let err = throughput_only(NumberPolicy::Strict)
            .extract(text, &run(1))
            .unwrap_err();
        match err {
            RigError::MalformedMetric { raw_text, .. } => assert_eq!(raw_text, "n/a"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn surrounding_noise_is_ignored() {
        let text = "[rank 0] ### GFLOP/s rating of: 3.50 ### trailing";
        let records = throughput_only(NumberPolicy::Strict)
            .extract(text, &run(1))
            .unwrap();
        assert_eq!(records[0].value, 3.5);
    }

    // -- Trailing garbage --

    #[test]
    fn prefix_policy_reads_valid_prefix() {
        let text = "GFLOP/s rating of: 10.5x\n";
        let records = throughput_only(NumberPolicy::Prefix)
            .extract(text, &run(1))
            .unwrap();
        assert_eq!(records[0].value, 10.5);
    }

    #[test]
    fn strict_policy_rejects_trailing_garbage() {
        let text = "GFLOP/s rating of: 10.5x\n";
        let err = throughput_only(NumberPolicy::Strict)
            .extract(text, &run(1))
            .unwrap_err();
        match err {
            RigError::MalformedMetric { label, raw_text } => {
                assert_eq!(label, "GFLOP/s rating of: ");
                assert_eq!(raw_text, "10.5x");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn strict_policy_accepts_clean_sample() {
        let extractor =
            MetricExtractor::new(ExtractionRule::hpcg_defaults(), NumberPolicy::Strict).unwrap();
        assert_eq!(extractor.extract(SAMPLE, &run(2)).unwrap().len(), 6);
    }

    #[test]
    fn integers_and_signs_do_not_match_grammar() {
        let extractor = throughput_only(NumberPolicy::Prefix);
        assert!(extractor.extract("GFLOP/s rating of: 10", &run(1)).is_err());
        assert!(extractor.extract("GFLOP/s rating of: -1.5", &run(1)).is_err());
        let strict = throughput_only(NumberPolicy::Strict);
        assert!(matches!(
            strict.extract("GFLOP/s rating of: 1,000.5", &run(1)).unwrap_err(),
            RigError::MalformedMetric { .. }
        ));
    }

    // -- Rule table --

    #[test]
    fn rule_set_is_open() {
        let mut rules = ExtractionRule::hpcg_defaults();
        rules.push(ExtractionRule::new(
            "Bytes Per Equation",
            "Bytes per equation (Total memory / Number of Equations): ",
            "bytes",
        ));
        let extractor = MetricExtractor::new(rules, NumberPolicy::Prefix).unwrap();
        let records = extractor.extract(SAMPLE, &run(2)).unwrap();
        assert_eq!(records.len(), 7);
        assert_eq!(records[6].value, 714.947);
    }

    #[test]
    fn labels_with_regex_metacharacters_are_literal() {
        let extractor = MetricExtractor::new(
            vec![ExtractionRule::new("Odd", "a.b (x)*: ", "u")],
            NumberPolicy::Prefix,
        )
        .unwrap();
        assert!(extractor.extract("aXb (x)*: 1.0", &run(1)).is_err());
        assert_eq!(extractor.extract("a.b (x)*: 2.0", &run(1)).unwrap()[0].value, 2.0);
    }

    #[test]
    fn policy_deserializes_lowercase() {
        let policy: NumberPolicy = serde_yaml::from_str("strict").unwrap();
        assert_eq!(policy, NumberPolicy::Strict);
    }
}
