//! Run-scoped counters and the final run report

use morgue_domain::Outcome;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Counters collected over one run
///
/// Owned by the collecting loop; nothing else mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMetrics {
    /// Tasks that reached a terminal state
    pub attempted: usize,
    /// Records materialized
    pub succeeded: usize,
    /// Duplicates (collision or existing target)
    pub duplicated: usize,
    /// Skipped documents
    pub skipped: usize,
    /// Failed tasks
    pub failed: usize,
    /// Concurrency budget of the run
    pub concurrency: usize,
    /// Most tasks observed executing at once
    pub peak_in_flight: usize,
    /// Wall time of the run
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

impl RunMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one terminal outcome
    pub fn record(&mut self, outcome: &Outcome) {
        self.attempted += 1;
        match outcome {
            Outcome::Success { .. } => self.succeeded += 1,
            Outcome::Duplicate { .. } => self.duplicated += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::Error { .. } => self.failed += 1,
        }
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let lines = [
            "Run Summary".to_string(),
            "===========".to_string(),
            format!("Attempted:  {}", self.attempted),
            format!("Succeeded:  {}", self.succeeded),
            format!("Duplicated: {}", self.duplicated),
            format!("Skipped:    {}", self.skipped),
            format!("Failed:     {}", self.failed),
            format!(
                "Concurrency: {} (peak in flight: {})",
                self.concurrency, self.peak_in_flight
            ),
            format!("Elapsed: {:.3}s", self.elapsed.as_secs_f64()),
        ];
        lines.join("\n")
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Counters
    pub metrics: RunMetrics,
    /// Outcomes in completion order
    pub outcomes: Vec<Outcome>,
}

impl RunReport {
    /// Outcomes sorted by source path
    pub fn sorted_outcomes(&self) -> Vec<&Outcome> {
        let mut sorted: Vec<&Outcome> = self.outcomes.iter().collect();
        sorted.sort_by(|a, b| a.path().cmp(b.path()));
        sorted
    }

    /// Duplicate outcomes, by path
    pub fn duplicates(&self) -> Vec<&Outcome> {
        self.filter(|o| matches!(o, Outcome::Duplicate { .. }))
    }

    /// Skipped outcomes, by path
    pub fn skipped(&self) -> Vec<&Outcome> {
        self.filter(|o| matches!(o, Outcome::Skipped { .. }))
    }

    /// Failed outcomes, by path
    pub fn failures(&self) -> Vec<&Outcome> {
        self.filter(|o| matches!(o, Outcome::Error { .. }))
    }

    /// Everything needing follow-up: duplicates, skips and failures, by path
    pub fn exceptions(&self) -> Vec<&Outcome> {
        self.filter(|o| !o.is_success())
    }

    fn filter(&self, keep: impl Fn(&Outcome) -> bool) -> Vec<&Outcome> {
        self.sorted_outcomes()
            .into_iter()
            .filter(|o| keep(*o))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morgue_domain::{DuplicateReason, Resolver, SkipReason};
    use std::path::PathBuf;

    fn outcomes() -> Vec<Outcome> {
        let key = Resolver::default()
            .resolve("https://tw.appledaily.com/local/20200505/HASH/")
            .unwrap();
        vec![
            Outcome::Error {
                path: PathBuf::from("d.html"),
                message: "read failed".to_string(),
            },
            Outcome::Success {
                path: PathBuf::from("a.html"),
                key: key.clone(),
                target: PathBuf::from("out/local/20200505/HASH/index.json"),
            },
            Outcome::Duplicate {
                path: PathBuf::from("b.html"),
                key,
                reason: DuplicateReason::IdCollision,
            },
            Outcome::Skipped {
                path: PathBuf::from("c.html"),
                reason: SkipReason::NoMatch,
                identifier: Some("c".to_string()),
            },
        ]
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = RunMetrics::new();
        assert_eq!(metrics.attempted, 0);
        assert_eq!(metrics.peak_in_flight, 0);
    }

    #[test]
    fn test_record_counts_each_status() {
        let mut metrics = RunMetrics::new();
        for outcome in &outcomes() {
            metrics.record(outcome);
        }
        assert_eq!(metrics.attempted, 4);
        assert_eq!(metrics.succeeded, 1);
        assert_eq!(metrics.duplicated, 1);
        assert_eq!(metrics.skipped, 1);
        assert_eq!(metrics.failed, 1);
    }

    #[test]
    fn test_report_accessors_sorted_by_path() {
        let report = RunReport {
            metrics: RunMetrics::new(),
            outcomes: outcomes(),
        };
        let paths: Vec<_> = report
            .sorted_outcomes()
            .iter()
            .map(|o| o.path().to_path_buf())
            .collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("a.html"),
                PathBuf::from("b.html"),
                PathBuf::from("c.html"),
                PathBuf::from("d.html"),
            ]
        );
        assert_eq!(report.duplicates().len(), 1);
        assert_eq!(report.skipped().len(), 1);
        assert_eq!(report.failures()[0].path(), std::path::Path::new("d.html"));
        assert_eq!(report.exceptions().len(), 3);
    }

    #[test]
    fn test_summary() {
        let mut metrics = RunMetrics::new();
        metrics.record(&outcomes()[1]);
        metrics.concurrency = 4;
        metrics.peak_in_flight = 1;
        metrics.elapsed = Duration::from_millis(1500);

        let summary = metrics.summary();
        assert!(summary.contains("Succeeded:  1"));
        assert!(summary.contains("peak in flight: 1"));
        assert!(summary.contains("Elapsed: 1.500s"));
    }

    #[test]
    fn test_json_shape() {
        let report = RunReport {
            metrics: RunMetrics {
                elapsed: Duration::from_millis(42),
                ..Default::default()
            },
            outcomes: outcomes(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["metrics"]["elapsed_ms"], 42);
        assert_eq!(json["outcomes"][2]["status"], "duplicate");
        assert_eq!(json["outcomes"][2]["reason"], "id-collision");
        assert_eq!(json["outcomes"][0]["status"], "error");
    }
}
