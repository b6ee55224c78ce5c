//! Per-run accumulation of outcomes and timings, and the final report.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::profiler::Profiler;

use super::result::{DetectionOutcome, RejectionReason};

/// Profiler phase covering feature acquisition for one query.
pub const PHASE_FEATURES: &str = "features";

/// Profiler phase covering the detector call for one query.
pub const PHASE_DETECTION: &str = "detection";

/// Outcome of one query image.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryReport {
    pub query: usize,
    pub image: PathBuf,
    pub num_features: usize,
    pub outcome: DetectionOutcome,
}

/// Mutable state of a run: written once per query, read at the end.
#[derive(Debug, Default)]
pub struct RunStatistics {
    pub profiler: Profiler,
    loops_found: usize,
    rejections: BTreeMap<RejectionReason, usize>,
    queries: Vec<QueryReport>,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: QueryReport) {
        match report.outcome {
            DetectionOutcome::Loop { .. } => self.loops_found += 1,
            DetectionOutcome::Rejected { reason, .. } => {
                *self.rejections.entry(reason).or_insert(0) += 1;
            }
        }
        self.queries.push(report);
    }

    pub fn loops_found(&self) -> usize {
        self.loops_found
    }

    pub fn queries_processed(&self) -> usize {
        self.queries.len()
    }

    pub fn finish(self) -> RunReport {
        RunReport {
            mean_features: self.profiler.mean_duration(PHASE_FEATURES),
            mean_detection: self.profiler.mean_duration(PHASE_DETECTION),
            loops_found: self.loops_found,
            rejections: self.rejections,
            queries: self.queries,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub queries: Vec<QueryReport>,
    pub loops_found: usize,
    pub rejections: BTreeMap<RejectionReason, usize>,
    /// `None` when no query was timed.
    pub mean_features: Option<Duration>,
    pub mean_detection: Option<Duration>,
}

impl RunReport {
    pub fn rejected(&self, reason: RejectionReason) -> usize {
        self.rejections.get(&reason).copied().unwrap_or(0)
    }

    /// Query indices and matched images of every detected loop.
    pub fn loops(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.queries.iter().filter_map(|q| match q.outcome {
            DetectionOutcome::Loop { matched } => Some((q.query, matched)),
            DetectionOutcome::Rejected { .. } => None,
        })
    }
}

struct Millis(Option<Duration>);

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => write!(f, "{:.3} ms/image", d.as_secs_f64() * 1e3),
            None => f.write_str("n/a (no samples)"),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.loops_found {
            0 => writeln!(f, "No loops found in this image sequence")?,
            1 => writeln!(f, "1 loop found in this image sequence!")?,
            n => writeln!(f, "{} loops found in this image sequence!", n)?,
        }

        if !self.rejections.is_empty() {
            writeln!(f, "Rejections:")?;
            for (reason, count) in &self.rejections {
                writeln!(f, " - {}: {}", reason.label(), count)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Average execution time:")?;
        writeln!(f, " - Feature computation: {}", Millis(self.mean_features))?;
        write!(f, " - Loop detection: {}", Millis(self.mean_detection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(i: usize, outcome: DetectionOutcome) -> QueryReport {
        QueryReport {
            query: i,
            image: PathBuf::from(format!("img{i:03}.jpg")),
            num_features: 100,
            outcome,
        }
    }

    #[test]
    fn test_counts_and_means() {
        let mut stats = RunStatistics::new();
        stats.record(query(
            0,
            DetectionOutcome::Rejected {
                reason: RejectionReason::NoDbResults,
                best_candidate: None,
            },
        ));
        stats.record(query(1, DetectionOutcome::Loop { matched: 0 }));
        for ms in [10, 20, 30] {
            stats.profiler.record(PHASE_FEATURES, Duration::from_millis(ms));
        }

        assert_eq!(stats.loops_found(), 1);
        assert_eq!(stats.queries_processed(), 2);

        let report = stats.finish();
        assert_eq!(report.loops_found, 1);
        assert_eq!(report.rejected(RejectionReason::NoDbResults), 1);
        assert_eq!(report.rejected(RejectionReason::LowScores), 0);
        assert_eq!(report.mean_features, Some(Duration::from_millis(20)));
        assert_eq!(report.mean_detection, None);
        assert_eq!(report.loops().collect::<Vec<_>>(), vec![(1, 0)]);
    }

    #[test]
    fn test_report_text() {
        let mut stats = RunStatistics::new();
        stats.profiler.record(PHASE_FEATURES, Duration::from_millis(4));
        stats.profiler.record(PHASE_DETECTION, Duration::from_millis(2));
        stats.record(query(0, DetectionOutcome::Loop { matched: 3 }));

        let text = stats.finish().to_string();
        assert!(text.starts_with("1 loop found in this image sequence!"));
        assert!(text.contains("Feature computation: 4.000 ms/image"));
        assert!(text.contains("Loop detection: 2.000 ms/image"));
    }

    #[test]
    fn test_report_without_loops_or_samples() {
        let text = RunStatistics::new().finish().to_string();
        assert!(text.starts_with("No loops found in this image sequence"));
        assert!(text.contains("Feature computation: n/a (no samples)"));
    }
}
