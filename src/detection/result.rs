//! What the loop detector returns for one query and how it is classified.

use std::fmt;

use thiserror::Error;

use crate::config::DetectorParams;

/// Status reported by the loop detector, one per query.
///
/// The discriminants are the raw codes used by DBoW-style detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DetectionStatus {
    LoopDetected = 0,
    /// All the images in the database are very recent.
    CloseMatchesOnly = 1,
    /// No matches against the database.
    NoDbResults = 2,
    /// Score of the current image against the previous one is too low.
    LowNssFactor = 3,
    /// No match reaches the score threshold.
    LowScores = 4,
    /// Not enough close matches to create groups.
    NoGroups = 5,
    NoTemporalConsistency = 6,
    NoGeometricalConsistency = 7,
}

impl DetectionStatus {
    pub const ALL: [DetectionStatus; 8] = [
        DetectionStatus::LoopDetected,
        DetectionStatus::CloseMatchesOnly,
        DetectionStatus::NoDbResults,
        DetectionStatus::LowNssFactor,
        DetectionStatus::LowScores,
        DetectionStatus::NoGroups,
        DetectionStatus::NoTemporalConsistency,
        DetectionStatus::NoGeometricalConsistency,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown detection status code {0}")]
pub struct UnknownStatus(pub i32);

impl TryFrom<i32> for DetectionStatus {
    type Error = UnknownStatus;

    fn try_from(code: i32) -> Result<Self, UnknownStatus> {
        DetectionStatus::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or(UnknownStatus(code))
    }
}

/// Raw detector answer for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionResult {
    pub status: DetectionStatus,
    /// Index of the query image.
    pub query: usize,
    /// Matched image for a loop, best candidate for some rejections.
    pub matched: Option<usize>,
}

impl DetectionResult {
    pub fn loop_found(query: usize, matched: usize) -> Self {
        Self {
            status: DetectionStatus::LoopDetected,
            query,
            matched: Some(matched),
        }
    }

    pub fn rejected(query: usize, status: DetectionStatus, best_candidate: Option<usize>) -> Self {
        Self {
            status,
            query,
            matched: best_candidate,
        }
    }
}

/// Reason a query did not close a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectionReason {
    CloseMatchesOnly,
    NoDbResults,
    LowNssFactor,
    LowScores,
    NoGroups,
    NoTemporalConsistency,
    NoGeometricalConsistency,
}

impl RejectionReason {
    pub const ALL: [RejectionReason; 7] = [
        RejectionReason::CloseMatchesOnly,
        RejectionReason::NoDbResults,
        RejectionReason::LowNssFactor,
        RejectionReason::LowScores,
        RejectionReason::NoGroups,
        RejectionReason::NoTemporalConsistency,
        RejectionReason::NoGeometricalConsistency,
    ];

    /// Short stable identifier, used in summaries.
    pub fn label(self) -> &'static str {
        match self {
            RejectionReason::CloseMatchesOnly => "close_matches_only",
            RejectionReason::NoDbResults => "no_db_results",
            RejectionReason::LowNssFactor => "low_nss_factor",
            RejectionReason::LowScores => "low_scores",
            RejectionReason::NoGroups => "no_groups",
            RejectionReason::NoTemporalConsistency => "no_temporal_consistency",
            RejectionReason::NoGeometricalConsistency => "no_geometrical_consistency",
        }
    }
}

/// Classified outcome of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionOutcome {
    Loop {
        matched: usize,
    },
    Rejected {
        reason: RejectionReason,
        best_candidate: Option<usize>,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("query {query}: loop detected without a matched image")]
pub struct MissingMatch {
    pub query: usize,
}

impl DetectionOutcome {
    /// Direct dispatch on the detector status, no reinterpretation.
    pub fn classify(result: &DetectionResult) -> Result<Self, MissingMatch> {
        let reason = match result.status {
            DetectionStatus::LoopDetected => {
                let matched = result.matched.ok_or(MissingMatch {
                    query: result.query,
                })?;
                return Ok(DetectionOutcome::Loop { matched });
            }
            DetectionStatus::CloseMatchesOnly => RejectionReason::CloseMatchesOnly,
            DetectionStatus::NoDbResults => RejectionReason::NoDbResults,
            DetectionStatus::LowNssFactor => RejectionReason::LowNssFactor,
            DetectionStatus::LowScores => RejectionReason::LowScores,
            DetectionStatus::NoGroups => RejectionReason::NoGroups,
            DetectionStatus::NoTemporalConsistency => RejectionReason::NoTemporalConsistency,
            DetectionStatus::NoGeometricalConsistency => RejectionReason::NoGeometricalConsistency,
        };
        Ok(DetectionOutcome::Rejected {
            reason,
            best_candidate: result.matched,
        })
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, DetectionOutcome::Loop { .. })
    }

    /// Human-readable diagnostic line for this outcome.
    pub fn describe<'a>(&'a self, params: &'a DetectorParams) -> Diagnostic<'a> {
        Diagnostic {
            outcome: self,
            params,
        }
    }
}

/// [`fmt::Display`] adapter returned by [`DetectionOutcome::describe`].
pub struct Diagnostic<'a> {
    outcome: &'a DetectionOutcome,
    params: &'a DetectorParams,
}

struct Candidate(Option<usize>);

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(idx) => write!(f, "{}", idx),
            None => f.write_str("none"),
        }
    }
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (reason, best) = match *self.outcome {
            DetectionOutcome::Loop { matched } => {
                return write!(f, "Loop found with image {}!", matched);
            }
            DetectionOutcome::Rejected {
                reason,
                best_candidate,
            } => (reason, Candidate(best_candidate)),
        };

        f.write_str("No loop: ")?;
        match reason {
            RejectionReason::CloseMatchesOnly => {
                f.write_str("All the images in the database are very recent")
            }
            RejectionReason::NoDbResults => f.write_str(
                "There are no matches against the database (few features in the image?)",
            ),
            RejectionReason::LowNssFactor => {
                f.write_str("Little overlap between this image and the previous one")
            }
            RejectionReason::LowScores => write!(
                f,
                "No match reaches the score threshold (alpha: {})",
                self.params.alpha
            ),
            RejectionReason::NoGroups => write!(
                f,
                "Not enough close matches to create groups. Best candidate: {}",
                best
            ),
            RejectionReason::NoTemporalConsistency => write!(
                f,
                "No temporal consistency (k: {}). Best candidate: {}",
                self.params.k, best
            ),
            RejectionReason::NoGeometricalConsistency => {
                write!(f, "No geometrical consistency. Best candidate: {}", best)
            }
        }
    }
}
