//! Detection orchestration.
//!
//! # Architecture
//!
//! - **Seams** (`traits.rs`): [`FeatureExtractor`] and [`LoopDetector`], the
//!   two external collaborators
//! - **Results** (`result.rs`): the detector status taxonomy and its
//!   classification into [`DetectionOutcome`]
//! - **Statistics** (`stats.rs`): loop counter, rejection tally and phase
//!   timings, summarized as a [`RunReport`]
//! - **Orchestrator** (`orchestrator.rs`): precondition checks and the
//!   per-image query loop

pub mod orchestrator;
pub mod result;
pub mod stats;
pub mod traits;

pub use orchestrator::{Orchestrator, PreparedRun, prepare, run_pipeline};
pub use result::{
    DetectionOutcome, DetectionResult, DetectionStatus, RejectionReason, UnknownStatus,
};
pub use stats::{PHASE_DETECTION, PHASE_FEATURES, QueryReport, RunReport, RunStatistics};
pub use traits::{FeatureExtractor, LoopDetector};
