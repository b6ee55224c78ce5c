pub mod config;
pub mod corpus;
pub mod detection;
pub mod extract;
pub mod io;
pub mod profiler;
pub mod reconcile;

pub use config::{DetectorParams, GeometricCheck, PipelineConfig};
pub use detection::{Orchestrator, RunReport, prepare, run_pipeline};
pub use reconcile::{IndexMapping, reconcile};
