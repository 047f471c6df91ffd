// Batch pipeline that recomputes fingerprints and learned theme scores.

pub mod entities;
pub mod learn;
pub mod summary;

pub use learn::{score_events, Pipeline, PipelineConfig};
pub use summary::{EventError, RunError, RunSummary, Stage, ThemeError, UnitFailure};
