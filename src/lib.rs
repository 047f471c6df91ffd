// Themer: learned theme scores for topic-annotated events.
//
// This is the library root. Each module corresponds to a major subsystem
// of the scoring pipeline.

pub mod config;
pub mod output;
pub mod pipeline;
pub mod store;
pub mod topics;
