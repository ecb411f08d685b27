pub mod aggregation;
pub mod alignment;
pub mod detection;
pub mod pipeline;
pub mod ranking;
pub mod scoring;
pub mod stats;

pub use pipeline::{run, PipelineInput, RunReport};
