pub mod config;
pub mod error;
pub mod pipeline;
pub mod subtitle;
pub mod translate;

pub use config::{Config, Tone};
pub use error::{Result, SubtransError};
pub use pipeline::{
    print_summary, translate_file, OutputPaths, PipelineContext, PipelineResult, PipelineStats,
};
