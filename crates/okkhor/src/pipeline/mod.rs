pub mod context;
pub mod progress;
pub mod runner;

pub use context::PipelineContext;
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::Pipeline;
