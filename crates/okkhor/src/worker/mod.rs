pub mod pool;

pub use pool::WorkerPool;

// Re-export crossbeam_channel for callers draining results directly.
pub use crossbeam_channel;
