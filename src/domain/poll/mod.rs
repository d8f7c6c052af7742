pub mod dispatcher;
pub mod error;
pub mod model;
pub mod processor;
pub mod service;

pub use dispatcher::{effective_limit, PollDispatcher, DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
pub use error::SourceError;
pub use model::{CycleSummary, ProcessOptions, ProcessingResult};
pub use processor::SourceProcessor;
pub use service::PollService;
