//! Submits render inputs to a remote render queue and waits for the results.
//!
//! [`orchestrator::RenderQueueOrchestrator`] is the entry point: it logs in, resolves the
//! target project, uploads one archive per input and polls until every job is downloaded.

pub mod console;
pub mod orchestrator;
pub mod remote;
pub mod selector;
pub mod submission;
pub mod waiter;

pub use orchestrator::RenderQueueOrchestrator;
pub use remote::RenderQueueService;
