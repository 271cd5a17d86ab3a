pub mod completion;
pub mod orchestrator;
pub mod state;

pub use completion::Completion;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use state::DetectionState;
