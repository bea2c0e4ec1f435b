pub mod context;
pub mod intent;
pub mod runtime;

pub use context::ContextAssembler;
pub use intent::IntentClassifier;
pub use runtime::{Orchestrator, TurnOutcome, TurnResult};
