pub mod case_def;
pub mod case_registry;

pub use case_def::CaseDefinition;
pub use case_registry::{CaseRegistry, GameSummary};
