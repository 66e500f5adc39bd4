//! Business logic between the HTTP handlers and the store

pub mod dashboard;
pub mod impact;
pub mod orchestrator;
pub mod scheduler;
pub mod usage;

pub use orchestrator::{IntelligenceBundle, Orchestrator};
pub use scheduler::WatchScheduler;
