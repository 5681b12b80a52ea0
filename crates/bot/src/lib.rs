//! SimpleFlow bot: webhook server and event orchestration.
//!
//! The server receives GitHub webhooks, verifies their signatures, and hands
//! recognized events to the [`orchestrator::EventOrchestrator`], which calls
//! the remote AI functions and writes results back into GitHub.

pub mod events;
pub mod failure;
pub mod orchestrator;
pub mod server;
pub mod signature;

pub use orchestrator::EventOrchestrator;
pub use server::{build_router, AppState};
