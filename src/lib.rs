// Library crate for the preview environment orchestrator
// Exports modules for use by the CI and garbage collector binaries and tests

pub mod backends;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod services;
pub mod state;

pub use error::{AppError, AppResult, DeleteOutcome};
pub use identity::EnvironmentIdentity;
pub use services::{GarbageCollector, GcReport, ProvisionService, TeardownService};
pub use state::Backends;
