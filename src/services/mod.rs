pub mod deletion;
pub mod gc;
pub mod provision;
pub mod teardown;

pub use deletion::DeletionBatch;
pub use gc::{
    deployment_pages, list_all_deployments, list_existing_deployments, GarbageCollector, GcReport,
    DEFAULT_MAX_AGE,
};
pub use provision::ProvisionService;
pub use teardown::TeardownService;
