pub mod app;
pub mod branch;
pub mod page;

pub use app::{App, AppDeployment, Organization, Secret};
pub use branch::{BranchEndpoint, CreatedBranch, DatabaseBranch, EndpointSpec, EndpointType};
pub use page::{
    DeploymentPage, DeploymentTrigger, Endpoints, PageDeployment, PublishedPage, TriggerMetadata,
    PREVIEW_ENVIRONMENT,
};
