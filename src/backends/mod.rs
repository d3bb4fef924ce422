pub mod cloudflare;
pub mod fly;
pub mod memory;
pub mod neon;

pub use cloudflare::CloudflarePages;
pub use fly::FlyApps;
pub use memory::{InMemoryApps, InMemoryDatabaseBranches, InMemoryPages};
pub use neon::NeonBranches;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppResult, DeleteOutcome};
use crate::models::{
    App, BranchEndpoint, CreatedBranch, DatabaseBranch, DeploymentPage, EndpointSpec,
    Organization, Secret,
};

/// Database branch backend
#[async_trait]
pub trait DatabaseBranchProvisioner: Send + Sync {
    /// List every branch of a project
    async fn list_branches(&self, project_id: &str) -> AppResult<Vec<DatabaseBranch>>;

    /// Create a branch together with its compute endpoint
    async fn create_branch(
        &self,
        project_id: &str,
        name: &str,
        endpoint: &EndpointSpec,
    ) -> AppResult<CreatedBranch>;

    /// List the endpoints attached to a branch
    async fn list_branch_endpoints(
        &self,
        project_id: &str,
        branch_id: &str,
    ) -> AppResult<Vec<BranchEndpoint>>;

    /// Delete a branch by id
    async fn delete_branch(&self, project_id: &str, branch_id: &str) -> AppResult<DeleteOutcome>;
}

/// Application deployment backend
#[async_trait]
pub trait AppDeploymentProvisioner: Send + Sync {
    async fn get_org_by_name(&self, name: &str) -> AppResult<Option<Organization>>;

    async fn list_apps(&self, org_id: &str) -> AppResult<Vec<App>>;

    async fn create_app(&self, org_id: &str, name: &str, region: &str) -> AppResult<App>;

    /// Replace the app's secrets with the given set
    async fn set_secrets(&self, app_id: &str, secrets: &[Secret]) -> AppResult<()>;

    /// Roll out an image with the given machine config
    async fn deploy_image(
        &self,
        app_id: &str,
        image: &str,
        config: &serde_json::Value,
    ) -> AppResult<()>;

    async fn delete_app(&self, app_id: &str) -> AppResult<DeleteOutcome>;
}

/// Static site backend
#[async_trait]
pub trait StaticSiteProvisioner: Send + Sync {
    /// Build the site at `path` with `env` exported; returns the output directory
    async fn build(&self, path: &Path, env: &HashMap<String, String>) -> AppResult<PathBuf>;

    /// Publish a build output under a branch label; returns the page URL
    async fn deploy_page(
        &self,
        project_name: &str,
        branch_label: &str,
        artifact_path: &Path,
    ) -> AppResult<String>;

    /// Fetch one page of the deployment history. `page` is 0-based.
    async fn list_deployments(
        &self,
        account_id: &str,
        project: &str,
        page: u32,
    ) -> AppResult<DeploymentPage>;

    async fn delete_deployment(
        &self,
        account_id: &str,
        project: &str,
        deployment_id: &str,
    ) -> AppResult<DeleteOutcome>;
}
