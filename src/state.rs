use std::sync::Arc;

use crate::backends::{
    AppDeploymentProvisioner, CloudflarePages, DatabaseBranchProvisioner, FlyApps, NeonBranches,
    StaticSiteProvisioner,
};
use crate::config::Config;
use crate::error::AppResult;

/// Backend ports shared by the orchestrators
#[derive(Clone)]
pub struct Backends {
    pub database: Arc<dyn DatabaseBranchProvisioner>,
    pub apps: Arc<dyn AppDeploymentProvisioner>,
    pub pages: Arc<dyn StaticSiteProvisioner>,
}

impl Backends {
    /// Create the network-backed ports from configuration
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self {
            database: Arc::new(NeonBranches::new(&config.neon)?),
            apps: Arc::new(FlyApps::new(&config.fly)?),
            pages: Arc::new(CloudflarePages::new(&config.pages)?),
        })
    }

    /// Create Backends from explicit ports (for testing)
    pub fn with_providers(
        database: Arc<dyn DatabaseBranchProvisioner>,
        apps: Arc<dyn AppDeploymentProvisioner>,
        pages: Arc<dyn StaticSiteProvisioner>,
    ) -> Self {
        Self {
            database,
            apps,
            pages,
        }
    }
}
