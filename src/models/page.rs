use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use time::OffsetDateTime;

/// Environment tag the edge provider gives to non-production deployments
pub const PREVIEW_ENVIRONMENT: &str = "preview";

/// Historical deployment record of a pages project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDeployment {
    pub id: String,
    #[serde(default)]
    pub project_name: String,
    pub environment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_on: OffsetDateTime,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub deployment_trigger: Option<DeploymentTrigger>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentTrigger {
    #[serde(default)]
    pub metadata: Option<TriggerMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerMetadata {
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit_hash: Option<String>,
}

impl PageDeployment {
    pub fn is_preview(&self) -> bool {
        self.environment == PREVIEW_ENVIRONMENT
    }

    /// Branch label recorded in the trigger metadata
    pub fn branch(&self) -> Option<&str> {
        self.deployment_trigger
            .as_ref()
            .and_then(|t| t.metadata.as_ref())
            .and_then(|m| m.branch.as_deref())
    }
}

/// One page of a deployment listing
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentPage {
    pub results: Vec<PageDeployment>,
    /// Only meaningful on the first page; `None` when the envelope lacks it
    pub total_pages: Option<u32>,
}

/// Record of a page published under a branch label
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedPage {
    pub project_name: String,
    pub branch_label: String,
    pub artifact_path: PathBuf,
    pub build_env: HashMap<String, String>,
    pub url: String,
}

/// Externally reachable endpoints of a provisioned environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub database_url: String,
    pub app_host: String,
    pub page_url: String,
}
