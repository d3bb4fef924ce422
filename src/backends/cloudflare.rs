use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::backends::StaticSiteProvisioner;
use crate::config::PagesConfig;
use crate::error::{AppError, AppResult, DeleteOutcome};
use crate::models::{DeploymentPage, PageDeployment};

const BACKEND: &str = "cloudflare";

/// Longest branch alias Cloudflare Pages keeps
const BRANCH_ALIAS_MAX_LEN: usize = 28;

/// Cloudflare Pages: builds and publishes through the local toolchain and
/// `wrangler`, lists and deletes deployments over the REST API
#[derive(Clone)]
pub struct CloudflarePages {
    client: Client,
    api_url: String,
    api_token: String,
    account_id: String,
    build_command: String,
    output_dir: String,
    wrangler_bin: String,
}

#[derive(Deserialize)]
struct DeploymentEnvelope {
    #[serde(default)]
    result: Vec<PageDeployment>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: Option<u32>,
}

impl CloudflarePages {
    pub fn new(config: &PagesConfig) -> AppResult<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            account_id: config.account_id.clone(),
            build_command: config.build_command.clone(),
            output_dir: config.output_dir.clone(),
            wrangler_bin: config.wrangler_bin.clone(),
        })
    }

    fn deployments_url(&self, account_id: &str, project: &str) -> String {
        format!(
            "{}/accounts/{}/pages/projects/{}/deployments",
            self.api_url, account_id, project
        )
    }
}

/// Public URL of a branch deployment, following the Pages alias rules
pub fn branch_alias_url(project_name: &str, branch_label: &str) -> String {
    let mut alias = String::new();
    for c in branch_label.chars() {
        if c.is_ascii_alphanumeric() {
            alias.push(c.to_ascii_lowercase());
        } else {
            alias.push('-');
        }
    }
    alias.truncate(BRANCH_ALIAS_MAX_LEN);
    let alias = alias.trim_matches('-');

    format!("https://{}.{}.pages.dev", alias, project_name)
}

#[async_trait]
impl StaticSiteProvisioner for CloudflarePages {
    async fn build(&self, path: &Path, env: &HashMap<String, String>) -> AppResult<PathBuf> {
        tracing::info!(dir = %path.display(), command = %self.build_command, "Building site");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.build_command)
            .current_dir(path)
            .envs(env)
            .output()
            .await?;

        if !output.status.success() {
            return Err(AppError::Build(format!(
                "`{}` exited with {}: {}",
                self.build_command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(path.join(&self.output_dir))
    }

    async fn deploy_page(
        &self,
        project_name: &str,
        branch_label: &str,
        artifact_path: &Path,
    ) -> AppResult<String> {
        tracing::info!(project = project_name, branch = branch_label, "Publishing page");

        let output = Command::new(&self.wrangler_bin)
            .arg("pages")
            .arg("deploy")
            .arg(artifact_path)
            .args(["--project-name", project_name, "--branch", branch_label])
            .env("CLOUDFLARE_API_TOKEN", &self.api_token)
            .env("CLOUDFLARE_ACCOUNT_ID", &self.account_id)
            .output()
            .await?;

        if !output.status.success() {
            return Err(AppError::Build(format!(
                "wrangler pages deploy exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(branch_alias_url(project_name, branch_label))
    }

    async fn list_deployments(
        &self,
        account_id: &str,
        project: &str,
        page: u32,
    ) -> AppResult<DeploymentPage> {
        // The API counts pages from 1
        let url = format!("{}?page={}", self.deployments_url(account_id, project), page + 1);
        tracing::debug!(url = %url, "Fetching deployments");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::backend(BACKEND, status.as_u16(), body));
        }

        let envelope: DeploymentEnvelope = response.json().await?;
        Ok(DeploymentPage {
            results: envelope.result,
            total_pages: envelope.result_info.and_then(|info| info.total_pages),
        })
    }

    async fn delete_deployment(
        &self,
        account_id: &str,
        project: &str,
        deployment_id: &str,
    ) -> AppResult<DeleteOutcome> {
        let url = format!(
            "{}/{}?force=true",
            self.deployments_url(account_id, project),
            deployment_id
        );

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(url = %url, status, "Deleted deployment");

        DeleteOutcome::from_status(BACKEND, status, &body)
    }
}
