use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::backends::DatabaseBranchProvisioner;
use crate::config::NeonConfig;
use crate::error::{AppError, AppResult, DeleteOutcome};
use crate::models::{BranchEndpoint, CreatedBranch, DatabaseBranch, EndpointSpec};

const BACKEND: &str = "neon";

/// Database branches over the Neon v2 REST API
#[derive(Clone)]
pub struct NeonBranches {
    client: Client,
    api_url: String,
    api_token: String,
}

#[derive(Deserialize)]
struct BranchList {
    branches: Vec<DatabaseBranch>,
}

#[derive(Deserialize)]
struct EndpointList {
    endpoints: Vec<BranchEndpoint>,
}

#[derive(Serialize)]
struct CreateBranchRequest<'a> {
    branch: NewBranch<'a>,
    endpoints: [&'a EndpointSpec; 1],
}

#[derive(Serialize)]
struct NewBranch<'a> {
    name: &'a str,
}

impl NeonBranches {
    pub fn new(config: &NeonConfig) -> AppResult<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::backend(BACKEND, status.as_u16(), body));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl DatabaseBranchProvisioner for NeonBranches {
    async fn list_branches(&self, project_id: &str) -> AppResult<Vec<DatabaseBranch>> {
        let url = self.url(&format!("/projects/{}/branches", project_id));
        tracing::debug!(project_id, "Listing database branches");

        let list: BranchList = self.send(self.client.get(url)).await?;
        Ok(list.branches)
    }

    async fn create_branch(
        &self,
        project_id: &str,
        name: &str,
        endpoint: &EndpointSpec,
    ) -> AppResult<CreatedBranch> {
        let url = self.url(&format!("/projects/{}/branches", project_id));
        let body = CreateBranchRequest {
            branch: NewBranch { name },
            endpoints: [endpoint],
        };
        tracing::debug!(project_id, branch = name, "Creating database branch");

        self.send(self.client.post(url).json(&body)).await
    }

    async fn list_branch_endpoints(
        &self,
        project_id: &str,
        branch_id: &str,
    ) -> AppResult<Vec<BranchEndpoint>> {
        let url = self.url(&format!(
            "/projects/{}/branches/{}/endpoints",
            project_id, branch_id
        ));

        let list: EndpointList = self.send(self.client.get(url)).await?;
        Ok(list.endpoints)
    }

    async fn delete_branch(&self, project_id: &str, branch_id: &str) -> AppResult<DeleteOutcome> {
        let url = self.url(&format!("/projects/{}/branches/{}", project_id, branch_id));

        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        DeleteOutcome::from_status(BACKEND, status, &body)
    }
}
