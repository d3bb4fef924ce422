use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::backends::AppDeploymentProvisioner;
use crate::config::FlyConfig;
use crate::error::{AppError, AppResult, DeleteOutcome};
use crate::models::{App, Organization, Secret};

const BACKEND: &str = "fly";

const GET_ORGANIZATION: &str = r#"
query GetOrganizationByName($name: String!) {
  organization(name: $name) { id slug name }
}"#;

const LIST_APPS: &str = r#"
query ListAppsForOrganization($orgId: ID!) {
  apps(organizationId: $orgId) { nodes { id name } }
}"#;

const CREATE_APP: &str = r#"
mutation CreateApp($input: CreateAppInput!) {
  createApp(input: $input) { app { id name } }
}"#;

const SET_SECRETS: &str = r#"
mutation SetSecrets($input: SetSecretsInput!) {
  setSecrets(input: $input) { release { id version } }
}"#;

const DEPLOY_IMAGE: &str = r#"
mutation DeployImage($input: DeployImageInput!) {
  deployImage(input: $input) { release { id version } }
}"#;

const DELETE_APP: &str = r#"
mutation DeleteApp($appId: ID!) {
  deleteApp(appId: $appId) { organization { id } }
}"#;

/// Apps over the Fly GraphQL API
#[derive(Clone)]
pub struct FlyApps {
    client: Client,
    api_url: String,
    api_token: String,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(default)]
    extensions: Option<GraphQlErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorExtensions {
    #[serde(default)]
    code: Option<String>,
}

impl GraphQlError {
    fn is_not_found(&self) -> bool {
        let code = self.extensions.as_ref().and_then(|e| e.code.as_deref());
        code == Some("NOT_FOUND") || self.message.starts_with("Could not find")
    }
}

#[derive(Deserialize)]
struct OrganizationData {
    organization: Option<Organization>,
}

#[derive(Deserialize)]
struct AppsData {
    apps: AppConnection,
}

#[derive(Deserialize)]
struct AppConnection {
    #[serde(default)]
    nodes: Vec<Option<App>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAppData {
    create_app: Option<CreatedApp>,
}

#[derive(Deserialize)]
struct CreatedApp {
    app: Option<App>,
}

/// Outcome of a GraphQL call before its data is decoded
enum Answer<T> {
    Data(T),
    NotFound,
}

impl FlyApps {
    pub fn new(config: &FlyConfig) -> AppResult<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> AppResult<Answer<T>> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", &self.api_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::backend(BACKEND, status.as_u16(), body));
        }

        let answer: GraphQlResponse<T> = response.json().await?;
        if !answer.errors.is_empty() {
            if answer.errors.iter().all(GraphQlError::is_not_found) {
                return Ok(Answer::NotFound);
            }
            let messages: Vec<&str> = answer.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(AppError::backend(BACKEND, status.as_u16(), messages.join("; ")));
        }

        answer
            .data
            .map(Answer::Data)
            .ok_or_else(|| AppError::UnexpectedResponseFormat("GraphQL response without data".to_string()))
    }

    /// Like `execute`, but a not-found answer is an error
    async fn query<T: DeserializeOwned>(&self, query: &str, variables: serde_json::Value) -> AppResult<T> {
        match self.execute(query, variables).await? {
            Answer::Data(data) => Ok(data),
            Answer::NotFound => Err(AppError::backend(BACKEND, 404, "not found")),
        }
    }
}

#[async_trait]
impl AppDeploymentProvisioner for FlyApps {
    async fn get_org_by_name(&self, name: &str) -> AppResult<Option<Organization>> {
        match self.execute::<OrganizationData>(GET_ORGANIZATION, json!({ "name": name })).await? {
            Answer::Data(data) => Ok(data.organization),
            Answer::NotFound => Ok(None),
        }
    }

    async fn list_apps(&self, org_id: &str) -> AppResult<Vec<App>> {
        let data: AppsData = self.query(LIST_APPS, json!({ "orgId": org_id })).await?;
        Ok(data.apps.nodes.into_iter().flatten().collect())
    }

    async fn create_app(&self, org_id: &str, name: &str, region: &str) -> AppResult<App> {
        let variables = json!({
            "input": {
                "organizationId": org_id,
                "name": name,
                "preferredRegion": region,
            }
        });
        let data: CreateAppData = self.query(CREATE_APP, variables).await?;

        data.create_app
            .and_then(|c| c.app)
            .ok_or_else(|| AppError::UnexpectedResponseFormat("createApp returned no app".to_string()))
    }

    async fn set_secrets(&self, app_id: &str, secrets: &[Secret]) -> AppResult<()> {
        let variables = json!({ "input": { "appId": app_id, "secrets": secrets } });
        let _: serde_json::Value = self.query(SET_SECRETS, variables).await?;
        Ok(())
    }

    async fn deploy_image(
        &self,
        app_id: &str,
        image: &str,
        config: &serde_json::Value,
    ) -> AppResult<()> {
        let variables = json!({
            "input": { "appId": app_id, "image": image, "definition": config }
        });
        let _: serde_json::Value = self.query(DEPLOY_IMAGE, variables).await?;
        Ok(())
    }

    async fn delete_app(&self, app_id: &str) -> AppResult<DeleteOutcome> {
        match self.execute::<serde_json::Value>(DELETE_APP, json!({ "appId": app_id })).await? {
            Answer::Data(_) => Ok(DeleteOutcome::Deleted),
            Answer::NotFound => Ok(DeleteOutcome::AlreadyAbsent),
        }
    }
}
