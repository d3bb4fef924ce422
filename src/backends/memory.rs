//! In-memory backends for unit and integration testing

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::backends::{AppDeploymentProvisioner, DatabaseBranchProvisioner, StaticSiteProvisioner};
use crate::error::{AppError, AppResult, DeleteOutcome};
use crate::models::{
    App, BranchEndpoint, CreatedBranch, DatabaseBranch, DeploymentPage, DeploymentTrigger,
    EndpointSpec, Organization, PageDeployment, PublishedPage, Secret, TriggerMetadata,
    PREVIEW_ENVIRONMENT,
};

// ---------------------------------------------------------------------------
// Database branches
// ---------------------------------------------------------------------------

/// In-memory database branch backend
#[derive(Clone, Default)]
pub struct InMemoryDatabaseBranches {
    inner: Arc<Mutex<BranchState>>,
    omit_endpoint_hosts: bool,
}

#[derive(Default)]
struct BranchState {
    branches: Vec<(DatabaseBranch, Vec<BranchEndpoint>)>,
    created: usize,
    deleted: usize,
}

fn endpoint_for(branch_id: &str, host: Option<String>) -> BranchEndpoint {
    BranchEndpoint {
        id: format!("ep-{}", branch_id),
        host,
        endpoint_type: crate::models::EndpointType::ReadWrite,
    }
}

impl InMemoryDatabaseBranches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoints come back without a host, as if still being provisioned
    pub fn without_endpoint_hosts(mut self) -> Self {
        self.omit_endpoint_hosts = true;
        self
    }

    /// Insert an existing branch with one endpoint at `host`
    pub async fn seed_branch(&self, project_id: &str, name: &str, host: &str) -> DatabaseBranch {
        let branch = DatabaseBranch {
            id: format!("br-{}", Uuid::new_v4()),
            name: name.to_string(),
            project_id: project_id.to_string(),
        };
        let endpoint = endpoint_for(&branch.id, Some(host.to_string()));
        self.inner
            .lock()
            .await
            .branches
            .push((branch.clone(), vec![endpoint]));
        branch
    }

    pub async fn branch_names(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.branches.iter().map(|(b, _)| b.name.clone()).collect()
    }

    /// Number of branches created through the port
    pub async fn created_count(&self) -> usize {
        self.inner.lock().await.created
    }

    pub async fn deleted_count(&self) -> usize {
        self.inner.lock().await.deleted
    }

    fn host_for(&self, name: &str) -> Option<String> {
        if self.omit_endpoint_hosts {
            None
        } else {
            Some(format!("{}.db.internal", name))
        }
    }
}

#[async_trait]
impl DatabaseBranchProvisioner for InMemoryDatabaseBranches {
    async fn list_branches(&self, project_id: &str) -> AppResult<Vec<DatabaseBranch>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .branches
            .iter()
            .filter(|(b, _)| b.project_id == project_id)
            .map(|(b, _)| b.clone())
            .collect())
    }

    async fn create_branch(
        &self,
        project_id: &str,
        name: &str,
        _endpoint: &EndpointSpec,
    ) -> AppResult<CreatedBranch> {
        let mut inner = self.inner.lock().await;
        if inner
            .branches
            .iter()
            .any(|(b, _)| b.project_id == project_id && b.name == name)
        {
            return Err(AppError::backend("memory", 409, format!("branch {} exists", name)));
        }

        let branch = DatabaseBranch {
            id: format!("br-{}", Uuid::new_v4()),
            name: name.to_string(),
            project_id: project_id.to_string(),
        };
        let endpoints = vec![endpoint_for(&branch.id, self.host_for(name))];
        inner.branches.push((branch.clone(), endpoints.clone()));
        inner.created += 1;

        Ok(CreatedBranch { branch, endpoints })
    }

    async fn list_branch_endpoints(
        &self,
        project_id: &str,
        branch_id: &str,
    ) -> AppResult<Vec<BranchEndpoint>> {
        let inner = self.inner.lock().await;
        inner
            .branches
            .iter()
            .find(|(b, _)| b.project_id == project_id && b.id == branch_id)
            .map(|(_, endpoints)| endpoints.clone())
            .ok_or_else(|| AppError::backend("memory", 404, format!("branch {} not found", branch_id)))
    }

    async fn delete_branch(&self, project_id: &str, branch_id: &str) -> AppResult<DeleteOutcome> {
        let mut inner = self.inner.lock().await;
        let before = inner.branches.len();
        inner
            .branches
            .retain(|(b, _)| !(b.project_id == project_id && b.id == branch_id));

        if inner.branches.len() < before {
            inner.deleted += 1;
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyAbsent)
        }
    }
}

// ---------------------------------------------------------------------------
// Apps
// ---------------------------------------------------------------------------

/// In-memory app deployment backend
#[derive(Clone, Default)]
pub struct InMemoryApps {
    inner: Arc<Mutex<AppsState>>,
}

#[derive(Default)]
struct AppsState {
    organizations: Vec<Organization>,
    apps: Vec<(String, App)>,
    created: usize,
    deleted: usize,
    secret_pushes: Vec<(String, Vec<Secret>)>,
    image_deploys: Vec<ImageDeploy>,
}

/// One recorded `deploy_image` call
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDeploy {
    pub app_id: String,
    pub image: String,
    pub config: serde_json::Value,
}

impl InMemoryApps {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_organization(&self, name: &str) -> Organization {
        let org = Organization {
            id: format!("org-{}", Uuid::new_v4()),
            slug: name.to_string(),
            name: name.to_string(),
        };
        self.inner.lock().await.organizations.push(org.clone());
        org
    }

    pub async fn seed_app(&self, org_id: &str, name: &str) -> App {
        let app = App {
            id: name.to_string(),
            name: name.to_string(),
        };
        self.inner
            .lock()
            .await
            .apps
            .push((org_id.to_string(), app.clone()));
        app
    }

    pub async fn app_names(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.apps.iter().map(|(_, a)| a.name.clone()).collect()
    }

    pub async fn created_count(&self) -> usize {
        self.inner.lock().await.created
    }

    pub async fn deleted_count(&self) -> usize {
        self.inner.lock().await.deleted
    }

    /// Every `set_secrets` call, in order
    pub async fn secret_pushes(&self) -> Vec<(String, Vec<Secret>)> {
        self.inner.lock().await.secret_pushes.clone()
    }

    /// Every `deploy_image` call, in order
    pub async fn image_deploys(&self) -> Vec<ImageDeploy> {
        self.inner.lock().await.image_deploys.clone()
    }
}

#[async_trait]
impl AppDeploymentProvisioner for InMemoryApps {
    async fn get_org_by_name(&self, name: &str) -> AppResult<Option<Organization>> {
        let inner = self.inner.lock().await;
        Ok(inner.organizations.iter().find(|o| o.name == name).cloned())
    }

    async fn list_apps(&self, org_id: &str) -> AppResult<Vec<App>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .apps
            .iter()
            .filter(|(org, _)| org == org_id)
            .map(|(_, app)| app.clone())
            .collect())
    }

    async fn create_app(&self, org_id: &str, name: &str, _region: &str) -> AppResult<App> {
        let mut inner = self.inner.lock().await;
        if inner.apps.iter().any(|(_, a)| a.name == name) {
            return Err(AppError::backend("memory", 422, "Name has already been taken"));
        }

        let app = App {
            id: name.to_string(),
            name: name.to_string(),
        };
        inner.apps.push((org_id.to_string(), app.clone()));
        inner.created += 1;
        Ok(app)
    }

    async fn set_secrets(&self, app_id: &str, secrets: &[Secret]) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.apps.iter().any(|(_, a)| a.id == app_id) {
            return Err(AppError::backend("memory", 404, format!("app {} not found", app_id)));
        }
        inner
            .secret_pushes
            .push((app_id.to_string(), secrets.to_vec()));
        Ok(())
    }

    async fn deploy_image(
        &self,
        app_id: &str,
        image: &str,
        config: &serde_json::Value,
    ) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.apps.iter().any(|(_, a)| a.id == app_id) {
            return Err(AppError::backend("memory", 404, format!("app {} not found", app_id)));
        }
        inner.image_deploys.push(ImageDeploy {
            app_id: app_id.to_string(),
            image: image.to_string(),
            config: config.clone(),
        });
        Ok(())
    }

    async fn delete_app(&self, app_id: &str) -> AppResult<DeleteOutcome> {
        let mut inner = self.inner.lock().await;
        let before = inner.apps.len();
        inner.apps.retain(|(_, a)| a.id != app_id);

        if inner.apps.len() < before {
            inner.deleted += 1;
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyAbsent)
        }
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// In-memory static site backend with a paginated deployment history
#[derive(Clone)]
pub struct InMemoryPages {
    inner: Arc<Mutex<PagesState>>,
    page_size: usize,
}

#[derive(Default)]
struct PagesState {
    deployments: Vec<PageDeployment>,
    listed_pages: Vec<u32>,
    delete_calls: Vec<String>,
    failing_deletes: HashSet<String>,
    total_pages_override: Option<Option<u32>>,
    builds: Vec<(PathBuf, HashMap<String, String>)>,
    published: Vec<PublishedPage>,
}

impl InMemoryPages {
    pub fn new(page_size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PagesState::default())),
            page_size: page_size.max(1),
        }
    }

    pub async fn seed_deployment(&self, deployment: PageDeployment) {
        self.inner.lock().await.deployments.push(deployment);
    }

    /// Make every listing report this `total_pages` instead of the real count
    pub async fn override_total_pages(&self, total_pages: Option<u32>) {
        self.inner.lock().await.total_pages_override = Some(total_pages);
    }

    /// Make deletes of this id fail with a 500
    pub async fn fail_delete_of(&self, deployment_id: &str) {
        self.inner
            .lock()
            .await
            .failing_deletes
            .insert(deployment_id.to_string());
    }

    pub async fn deployment_ids(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.deployments.iter().map(|d| d.id.clone()).collect()
    }

    /// Page indexes requested, in order
    pub async fn listed_pages(&self) -> Vec<u32> {
        self.inner.lock().await.listed_pages.clone()
    }

    /// Deployment ids passed to `delete_deployment`, in order
    pub async fn delete_calls(&self) -> Vec<String> {
        self.inner.lock().await.delete_calls.clone()
    }

    pub async fn builds(&self) -> Vec<(PathBuf, HashMap<String, String>)> {
        self.inner.lock().await.builds.clone()
    }

    pub async fn published(&self) -> Vec<PublishedPage> {
        self.inner.lock().await.published.clone()
    }
}

/// Preview deployment fixture for `branch`, created `age_days` ago
pub fn preview_deployment(id: &str, branch: &str, age_days: i64) -> PageDeployment {
    PageDeployment {
        id: id.to_string(),
        project_name: String::new(),
        environment: PREVIEW_ENVIRONMENT.to_string(),
        created_on: OffsetDateTime::now_utc() - time::Duration::days(age_days),
        url: None,
        deployment_trigger: Some(DeploymentTrigger {
            metadata: Some(TriggerMetadata {
                branch: Some(branch.to_string()),
                commit_hash: None,
            }),
        }),
    }
}

#[async_trait]
impl StaticSiteProvisioner for InMemoryPages {
    async fn build(&self, path: &Path, env: &HashMap<String, String>) -> AppResult<PathBuf> {
        self.inner
            .lock()
            .await
            .builds
            .push((path.to_path_buf(), env.clone()));
        Ok(path.join("dist"))
    }

    async fn deploy_page(
        &self,
        project_name: &str,
        branch_label: &str,
        artifact_path: &Path,
    ) -> AppResult<String> {
        let mut inner = self.inner.lock().await;
        let url = format!("https://{}.{}.pages.dev", branch_label, project_name);
        let build_env = inner
            .builds
            .last()
            .map(|(_, env)| env.clone())
            .unwrap_or_default();

        let mut deployment = preview_deployment(&Uuid::new_v4().to_string(), branch_label, 0);
        deployment.project_name = project_name.to_string();
        deployment.url = Some(url.clone());
        inner.deployments.push(deployment);

        inner.published.push(PublishedPage {
            project_name: project_name.to_string(),
            branch_label: branch_label.to_string(),
            artifact_path: artifact_path.to_path_buf(),
            build_env,
            url: url.clone(),
        });
        Ok(url)
    }

    async fn list_deployments(
        &self,
        _account_id: &str,
        _project: &str,
        page: u32,
    ) -> AppResult<DeploymentPage> {
        let mut inner = self.inner.lock().await;
        inner.listed_pages.push(page);

        let total = inner.deployments.len();
        let real_pages = total.div_ceil(self.page_size).max(1) as u32;
        let total_pages = inner.total_pages_override.unwrap_or(Some(real_pages));

        let start = (page as usize * self.page_size).min(total);
        let end = (start + self.page_size).min(total);

        Ok(DeploymentPage {
            results: inner.deployments[start..end].to_vec(),
            total_pages,
        })
    }

    async fn delete_deployment(
        &self,
        _account_id: &str,
        _project: &str,
        deployment_id: &str,
    ) -> AppResult<DeleteOutcome> {
        let mut inner = self.inner.lock().await;
        inner.delete_calls.push(deployment_id.to_string());

        if inner.failing_deletes.contains(deployment_id) {
            return Err(AppError::backend("memory", 500, "internal error"));
        }

        let before = inner.deployments.len();
        inner.deployments.retain(|d| d.id != deployment_id);
        if inner.deployments.len() < before {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyAbsent)
        }
    }
}
