use crate::config::Config;
use crate::error::{AppResult, DeleteOutcome};
use crate::identity::EnvironmentIdentity;
use crate::models::PageDeployment;
use crate::services::gc::{list_existing_deployments, matches_branch};
use crate::services::DeletionBatch;
use crate::state::Backends;

/// Idempotent removal of a preview environment: app, then database branch,
/// then page deployments. A backend with nothing left to remove is a success.
#[derive(Clone)]
pub struct TeardownService {
    backends: Backends,
}

impl TeardownService {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    pub async fn teardown(&self, config: &Config, identity: &EnvironmentIdentity) -> AppResult<()> {
        let name = identity.name();

        tracing::info!(environment = %name, "Destroying app");
        let outcome = self.backends.apps.delete_app(name).await?;
        log_outcome(name, "app", outcome);

        tracing::info!(environment = %name, "Destroying database branch");
        self.teardown_database(config, name).await?;

        tracing::info!(environment = %name, "Destroying page deployments");
        self.teardown_pages(config, name).await?;

        tracing::info!(environment = %name, "Environment destroyed");
        Ok(())
    }

    async fn teardown_database(&self, config: &Config, name: &str) -> AppResult<()> {
        let project_id = &config.neon.project_id;
        let database = &self.backends.database;

        let branches = database.list_branches(project_id).await?;
        match branches.into_iter().find(|b| b.name == name) {
            Some(branch) => {
                let outcome = database.delete_branch(project_id, &branch.id).await?;
                log_outcome(name, "database branch", outcome);
            }
            None => log_outcome(name, "database branch", DeleteOutcome::AlreadyAbsent),
        }

        Ok(())
    }

    /// Delete every preview deployment published under the name
    async fn teardown_pages(&self, config: &Config, name: &str) -> AppResult<()> {
        let pages = &config.pages;

        let deployments = list_existing_deployments(
            self.backends.pages.as_ref(),
            &pages.account_id,
            &pages.project_name,
        )
        .await?;
        let matches: Vec<&PageDeployment> = deployments
            .iter()
            .filter(|d| matches_branch(d, name))
            .collect();

        let batch = DeletionBatch::run(
            self.backends.pages.as_ref(),
            &pages.account_id,
            &pages.project_name,
            &matches,
        )
        .await;
        let already_absent = batch.already_absent;
        let deleted = batch.into_result()?;

        tracing::info!(environment = %name, deleted, already_absent, "Page deployments removed");
        Ok(())
    }
}

fn log_outcome(name: &str, resource: &str, outcome: DeleteOutcome) {
    match outcome {
        DeleteOutcome::Deleted => tracing::info!(environment = %name, resource, "Deleted"),
        DeleteOutcome::AlreadyAbsent => {
            tracing::info!(environment = %name, resource, "Already absent, nothing to delete")
        }
    }
}
