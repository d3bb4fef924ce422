use crate::backends::StaticSiteProvisioner;
use crate::error::{AppError, AppResult, DeleteOutcome};
use crate::models::PageDeployment;

/// Result of deleting a batch of deployments one after another.
///
/// Every deletion is attempted; only the first fatal error is kept.
#[derive(Debug, Default)]
pub struct DeletionBatch {
    /// Deleted or already absent
    pub deleted: usize,
    pub already_absent: usize,
    pub failed: usize,
    pub first_error: Option<AppError>,
}

impl DeletionBatch {
    /// Delete each deployment sequentially, awaiting every call
    pub async fn run(
        pages: &dyn StaticSiteProvisioner,
        account_id: &str,
        project: &str,
        deployments: &[&PageDeployment],
    ) -> Self {
        let mut batch = Self::default();

        for deployment in deployments {
            match pages
                .delete_deployment(account_id, project, &deployment.id)
                .await
            {
                Ok(outcome) => batch.record(&deployment.id, outcome),
                Err(e) => {
                    tracing::error!(
                        deployment_id = %deployment.id,
                        project,
                        error = %e,
                        "Failed to delete deployment"
                    );
                    batch.failed += 1;
                    batch.first_error.get_or_insert(e);
                }
            }
        }

        batch
    }

    fn record(&mut self, deployment_id: &str, outcome: DeleteOutcome) {
        if outcome == DeleteOutcome::AlreadyAbsent {
            tracing::warn!(deployment_id, "Deployment already absent");
            self.already_absent += 1;
        } else {
            tracing::debug!(deployment_id, "Deployment deleted");
        }
        self.deleted += 1;
    }

    /// Fold another batch into this one, keeping the earliest error
    pub fn merge(&mut self, other: DeletionBatch) {
        self.deleted += other.deleted;
        self.already_absent += other.already_absent;
        self.failed += other.failed;
        if self.first_error.is_none() {
            self.first_error = other.first_error;
        }
    }

    /// Deleted count, or the first error wrapped with that count
    pub fn into_result(self) -> AppResult<usize> {
        match self.first_error {
            None => Ok(self.deleted),
            Some(source) => Err(AppError::PartialDeletion {
                deleted: self.deleted,
                source: Box::new(source),
            }),
        }
    }
}
