use futures::stream::{self, Stream, TryStreamExt};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

use crate::backends::StaticSiteProvisioner;
use crate::error::{AppError, AppResult};
use crate::models::PageDeployment;
use crate::services::DeletionBatch;

/// Preview deployments older than this are collected regardless of branch
pub const DEFAULT_MAX_AGE: Duration = Duration::days(15);

/// Summary of one collector run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GcReport {
    /// Deployments retrieved across all pages
    pub listed: usize,
    pub branch_matches: usize,
    pub expired: usize,
    /// Successful delete calls, counting not-found as deleted
    pub deleted: usize,
    /// Part of `deleted` that was already gone
    pub already_absent: usize,
}

/// Where the page walk is
enum Cursor {
    First,
    Next { index: u32, total: u32 },
}

/// Lazy sequence of deployment pages.
///
/// Page 0 is fetched first to learn `total_pages`; the remaining pages are then
/// fetched one at a time, in order.
pub fn deployment_pages<'a>(
    pages: &'a dyn StaticSiteProvisioner,
    account_id: &'a str,
    project: &'a str,
) -> impl Stream<Item = AppResult<Vec<PageDeployment>>> + 'a {
    page_stream(pages, account_id, project, false)
}

fn page_stream<'a>(
    pages: &'a dyn StaticSiteProvisioner,
    account_id: &'a str,
    project: &'a str,
    allow_empty: bool,
) -> impl Stream<Item = AppResult<Vec<PageDeployment>>> + 'a {
    stream::try_unfold(Cursor::First, move |cursor| {
        next_page(pages, account_id, project, allow_empty, cursor)
    })
}

async fn next_page(
    pages: &dyn StaticSiteProvisioner,
    account_id: &str,
    project: &str,
    allow_empty: bool,
    cursor: Cursor,
) -> AppResult<Option<(Vec<PageDeployment>, Cursor)>> {
    match cursor {
        Cursor::First => {
            let first = pages.list_deployments(account_id, project, 0).await?;
            let total = match first.total_pages {
                Some(total) if total > 0 => total,
                // A project without deployments reports zero pages
                Some(0) if allow_empty && first.results.is_empty() => {
                    tracing::debug!(project, "Project has no deployments");
                    return Ok(None);
                }
                other => {
                    return Err(AppError::UnexpectedResponseFormat(format!(
                        "deployment listing for {} has total_pages {:?}",
                        project, other
                    )))
                }
            };
            tracing::debug!(project, total_pages = total, "Fetched first deployment page");
            Ok(Some((first.results, Cursor::Next { index: 1, total })))
        }
        Cursor::Next { index, total } if index < total => {
            let page = pages.list_deployments(account_id, project, index).await?;
            tracing::debug!(project, page = index, "Fetched deployment page");
            Ok(Some((page.results, Cursor::Next { index: index + 1, total })))
        }
        Cursor::Next { .. } => Ok(None),
    }
}

/// Every deployment of a project, across all pages
pub async fn list_all_deployments(
    pages: &dyn StaticSiteProvisioner,
    account_id: &str,
    project: &str,
) -> AppResult<Vec<PageDeployment>> {
    deployment_pages(pages, account_id, project)
        .try_concat()
        .await
}

/// Like [`list_all_deployments`], but an empty listing with zero pages is an
/// empty project rather than a malformed envelope
pub async fn list_existing_deployments(
    pages: &dyn StaticSiteProvisioner,
    account_id: &str,
    project: &str,
) -> AppResult<Vec<PageDeployment>> {
    page_stream(pages, account_id, project, true)
        .try_concat()
        .await
}

/// Preview deployment whose trigger branch is `branch`
pub fn matches_branch(deployment: &PageDeployment, branch: &str) -> bool {
    deployment.is_preview() && deployment.branch() == Some(branch)
}

/// Preview deployment strictly older than `max_age` at `now`
pub fn is_expired(deployment: &PageDeployment, now: OffsetDateTime, max_age: Duration) -> bool {
    deployment.is_preview() && now - deployment.created_on > max_age
}

/// Removes stale or orphaned preview deployments of a pages project
#[derive(Clone)]
pub struct GarbageCollector {
    pages: Arc<dyn StaticSiteProvisioner>,
    max_age: Duration,
}

impl GarbageCollector {
    pub fn new(pages: Arc<dyn StaticSiteProvisioner>) -> Self {
        Self {
            pages,
            max_age: DEFAULT_MAX_AGE,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Delete every preview deployment of `target_branch`, then every preview
    /// deployment older than the age threshold
    pub async fn collect_garbage(
        &self,
        account_id: &str,
        project: &str,
        target_branch: &str,
    ) -> AppResult<GcReport> {
        self.collect_garbage_at(OffsetDateTime::now_utc(), account_id, project, target_branch)
            .await
    }

    /// Same as [`collect_garbage`](Self::collect_garbage) with an explicit clock
    pub async fn collect_garbage_at(
        &self,
        now: OffsetDateTime,
        account_id: &str,
        project: &str,
        target_branch: &str,
    ) -> AppResult<GcReport> {
        tracing::info!(project, branch = target_branch, "Collecting preview deployments");

        let deployments = list_all_deployments(self.pages.as_ref(), account_id, project).await?;
        tracing::info!(count = deployments.len(), "Collected deployments");

        let mut report = GcReport {
            listed: deployments.len(),
            ..Default::default()
        };

        let branch_matches: Vec<&PageDeployment> = deployments
            .iter()
            .filter(|d| matches_branch(d, target_branch))
            .collect();
        report.branch_matches = branch_matches.len();
        tracing::info!(
            count = branch_matches.len(),
            branch = target_branch,
            "Deleting deployments of branch"
        );
        let mut batch =
            DeletionBatch::run(self.pages.as_ref(), account_id, project, &branch_matches).await;

        // May overlap with the branch pass; deletes are idempotent
        let expired: Vec<&PageDeployment> = deployments
            .iter()
            .filter(|d| is_expired(d, now, self.max_age))
            .collect();
        report.expired = expired.len();
        tracing::info!(
            count = expired.len(),
            max_age_days = self.max_age.whole_days(),
            "Deleting expired deployments"
        );
        batch.merge(DeletionBatch::run(self.pages.as_ref(), account_id, project, &expired).await);

        report.deleted = batch.deleted;
        report.already_absent = batch.already_absent;
        batch.into_result()?;

        tracing::info!(
            deleted = report.deleted,
            already_absent = report.already_absent,
            "Garbage collection complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::{preview_deployment, InMemoryPages};

    #[test]
    fn test_is_expired_threshold() {
        let now = OffsetDateTime::now_utc();
        let mut deployment = preview_deployment("dep-1", "main", 0);

        deployment.created_on = now - Duration::days(15);
        assert!(!is_expired(&deployment, now, DEFAULT_MAX_AGE));

        deployment.created_on = now - Duration::days(15) - Duration::seconds(1);
        assert!(is_expired(&deployment, now, DEFAULT_MAX_AGE));

        deployment.environment = "production".to_string();
        assert!(!is_expired(&deployment, now, DEFAULT_MAX_AGE));
    }

    #[test]
    fn test_matches_branch_requires_preview() {
        let mut deployment = preview_deployment("dep-1", "feature-x-42", 0);
        assert!(matches_branch(&deployment, "feature-x-42"));
        assert!(!matches_branch(&deployment, "feature-x-43"));

        deployment.environment = "production".to_string();
        assert!(!matches_branch(&deployment, "feature-x-42"));
    }

    #[tokio::test]
    async fn test_missing_total_pages_is_unexpected_format() {
        let pages = InMemoryPages::new(10);
        pages.override_total_pages(None).await;

        let err = list_all_deployments(&pages, "acc", "proj").await.unwrap_err();
        assert!(matches!(err, AppError::UnexpectedResponseFormat(_)));
    }

    #[tokio::test]
    async fn test_zero_total_pages_is_unexpected_format() {
        let pages = InMemoryPages::new(10);
        pages.override_total_pages(Some(0)).await;

        let err = list_all_deployments(&pages, "acc", "proj").await.unwrap_err();
        assert!(matches!(err, AppError::UnexpectedResponseFormat(_)));
        assert_eq!(pages.listed_pages().await, vec![0]);
    }

    #[tokio::test]
    async fn test_existing_deployments_of_empty_project() {
        let pages = InMemoryPages::new(10);
        pages.override_total_pages(Some(0)).await;

        let all = list_existing_deployments(&pages, "acc", "proj").await.unwrap();
        assert!(all.is_empty());
        assert_eq!(pages.listed_pages().await, vec![0]);
    }

    #[tokio::test]
    async fn test_existing_deployments_rejects_zero_pages_with_results() {
        let pages = InMemoryPages::new(10);
        pages.seed_deployment(preview_deployment("dep-1", "main", 1)).await;
        pages.override_total_pages(Some(0)).await;

        let err = list_existing_deployments(&pages, "acc", "proj").await.unwrap_err();
        assert!(matches!(err, AppError::UnexpectedResponseFormat(_)));
    }

    #[tokio::test]
    async fn test_existing_deployments_rejects_missing_total_pages() {
        let pages = InMemoryPages::new(10);
        pages.override_total_pages(None).await;

        let err = list_existing_deployments(&pages, "acc", "proj").await.unwrap_err();
        assert!(matches!(err, AppError::UnexpectedResponseFormat(_)));
    }

    #[tokio::test]
    async fn test_pages_are_fetched_in_order() {
        let pages = InMemoryPages::new(2);
        for i in 0..7 {
            pages
                .seed_deployment(preview_deployment(&format!("dep-{}", i), "main", 1))
                .await;
        }

        let all = list_all_deployments(&pages, "acc", "proj").await.unwrap();
        assert_eq!(all.len(), 7);
        assert_eq!(pages.listed_pages().await, vec![0, 1, 2, 3]);
    }
}
