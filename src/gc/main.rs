use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use preview_env::backends::CloudflarePages;
use preview_env::config::PagesConfig;
use preview_env::services::DEFAULT_MAX_AGE;
use preview_env::{AppError, GarbageCollector};

/// Delete the preview deployments of a branch and every stale preview deployment
#[derive(Debug, Parser)]
#[command(name = "pages-gc", version)]
struct Args {
    /// Branch whose preview deployments are removed
    branch: String,

    /// Pages project, defaults to CLOUDFLARE_PROJECT_NAME
    #[arg(long)]
    project: Option<String>,

    /// Age in days past which any preview deployment is removed
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_AGE.whole_days() as u16,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    max_age_days: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    dotenvy::dotenv().ok();
    let config = PagesConfig::from_env().context("Failed to load configuration")?;
    let project = args.project.unwrap_or_else(|| config.project_name.clone());

    tracing::info!(branch = %args.branch, project = %project, "Will destroy all deployments attached to branch");

    let pages = CloudflarePages::new(&config).context("Failed to create pages client")?;
    let collector = GarbageCollector::new(Arc::new(pages))
        .with_max_age(time::Duration::days(i64::from(args.max_age_days)));

    match collector
        .collect_garbage(&config.account_id, &project, &args.branch)
        .await
    {
        Ok(report) => {
            tracing::info!(
                listed = report.listed,
                branch_matches = report.branch_matches,
                expired = report.expired,
                deleted = report.deleted,
                already_absent = report.already_absent,
                "Done"
            );
            Ok(())
        }
        Err(AppError::PartialDeletion { deleted, source }) => {
            tracing::error!(deleted, error = %source, "Garbage collection incomplete");
            Err(anyhow::anyhow!(
                "deleted {} deployments before failing: {}",
                deleted,
                source
            ))
        }
        Err(e) => Err(e).context("Garbage collection failed"),
    }
}
