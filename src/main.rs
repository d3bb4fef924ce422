use std::fs::OpenOptions;
use std::io::Write;

use anyhow::Context;

use preview_env::config::{Config, Event};
use preview_env::{Backends, EnvironmentIdentity, ProvisionService, TeardownService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    let identity = EnvironmentIdentity::from_ref(
        &config.ref_name,
        config.pull_request_number,
        config.suffix.as_deref(),
    );
    tracing::info!(environment = %identity, event = config.event.as_str(), "Starting");

    let backends = Backends::from_config(&config).context("Failed to create backend clients")?;

    match config.event {
        Event::Open => {
            let endpoints = ProvisionService::new(backends)
                .provision(&config, &identity)
                .await
                .with_context(|| format!("Failed to provision {}", identity))?;

            write_output("app_host", &endpoints.app_host)?;
            write_output("page_url", &endpoints.page_url)?;
        }
        Event::Close => {
            TeardownService::new(backends)
                .teardown(&config, &identity)
                .await
                .with_context(|| format!("Failed to tear down {}", identity))?;
        }
    }

    write_output("app_name", identity.name())?;
    Ok(())
}

/// Append a step output to `$GITHUB_OUTPUT` when running in Actions
fn write_output(key: &str, value: &str) -> anyhow::Result<()> {
    let Ok(path) = std::env::var("GITHUB_OUTPUT") else {
        tracing::debug!(key, value, "GITHUB_OUTPUT not set, skipping output");
        return Ok(());
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path))?;
    writeln!(file, "{}={}", key, value)?;
    Ok(())
}
