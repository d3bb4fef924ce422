use std::path::PathBuf;
use std::sync::Arc;

use preview_env::backends::{InMemoryApps, InMemoryDatabaseBranches, InMemoryPages};
use preview_env::config::{Config, Event, FlyConfig, NeonConfig, PagesConfig};
use preview_env::models::Secret;
use preview_env::Backends;

pub const PROJECT_ID: &str = "proj-test";
pub const ORG_NAME: &str = "acme";

/// Test configuration
pub fn test_config() -> Config {
    Config {
        event: Event::Open,
        ref_name: "feature-x".to_string(),
        pull_request_number: 42,
        suffix: None,
        neon: NeonConfig {
            api_url: "http://localhost".to_string(),
            api_token: "neon-token".to_string(),
            project_id: PROJECT_ID.to_string(),
            user: "app".to_string(),
            password: "s3cret".to_string(),
            db_name: "appdb".to_string(),
            connection_options: Some("?sslmode=require".to_string()),
        },
        fly: FlyConfig {
            api_url: "http://localhost".to_string(),
            api_token: "fly-token".to_string(),
            org_name: ORG_NAME.to_string(),
            region: "cdg".to_string(),
            image: "registry.fly.io/api:pr-42".to_string(),
            app_domain: "fly.dev".to_string(),
            template: serde_json::json!({
                "primary_region": "cdg",
                "http_service": { "internal_port": 8080 }
            }),
            secrets: vec![Secret::new("SESSION_KEY", "abc")],
        },
        pages: PagesConfig {
            api_url: "http://localhost".to_string(),
            api_token: "cf-token".to_string(),
            account_id: "acc-test".to_string(),
            project_name: "ecair".to_string(),
            site_dir: PathBuf::from("web"),
            build_command: "npm run build".to_string(),
            output_dir: "dist".to_string(),
            api_url_var: "PUBLIC_API_URL".to_string(),
            wrangler_bin: "wrangler".to_string(),
        },
    }
}

/// In-memory backends plus the configuration pointing at them
pub struct TestApp {
    pub config: Config,
    pub database: InMemoryDatabaseBranches,
    pub apps: InMemoryApps,
    pub pages: InMemoryPages,
    pub backends: Backends,
}

impl TestApp {
    /// Create a test application whose organization exists
    pub async fn new() -> Self {
        Self::with_database(InMemoryDatabaseBranches::new()).await
    }

    pub async fn with_database(database: InMemoryDatabaseBranches) -> Self {
        let apps = InMemoryApps::new();
        apps.seed_organization(ORG_NAME).await;
        Self::with_parts(database, apps, InMemoryPages::new(25))
    }

    pub fn with_parts(
        database: InMemoryDatabaseBranches,
        apps: InMemoryApps,
        pages: InMemoryPages,
    ) -> Self {
        let backends = Backends::with_providers(
            Arc::new(database.clone()),
            Arc::new(apps.clone()),
            Arc::new(pages.clone()),
        );

        Self {
            config: test_config(),
            database,
            apps,
            pages,
            backends,
        }
    }
}
