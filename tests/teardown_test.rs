mod common;

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use preview_env::backends::memory::preview_deployment;
use preview_env::backends::{CloudflarePages, InMemoryApps, InMemoryDatabaseBranches};
use preview_env::{AppError, Backends, EnvironmentIdentity, ProvisionService, TeardownService};

use common::{test_config, TestApp, ORG_NAME};

fn identity() -> EnvironmentIdentity {
    EnvironmentIdentity::new("feature-x", 42, None)
}

#[tokio::test]
async fn test_teardown_removes_provisioned_environment() {
    let app = TestApp::new().await;
    ProvisionService::new(app.backends.clone())
        .provision(&app.config, &identity())
        .await
        .unwrap();
    app.pages
        .seed_deployment(preview_deployment("dep-older", "feature-x-42", 3))
        .await;

    TeardownService::new(app.backends.clone())
        .teardown(&app.config, &identity())
        .await
        .unwrap();

    assert!(app.apps.app_names().await.is_empty());
    assert_eq!(app.apps.deleted_count().await, 1);
    assert!(app.database.branch_names().await.is_empty());
    assert_eq!(app.database.deleted_count().await, 1);
    assert!(app.pages.deployment_ids().await.is_empty());
    assert_eq!(app.pages.delete_calls().await.len(), 2);
}

#[tokio::test]
async fn test_teardown_twice_succeeds() {
    let app = TestApp::new().await;
    ProvisionService::new(app.backends.clone())
        .provision(&app.config, &identity())
        .await
        .unwrap();
    let service = TeardownService::new(app.backends.clone());

    service.teardown(&app.config, &identity()).await.unwrap();
    service.teardown(&app.config, &identity()).await.unwrap();

    assert_eq!(app.apps.deleted_count().await, 1);
    assert_eq!(app.database.deleted_count().await, 1);
}

#[tokio::test]
async fn test_teardown_of_unknown_environment_is_noop() {
    let app = TestApp::new().await;

    TeardownService::new(app.backends.clone())
        .teardown(&app.config, &identity())
        .await
        .unwrap();

    assert_eq!(app.apps.deleted_count().await, 0);
    assert_eq!(app.database.deleted_count().await, 0);
    assert!(app.pages.delete_calls().await.is_empty());
}

#[tokio::test]
async fn test_teardown_keeps_other_branches() {
    let app = TestApp::new().await;
    app.pages
        .seed_deployment(preview_deployment("dep-mine", "feature-x-42", 1))
        .await;
    app.pages
        .seed_deployment(preview_deployment("dep-other", "feature-y-7", 1))
        .await;
    let mut production = preview_deployment("dep-prod", "feature-x-42", 1);
    production.environment = "production".to_string();
    app.pages.seed_deployment(production).await;

    TeardownService::new(app.backends.clone())
        .teardown(&app.config, &identity())
        .await
        .unwrap();

    assert_eq!(app.pages.delete_calls().await, vec!["dep-mine"]);
    assert_eq!(app.pages.deployment_ids().await, vec!["dep-other", "dep-prod"]);
}

#[tokio::test]
async fn test_teardown_surfaces_failed_page_delete() {
    let app = TestApp::new().await;
    app.pages
        .seed_deployment(preview_deployment("dep-a", "feature-x-42", 1))
        .await;
    app.pages
        .seed_deployment(preview_deployment("dep-b", "feature-x-42", 2))
        .await;
    app.pages.fail_delete_of("dep-a").await;

    let err = TeardownService::new(app.backends.clone())
        .teardown(&app.config, &identity())
        .await
        .unwrap_err();

    match err {
        AppError::PartialDeletion { deleted, source } => {
            assert_eq!(deleted, 1);
            assert!(matches!(*source, AppError::BackendRequestFailed { status: 500, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    // The sibling deletion still ran
    assert_eq!(app.pages.delete_calls().await, vec!["dep-a", "dep-b"]);
}

#[tokio::test]
async fn test_teardown_of_project_without_deployments() {
    let app = TestApp::new().await;
    app.pages.override_total_pages(Some(0)).await;

    TeardownService::new(app.backends.clone())
        .teardown(&app.config, &identity())
        .await
        .unwrap();

    assert_eq!(app.pages.listed_pages().await, vec![0]);
    assert!(app.pages.delete_calls().await.is_empty());
}

#[tokio::test]
async fn test_teardown_accepts_empty_pages_envelope() {
    let mock_server = MockServer::start().await;
    let config = {
        let mut config = test_config();
        config.pages.api_url = mock_server.uri();
        config
    };

    Mock::given(method("GET"))
        .and(path(format!(
            "/accounts/{}/pages/projects/{}/deployments",
            config.pages.account_id, config.pages.project_name
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [],
            "result_info": { "total_pages": 0 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let apps = InMemoryApps::new();
    apps.seed_organization(ORG_NAME).await;
    let backends = Backends::with_providers(
        Arc::new(InMemoryDatabaseBranches::new()),
        Arc::new(apps),
        Arc::new(CloudflarePages::new(&config.pages).unwrap()),
    );

    TeardownService::new(backends)
        .teardown(&config, &identity())
        .await
        .unwrap();
}
