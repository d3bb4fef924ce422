pub mod app;

pub use app::{test_config, TestApp, ORG_NAME, PROJECT_ID};
