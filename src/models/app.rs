use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub name: String,
}

/// Application known to the app deployment backend. The id doubles as the
/// handle for secrets, deploys and deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    pub name: String,
}

/// Key/value secret pushed to an app. Order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub key: String,
    pub value: String,
}

impl Secret {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Everything pushed to an app on one provisioning run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppDeployment {
    pub organization_id: String,
    pub name: String,
    pub region: String,
    pub image_ref: String,
    pub secrets: Vec<Secret>,
    pub config_document: serde_json::Value,
}

impl AppDeployment {
    /// Merge `{ "app": name }` into the template. The name always wins over a
    /// template `app` key.
    pub fn merge_config(template: &serde_json::Value, name: &str) -> serde_json::Value {
        let mut document = match template {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        document.insert(
            "app".to_string(),
            serde_json::Value::String(name.to_string()),
        );
        serde_json::Value::Object(document)
    }
}
