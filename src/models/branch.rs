use serde::{Deserialize, Serialize};

/// Smallest compute size a branch endpoint may autoscale down to
pub const MIN_AUTOSCALING_CU: f64 = 0.25;

/// Database branch as returned by the branch provisioner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseBranch {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project_id: String,
}

/// Endpoint kind; listings also return read replicas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointType {
    ReadWrite,
    ReadOnly,
}

/// Compute endpoint attached to a branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchEndpoint {
    pub id: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(rename = "type")]
    pub endpoint_type: EndpointType,
}

/// Endpoint requested alongside a new branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    #[serde(rename = "type")]
    pub endpoint_type: EndpointType,
    pub autoscaling_limit_min_cu: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioner: Option<String>,
}

impl EndpointSpec {
    /// Read-write endpoint at minimum autoscaling
    pub fn read_write_minimal() -> Self {
        Self {
            endpoint_type: EndpointType::ReadWrite,
            autoscaling_limit_min_cu: MIN_AUTOSCALING_CU,
            provisioner: Some("k8s-neonvm".to_string()),
        }
    }
}

/// Creation response: the branch plus the endpoints created with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedBranch {
    pub branch: DatabaseBranch,
    #[serde(default)]
    pub endpoints: Vec<BranchEndpoint>,
}

impl CreatedBranch {
    pub fn first_host(&self) -> Option<&str> {
        first_host(&self.endpoints)
    }
}

/// Host of the first endpoint, if it has one
pub fn first_host(endpoints: &[BranchEndpoint]) -> Option<&str> {
    endpoints
        .first()
        .and_then(|e| e.host.as_deref())
        .filter(|h| !h.is_empty())
}
