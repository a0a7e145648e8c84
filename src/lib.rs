use serde::{Deserialize, Serialize};

pub mod apply;
pub mod auth;
pub mod cfn;
pub mod config;
pub mod credentials;
pub mod eks;
pub mod error;
pub mod manifest;
pub mod params;
pub mod reconcile;
pub mod runtime;

pub use error::{Error, Result};

/// Name of the ConfigMap read by the cluster authenticator
pub const AWS_AUTH_NAME: &str = "aws-auth";
/// Namespace the aws-auth ConfigMap lives in
pub const AWS_AUTH_NAMESPACE: &str = "kube-system";

/// Map a role in AWS IAM to Kubernetes groups
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MapRoleSpec {
  /// ARN of the AWS Role
  pub rolearn: String,
  /// Username inside kube
  pub username: String,
  /// Groups in kube
  pub groups: Vec<String>,
}

/// Map a user in AWS IAM to Kubernetes groups
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MapUserSpec {
  /// ARN of the AWS User
  pub userarn: String,
  /// Username inside kube
  pub username: String,
  /// Groups in kube
  pub groups: Vec<String>,
}
