use aws_sdk_eks::error::DescribeClusterError;
use aws_sdk_sts::error::AssumeRoleError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
#[allow(clippy::large_enum_variant)]
pub enum Error {
  #[error("Invalid resource properties, missing or malformed: {}", fields.join(", "))]
  Input { fields: Vec<String> },

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Unable to describe cluster '{cluster_name}': {source}")]
  ClusterLookup {
    cluster_name: String,
    source: aws_sdk_eks::types::SdkError<DescribeClusterError>,
  },

  #[error("Cluster '{cluster_name}' has no certificate authority data")]
  ClusterCaMissing { cluster_name: String },

  #[error("Unable to assume role '{role_arn}': {source}")]
  AssumeRole {
    role_arn: String,
    source: aws_sdk_sts::types::SdkError<AssumeRoleError>,
  },

  #[error("Credentials were missing for assumed role '{role_arn}'")]
  CredentialsMissing { role_arn: String },

  #[error("Unable to create client for cluster '{cluster_name}': {reason}")]
  AuthClient { cluster_name: String, reason: String },

  #[error("Unable to render ConfigMap template: {0}")]
  Template(#[from] minijinja::Error),

  #[error("Invalid ConfigMap yaml: {0}")]
  Decode(#[from] serde_yaml::Error),

  #[error("Error creating ConfigMap on cluster after {attempts} attempts: {source}")]
  Apply { attempts: u32, source: kube::Error },

  #[error("Lambda runtime error: {0}")]
  Runtime(String),

  #[error("Http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Json error: {0}")]
  Json(#[from] serde_json::Error),
}
