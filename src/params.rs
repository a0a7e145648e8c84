use serde_json::{Map, Value};

use crate::{Error, Result};

/// Parameters of a single aws-auth provisioning request, parsed from the
/// untyped `ResourceProperties` of the lifecycle event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationParams {
  pub account_id: String,
  pub create_role_arn: String,
  pub cluster_name: String,
  pub cluster_endpoint: String,
  pub admin_user: String,
  pub admin_role_arn: String,
  pub node_instance_role_arn: String,
}

/// The inputs of the rendered manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingParameters {
  pub node_instance_role_arn: String,
  pub admin_role_arn: String,
  pub admin_user: String,
  pub account_id: String,
  pub cluster_name: String,
}

impl InvocationParams {
  /// Only `CreateRoleArn` is required. Optional fields left out become empty
  /// strings, but a field of the wrong type is always reported.
  pub fn from_properties(props: &Map<String, Value>) -> Result<Self> {
    let mut bad = Vec::new();
    let mut field = |key: &str, required: bool| match props.get(key) {
      Some(Value::String(s)) if !(required && s.is_empty()) => s.clone(),
      None | Some(Value::Null) if !required => String::new(),
      _ => {
        bad.push(key.to_string());
        String::new()
      }
    };

    let params = Self {
      account_id: field("AccountId", false),
      create_role_arn: field("CreateRoleArn", true),
      cluster_name: field("ClusterName", false),
      cluster_endpoint: field("ClusterEndpoint", false),
      admin_user: field("AdminUser", false),
      admin_role_arn: field("AdminRoleArn", false),
      node_instance_role_arn: field("NodeInstanceRoleArn", false),
    };

    if bad.is_empty() {
      Ok(params)
    } else {
      Err(Error::Input { fields: bad })
    }
  }

  pub fn binding(&self) -> BindingParameters {
    BindingParameters {
      node_instance_role_arn: self.node_instance_role_arn.clone(),
      admin_role_arn: self.admin_role_arn.clone(),
      admin_user: self.admin_user.clone(),
      account_id: self.account_id.clone(),
      cluster_name: self.cluster_name.clone(),
    }
  }
}
