use k8s_openapi::api::core::v1::ConfigMap;
use log::debug;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

use crate::{params::BindingParameters, MapRoleSpec, MapUserSpec, Result};

const TEMPLATE_NAME: &str = "aws-auth";

/// Filled in by the node bootstrap agent when a node joins, never here.
const EC2_PRIVATE_DNS_NAME: &str = "{{EC2PrivateDNSName}}";

const CONFIG_MAP_TEMPLATE: &str = r#"apiVersion: v1
kind: ConfigMap
metadata:
  name: aws-auth
  namespace: kube-system
data:
  mapRoles: |
    - rolearn: {{ NodeInstanceRoleArn }}
      username: system:node:{{ EC2PrivateDNSName }}
      groups:
        - system:bootstrappers
        - system:nodes
{%- if AdminRoleArn %}
    - rolearn: {{ AdminRoleArn }}
      username: admin-role
      groups:
        - system:masters
{%- endif %}
  mapUsers: |
    - userarn: {{ AdminUserArn }}
      username: {{ AdminUser }}
      groups:
        - system:masters
"#;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TemplateVars<'a> {
  node_instance_role_arn: &'a str,
  #[serde(rename = "EC2PrivateDNSName")]
  ec2_private_dns_name: &'a str,
  admin_user_arn: String,
  admin_user: &'a str,
  admin_role_arn: &'a str,
}

/// The aws-auth ConfigMap as rendered text together with its decoded form
#[derive(Debug, Clone)]
pub struct RenderedManifest {
  raw: Vec<u8>,
  config_map: ConfigMap,
}

impl RenderedManifest {
  pub fn as_bytes(&self) -> &[u8] {
    &self.raw
  }

  pub fn config_map(&self) -> &ConfigMap {
    &self.config_map
  }

  pub fn map_roles(&self) -> Result<Vec<MapRoleSpec>> {
    Ok(serde_yaml::from_str(self.data("mapRoles"))?)
  }

  pub fn map_users(&self) -> Result<Vec<MapUserSpec>> {
    Ok(serde_yaml::from_str(self.data("mapUsers"))?)
  }

  fn data(&self, key: &str) -> &str {
    self
      .config_map
      .data
      .as_ref()
      .and_then(|d| d.get(key))
      .map(String::as_str)
      .unwrap_or_default()
  }
}

pub fn admin_user_arn(account_id: &str, admin_user: &str) -> String {
  format!("arn:aws:iam::{}:user/{}", account_id, admin_user)
}

/// Render the aws-auth ConfigMap binding the node instance role, the admin
/// role (when set) and the admin user.
pub fn render(
  node_instance_role_arn: &str,
  account_id: &str,
  admin_user: &str,
  admin_role_arn: &str,
) -> Result<RenderedManifest> {
  let mut env = Environment::new();
  env.set_undefined_behavior(UndefinedBehavior::Strict);
  env.set_keep_trailing_newline(true);
  env.set_auto_escape_callback(|_| AutoEscape::None);
  env.add_template(TEMPLATE_NAME, CONFIG_MAP_TEMPLATE)?;

  let vars = TemplateVars {
    node_instance_role_arn,
    ec2_private_dns_name: EC2_PRIVATE_DNS_NAME,
    admin_user_arn: admin_user_arn(account_id, admin_user),
    admin_user,
    admin_role_arn,
  };
  let raw = env.get_template(TEMPLATE_NAME)?.render(&vars)?.into_bytes();
  debug!("Config map: {}", String::from_utf8_lossy(&raw));

  let config_map = serde_yaml::from_slice(&raw)?;
  let manifest = RenderedManifest { raw, config_map };

  // the authenticator parses the embedded blocks, a bad one locks out every binding
  manifest.map_roles()?;
  manifest.map_users()?;
  Ok(manifest)
}

pub fn render_binding(binding: &BindingParameters) -> Result<RenderedManifest> {
  render(
    &binding.node_instance_role_arn,
    &binding.account_id,
    &binding.admin_user,
    &binding.admin_role_arn,
  )
}
