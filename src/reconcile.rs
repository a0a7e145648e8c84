use aws_types::region::Region;
use log::info;
use serde_json::{Map, Value};

use crate::{
  apply::apply_create,
  auth::{new_auth_client, ClusterConfig},
  config::Config,
  credentials::{assume_role, Session},
  eks::resolve_ca,
  manifest::render_binding,
  params::InvocationParams,
  Result, AWS_AUTH_NAMESPACE,
};

/// Bind the IAM principals named in `props` to RBAC groups by creating the
/// aws-auth ConfigMap in the cluster.
///
/// Input and configuration are validated before any AWS or cluster call.
pub async fn create_aws_auth(props: &Map<String, Value>, config: &Config) -> Result<()> {
  let params = InvocationParams::from_properties(props)?;
  let region = config.region()?;

  let sdk_config = aws_config::from_env()
    .region(Region::new(region.to_string()))
    .load()
    .await;

  let certificate_authority_data = resolve_ca(&sdk_config, &params.cluster_name).await?;
  let credentials = assume_role(&sdk_config, &params.create_role_arn).await?;

  let cluster = ClusterConfig {
    cluster_name: params.cluster_name.clone(),
    endpoint: params.cluster_endpoint.clone(),
    certificate_authority_data,
    session: Session::new(credentials, region)?,
  };
  let client = new_auth_client(&cluster).await?;

  let manifest = render_binding(&params.binding())?;
  apply_create(&client, AWS_AUTH_NAMESPACE, manifest).await?;

  info!("aws-auth provisioned for cluster '{}'", params.cluster_name);
  Ok(())
}
