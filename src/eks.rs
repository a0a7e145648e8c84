use aws_sdk_eks::output::DescribeClusterOutput;
use aws_types::SdkConfig;
use log::info;

use crate::{Error, Result};

/// Load the EKS cluster certificate authority, base64 encoded PEM.
pub async fn resolve_ca(sdk_config: &SdkConfig, cluster_name: &str) -> Result<String> {
  info!("Describing cluster '{}'", cluster_name);

  let output = aws_sdk_eks::Client::new(sdk_config)
    .describe_cluster()
    .name(cluster_name)
    .send()
    .await
    .map_err(|source| Error::ClusterLookup {
      cluster_name: cluster_name.to_string(),
      source,
    })?;

  certificate(&output, cluster_name)
}

fn certificate(output: &DescribeClusterOutput, cluster_name: &str) -> Result<String> {
  output
    .cluster()
    .and_then(|cluster| cluster.certificate_authority())
    .and_then(|ca| ca.data())
    .filter(|data| !data.is_empty())
    .map(str::to_string)
    .ok_or_else(|| Error::ClusterCaMissing {
      cluster_name: cluster_name.to_string(),
    })
}
