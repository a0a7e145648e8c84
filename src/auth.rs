use std::time::{Duration, SystemTime};

use aws_sigv4::http_request::{
  sign, SignableBody, SignableRequest, SignatureLocation, SigningParams, SigningSettings,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use kube::{
  config::{KubeConfigOptions, Kubeconfig},
  Client,
};
use log::debug;
use serde_json::{json, Value};

use crate::{credentials::Session, Error, Result};

const TOKEN_PREFIX: &str = "k8s-aws-v1.";
const CLUSTER_ID_HEADER: &str = "x-k8s-aws-id";
const TOKEN_EXPIRY: Duration = Duration::from_secs(60);
const KUBECONFIG_NAME: &str = "aws-auth";

/// Everything needed to reach a cluster without holding a kubeconfig for it
#[derive(Debug, Clone)]
pub struct ClusterConfig {
  pub cluster_name: String,
  pub endpoint: String,
  /// base64 encoded PEM
  pub certificate_authority_data: String,
  pub session: Session,
}

impl ClusterConfig {
  fn auth_error(&self, reason: impl ToString) -> Error {
    Error::AuthClient {
      cluster_name: self.cluster_name.clone(),
      reason: reason.to_string(),
    }
  }
}

/// Mint a cluster bearer token: a presigned STS GetCallerIdentity url naming
/// the cluster in a signed header. The cluster accepts it for 15 minutes.
pub fn bearer_token(cluster: &ClusterConfig) -> Result<String> {
  let session = &cluster.session;
  let creds = session.credentials();

  let mut request = http::Request::builder()
    .method("GET")
    .uri(format!(
      "https://sts.{}.amazonaws.com/?Action=GetCallerIdentity&Version=2011-06-15",
      session.region()
    ))
    .header(CLUSTER_ID_HEADER, &cluster.cluster_name)
    .body(())
    .map_err(|e| cluster.auth_error(e))?;

  let mut settings = SigningSettings::default();
  settings.signature_location = SignatureLocation::QueryParams;
  settings.expires_in = Some(TOKEN_EXPIRY);

  let mut builder = SigningParams::builder()
    .access_key(creds.access_key_id())
    .secret_key(creds.secret_access_key())
    .region(session.region())
    .service_name("sts")
    .time(SystemTime::now())
    .settings(settings);
  builder.set_security_token(creds.session_token());
  let params = builder.build().map_err(|e| cluster.auth_error(e))?;

  let signable = SignableRequest::new(
    request.method(),
    request.uri(),
    request.headers(),
    SignableBody::Bytes(&[]),
  );
  let (instructions, _) = sign(signable, &params)
    .map_err(|e| cluster.auth_error(e))?
    .into_parts();
  instructions.apply_to_request(&mut request);

  Ok(format!(
    "{}{}",
    TOKEN_PREFIX,
    URL_SAFE_NO_PAD.encode(request.uri().to_string())
  ))
}

fn kubeconfig(cluster: &ClusterConfig, token: &str) -> Value {
  json!({
    "apiVersion": "v1",
    "kind": "Config",
    "clusters": [{
      "name": KUBECONFIG_NAME,
      "cluster": {
        "server": cluster.endpoint,
        "certificate-authority-data": cluster.certificate_authority_data,
      },
    }],
    "users": [{
      "name": KUBECONFIG_NAME,
      "user": { "token": token },
    }],
    "contexts": [{
      "name": KUBECONFIG_NAME,
      "context": { "cluster": KUBECONFIG_NAME, "user": KUBECONFIG_NAME },
    }],
    "current-context": KUBECONFIG_NAME,
  })
}

/// Build a kube client for the cluster authenticated with a token derived
/// from the session credentials.
pub async fn new_auth_client(cluster: &ClusterConfig) -> Result<Client> {
  debug!("Creating client for cluster '{}' at {}", cluster.cluster_name, cluster.endpoint);

  let token = bearer_token(cluster)?;
  let kubeconfig: Kubeconfig =
    serde_json::from_value(kubeconfig(cluster, &token)).map_err(|e| cluster.auth_error(e))?;
  let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
    .await
    .map_err(|e| cluster.auth_error(e))?;

  Client::try_from(config).map_err(|e| cluster.auth_error(e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use aws_credential_types::Credentials;

  fn cluster() -> ClusterConfig {
    let creds = Credentials::new(
      "AKIDEXAMPLE",
      "SECRET",
      Some("SESSIONTOKEN".to_string()),
      None,
      "test",
    );
    ClusterConfig {
      cluster_name: "demo".to_string(),
      endpoint: "https://demo.eks".to_string(),
      certificate_authority_data: "Q0EK".to_string(),
      session: Session::new(creds, "eu-west-1").unwrap(),
    }
  }

  #[test]
  fn token_is_a_presigned_caller_identity_url() {
    let token = bearer_token(&cluster()).unwrap();
    let encoded = token.strip_prefix(TOKEN_PREFIX).unwrap();
    let url = String::from_utf8(URL_SAFE_NO_PAD.decode(encoded).unwrap()).unwrap();

    assert!(url.starts_with("https://sts.eu-west-1.amazonaws.com/?"));
    assert!(url.contains("Action=GetCallerIdentity"));
    assert!(url.contains("X-Amz-Signature="));
    assert!(url.contains("X-Amz-Expires=60"));
    assert!(url.contains("X-Amz-Security-Token=SESSIONTOKEN"));
    assert!(url.contains(CLUSTER_ID_HEADER));
  }

  #[test]
  fn kubeconfig_points_at_cluster() {
    let c = cluster();
    let value = kubeconfig(&c, "k8s-aws-v1.abc");

    assert_eq!(value["clusters"][0]["cluster"]["server"], "https://demo.eks");
    assert_eq!(value["clusters"][0]["cluster"]["certificate-authority-data"], "Q0EK");
    assert_eq!(value["users"][0]["user"]["token"], "k8s-aws-v1.abc");
    assert!(serde_json::from_value::<Kubeconfig>(value).is_ok());
  }
}
