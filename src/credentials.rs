use std::time::{Duration, SystemTime};

use aws_credential_types::Credentials;
use aws_sdk_sts::output::AssumeRoleOutput;
use aws_types::SdkConfig;
use log::info;

use crate::{Error, Result};

/// Pinned as both external id and session name so the target account's
/// trust policy can restrict who assumes the role.
pub const EXTERNAL_ID: &str = "cfn-custom-resource-configmap";
pub const SESSION_DURATION: Duration = Duration::from_secs(3600);

const PROVIDER_NAME: &str = "cfn-custom-resource-assume-role";

/// Assume `role_arn` and return its short lived credentials.
pub async fn assume_role(sdk_config: &SdkConfig, role_arn: &str) -> Result<Credentials> {
  info!("Assuming role '{}'", role_arn);

  let output = aws_sdk_sts::Client::new(sdk_config)
    .assume_role()
    .role_arn(role_arn)
    .role_session_name(EXTERNAL_ID)
    .external_id(EXTERNAL_ID)
    .duration_seconds(SESSION_DURATION.as_secs() as i32)
    .send()
    .await
    .map_err(|source| Error::AssumeRole {
      role_arn: role_arn.to_string(),
      source,
    })?;

  temporary_credentials(&output, role_arn)
}

fn temporary_credentials(output: &AssumeRoleOutput, role_arn: &str) -> Result<Credentials> {
  let missing = || Error::CredentialsMissing {
    role_arn: role_arn.to_string(),
  };
  let creds = output.credentials().ok_or_else(missing)?;
  let expiry = creds
    .expiration()
    .and_then(|e| SystemTime::try_from(*e).ok());

  Ok(Credentials::new(
    creds.access_key_id().ok_or_else(missing)?,
    creds.secret_access_key().ok_or_else(missing)?,
    Some(creds.session_token().ok_or_else(missing)?.to_string()),
    expiry,
    PROVIDER_NAME,
  ))
}

/// Credentials plus the region every derived call is scoped to
#[derive(Debug, Clone)]
pub struct Session {
  credentials: Credentials,
  region: String,
}

impl Session {
  pub fn new(credentials: Credentials, region: &str) -> Result<Self> {
    if region.is_empty() {
      return Err(Error::Config("session requires an AWS region".to_string()));
    }
    Ok(Self {
      credentials,
      region: region.to_string(),
    })
  }

  pub fn credentials(&self) -> &Credentials {
    &self.credentials
  }

  pub fn region(&self) -> &str {
    &self.region
  }
}
