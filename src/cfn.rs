//! CloudFormation custom resource envelope: the lifecycle event delivered to
//! the function and the response it owes to the stack.
//!
//! A failure to provision aws-auth is logged and the event is still answered
//! with `SUCCESS`. Provisioning problems therefore show up in the logs only,
//! never as a failed stack operation.

use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{config::Config, reconcile::create_aws_auth, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RequestType {
  Create,
  Update,
  Delete,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnEvent {
  pub request_type: RequestType,
  pub request_id: String,
  #[serde(rename = "ResponseURL")]
  pub response_url: String,
  #[serde(default)]
  pub resource_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub physical_resource_id: Option<String>,
  pub logical_resource_id: String,
  pub stack_id: String,
  #[serde(default)]
  pub resource_properties: Map<String, Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub old_resource_properties: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
  Success,
  Failed,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnResponse {
  pub status: Status,
  pub reason: String,
  pub physical_resource_id: String,
  pub stack_id: String,
  pub request_id: String,
  pub logical_resource_id: String,
  pub no_echo: bool,
  pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerOutput {
  pub physical_resource_id: String,
  pub data: Map<String, Value>,
}

impl CfnResponse {
  fn new(event: &CfnEvent, status: Status, reason: String, output: HandlerOutput) -> Self {
    Self {
      status,
      reason,
      physical_resource_id: output.physical_resource_id,
      stack_id: event.stack_id.clone(),
      request_id: event.request_id.clone(),
      logical_resource_id: event.logical_resource_id.clone(),
      no_echo: false,
      data: output.data,
    }
  }

  pub fn success(event: &CfnEvent, output: HandlerOutput, config: &Config) -> Self {
    let reason = format!(
      "See the details in CloudWatch Log Stream: {}",
      config.log_stream_name
    );
    Self::new(event, Status::Success, reason, output)
  }

  pub fn failure(event: &CfnEvent, reason: impl ToString, config: &Config) -> Self {
    let output = HandlerOutput {
      physical_resource_id: physical_resource_id(event, config),
      data: Map::new(),
    };
    Self::new(event, Status::Failed, reason.to_string(), output)
  }
}

fn physical_resource_id(event: &CfnEvent, config: &Config) -> String {
  if config.log_stream_name.is_empty() {
    event.physical_resource_id.clone().unwrap_or_default()
  } else {
    config.log_stream_name.clone()
  }
}

/// Handle one lifecycle event. Only `Create` does any work.
pub async fn handle(event: &CfnEvent, config: &Config) -> HandlerOutput {
  info!(
    "[{}] {:?} request for {} ({})",
    event.request_id, event.request_type, event.logical_resource_id, event.resource_type
  );

  match event.request_type {
    RequestType::Create => {
      if let Err(e) = create_aws_auth(&event.resource_properties, config).await {
        error!(
          "[{}] Unable to create aws-auth ConfigMap - reason: {}",
          event.request_id, e
        );
      }
    }
    RequestType::Update | RequestType::Delete => {
      info!(
        "[{}] {:?} is not supported, acknowledging without changes",
        event.request_id, event.request_type
      );
    }
    RequestType::Unknown => {
      error!("[{}] Unknown request type", event.request_id);
    }
  }

  HandlerOutput {
    physical_resource_id: physical_resource_id(event, config),
    data: Map::new(),
  }
}

/// Upload the response to the pre-signed url in the event.
pub async fn respond(
  client: &reqwest::Client,
  event: &CfnEvent,
  response: &CfnResponse,
) -> Result<()> {
  info!(
    "[{}] Sending {:?} response for {}",
    event.request_id, response.status, event.logical_resource_id
  );

  // the pre-signed url is signed without a content type
  client
    .put(&event.response_url)
    .body(serde_json::to_string(response)?)
    .send()
    .await?
    .error_for_status()?;
  Ok(())
}
