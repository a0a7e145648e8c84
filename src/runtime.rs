//! Minimal client for the Lambda runtime API, enough to serve custom
//! resource events one at a time.

use log::{debug, error, info};
use serde::Serialize;

use crate::{
  cfn::{handle, respond, CfnEvent, CfnResponse, RequestType},
  config::Config,
  Error, Result,
};

const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvocationError {
  error_message: String,
  error_type: String,
}

/// Handle a single raw event and build the CloudFormation response for it.
pub async fn process(body: &[u8], config: &Config) -> Result<(CfnEvent, CfnResponse)> {
  let event: CfnEvent = serde_json::from_slice(body)?;
  let output = handle(&event, config).await;
  let response = match event.request_type {
    RequestType::Unknown => CfnResponse::failure(&event, "Unsupported request type", config),
    _ => CfnResponse::success(&event, output, config),
  };
  Ok((event, response))
}

pub struct Runtime {
  http: reqwest::Client,
  base_url: String,
  config: Config,
}

impl Runtime {
  pub fn new(config: Config) -> Result<Self> {
    let api = config
      .runtime_api
      .clone()
      .ok_or_else(|| Error::Config("AWS_LAMBDA_RUNTIME_API is not set".to_string()))?;

    Ok(Self {
      http: reqwest::Client::new(),
      base_url: format!("http://{}/{}/runtime", api, API_VERSION),
      config,
    })
  }

  /// Serve invocations until the runtime API fails.
  pub async fn run(&self) -> Result<()> {
    loop {
      let (request_id, body) = self.next_invocation().await?;
      debug!("Invocation {}", request_id);

      match self.invoke(&body).await {
        Ok(response) => self.post_response(&request_id, &response).await?,
        Err(e) => {
          error!("[{}] Invocation failed: {}", request_id, e);
          self.post_error(&request_id, &e).await?;
        }
      }
    }
  }

  async fn invoke(&self, body: &[u8]) -> Result<CfnResponse> {
    let (event, response) = process(body, &self.config).await?;
    respond(&self.http, &event, &response).await?;
    Ok(response)
  }

  async fn next_invocation(&self) -> Result<(String, Vec<u8>)> {
    let resp = self
      .http
      .get(format!("{}/invocation/next", self.base_url))
      .send()
      .await?
      .error_for_status()?;

    let request_id = resp
      .headers()
      .get(REQUEST_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::to_string)
      .ok_or_else(|| Error::Runtime(format!("{} header missing", REQUEST_ID_HEADER)))?;

    Ok((request_id, resp.bytes().await?.to_vec()))
  }

  async fn post_response(&self, request_id: &str, response: &CfnResponse) -> Result<()> {
    self
      .http
      .post(format!("{}/invocation/{}/response", self.base_url, request_id))
      .json(response)
      .send()
      .await?
      .error_for_status()?;
    info!("[{}] Invocation complete", request_id);
    Ok(())
  }

  async fn post_error(&self, request_id: &str, err: &Error) -> Result<()> {
    let body = InvocationError {
      error_message: err.to_string(),
      error_type: "Runtime.HandlerError".to_string(),
    };
    self
      .http
      .post(format!("{}/invocation/{}/error", self.base_url, request_id))
      .json(&body)
      .send()
      .await?
      .error_for_status()?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cfn::Status;

  #[test]
  fn runtime_needs_api_endpoint() {
    assert!(matches!(Runtime::new(Config::default()), Err(Error::Config(_))));
  }

  #[test]
  fn runtime_url_uses_api_version() {
    let runtime = Runtime::new(Config {
      runtime_api: Some("127.0.0.1:9001".to_string()),
      ..Config::default()
    })
    .unwrap();
    assert_eq!(runtime.base_url, "http://127.0.0.1:9001/2018-06-01/runtime");
  }

  #[tokio::test]
  async fn malformed_event_is_an_error() {
    let err = process(br#"{"RequestType": "Rename"}"#, &Config::default())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Json(_)));
  }

  #[tokio::test]
  async fn unknown_request_type_is_answered_with_failure() {
    let body = br#"{
      "RequestType": "Rename",
      "RequestId": "req-3",
      "ResponseURL": "https://example.invalid/response",
      "LogicalResourceId": "AwsAuth",
      "StackId": "stack"
    }"#;
    let (_, response) = process(body, &Config::default()).await.unwrap();

    assert_eq!(response.status, Status::Failed);
    assert_eq!(response.reason, "Unsupported request type");
  }

  #[tokio::test]
  async fn update_event_is_acknowledged() {
    let body = br#"{
      "RequestType": "Update",
      "RequestId": "req-2",
      "ResponseURL": "https://example.invalid/response",
      "LogicalResourceId": "AwsAuth",
      "StackId": "stack",
      "PhysicalResourceId": "old-stream",
      "ResourceProperties": {}
    }"#;
    let (event, response) = process(body, &Config::default()).await.unwrap();

    assert_eq!(event.request_id, "req-2");
    assert_eq!(response.status, Status::Success);
    assert_eq!(response.physical_resource_id, "old-stream");
  }
}
