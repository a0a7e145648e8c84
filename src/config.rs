use std::env;

use crate::{Error, Result};

const REGION_ENV: &str = "AWS_REGION";
const DEFAULT_REGION_ENV: &str = "AWS_DEFAULT_REGION";
const LOG_STREAM_ENV: &str = "AWS_LAMBDA_LOG_STREAM_NAME";
const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

/// Process settings taken from the Lambda environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
  pub region: Option<String>,
  pub log_stream_name: String,
  pub runtime_api: Option<String>,
}

impl Config {
  pub fn from_env() -> Self {
    let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.is_empty());

    Self {
      region: non_empty(REGION_ENV).or_else(|| non_empty(DEFAULT_REGION_ENV)),
      log_stream_name: non_empty(LOG_STREAM_ENV).unwrap_or_default(),
      runtime_api: non_empty(RUNTIME_API_ENV),
    }
  }

  /// Region for every region scoped AWS call; there is no default.
  pub fn region(&self) -> Result<&str> {
    self
      .region
      .as_deref()
      .ok_or_else(|| Error::Config(format!("{} is not set", REGION_ENV)))
  }
}
