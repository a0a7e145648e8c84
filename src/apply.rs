use std::{future::Future, time::Duration};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
  api::{Api, PostParams},
  Client,
};
use log::{info, warn};

use crate::{manifest::RenderedManifest, Error, Result};

/// Fixed attempts with a fixed delay between them; no backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub attempts: u32,
  pub delay: Duration,
}

pub const APPLY_RETRY: RetryPolicy = RetryPolicy {
  attempts: 3,
  delay: Duration::from_secs(5),
};

/// Run `call` until it succeeds or the policy's attempts are used up,
/// returning the last error.
pub async fn retry<F, Fut, T, E>(policy: RetryPolicy, mut call: F) -> Result<T, E>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: std::fmt::Display,
{
  let mut attempt = 1;
  loop {
    match call().await {
      Ok(v) => return Ok(v),
      Err(e) if attempt >= policy.attempts => return Err(e),
      Err(e) => {
        warn!(
          "Attempt {}/{} failed: {}, retrying in {:?}",
          attempt, policy.attempts, e, policy.delay
        );
        tokio::time::sleep(policy.delay).await;
        attempt += 1;
      }
    }
  }
}

/// The single write the provisioner makes against a cluster
#[async_trait]
pub trait ConfigMapClient {
  async fn create(&self, namespace: &str, cm: &ConfigMap) -> Result<ConfigMap, kube::Error>;
}

#[async_trait]
impl ConfigMapClient for Client {
  async fn create(&self, namespace: &str, cm: &ConfigMap) -> Result<ConfigMap, kube::Error> {
    Api::<ConfigMap>::namespaced(self.clone(), namespace)
      .create(&PostParams::default(), cm)
      .await
  }
}

/// Create the manifest's ConfigMap, retrying every failure alike. An object
/// left by an earlier run makes every attempt fail with a conflict.
pub async fn apply_create<C>(client: &C, namespace: &str, manifest: RenderedManifest) -> Result<()>
where
  C: ConfigMapClient + Sync,
{
  let cm = manifest.config_map();
  retry(APPLY_RETRY, || client.create(namespace, cm))
    .await
    .map_err(|source| Error::Apply {
      attempts: APPLY_RETRY.attempts,
      source,
    })?;

  info!(
    "Created ConfigMap {}/{}",
    namespace,
    cm.metadata.name.as_deref().unwrap_or_default()
  );
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::render;
  use kube::error::ErrorResponse;
  use std::sync::{
    atomic::{AtomicU32, Ordering},
    Mutex,
  };
  use tokio::time::Instant;

  /// Fails the first `failures` calls with a distinct status code each time.
  struct FlakyClient {
    failures: u32,
    calls: AtomicU32,
    namespaces: Mutex<Vec<String>>,
  }

  impl FlakyClient {
    fn new(failures: u32) -> Self {
      Self {
        failures,
        calls: AtomicU32::new(0),
        namespaces: Mutex::new(vec![]),
      }
    }

    fn calls(&self) -> u32 {
      self.calls.load(Ordering::SeqCst)
    }
  }

  #[async_trait]
  impl ConfigMapClient for FlakyClient {
    async fn create(&self, namespace: &str, cm: &ConfigMap) -> Result<ConfigMap, kube::Error> {
      let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
      self.namespaces.lock().unwrap().push(namespace.to_string());
      if call <= self.failures {
        Err(kube::Error::Api(ErrorResponse {
          status: "Failure".to_string(),
          message: format!("attempt {}", call),
          reason: "AlreadyExists".to_string(),
          code: 408 + call as u16,
        }))
      } else {
        Ok(cm.clone())
      }
    }
  }

  fn manifest() -> RenderedManifest {
    render("arn:aws:iam::111111111111:role/node", "111111111111", "alice", "").unwrap()
  }

  #[tokio::test(start_paused = true)]
  async fn succeeds_after_two_failures() {
    let client = FlakyClient::new(2);
    let start = Instant::now();

    apply_create(&client, "kube-system", manifest()).await.unwrap();

    assert_eq!(client.calls(), 3);
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert_eq!(*client.namespaces.lock().unwrap(), vec!["kube-system"; 3]);
  }

  #[tokio::test(start_paused = true)]
  async fn first_success_does_not_sleep() {
    let client = FlakyClient::new(0);
    let start = Instant::now();

    apply_create(&client, "kube-system", manifest()).await.unwrap();

    assert_eq!(client.calls(), 1);
    assert!(start.elapsed() < Duration::from_secs(5));
  }

  #[tokio::test(start_paused = true)]
  async fn gives_up_after_three_attempts_with_last_error() {
    let client = FlakyClient::new(u32::MAX);
    let start = Instant::now();

    let err = apply_create(&client, "kube-system", manifest()).await.unwrap_err();

    assert_eq!(client.calls(), 3);
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert!(start.elapsed() < Duration::from_secs(15));
    match err {
      Error::Apply {
        attempts: 3,
        source: kube::Error::Api(resp),
      } => {
        assert_eq!(resp.message, "attempt 3");
        assert_eq!(resp.code, 411);
      }
      e => panic!("unexpected error: {:?}", e),
    }
  }

  #[tokio::test(start_paused = true)]
  async fn retry_honours_policy() {
    let policy = RetryPolicy {
      attempts: 2,
      delay: Duration::from_secs(1),
    };
    let mut calls = 0;
    let res: Result<(), String> = retry(policy, || {
      calls += 1;
      async { Err("nope".to_string()) }
    })
    .await;

    assert_eq!(res, Err("nope".to_string()));
    assert_eq!(calls, 2);
  }
}
