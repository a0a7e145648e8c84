use anyhow::{bail, Context as _};
use argh::FromArgs;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::{
  io::Read,
  path::{Path, PathBuf},
};

use provisioner::{
  cfn::respond,
  config::Config,
  runtime::{process, Runtime},
};

#[derive(FromArgs)]
/// Provision the aws-auth ConfigMap for CloudFormation custom resource events.
/// Serves the Lambda runtime API when AWS_LAMBDA_RUNTIME_API is set, otherwise
/// handles a single event from a file or stdin.
struct Args {
  /// set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
  /// is present, it overrides the default logging behavior.
  #[argh(option, default = "LevelFilter::Info")]
  log_level: LevelFilter,

  /// path of a custom resource event json, `-` for stdin
  #[argh(option)]
  event: Option<PathBuf>,

  /// upload the response to the event's ResponseURL instead of printing it
  #[argh(switch)]
  send: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let args: Args = argh::from_env();
  init_logger(args.log_level);

  let config = Config::from_env();

  match (&config.runtime_api, &args.event) {
    (Some(api), None) => {
      info!("Serving Lambda runtime API at {}", api);
      Runtime::new(config.clone())?.run().await?;
    }
    (_, Some(path)) => run_once(path, args.send, &config).await?,
    (None, None) => bail!("No AWS_LAMBDA_RUNTIME_API set and no --event given"),
  }

  Ok(())
}

async fn run_once(path: &Path, send: bool, config: &Config) -> anyhow::Result<()> {
  let body = if path.as_os_str() == "-" {
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf).context("Failed to read event from stdin")?;
    buf
  } else {
    std::fs::read(path).with_context(|| format!("Failed to read event {}", path.display()))?
  };

  let (event, response) = process(&body, config).await.context("Failed to process event")?;

  if send {
    respond(&reqwest::Client::new(), &event, &response)
      .await
      .context("Failed to send response")?;
  } else {
    println!("{}", serde_json::to_string_pretty(&response)?);
  }
  Ok(())
}

fn init_logger(level: LevelFilter) {
  match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
    // RUST_LOG exists; env_logger will use it.
    Some(_) => Builder::from_default_env().init(),
    None => Builder::new()
      .filter(Some(env!("CARGO_CRATE_NAME")), level)
      .init(),
  }
}
