//! s3v2 - command-line client for SigV2 S3-compatible storage.
//!
//! # Usage
//!
//! ```text
//! S3_ENDPOINT=localhost:9000 s3v2 put photos /2024/puppy.jpg ./puppy.jpg
//! s3v2 presign photos /2024/puppy.jpg --expires-in 600
//! s3v2 ls photos --prefix 2024/ -H 'x-amz-meta-trace: 1'
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `S3_ACCESS_KEY` / `AWS_ACCESS_KEY_ID` | *(required)* | Access key ID |
//! | `S3_SECRET_KEY` / `AWS_SECRET_ACCESS_KEY` | *(required)* | Secret access key |
//! | `S3_ENDPOINT` | `s3.amazonaws.com` | Service endpoint |
//! | `S3_SECURE` | `false` | Use https |
//! | `S3_DEFAULT_ACL` | `public-read` | Canned ACL for uploads |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod cli;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use http::HeaderMap;
use s3v2_client::{Client, ClientConfig, ListOptions, Response};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
/// Logs go to stderr so object bodies on stdout stay clean.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Fail on non-2xx responses, echoing the service's error body.
fn check_status(response: &Response) -> Result<()> {
    if response.status().is_success() {
        return Ok(());
    }
    anyhow::bail!(
        "request failed with {}: {}",
        response.status(),
        String::from_utf8_lossy(response.body())
    )
}

/// `now` plus `seconds`, or an error when that leaves chrono's range.
fn expiration_after(now: DateTime<Utc>, seconds: i64) -> Result<DateTime<Utc>> {
    Duration::try_seconds(seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .with_context(|| format!("--expires-in {seconds} is out of range"))
}

async fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(bytes).await?;
    stdout.flush().await?;
    Ok(())
}

fn print_headers(response: &Response) {
    println!("{}", response.status());
    for (name, value) in response.headers() {
        println!("{name}: {}", String::from_utf8_lossy(value.as_bytes()));
    }
}

async fn run(client: &Client, command: Command, headers: &HeaderMap) -> Result<()> {
    match command {
        Command::Presign {
            bucket,
            key,
            expires_in,
        } => {
            let bucket = client.bucket(bucket)?;
            let expiration = expiration_after(Utc::now(), expires_in)?;
            println!("{}", bucket.signed_url(&key, expiration)?);
        }
        Command::Get {
            bucket,
            key,
            output,
        } => {
            let response = client.bucket(bucket)?.get_file(&key, headers).await?;
            check_status(&response)?;
            match output {
                Some(path) => tokio::fs::write(&path, response.body())
                    .await
                    .with_context(|| format!("cannot write {}", path.display()))?,
                None => write_stdout(response.body()).await?,
            }
        }
        Command::Head { bucket, key } => {
            let response = client.bucket(bucket)?.head_file(&key, headers).await?;
            print_headers(&response);
            check_status(&response)?;
        }
        Command::Put { bucket, key, file } => {
            let response = client
                .bucket(bucket)?
                .put_file(&file, &key, headers)
                .await
                .with_context(|| format!("cannot upload {}", file.display()))?;
            check_status(&response)?;
            info!(key = %key, status = %response.status(), "Uploaded");
        }
        Command::Rm { bucket, key } => {
            let response = client.bucket(bucket)?.delete_file(&key, headers).await?;
            check_status(&response)?;
        }
        Command::Ls {
            bucket,
            prefix,
            marker,
            max_keys,
            delimiter,
        } => {
            let options = ListOptions {
                prefix,
                marker,
                max_keys,
                delimiter,
            };
            let response = client.bucket(bucket)?.list("/", &options, headers).await?;
            check_status(&response)?;
            write_stdout(response.body()).await?;
        }
        Command::Mb { bucket } => {
            let response = client.bucket(bucket)?.create(headers).await?;
            check_status(&response)?;
        }
        Command::Rb { bucket } => {
            let response = client.bucket(bucket)?.remove(headers).await?;
            check_status(&response)?;
        }
        Command::Buckets => {
            let response = client.list_buckets(headers).await?;
            check_status(&response)?;
            write_stdout(response.body()).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.apply(ClientConfig::from_env());

    init_tracing(&config.log_level)?;
    debug!(config = ?config, "Loaded configuration");

    let client = Client::new(config).context("invalid client configuration")?;

    let mut headers = HeaderMap::new();
    for (name, value) in cli.headers {
        headers.append(name, value);
    }

    run(&client, cli.command, &headers).await
}
