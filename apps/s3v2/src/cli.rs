//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use http::{HeaderName, HeaderValue};
use s3v2_client::{ClientConfig, ClientError, ClientResult};

/// Command-line client for S3-compatible storage signed with AWS Signature V2.
#[derive(Debug, Parser)]
#[command(name = "s3v2", version, about)]
pub struct Cli {
    /// Service endpoint as `host[:port]` (overrides `S3_ENDPOINT`).
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Use https (overrides `S3_SECURE`).
    #[arg(long, global = true)]
    pub secure: bool,

    /// Canned ACL for uploads (overrides `S3_DEFAULT_ACL`).
    #[arg(long, global = true)]
    pub default_acl: Option<String>,

    /// Extra request header as `Name: value`; repeatable.
    #[arg(short = 'H', long = "header", global = true, value_parser = parse_header)]
    pub headers: Vec<(HeaderName, HeaderValue)>,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations, one per request kind.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a presigned GET URL.
    Presign {
        bucket: String,
        key: String,
        /// Validity in seconds from now.
        #[arg(long, default_value_t = 3600)]
        expires_in: i64,
    },
    /// Download an object.
    Get {
        bucket: String,
        key: String,
        /// Write the body here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show an object's metadata.
    Head { bucket: String, key: String },
    /// Upload a file.
    Put {
        bucket: String,
        key: String,
        file: PathBuf,
    },
    /// Delete an object.
    Rm { bucket: String, key: String },
    /// List objects in a bucket.
    Ls {
        bucket: String,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        marker: Option<String>,
        #[arg(long)]
        max_keys: Option<u32>,
        #[arg(long)]
        delimiter: Option<String>,
    },
    /// Create a bucket.
    Mb { bucket: String },
    /// Remove a bucket.
    Rb { bucket: String },
    /// List buckets.
    Buckets,
}

impl Cli {
    /// Apply command-line overrides on top of `config`.
    pub fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        if self.secure {
            config.secure = true;
        }
        if let Some(acl) = &self.default_acl {
            config.default_acl.clone_from(acl);
        }
        config
    }
}

/// Parse a `Name: value` header argument.
pub fn parse_header(arg: &str) -> ClientResult<(HeaderName, HeaderValue)> {
    let (name, value) = arg
        .split_once(':')
        .ok_or_else(|| ClientError::InvalidHeader(format!("expected `Name: value`, got {arg:?}")))?;

    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| ClientError::InvalidHeader(format!("{name:?}: {e}")))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| ClientError::InvalidHeader(format!("{value:?}: {e}")))?;

    Ok((name, value))
}
