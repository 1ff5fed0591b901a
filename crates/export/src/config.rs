//! Sink configuration.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where export tables are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// A folder on the local file system.
    Local { folder: PathBuf },
    /// An S3-compatible bucket.
    S3(S3SinkConfig),
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::Local {
            folder: PathBuf::from("export_folder"),
        }
    }
}

impl SinkConfig {
    /// Build from `EXPORT_SINK` (`local` or `s3`) and `EXPORT_FOLDER`.
    pub fn from_env() -> Self {
        let folder = env::var("EXPORT_FOLDER").ok();
        match env::var("EXPORT_SINK").as_deref() {
            Ok("s3") => {
                let mut s3 = S3SinkConfig::from_env();
                if let Some(folder) = folder {
                    s3.folder = folder;
                }
                Self::S3(s3)
            }
            _ => match folder {
                Some(folder) => Self::Local {
                    folder: PathBuf::from(folder),
                },
                None => Self::default(),
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Local { folder } => {
                if folder.as_os_str().is_empty() {
                    return Err("sink folder must not be empty".to_string());
                }
                Ok(())
            }
            Self::S3(s3) => s3.validate(),
        }
    }

    /// Human-readable destination, used in logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Local { folder } => format!("file://{}", folder.display()),
            Self::S3(s3) => format!("s3://{}/{}", s3.bucket, s3.folder),
        }
    }
}

/// S3-compatible bucket settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3SinkConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    /// Allow plain HTTP, e.g. for a local MinIO.
    pub allow_http: bool,
    /// Key prefix for export objects.
    pub folder: String,
}

impl Default for S3SinkConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            bucket: "pentad-exports".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
            folder: "export_folder".to_string(),
        }
    }
}

impl S3SinkConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env::var("S3_ENDPOINT").unwrap_or(defaults.endpoint),
            bucket: env::var("S3_BUCKET").unwrap_or(defaults.bucket),
            access_key_id: env::var("S3_ACCESS_KEY").unwrap_or(defaults.access_key_id),
            secret_access_key: env::var("S3_SECRET_KEY").unwrap_or(defaults.secret_access_key),
            region: env::var("S3_REGION").unwrap_or(defaults.region),
            allow_http: env::var("S3_ALLOW_HTTP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.allow_http),
            folder: defaults.folder,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.is_empty() {
            return Err("s3 endpoint must not be empty".to_string());
        }
        if self.bucket.is_empty() {
            return Err("s3 bucket must not be empty".to_string());
        }
        if !self.allow_http && self.endpoint.starts_with("http://") {
            return Err(format!(
                "s3 endpoint {} uses http but allow_http is false",
                self.endpoint
            ));
        }
        Ok(())
    }
}
