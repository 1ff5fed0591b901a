//! Tabular sinks backed by `object_store`.

use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::ObjectStore;
use serde::Serialize;
use tracing::instrument;

use crate::config::{S3SinkConfig, SinkConfig};
use crate::error::{ExportError, Result};
use crate::table::ExportTable;

/// Where a table ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReceipt {
    pub table: String,
    pub location: String,
    pub rows: usize,
    pub bytes: usize,
}

/// Persists export tables.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Write one table, replacing any previous object of the same name.
    async fn write(&self, table: &ExportTable) -> Result<WriteReceipt>;

    /// Destination description for logs.
    fn describe(&self) -> String;
}

/// CSV sink over any object store: `<folder>/<table name>.csv`.
#[derive(Debug, Clone)]
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
    folder: String,
    label: String,
}

impl ObjectStoreSink {
    pub fn new(store: Arc<dyn ObjectStore>, folder: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            store,
            folder: folder.into().trim_matches('/').to_string(),
            label: label.into(),
        }
    }

    /// Build the sink described by a configuration.
    pub fn from_config(config: &SinkConfig) -> Result<Self> {
        config.validate().map_err(ExportError::config)?;
        match config {
            SinkConfig::Local { folder } => Self::local(folder),
            SinkConfig::S3(s3) => Self::s3(s3),
        }
    }

    /// Tables written directly under a local directory, created if needed.
    pub fn local(folder: &FsPath) -> Result<Self> {
        std::fs::create_dir_all(folder).map_err(|e| {
            ExportError::storage(format!("Failed to create {}: {}", folder.display(), e))
        })?;
        let store = LocalFileSystem::new_with_prefix(folder)?;
        Ok(Self::new(
            Arc::new(store),
            "",
            format!("file://{}", folder.display()),
        ))
    }

    pub fn s3(config: &S3SinkConfig) -> Result<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| ExportError::config(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self::new(
            Arc::new(store),
            config.folder.clone(),
            format!("s3://{}", config.bucket),
        ))
    }

    /// In-memory store, for tests and dry runs.
    pub fn in_memory(folder: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemory::new()), folder, "memory://")
    }

    /// Object path of a table file.
    pub fn object_path(&self, file_name: &str) -> Path {
        if self.folder.is_empty() {
            Path::from(file_name)
        } else {
            Path::from(format!("{}/{}", self.folder, file_name))
        }
    }

    fn display_location(&self, location: &Path) -> String {
        if self.label.ends_with('/') {
            format!("{}{}", self.label, location)
        } else {
            format!("{}/{}", self.label, location)
        }
    }

    /// Read back a written table file.
    #[instrument(skip(self), fields(sink = %self.label))]
    pub async fn read(&self, file_name: &str) -> Result<Bytes> {
        let location = self.object_path(file_name);
        let result = self.store.get(&location).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => {
                ExportError::storage(format!("Object not found: {}", location))
            }
            other => ExportError::storage(format!("Failed to get {}: {}", location, other)),
        })?;
        Ok(result.bytes().await?)
    }

    /// Names of every object under the sink's folder.
    pub async fn list(&self) -> Result<Vec<String>> {
        use futures::TryStreamExt;

        let prefix = (!self.folder.is_empty()).then(|| Path::from(self.folder.as_str()));
        let mut names = Vec::new();
        let mut stream = self.store.list(prefix.as_ref());
        while let Some(meta) = stream.try_next().await? {
            names.push(meta.location.to_string());
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl Sink for ObjectStoreSink {
    #[instrument(skip(self, table), fields(sink = %self.label, table = %table.name, rows = table.len()))]
    async fn write(&self, table: &ExportTable) -> Result<WriteReceipt> {
        let location = self.object_path(&table.file_name());
        let data = table.to_csv_bytes()?;
        let size = data.len();

        self.store
            .put(&location, Bytes::from(data))
            .await
            .map_err(|e| ExportError::storage(format!("Failed to put {}: {}", location, e)))?;

        tracing::info!(location = %location, bytes = size, "Wrote export table");

        Ok(WriteReceipt {
            table: table.name.clone(),
            location: self.display_location(&location),
            rows: table.len(),
            bytes: size,
        })
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ExportTable {
        let mut table = ExportTable::new("mean_values_Y", vec!["Y".to_string()]);
        table.push_row("P1", vec![Some(1250.0)]).unwrap();
        table.push_row("P2", vec![None]).unwrap();
        table
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let sink = ObjectStoreSink::in_memory("export_folder");
        let receipt = sink.write(&table()).await.unwrap();

        assert_eq!(receipt.rows, 2);
        assert_eq!(receipt.location, "memory://export_folder/mean_values_Y.csv");

        let bytes = sink.read("mean_values_Y.csv").await.unwrap();
        assert_eq!(&bytes[..], b"pentad,Y\nP1,1250\nP2,\n");
        assert_eq!(sink.list().await.unwrap(), vec!["export_folder/mean_values_Y.csv"]);
    }

    #[tokio::test]
    async fn test_rewrite_replaces_object() {
        let sink = ObjectStoreSink::in_memory("");
        sink.write(&table()).await.unwrap();

        let mut updated = table();
        updated.rows.truncate(1);
        sink.write(&updated).await.unwrap();

        let bytes = sink.read("mean_values_Y.csv").await.unwrap();
        assert_eq!(&bytes[..], b"pentad,Y\nP1,1250\n");
    }

    #[tokio::test]
    async fn test_missing_object_is_storage_error() {
        let sink = ObjectStoreSink::in_memory("out");
        let err = sink.read("nothing.csv").await.unwrap_err();
        assert!(matches!(err, ExportError::Storage(_)));
    }

    #[test]
    fn test_object_path_trims_slashes() {
        let sink = ObjectStoreSink::in_memory("/runs/1/");
        assert_eq!(sink.object_path("a.csv").as_ref(), "runs/1/a.csv");
    }
}
