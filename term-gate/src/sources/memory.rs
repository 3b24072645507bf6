//! In-memory datasets keyed by source path.

use super::DatasetLoader;
use crate::prelude::*;
use crate::rules::DataSourceSpec;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::{MemTable, TableProvider};
use datafusion::prelude::SessionContext;
use std::collections::HashMap;
use std::sync::Arc;

/// Serves record batches registered under a path.
///
/// The source format is ignored; only the path is looked up.
///
/// # Examples
///
/// ```rust,ignore
/// let loader = MemoryLoader::new().with_batch("mem://customers", batch);
/// let gate = QualityGate::builder().loader(loader).build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    tables: HashMap<String, (SchemaRef, Vec<RecordBatch>)>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single batch under `path`.
    pub fn with_batch(self, path: impl Into<String>, batch: RecordBatch) -> Self {
        let schema = batch.schema();
        self.with_batches(path, schema, vec![batch])
    }

    /// Registers batches sharing `schema` under `path`. `batches` may be empty.
    pub fn with_batches(mut self, path: impl Into<String>, schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        self.tables.insert(path.into(), (schema, batches));
        self
    }
}

#[async_trait]
impl DatasetLoader for MemoryLoader {
    async fn load(&self, _ctx: &SessionContext, source: &DataSourceSpec) -> Result<Arc<dyn TableProvider>> {
        let (schema, batches) = self.tables.get(&source.path).ok_or_else(|| {
            GateError::data_source("memory", format!("No in-memory dataset at '{}'", source.path))
        })?;
        let table = MemTable::try_new(schema.clone(), vec![batches.clone()]).map_err(|e| {
            GateError::data_source_with_source(
                "memory",
                format!("Invalid in-memory dataset at '{}'", source.path),
                Box::new(e),
            )
        })?;
        Ok(Arc::new(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::SourceFormat;
    use crate::test_helpers::{batch_from_columns, TestColumn};

    #[tokio::test]
    async fn test_load_registered_batch() {
        let batch = batch_from_columns(vec![TestColumn::int("id", vec![Some(1), Some(2)])]);
        let loader = MemoryLoader::new().with_batch("mem://ids", batch);

        let ctx = SessionContext::new();
        let spec = DataSourceSpec::new("mem://ids", SourceFormat::Csv);
        let provider = loader.load(&ctx, &spec).await.unwrap();
        assert_eq!(provider.schema().fields().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let ctx = SessionContext::new();
        let spec = DataSourceSpec::new("mem://missing", SourceFormat::Csv);
        let err = MemoryLoader::new().load(&ctx, &spec).await.unwrap_err();
        assert_eq!(err.kind(), "dataset_load_failed");
    }
}
