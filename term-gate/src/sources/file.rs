//! File-backed datasets: CSV, Parquet and NDJSON.

use super::{expand_glob, is_glob, DatasetLoader};
use crate::prelude::*;
use crate::rules::{DataSourceSpec, SourceFormat};
use async_trait::async_trait;
use datafusion::datasource::TableProvider;
use datafusion::prelude::{CsvReadOptions, NdJsonReadOptions, ParquetReadOptions, SessionContext};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Loads datasets from the local filesystem.
///
/// `path` may name a single file, a directory (every file with the format's
/// default extension is read) or a glob pattern. CSV files must have a header
/// row; column types are inferred.
#[derive(Debug, Clone)]
pub struct FileLoader {
    /// Rows sampled for CSV/JSON schema inference.
    schema_infer_max_records: usize,
}

impl Default for FileLoader {
    fn default() -> Self {
        Self {
            schema_infer_max_records: 1000,
        }
    }
}

impl FileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema_infer_max_records(mut self, records: usize) -> Self {
        self.schema_infer_max_records = records;
        self
    }

    /// Resolves `source.path` to the concrete paths to read and the file
    /// extension DataFusion should filter on.
    fn resolve(source: &DataSourceSpec) -> Result<(Vec<String>, String)> {
        let default_extension = format!(".{}", source.format.as_str());

        if is_glob(&source.path) {
            let paths = expand_glob(&source.path)?;
            let extension = Self::extension_of(&paths[0]);
            return Ok((paths, extension));
        }

        let path = Path::new(&source.path);
        if path.is_dir() {
            // A trailing separator makes DataFusion list the directory.
            let mut dir = source.path.clone();
            if !dir.ends_with('/') {
                dir.push('/');
            }
            Ok((vec![dir], default_extension))
        } else if path.is_file() {
            Ok((vec![source.path.clone()], Self::extension_of(&source.path)))
        } else {
            Err(GateError::data_source(
                source.format.as_str(),
                format!("Path '{}' does not exist", source.path),
            ))
        }
    }

    fn extension_of(path: &str) -> String {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatasetLoader for FileLoader {
    #[instrument(skip(self, ctx), fields(source.path = %source.path, source.format = %source.format))]
    async fn load(&self, ctx: &SessionContext, source: &DataSourceSpec) -> Result<Arc<dyn TableProvider>> {
        let (paths, extension) = Self::resolve(source)?;
        debug!(source.files = paths.len(), source.extension = %extension, "Resolved data source");

        let frame = match source.format {
            SourceFormat::Csv => {
                let options = CsvReadOptions::new()
                    .has_header(true)
                    .file_extension(&extension)
                    .schema_infer_max_records(self.schema_infer_max_records);
                ctx.read_csv(paths, options).await
            }
            SourceFormat::Parquet => {
                let options = ParquetReadOptions {
                    file_extension: &extension,
                    ..Default::default()
                };
                ctx.read_parquet(paths, options).await
            }
            SourceFormat::Json => {
                let options = NdJsonReadOptions {
                    schema_infer_max_records: self.schema_infer_max_records,
                    ..NdJsonReadOptions::default().file_extension(&extension)
                };
                ctx.read_json(paths, options).await
            }
        }
        .map_err(|e| {
            GateError::data_source_with_source(
                source.format.as_str(),
                format!("Failed to read '{}'", source.path),
                Box::new(e),
            )
        })?;

        Ok(frame.into_view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn count(ctx: &SessionContext, provider: Arc<dyn TableProvider>) -> usize {
        ctx.register_table("t", provider).unwrap();
        ctx.table("t").await.unwrap().count().await.unwrap()
    }

    #[tokio::test]
    async fn test_load_csv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "customer_id,state").unwrap();
        writeln!(file, "1,SP").unwrap();
        writeln!(file, "2,").unwrap();
        file.flush().unwrap();

        let ctx = SessionContext::new();
        let spec = DataSourceSpec::new(file.path().to_str().unwrap(), SourceFormat::Csv);
        let provider = FileLoader::new().load(&ctx, &spec).await.unwrap();
        assert_eq!(provider.schema().fields().len(), 2);
        assert_eq!(count(&ctx, provider).await, 2);
    }

    #[tokio::test]
    async fn test_load_csv_glob() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("part1.csv"), "id\n1\n2\n").unwrap();
        std::fs::write(dir.path().join("part2.csv"), "id\n3\n").unwrap();

        let ctx = SessionContext::new();
        let spec = DataSourceSpec::new(format!("{}/*.csv", dir.path().display()), SourceFormat::Csv);
        let provider = FileLoader::new().load(&ctx, &spec).await.unwrap();
        assert_eq!(count(&ctx, provider).await, 3);
    }

    #[tokio::test]
    async fn test_load_ndjson() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"id": 1, "status": "open"}}"#).unwrap();
        writeln!(file, r#"{{"id": 2, "status": "closed"}}"#).unwrap();
        file.flush().unwrap();

        let ctx = SessionContext::new();
        let spec = DataSourceSpec::new(file.path().to_str().unwrap(), SourceFormat::Json);
        let provider = FileLoader::new().load(&ctx, &spec).await.unwrap();
        assert_eq!(count(&ctx, provider).await, 2);
    }

    #[tokio::test]
    async fn test_missing_path_is_a_data_source_error() {
        let ctx = SessionContext::new();
        let spec = DataSourceSpec::new("/definitely/not/here.csv", SourceFormat::Csv);
        let err = FileLoader::new().load(&ctx, &spec).await.unwrap_err();
        assert!(matches!(err, GateError::DataSource { .. }));
        assert_eq!(err.kind(), "dataset_load_failed");
    }
}
