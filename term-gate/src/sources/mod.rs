//! Dataset loading.
//!
//! A [`DatasetLoader`] turns a [`DataSourceSpec`] into a DataFusion table
//! provider. The engine registers the provider under a generated table name and
//! hands validators a [`Dataset`](crate::core::Dataset) over it.
//!
//! - [`FileLoader`] reads CSV (with header), Parquet and newline-delimited JSON
//!   from a file, a directory or a glob pattern.
//! - [`MemoryLoader`] serves record batches registered under a path, for tests
//!   and for embedding the gate behind another data layer.

use crate::prelude::*;
use crate::rules::DataSourceSpec;
use async_trait::async_trait;
use datafusion::datasource::TableProvider;
use datafusion::prelude::SessionContext;
use std::fmt::Debug;
use std::sync::Arc;

mod file;
mod memory;

pub use file::FileLoader;
pub use memory::MemoryLoader;

/// Resolves a data source into a table provider.
#[async_trait]
pub trait DatasetLoader: Debug + Send + Sync {
    /// Loads the dataset described by `source`.
    ///
    /// Failures should be reported as [`GateError::DataSource`].
    async fn load(&self, ctx: &SessionContext, source: &DataSourceSpec) -> Result<Arc<dyn TableProvider>>;
}

/// Whether `path` is a glob pattern rather than a literal path.
pub(crate) fn is_glob(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Utility function to expand a glob pattern into the files it matches.
pub(crate) fn expand_glob(pattern: &str) -> Result<Vec<String>> {
    let matches = glob::glob(pattern)
        .map_err(|e| GateError::data_source("file", format!("Invalid glob pattern '{pattern}': {e}")))?;

    let mut paths = Vec::new();
    for entry in matches {
        let path = entry.map_err(|e| {
            GateError::data_source_with_source("file", format!("Cannot read '{pattern}'"), Box::new(e))
        })?;
        if path.is_file() {
            if let Some(path_str) = path.to_str() {
                paths.push(path_str.to_string());
            }
        }
    }

    if paths.is_empty() {
        return Err(GateError::data_source(
            "file",
            format!("No files found matching '{pattern}'"),
        ));
    }

    paths.sort();
    Ok(paths)
}
