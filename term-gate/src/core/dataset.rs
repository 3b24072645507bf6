//! Read-only dataset handle handed to validators.

use crate::prelude::*;
use crate::security::SqlSecurity;
use arrow::array::{Array, Float64Array};
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use datafusion::dataframe::DataFrame;
use datafusion::prelude::SessionContext;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Aggregates a [`Dataset`] can compute over one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Arithmetic mean of non-null values.
    Mean,
    /// Number of null values.
    NullCount,
    /// Number of distinct non-null values.
    DistinctCount,
}

impl Aggregate {
    fn sql_expression(&self, column_identifier: &str) -> String {
        match self {
            Aggregate::Mean => format!("AVG(CAST({column_identifier} AS DOUBLE))"),
            Aggregate::NullCount => format!("COUNT(*) - COUNT({column_identifier})"),
            Aggregate::DistinctCount => format!("COUNT(DISTINCT {column_identifier})"),
        }
    }
}

/// A dataset registered in the run's session.
///
/// The handle only exposes reads: counts, aggregates and filters that produce
/// new lazily-evaluated [`RowSubset`]s. The registered table itself is never
/// modified. Cloning is cheap and clones share the cached row count.
#[derive(Clone)]
pub struct Dataset {
    name: Arc<str>,
    table: Arc<str>,
    ctx: SessionContext,
    row_count: Arc<OnceCell<u64>>,
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("name", &self.name)
            .field("table", &self.table)
            .finish()
    }
}

impl Dataset {
    /// Wraps a table already registered in `ctx` under `table`.
    pub fn new(name: impl Into<Arc<str>>, table: impl Into<Arc<str>>, ctx: SessionContext) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            ctx,
            row_count: Arc::new(OnceCell::new()),
        }
    }

    /// The dataset name from the validation set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table name the dataset is registered under.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Total number of rows, computed once per handle.
    pub async fn row_count(&self) -> Result<u64> {
        let count = self
            .row_count
            .get_or_try_init(|| async {
                let df = self.ctx.table(self.table.as_ref()).await?;
                let count = df.count().await?;
                debug!(dataset.name = %self.name, dataset.rows = count, "Counted dataset rows");
                Ok::<u64, GateError>(count as u64)
            })
            .await?;
        Ok(*count)
    }

    /// The Arrow schema of the dataset.
    pub async fn schema(&self) -> Result<SchemaRef> {
        let provider = self.ctx.table_provider(self.table.as_ref()).await?;
        Ok(provider.schema())
    }

    /// The data type of `column`, or [`GateError::ColumnNotFound`].
    pub async fn column_type(&self, column: &str) -> Result<DataType> {
        let schema = self.schema().await?;
        schema
            .field_with_name(column)
            .map(|field| field.data_type().clone())
            .map_err(|_| GateError::ColumnNotFound {
                column: column.to_string(),
            })
    }

    /// Fails with [`GateError::TypeMismatch`] unless `column` is numeric.
    pub async fn require_numeric(&self, column: &str) -> Result<()> {
        let data_type = self.column_type(column).await?;
        if data_type.is_numeric() {
            Ok(())
        } else {
            Err(GateError::TypeMismatch {
                column: column.to_string(),
                expected: "numeric".to_string(),
                found: data_type.to_string(),
            })
        }
    }

    /// Runs a query against the session the dataset lives in.
    pub async fn query(&self, sql: &str) -> Result<DataFrame> {
        Ok(self.ctx.sql(sql).await?)
    }

    /// Selects the full rows matching `predicate` (a SQL boolean expression).
    pub async fn filter(&self, predicate: &str) -> Result<RowSubset> {
        let frame = self
            .query(&format!("SELECT * FROM {} WHERE {predicate}", self.table))
            .await?;
        RowSubset::from_frame(frame).await
    }

    /// Computes one aggregate over `column`. `None` means the aggregate is
    /// undefined (for example the mean of zero values).
    pub async fn aggregate(&self, column: &str, aggregate: Aggregate) -> Result<Option<f64>> {
        self.column_type(column).await?;
        let column_identifier = SqlSecurity::escape_identifier(column)?;
        let expr = aggregate.sql_expression(&column_identifier);
        let values = self
            .scalar_row(&format!("SELECT {expr} AS value FROM {}", self.table))
            .await?;
        Ok(values.into_iter().next().flatten())
    }

    /// Runs a query expected to return a single row and reads every column of
    /// that row as a float.
    pub async fn scalar_row(&self, sql: &str) -> Result<Vec<Option<f64>>> {
        let batches = self.query(sql).await?.collect().await?;
        let batch = batches
            .iter()
            .find(|b| b.num_rows() > 0)
            .ok_or_else(|| GateError::Internal("Aggregate query returned no rows".to_string()))?;
        (0..batch.num_columns())
            .map(|idx| scalar_f64(batch, idx))
            .collect()
    }
}

/// Reads row 0 of column `idx` as a float, whatever numeric type it has.
pub(crate) fn scalar_f64(batch: &RecordBatch, idx: usize) -> Result<Option<f64>> {
    let column = batch.column(idx);
    let as_float = arrow::compute::cast(column, &DataType::Float64)?;
    let array = as_float
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| GateError::Internal("Failed to read aggregate value".to_string()))?;
    if array.is_empty() || array.is_null(0) {
        Ok(None)
    } else {
        Ok(Some(array.value(0)))
    }
}

/// A lazily-evaluated subset of a dataset's rows, with every column kept.
#[derive(Clone)]
pub struct RowSubset {
    frame: DataFrame,
    row_count: u64,
}

impl fmt::Debug for RowSubset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowSubset")
            .field("row_count", &self.row_count)
            .finish()
    }
}

impl RowSubset {
    /// Counts the rows of `frame` and wraps it.
    pub async fn from_frame(frame: DataFrame) -> Result<Self> {
        let row_count = frame.clone().count().await? as u64;
        Ok(Self { frame, row_count })
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// The Arrow schema of the subset (the dataset's full schema).
    pub fn schema(&self) -> SchemaRef {
        self.frame.schema().inner().clone()
    }

    /// Materializes the rows.
    pub async fn collect(self) -> Result<Vec<RecordBatch>> {
        Ok(self.frame.collect().await?)
    }
}
