//! Test helpers for building in-memory datasets.

use crate::core::Dataset;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use std::sync::Arc;

/// A named, nullable column of test data.
pub struct TestColumn {
    name: String,
    data_type: DataType,
    array: ArrayRef,
}

impl TestColumn {
    pub fn int(name: &str, values: Vec<Option<i64>>) -> Self {
        Self {
            name: name.to_string(),
            data_type: DataType::Int64,
            array: Arc::new(Int64Array::from(values)),
        }
    }

    pub fn float(name: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.to_string(),
            data_type: DataType::Float64,
            array: Arc::new(Float64Array::from(values)),
        }
    }

    pub fn utf8(name: &str, values: Vec<Option<&str>>) -> Self {
        Self {
            name: name.to_string(),
            data_type: DataType::Utf8,
            array: Arc::new(StringArray::from(values)),
        }
    }
}

/// Builds a record batch from test columns.
pub fn batch_from_columns(columns: Vec<TestColumn>) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|c| Field::new(c.name.as_str(), c.data_type.clone(), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let arrays = columns.into_iter().map(|c| c.array).collect();
    RecordBatch::try_new(schema, arrays).unwrap()
}

/// Registers the columns as table `data` in a fresh session and returns the handle.
pub async fn dataset_from_columns(name: &str, columns: Vec<TestColumn>) -> Dataset {
    let batch = batch_from_columns(columns);
    let ctx = SessionContext::new();
    let provider = MemTable::try_new(batch.schema(), vec![vec![batch]]).unwrap();
    ctx.register_table("data", Arc::new(provider)).unwrap();
    Dataset::new(name, "data", ctx)
}
