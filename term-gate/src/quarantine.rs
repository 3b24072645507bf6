//! Quarantine of failing rows.
//!
//! When a row-level rule fails and asks for quarantine, the full offending rows
//! (every column) are written to a deterministic location so they can be
//! inspected offline:
//!
//! ```text
//! {root}/{dataset_name}/{rule_type}_{column}/part-00000.parquet
//! ```
//!
//! Spaces and path separators in each component become `_`, so `first name`
//! lands in `is_not_null_first_name`. Re-running a rule targets the same
//! directory; the [`WritePolicy`] decides what happens to earlier output.
//!
//! Distinct targets that clean up to the same directory are refused rather
//! than allowed to overwrite each other's rows.
//!
//! A quarantine failure never stops a run. The engine records it as a warning
//! on the rule outcome.

use crate::core::RowSubset;
use crate::prelude::*;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

/// What to do when the quarantine directory for a rule already has output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Remove earlier output first.
    #[default]
    Replace,
    /// Keep earlier output and add the next numbered part.
    Append,
    /// Refuse to write.
    FailIfExists,
}

/// Identifies the rule whose failing rows are being isolated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantineTarget {
    pub dataset_name: String,
    pub rule_type: String,
    pub column: String,
}

impl QuarantineTarget {
    pub fn new(
        dataset_name: impl Into<String>,
        rule_type: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            rule_type: rule_type.into(),
            column: column.into(),
        }
    }

    /// The target directory relative to the quarantine root.
    pub fn relative_dir(&self) -> PathBuf {
        let rule_dir = format!("{}_{}", self.rule_type, self.column);
        PathBuf::from(sanitize_component(&self.dataset_name)).join(sanitize_component(&rule_dir))
    }
}

/// Where quarantined rows were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineReceipt {
    /// The rule's quarantine directory.
    pub path: String,
    /// The Parquet file written by this run.
    pub file: String,
    pub rows_written: u64,
    /// Whether earlier output in the directory was removed.
    pub replaced: bool,
}

/// Destination for failing rows.
#[async_trait]
pub trait QuarantineSink: Debug + Send + Sync {
    async fn write(&self, target: &QuarantineTarget, rows: RowSubset) -> Result<QuarantineReceipt>;
}

/// Writes failing rows as Parquet files under a root directory.
///
/// Clones share the record of which target owns each directory.
#[derive(Debug, Clone)]
pub struct ParquetQuarantineWriter {
    root: PathBuf,
    policy: WritePolicy,
    claims: Arc<Mutex<HashMap<PathBuf, QuarantineTarget>>>,
}

impl ParquetQuarantineWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: WritePolicy::default(),
            claims: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// The directory a target's rows are written to.
    pub fn target_dir(&self, target: &QuarantineTarget) -> PathBuf {
        self.root.join(target.relative_dir())
    }

    /// Binds `dir` to `target`. Fails if another target already owns it.
    fn claim(&self, dir: &Path, target: &QuarantineTarget) -> Result<()> {
        let mut claims = self.claims.lock().map_err(|_| {
            GateError::quarantine_write(dir.display().to_string(), "claim registry lock poisoned")
        })?;
        match claims.get(dir) {
            Some(owner) if owner != target => Err(GateError::quarantine_write(
                dir.display().to_string(),
                format!(
                    "directory already holds rows of dataset '{}' rule '{}' on column '{}'",
                    owner.dataset_name, owner.rule_type, owner.column
                ),
            )),
            Some(_) => Ok(()),
            None => {
                claims.insert(dir.to_path_buf(), target.clone());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl QuarantineSink for ParquetQuarantineWriter {
    #[instrument(skip(self, rows), fields(
        dataset.name = %target.dataset_name,
        rule.type = %target.rule_type,
        rule.column = %target.column
    ))]
    async fn write(&self, target: &QuarantineTarget, rows: RowSubset) -> Result<QuarantineReceipt> {
        let dir = self.target_dir(target);
        let dir_display = dir.display().to_string();
        self.claim(&dir, target)?;

        let schema = rows.schema();
        let batches = rows
            .collect()
            .await
            .map_err(|e| GateError::quarantine_write(&dir_display, e.to_string()))?;

        let policy = self.policy;
        let receipt = tokio::task::spawn_blocking(move || {
            write_parts(&dir, policy, |path| write_parquet(path, schema, &batches))
        })
        .await
        .map_err(|e| GateError::quarantine_write(&dir_display, format!("Writer task failed: {e}")))?
        .map_err(|e| match e {
            err @ GateError::QuarantineWrite { .. } => err,
            other => GateError::quarantine_write(&dir_display, other.to_string()),
        })?;

        info!(
            quarantine.path = %receipt.file,
            quarantine.rows = receipt.rows_written,
            "Quarantined failing rows"
        );
        Ok(receipt)
    }
}

/// Writes one part with `write_file` according to `policy`.
///
/// `Replace` stages the new part in a sibling directory and only swaps it in
/// once it is complete, so a failed write leaves earlier output untouched.
fn write_parts<F>(dir: &Path, policy: WritePolicy, write_file: F) -> Result<QuarantineReceipt>
where
    F: FnOnce(&Path) -> Result<u64>,
{
    let (rows_written, part, replaced) = match policy {
        WritePolicy::Replace => {
            let staging = staging_dir(dir);
            if staging.exists() {
                std::fs::remove_dir_all(&staging)?;
            }
            std::fs::create_dir_all(&staging)?;
            let rows_written = match write_file(&staging.join(part_name(0))) {
                Ok(rows) => rows,
                Err(e) => {
                    let _ = std::fs::remove_dir_all(&staging);
                    return Err(e);
                }
            };
            let replaced = dir.exists();
            if replaced {
                std::fs::remove_dir_all(dir)?;
            }
            std::fs::rename(&staging, dir)?;
            (rows_written, 0, replaced)
        }
        WritePolicy::Append | WritePolicy::FailIfExists => {
            let existing = existing_parts(dir)?;
            if policy == WritePolicy::FailIfExists && !existing.is_empty() {
                return Err(GateError::quarantine_write(
                    dir.display().to_string(),
                    "quarantine output already exists",
                ));
            }
            let part = existing.iter().max().map_or(0, |n| n + 1);
            std::fs::create_dir_all(dir)?;
            let file_path = dir.join(part_name(part));
            let rows_written = match write_file(&file_path) {
                Ok(rows) => rows,
                Err(e) => {
                    let _ = std::fs::remove_file(&file_path);
                    return Err(e);
                }
            };
            (rows_written, part, false)
        }
    };

    Ok(QuarantineReceipt {
        path: dir.display().to_string(),
        file: dir.join(part_name(part)).display().to_string(),
        rows_written,
        replaced,
    })
}

fn write_parquet(path: &Path, schema: arrow::datatypes::SchemaRef, batches: &[RecordBatch]) -> Result<u64> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    let mut rows_written = 0u64;
    for batch in batches {
        writer.write(batch)?;
        rows_written += batch.num_rows() as u64;
    }
    writer.close()?;
    Ok(rows_written)
}

fn part_name(part: u32) -> String {
    format!("part-{part:05}.parquet")
}

/// Hidden sibling of `dir` used while a replacement part is being written.
fn staging_dir(dir: &Path) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.with_file_name(format!(".{name}.staging"))
}

/// Part numbers already present in `dir`.
fn existing_parts(dir: &Path) -> Result<Vec<u32>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name();
        let number = name
            .to_str()
            .and_then(|n| n.strip_prefix("part-"))
            .and_then(|n| n.strip_suffix(".parquet"))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(number) = number {
            parts.push(number);
        }
    }
    Ok(parts)
}

/// Makes a name safe to use as a single path component.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
