//! Report persistence.

use super::RunReport;
use crate::formatters::{JsonFormatter, ResultFormatter};
use crate::prelude::*;
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Destination for finished run reports.
#[async_trait]
pub trait ReportSink: Debug + Send + Sync {
    /// Persists `report` and returns where it went.
    ///
    /// Failures must be reported as [`GateError::ReportWrite`].
    async fn persist(&self, report: &RunReport) -> Result<String>;
}

/// Writes each report as pretty JSON to `{root}/{report_id}.json`.
///
/// Existing files are never overwritten: if the name is taken, `_1`, `_2`, ...
/// is appended to the file stem.
#[derive(Debug, Clone)]
pub struct FileReportSink {
    root: PathBuf,
    formatter: JsonFormatter,
}

impl FileReportSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            formatter: JsonFormatter::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidate(&self, report_id: &str, attempt: usize) -> PathBuf {
        if attempt == 0 {
            self.root.join(format!("{report_id}.json"))
        } else {
            self.root.join(format!("{report_id}_{attempt}.json"))
        }
    }
}

#[async_trait]
impl ReportSink for FileReportSink {
    async fn persist(&self, report: &RunReport) -> Result<String> {
        let root = self.root.display().to_string();
        let body = self.formatter.format(report).map_err(|e| GateError::ReportWrite {
            path: root.clone(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| GateError::report_write(&root, e))?;

        let mut attempt = 0;
        let (path, mut file) = loop {
            let path = self.candidate(&report.report_id, attempt);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(GateError::report_write(path.display().to_string(), e)),
            }
        };

        let path_str = path.display().to_string();
        file.write_all(body.as_bytes())
            .await
            .map_err(|e| GateError::report_write(&path_str, e))?;
        file.flush()
            .await
            .map_err(|e| GateError::report_write(&path_str, e))?;

        info!(report.path = %path_str, report.id = %report.report_id, "Report saved");
        Ok(path_str)
    }
}

/// Keeps reports in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryReportSink {
    reports: Arc<Mutex<Vec<RunReport>>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports persisted so far, oldest first.
    pub fn reports(&self) -> Vec<RunReport> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn persist(&self, report: &RunReport) -> Result<String> {
        let mut reports = self
            .reports
            .lock()
            .map_err(|_| GateError::ReportWrite {
                path: "memory".to_string(),
                message: "report store lock poisoned".to_string(),
                source: None,
            })?;
        reports.push(report.clone());
        Ok(format!("memory://{}", report.report_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportBuilder;

    #[tokio::test]
    async fn test_file_sink_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileReportSink::new(dir.path().join("reports"));
        let report = ReportBuilder::new("p").finish();

        let first = sink.persist(&report).await.unwrap();
        let second = sink.persist(&report).await.unwrap();
        assert_ne!(first, second);
        assert!(first.ends_with(&format!("{}.json", report.report_id)));
        assert!(second.ends_with(&format!("{}_1.json", report.report_id)));

        let content = std::fs::read_to_string(&first).unwrap();
        let parsed: RunReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, report);
    }

    #[tokio::test]
    async fn test_file_sink_reports_write_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "x").unwrap();

        let sink = FileReportSink::new(&blocker);
        let err = sink.persist(&ReportBuilder::new("p").finish()).await.unwrap_err();
        assert!(matches!(err, GateError::ReportWrite { .. }));
    }

    #[tokio::test]
    async fn test_memory_sink() {
        let sink = MemoryReportSink::new();
        let handle = sink.clone();
        sink.persist(&ReportBuilder::new("p").finish()).await.unwrap();
        assert_eq!(handle.reports().len(), 1);
    }
}
