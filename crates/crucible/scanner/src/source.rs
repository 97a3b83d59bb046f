use crate::error::{ScanError, ScanResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One external telemetry record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub severity: f64,
    #[serde(alias = "domain")]
    pub domain_tag: String,
    #[serde(alias = "timestamp")]
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub source: String,
}

impl SignalRecord {
    pub fn new(
        severity: f64,
        domain_tag: impl Into<String>,
        observed_at: DateTime<Utc>,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            domain_tag: domain_tag.into(),
            observed_at,
            evidence: evidence.into(),
            source: String::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Provider of external telemetry.
#[async_trait]
pub trait SignalSource: Send + Sync {
    fn name(&self) -> &str;

    async fn collect(&self) -> ScanResult<Vec<SignalRecord>>;
}

/// Fixed records held in memory.
#[derive(Clone, Debug, Default)]
pub struct StaticSignals {
    records: Vec<SignalRecord>,
}

impl StaticSignals {
    pub fn new(records: Vec<SignalRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl SignalSource for StaticSignals {
    fn name(&self) -> &str {
        "static"
    }

    async fn collect(&self) -> ScanResult<Vec<SignalRecord>> {
        Ok(self.records.clone())
    }
}

/// Reads `*.json` (a record or an array of records) and `*.jsonl` (one
/// record per line) from a directory, in file-name order.
#[derive(Clone, Debug)]
pub struct JsonDirSource {
    dir: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<SignalRecord>),
    One(SignalRecord),
}

impl JsonDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read(path: &Path) -> ScanResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ScanError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[async_trait]
impl SignalSource for JsonDirSource {
    fn name(&self) -> &str {
        "json-dir"
    }

    async fn collect(&self) -> ScanResult<Vec<SignalRecord>> {
        let io_err = |source: std::io::Error| ScanError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            paths.push(entry.path());
        }
        paths.sort();

        let mut records = Vec::new();
        for path in paths {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
            let origin = path.display().to_string();
            match ext {
                "json" => {
                    let raw = Self::read(&path).await?;
                    let parsed: OneOrMany =
                        serde_json::from_str(&raw).map_err(|source| ScanError::Parse {
                            path: path.clone(),
                            line: 1,
                            source,
                        })?;
                    let batch = match parsed {
                        OneOrMany::Many(v) => v,
                        OneOrMany::One(r) => vec![r],
                    };
                    records.extend(batch.into_iter().map(|r| fill_source(r, &origin)));
                }
                "jsonl" => {
                    let raw = Self::read(&path).await?;
                    for (idx, line) in raw.lines().enumerate() {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let record: SignalRecord =
                            serde_json::from_str(line).map_err(|source| ScanError::Parse {
                                path: path.clone(),
                                line: idx + 1,
                                source,
                            })?;
                        records.push(fill_source(record, &origin));
                    }
                }
                _ => {
                    debug!(path = %path.display(), "ignoring non-telemetry file");
                }
            }
        }
        if records.is_empty() {
            warn!(dir = %self.dir.display(), "telemetry directory yielded no records");
        }
        Ok(records)
    }
}

fn fill_source(mut record: SignalRecord, origin: &str) -> SignalRecord {
    if record.source.is_empty() {
        record.source = origin.to_string();
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_dir_reads_records_arrays_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"severity":0.4,"domain":"disk","timestamp":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"[{"severity":0.7,"domain_tag":"net","observed_at":"2026-01-01T00:00:01Z","evidence":"drops"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("c.jsonl"),
            "{\"severity\":0.9,\"domain\":\"cpu\",\"timestamp\":\"2026-01-01T00:00:02Z\"}\n\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let records = JsonDirSource::new(dir.path()).collect().await.unwrap();
        let domains: Vec<&str> = records.iter().map(|r| r.domain_tag.as_str()).collect();
        assert_eq!(domains, vec!["disk", "net", "cpu"]);
        assert!(records[0].source.ends_with("a.json"));
        assert_eq!(records[1].evidence, "drops");
    }

    #[tokio::test]
    async fn malformed_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("bad.jsonl"),
            "{\"severity\":0.9,\"domain\":\"cpu\",\"timestamp\":\"2026-01-01T00:00:02Z\"}\nnot json\n",
        )
        .unwrap();
        let err = JsonDirSource::new(dir.path()).collect().await.unwrap_err();
        assert!(matches!(err, ScanError::Parse { line: 2, .. }));
    }

    #[tokio::test]
    async fn missing_dir_is_io_error() {
        let err = JsonDirSource::new("/definitely/not/here")
            .collect()
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Io { .. }));
    }
}
