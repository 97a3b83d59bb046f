use crate::error::{ScanError, ScanResult};
use crate::source::{SignalRecord, SignalSource};
use chrono::{DateTime, Utc};
use crucible_types::{Catalyst, CatalystOrigin};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{info, warn};

/// Priority order: highest severity, then earliest timestamp, then
/// lexicographic domain tag. Evidence text settles exact duplicates so the
/// order is total.
pub fn rank(
    a: (f64, &DateTime<Utc>, &str, &str),
    b: (f64, &DateTime<Utc>, &str, &str),
) -> Ordering {
    b.0.total_cmp(&a.0)
        .then_with(|| a.1.cmp(b.1))
        .then_with(|| a.2.cmp(b.2))
        .then_with(|| a.3.cmp(b.3))
}

fn key(r: &SignalRecord) -> (f64, &DateTime<Utc>, &str, &str) {
    (r.severity, &r.observed_at, &r.domain_tag, &r.evidence)
}

/// Select the highest-priority record. Records with a non-finite severity
/// are skipped.
pub fn select(records: &[SignalRecord]) -> ScanResult<&SignalRecord> {
    records
        .iter()
        .filter(|r| {
            let finite = r.severity.is_finite();
            if !finite {
                warn!(domain = %r.domain_tag, "skipping signal with non-finite severity");
            }
            finite
        })
        .min_by(|a, b| rank(key(a), key(b)))
        .ok_or_else(|| ScanError::NoSignal("no usable signal records".into()))
}

/// Result of one scan.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Selection {
    pub catalyst: Catalyst,
    /// Candidates considered, external plus internal.
    pub considered: usize,
    /// Records dropped for a non-finite severity.
    pub skipped: usize,
}

enum Candidate {
    External(SignalRecord),
    Internal(Catalyst),
}

impl Candidate {
    fn key(&self) -> (f64, &DateTime<Utc>, &str, &str) {
        match self {
            Self::External(r) => key(r),
            Self::Internal(c) => (
                c.severity,
                &c.observed_at,
                &c.domain_tag,
                &c.source_evidence,
            ),
        }
    }
}

/// Telemetry Scanner over a set of signal sources.
#[derive(Default)]
pub struct TelemetryScanner {
    sources: Vec<Box<dyn SignalSource>>,
}

impl TelemetryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl SignalSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn add_source(&mut self, source: Box<dyn SignalSource>) {
        self.sources.push(source);
    }

    pub async fn collect(&self) -> ScanResult<Vec<SignalRecord>> {
        let mut all = Vec::new();
        for source in &self.sources {
            let mut batch = source.collect().await?;
            for r in batch.iter_mut().filter(|r| r.source.is_empty()) {
                r.source = source.name().to_string();
            }
            all.append(&mut batch);
        }
        Ok(all)
    }

    /// Collect every source and pick one catalyst. Pending internal
    /// catalysts compete on the same terms as external records and are
    /// returned unchanged when selected.
    pub async fn scan(&self, pending: &[Catalyst]) -> ScanResult<Selection> {
        let records = self.collect().await?;
        let total = records.len();
        let mut candidates: Vec<Candidate> = records
            .into_iter()
            .filter(|r| {
                let finite = r.severity.is_finite();
                if !finite {
                    warn!(domain = %r.domain_tag, source = %r.source, "skipping signal with non-finite severity");
                }
                finite
            })
            .map(Candidate::External)
            .collect();
        let skipped = total - candidates.len();
        candidates.extend(
            pending
                .iter()
                .filter(|c| c.severity.is_finite())
                .cloned()
                .map(Candidate::Internal),
        );
        let considered = candidates.len();

        let best = candidates
            .into_iter()
            .min_by(|a, b| rank(a.key(), b.key()))
            .ok_or_else(|| {
                ScanError::NoSignal(format!(
                    "{} source(s) and {} pending catalyst(s) produced nothing",
                    self.sources.len(),
                    pending.len()
                ))
            })?;

        let catalyst = match best {
            Candidate::Internal(c) => c,
            Candidate::External(r) => {
                let evidence = if r.evidence.is_empty() {
                    format!("{} anomaly at severity {:.3}", r.domain_tag, r.severity)
                } else {
                    r.evidence
                };
                Catalyst::new(
                    r.severity,
                    evidence,
                    r.domain_tag,
                    r.observed_at,
                    CatalystOrigin::Telemetry { source: r.source },
                )
            }
        };
        info!(
            catalyst = %catalyst.id,
            domain = %catalyst.domain_tag,
            severity = catalyst.severity,
            internal = catalyst.is_internal(),
            considered,
            "catalyst selected"
        );
        Ok(Selection {
            catalyst,
            considered,
            skipped,
        })
    }
}
