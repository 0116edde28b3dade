//! Mismatch records and the run-level accumulator.

use std::fmt;

use serde::Serialize;

/// One byte that differed from its golden vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// Offset within the compared window
    pub position: usize,
    /// Golden byte
    pub expected: u8,
    /// Observed byte
    pub actual: u8,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expected {:02x}, got {:02x}.", self.expected, self.actual)
    }
}

/// Outcome of one labelled golden comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Human-readable label (e.g. `"single bytes"`)
    pub label: String,
    /// Golden vector name
    pub vector: String,
    /// Bytes compared
    pub checked: usize,
    /// Differing bytes, in position order
    pub mismatches: Vec<Mismatch>,
    /// Observed bytes, for echo and JSON output
    #[serde(with = "hex_bytes")]
    pub observed: Vec<u8>,
}

impl CheckReport {
    /// Compares `actual` against `expected` position by position.
    #[must_use]
    pub fn compare(label: &str, vector: &str, expected: &[u8], actual: &[u8]) -> Self {
        let mismatches = expected
            .iter()
            .zip(actual)
            .enumerate()
            .filter(|(_, (e, a))| e != a)
            .map(|(position, (&expected, &actual))| Mismatch { position, expected, actual })
            .collect();
        Self {
            label: label.to_owned(),
            vector: vector.to_owned(),
            checked: expected.len().min(actual.len()),
            mismatches,
            observed: actual.to_vec(),
        }
    }

    #[must_use]
    pub fn mismatch_count(&self) -> usize {
        self.mismatches.len()
    }

    #[must_use]
    pub fn first_mismatch(&self) -> Option<&Mismatch> {
        self.mismatches.first()
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Everything a run observed. Owned by the caller and threaded through
/// every component; the mismatch total only ever grows.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    /// Checks in the order they were performed
    pub checks: Vec<CheckReport>,
    mismatches: usize,
    /// Set when fail-fast stopped the run early
    pub aborted: bool,
    /// Informational notes (skipped comparisons, digests)
    pub notes: Vec<String>,
}

impl RunReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a check, logging one diagnostic per differing byte.
    pub fn record(&mut self, check: CheckReport) {
        for m in &check.mismatches {
            tracing::warn!(label = %check.label, vector = %check.vector, position = m.position, "{m}");
        }
        if check.passed() {
            tracing::debug!(label = %check.label, vector = %check.vector, "ok");
        }
        self.mismatches += check.mismatch_count();
        self.checks.push(check);
    }

    /// Adds an informational line.
    pub fn note(&mut self, note: impl Into<String>) {
        let note = note.into();
        tracing::info!("{note}");
        self.notes.push(note);
    }

    /// Total failed byte comparisons across the run.
    #[must_use]
    pub fn mismatch_count(&self) -> usize {
        self.mismatches
    }

    /// Process exit status: the mismatch total, saturated at 255.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.mismatches.min(255) as i32
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches == 0 && !self.aborted
    }
}

mod hex_bytes {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }
}
