// src/config.rs
//! Run parameters, defaulting to the counts the golden vectors were recorded
//! with and overridable through `SHN_*` environment variables:
//!
//! | variable                  | default       |
//! |---------------------------|---------------|
//! | `SHN_STRESS_ITERATIONS`   | 999 999       |
//! | `SHN_FEEDBACK_ITERATIONS` | 1 000 000     |
//! | `SHN_FAIL_FAST`           | off           |
//! | `SHN_BENCH_BYTES`         | 200 000 000   |
//! | `SHN_BENCH_BLOCK`         | 1600          |
//! | `SHN_BENCH_MAC`           | 8             |
//! | `SHN_BENCH_OPS`           | 10 000 000    |

use std::str::FromStr;

use crate::vectors::{FEEDBACK_ITERATIONS, ITERATIONS, TESTSIZE};

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key).and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key)
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Conformance/stress run parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Key and nonce evolution iterations
    pub stress_iterations: usize,
    /// Feedback engine iterations
    pub feedback_iterations: usize,
    /// Stop after the first phase that records a mismatch
    pub fail_fast: bool,
    /// Per-iteration feedback output and register dumps
    pub verbose: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            stress_iterations: ITERATIONS,
            feedback_iterations: FEEDBACK_ITERATIONS,
            fail_fast: false,
            verbose: false,
        }
    }
}

impl HarnessConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            stress_iterations: parse_or(&lookup, "SHN_STRESS_ITERATIONS", d.stress_iterations),
            feedback_iterations: parse_or(&lookup, "SHN_FEEDBACK_ITERATIONS", d.feedback_iterations),
            fail_fast: flag(&lookup, "SHN_FAIL_FAST"),
            verbose: false,
        }
    }

    /// True when every loop runs for its recorded count.
    #[must_use]
    pub fn is_golden(&self) -> bool {
        self.stress_iterations == ITERATIONS && self.feedback_iterations == FEEDBACK_ITERATIONS
    }
}

/// Benchmark sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Minimum bytes per byte-counting family
    pub stream_bytes: usize,
    /// Packet size for the per-packet families
    pub block_size: usize,
    /// Tag bytes finalised per packet
    pub mac_size: usize,
    /// Key / nonce schedules per schedule family
    pub schedule_ops: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self { stream_bytes: 200_000_000, block_size: 1600, mac_size: 8, schedule_ops: 10_000_000 }
    }
}

impl BenchConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            stream_bytes: parse_or(&lookup, "SHN_BENCH_BYTES", d.stream_bytes),
            block_size: parse_or(&lookup, "SHN_BENCH_BLOCK", d.block_size).max(1),
            mac_size: parse_or(&lookup, "SHN_BENCH_MAC", d.mac_size).clamp(1, TESTSIZE),
            schedule_ops: parse_or(&lookup, "SHN_BENCH_OPS", d.schedule_ops),
        }
    }
}
