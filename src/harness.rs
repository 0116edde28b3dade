//! §6.1.0 Overview - Run orchestration
//! - `run_test`: conformance, then the stress loops, then the feedback engine
//! - `write_keystream`: raw or hex keystream for external statistical tools

/* =============================================================================
 * SHN - harness.rs - Program v1.0.0
 * Numbering: Program=1.0.0, Sections=§6.X.0, Subsections=§6.X.Y
 * =============================================================================
 */

// ============================================================================
// §6.2.0 Imports & Constants
// ============================================================================
use std::io::Write;

use zeroize::Zeroize;

use crate::cipher::AuthStreamCipher;
use crate::config::HarnessConfig;
use crate::conformance::ConformanceSuite;
use crate::error::HarnessError;
use crate::feedback::{self, FeedbackState, Observation};
use crate::hexfmt;
use crate::report::RunReport;
use crate::stress;

/// Keystream generation writes in chunks of this size.
pub const CHUNK_BYTES: usize = 1 << 20;

// ============================================================================
// §6.3.0 Observers
// ============================================================================

/// Hooks for long-running phases. Every method defaults to doing nothing.
pub trait RunObserver {
    /// Called every [`stress::PROGRESS_INTERVAL`] iterations of a stress loop.
    fn stress_progress(&mut self, _phase: &'static str, _iteration: usize) {}

    /// Called once per feedback iteration.
    fn feedback_step(&mut self, _observation: &Observation) {}
}

/// Observer that ignores everything.
pub struct Silent;

impl RunObserver for Silent {}

// ============================================================================
// §6.4.0 Test runs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMode {
    /// Conformance suite only
    Quick,
    /// Conformance, stress loops and feedback engine
    Full,
}

/// Everything a test run produced.
#[derive(Debug)]
pub struct TestRun {
    pub report: RunReport,
    /// Final feedback state, when that phase ran
    pub feedback: Option<FeedbackState>,
}

fn should_stop(config: &HarnessConfig, report: &mut RunReport, phase: &str) -> bool {
    if config.fail_fast && report.mismatch_count() > 0 {
        report.aborted = true;
        tracing::warn!(phase, mismatches = report.mismatch_count(), "fail-fast: stopping");
        return true;
    }
    false
}

/// Runs the requested phases against `ctx`.
pub fn run_test<C, O>(
    ctx: &mut C,
    config: &HarnessConfig,
    mode: TestMode,
    observer: &mut O,
) -> Result<TestRun, HarnessError>
where
    C: AuthStreamCipher + ?Sized,
    O: RunObserver + ?Sized,
{
    let mut report = RunReport::new();

    /* §6.4.1 conformance */
    let outcome = ConformanceSuite::new(&mut *ctx).run(&mut report)?;
    tracing::info!(mismatches = report.mismatch_count(), "conformance complete");
    if mode == TestMode::Quick || should_stop(config, &mut report, "conformance") {
        return Ok(TestRun { report, feedback: None });
    }

    /* §6.4.2 stress loops */
    stress::run_key_evolution(
        &mut *ctx,
        outcome.keystream_window,
        config.stress_iterations,
        &mut report,
        |i| observer.stress_progress("key evolution", i),
    )?;
    if should_stop(config, &mut report, "key evolution") {
        return Ok(TestRun { report, feedback: None });
    }

    stress::run_nonce_evolution(&mut *ctx, config.stress_iterations, &mut report, |i| {
        observer.stress_progress("nonce evolution", i)
    })?;
    if should_stop(config, &mut report, "nonce evolution") {
        return Ok(TestRun { report, feedback: None });
    }

    /* §6.4.3 feedback engine */
    let state = feedback::run_checked(&mut *ctx, config.feedback_iterations, &mut report, |o| {
        observer.feedback_step(o)
    })?;
    tracing::info!(mismatches = report.mismatch_count(), "test run complete");

    Ok(TestRun { report, feedback: Some(state) })
}

// ============================================================================
// §6.5.0 Keystream generation
// ============================================================================

/// Default byte count for hex output.
pub const DEFAULT_HEX_BYTES: usize = 1_000_000;
/// Default byte count for raw output.
pub const DEFAULT_RAW_BYTES: usize = 1_000_000_000 / 8;

/// Keys and nonces `ctx`, then writes `n` keystream bytes to `out`, raw or as
/// 16-per-line hex.
pub fn write_keystream<C, W>(
    ctx: &mut C,
    key: &[u8],
    nonce: &[u8],
    n: usize,
    out: &mut W,
    raw: bool,
) -> Result<(), HarnessError>
where
    C: AuthStreamCipher + ?Sized,
    W: Write + ?Sized,
{
    ctx.key(key);
    ctx.nonce(nonce);

    let mut buf = vec![0u8; CHUNK_BYTES.min(n)];
    let mut left = n;
    while left > 0 {
        let len = left.min(buf.len());
        let chunk = &mut buf[..len];
        chunk.fill(0);
        ctx.stream(chunk);
        if raw {
            out.write_all(chunk)?;
        } else {
            hexfmt::write_bulk(out, chunk)?;
        }
        left -= len;
    }
    out.flush()?;
    buf.zeroize();
    Ok(())
}

// ============================================================================
// §6.6.0 Tests
// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::shannon::ShannonCipher;
    use crate::vectors::{TESTSIZE, TEST_KEY, TEST_NONCE};

    struct Counting {
        progress: Vec<(&'static str, usize)>,
        steps: usize,
    }

    impl RunObserver for Counting {
        fn stress_progress(&mut self, phase: &'static str, iteration: usize) {
            self.progress.push((phase, iteration));
        }
        fn feedback_step(&mut self, _observation: &Observation) {
            self.steps += 1;
        }
    }

    fn short() -> HarnessConfig {
        HarnessConfig {
            stress_iterations: 1000,
            feedback_iterations: 40,
            fail_fast: false,
            verbose: false,
        }
    }

    #[test]
    fn quick_mode_runs_conformance_only() {
        let mut ctx = ShannonCipher::new(&[]);
        let run = run_test(&mut ctx, &short(), TestMode::Quick, &mut Silent).unwrap();
        assert!(run.report.passed());
        assert_eq!(run.report.checks.len(), 13);
        assert!(run.feedback.is_none());
    }

    #[test]
    fn short_full_run_notes_each_loop() {
        let mut ctx = ShannonCipher::new(&[]);
        let mut obs = Counting { progress: Vec::new(), steps: 0 };
        let run = run_test(&mut ctx, &short(), TestMode::Full, &mut obs).unwrap();
        assert!(run.report.passed());
        assert!(run.feedback.is_some());
        // key, nonce, feedback tag, feedback digest
        assert_eq!(run.report.notes.len(), 4);
        assert!(run.report.notes[0].contains("93bf8d32860a4f3f"));
        assert!(run.report.notes[1].contains("aa054115"));
        assert!(run.report.notes[2].starts_with("feedback: 40 iterations"));
        assert_eq!(
            obs.progress,
            vec![
                ("key evolution", 500),
                ("key evolution", 1000),
                ("nonce evolution", 500),
                ("nonce evolution", 1000),
            ]
        );
        assert_eq!(obs.steps, 40);
    }

    /// Corrupts every keystream byte so conformance fails immediately.
    struct Broken(ShannonCipher);

    impl AuthStreamCipher for Broken {
        fn key(&mut self, key: &[u8]) {
            self.0.key(key);
        }
        fn nonce(&mut self, nonce: &[u8]) {
            self.0.nonce(nonce);
        }
        fn stream(&mut self, buf: &mut [u8]) {
            self.0.stream(buf);
            buf.iter_mut().for_each(|b| *b = !*b);
        }
        fn mac_only(&mut self, buf: &[u8]) {
            self.0.mac_only(buf);
        }
        fn encrypt(&mut self, buf: &mut [u8]) {
            self.0.encrypt(buf);
        }
        fn decrypt(&mut self, buf: &mut [u8]) {
            self.0.decrypt(buf);
        }
        fn finish(&mut self, tag: &mut [u8]) {
            self.0.finish(tag);
        }
    }

    #[test]
    fn fail_fast_stops_after_conformance() {
        let mut ctx = Broken(ShannonCipher::new(&[]));
        let config = HarnessConfig { fail_fast: true, ..short() };
        let run = run_test(&mut ctx, &config, TestMode::Full, &mut Silent).unwrap();
        assert!(run.report.aborted);
        // keystream bulk, bytes and STREAMTEST all fully wrong
        assert_eq!(run.report.mismatch_count(), 3 * TESTSIZE);
        assert!(run.feedback.is_none());
        assert!(run.report.notes.is_empty());
    }

    #[test]
    fn without_fail_fast_every_phase_runs() {
        let mut ctx = Broken(ShannonCipher::new(&[]));
        let run = run_test(&mut ctx, &short(), TestMode::Full, &mut Silent).unwrap();
        assert!(!run.report.aborted);
        assert!(run.feedback.is_some());
        assert_eq!(run.report.mismatch_count(), 3 * TESTSIZE);
    }

    #[test]
    fn hex_keystream_matches_direct_stream() {
        let mut ctx = ShannonCipher::new(&[]);
        let mut out = Vec::new();
        write_keystream(&mut ctx, TEST_KEY, &TEST_NONCE, 20, &mut out, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "4d 7e d3 9c b6 95 d9 6a cf 52 97 70 ec 7d cc be\nae 2b 6f 8c \n"
        );
    }

    #[test]
    fn raw_keystream_spans_chunks() {
        let n = CHUNK_BYTES + 37;
        let mut ctx = ShannonCipher::new(&[]);
        let mut out = Vec::new();
        write_keystream(&mut ctx, &[0u8; 8], &[], n, &mut out, true).unwrap();
        assert_eq!(out.len(), n);

        let mut direct = vec![0u8; n];
        let mut c2 = ShannonCipher::new(&[0u8; 8]);
        c2.nonce(&[]);
        c2.stream(&mut direct);
        assert_eq!(out, direct);
        assert_eq!(
            hex::encode(&out[..32]),
            "9affe209b13ed470bc7fb71ae6064128c91b12da60bddf2f950ba8346a3e45d2"
        );
    }

    #[test]
    fn zero_bytes_writes_nothing() {
        let mut ctx = ShannonCipher::new(&[]);
        let mut out = Vec::new();
        write_keystream(&mut ctx, &[], &[], 0, &mut out, false).unwrap();
        assert!(out.is_empty());
    }
}
