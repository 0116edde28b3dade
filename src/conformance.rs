//! §3.1.0 Overview - Ordered conformance stages
//! - KeySchedule → Keystream → StreamContinuation → MacOnly → RoundTrip → RoundTripBytes
//! - Each stage may only start once its predecessor has completed
//! - Every stage after the key schedule rewinds with the same nonce
//! - A round trip decrypts the ciphertext its own encrypt path produced

/* =============================================================================
 * SHN - conformance.rs - Program v1.0.0
 * Numbering: Program=1.0.0, Sections=§3.X.0, Subsections=§3.X.Y
 * =============================================================================
 */

// ============================================================================
// §3.2.0 Imports
// ============================================================================
use serde::Serialize;

use crate::cipher::{AuthStreamCipher, Chunking, OpFamily};
use crate::equivalence::{check_equivalent, check_path, Expectation, Labels, OutputWindow};
use crate::error::HarnessError;
use crate::report::RunReport;
use crate::vectors::{GoldenVectorRegistry, INPUTSIZE, STREAMTEST, TESTSIZE, TEST_KEY, TEST_NONCE};

// ============================================================================
// §3.3.0 Stages
// ============================================================================

/// Conformance stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    KeySchedule,
    Keystream,
    StreamContinuation,
    MacOnly,
    /// Bulk encrypt, then bulk decrypt of that ciphertext
    RoundTrip,
    /// Per-byte encrypt, then per-byte decrypt of that ciphertext
    RoundTripBytes,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::KeySchedule,
        Stage::Keystream,
        Stage::StreamContinuation,
        Stage::MacOnly,
        Stage::RoundTrip,
        Stage::RoundTripBytes,
    ];

    /// Stage that must have completed immediately before this one.
    #[must_use]
    pub fn predecessor(self) -> Option<Stage> {
        match self {
            Stage::KeySchedule => None,
            Stage::Keystream => Some(Stage::KeySchedule),
            Stage::StreamContinuation => Some(Stage::Keystream),
            Stage::MacOnly => Some(Stage::StreamContinuation),
            Stage::RoundTrip => Some(Stage::MacOnly),
            Stage::RoundTripBytes => Some(Stage::RoundTrip),
        }
    }
}

/// What later harness phases take from a completed suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConformanceOutcome {
    /// First keystream bytes of the per-byte keystream path
    pub keystream_window: [u8; TESTSIZE],
}

/// Output-window labels of one round trip; both tags report as `final MAC`.
#[derive(Debug, Clone, Copy)]
struct RoundTripLabels {
    encrypt: &'static str,
    decrypt: &'static str,
}

// ============================================================================
// §3.4.0 Suite
// ============================================================================

/// Drives one context through the stages, recording into a run report.
pub struct ConformanceSuite<'a, C: AuthStreamCipher + ?Sized> {
    ctx: &'a mut C,
    completed: Option<Stage>,
    keystream_window: [u8; TESTSIZE],
}

impl<'a, C: AuthStreamCipher + ?Sized> ConformanceSuite<'a, C> {
    pub fn new(ctx: &'a mut C) -> Self {
        Self { ctx, completed: None, keystream_window: [0; TESTSIZE] }
    }

    /// Last stage that completed.
    #[must_use]
    pub fn completed(&self) -> Option<Stage> {
        self.completed
    }

    /* §3.4.1 enter / leave: ordering guard */
    fn enter(&self, stage: Stage) -> Result<(), HarnessError> {
        if stage.predecessor() != self.completed {
            return Err(HarnessError::StageOrder {
                stage,
                expected: stage.predecessor(),
                found: self.completed,
            });
        }
        tracing::debug!(?stage, "entering stage");
        Ok(())
    }

    fn leave(&mut self, stage: Stage) {
        self.completed = Some(stage);
        tracing::debug!(?stage, "stage complete");
    }

    /* §3.4.2 key schedule */
    pub fn key_schedule(&mut self) -> Result<(), HarnessError> {
        self.enter(Stage::KeySchedule)?;
        self.ctx.key(TEST_KEY);
        self.leave(Stage::KeySchedule);
        Ok(())
    }

    /* §3.4.3 keystream: bulk vs single bytes */
    pub fn keystream(&mut self, report: &mut RunReport) -> Result<(), HarnessError> {
        self.enter(Stage::Keystream)?;
        let eq = check_equivalent(
            &mut *self.ctx,
            OpFamily::Keystream,
            &[0u8; INPUTSIZE],
            |c| c.nonce(&TEST_NONCE),
            &Expectation { output: Some(OutputWindow { offset: 0, vector: "testout" }), tag: None },
            Labels { bulk: "one chunk", incremental: "single bytes", tag: "" },
            report,
        )?;
        self.keystream_window.copy_from_slice(&eq.incremental.output[..TESTSIZE]);
        self.leave(Stage::Keystream);
        Ok(())
    }

    /* §3.4.4 continuation: far stream position */
    pub fn stream_continuation(&mut self, report: &mut RunReport) -> Result<(), HarnessError> {
        self.enter(Stage::StreamContinuation)?;
        let mut big = vec![0u8; STREAMTEST];
        self.ctx.stream(&mut big);
        let vector = GoldenVectorRegistry::get("streamout")?;
        let offset = STREAMTEST - INPUTSIZE;
        report.record(vector.compare("STREAMTEST", &big[offset..])?);
        self.leave(Stage::StreamContinuation);
        Ok(())
    }

    /* §3.4.5 mac only */
    pub fn mac_only(&mut self, report: &mut RunReport) -> Result<(), HarnessError> {
        self.enter(Stage::MacOnly)?;
        check_equivalent(
            &mut *self.ctx,
            OpFamily::MacOnly,
            &[0u8; INPUTSIZE],
            |c| c.nonce(&TEST_NONCE),
            &Expectation { output: None, tag: Some("macout") },
            Labels { bulk: "MAC test", incremental: "MAC bytes", tag: "final MAC" },
            report,
        )?;
        self.leave(Stage::MacOnly);
        Ok(())
    }

    /* §3.4.6 round trips: encrypt, then decrypt that ciphertext */
    fn round_trip_path(
        &mut self,
        chunking: Chunking,
        labels: RoundTripLabels,
        report: &mut RunReport,
    ) -> Result<(), HarnessError> {
        self.ctx.nonce(&TEST_NONCE);
        let encrypted = check_path(
            &mut *self.ctx,
            OpFamily::Encrypt,
            &[0u8; INPUTSIZE],
            chunking,
            &Expectation {
                output: Some(OutputWindow { offset: 0, vector: "testout" }),
                tag: Some("macout"),
            },
            labels.encrypt,
            "final MAC",
            report,
        )?;
        self.ctx.nonce(&TEST_NONCE);
        check_path(
            &mut *self.ctx,
            OpFamily::Decrypt,
            &encrypted.output,
            chunking,
            &Expectation {
                output: Some(OutputWindow { offset: 0, vector: "zeros" }),
                tag: Some("macout"),
            },
            labels.decrypt,
            "final MAC",
            report,
        )?;
        Ok(())
    }

    pub fn round_trip(&mut self, report: &mut RunReport) -> Result<(), HarnessError> {
        self.enter(Stage::RoundTrip)?;
        let labels = RoundTripLabels { encrypt: "MAC+enc test", decrypt: "MAC+dec test" };
        self.round_trip_path(Chunking::Bulk, labels, report)?;
        self.leave(Stage::RoundTrip);
        Ok(())
    }

    pub fn round_trip_bytes(&mut self, report: &mut RunReport) -> Result<(), HarnessError> {
        self.enter(Stage::RoundTripBytes)?;
        let labels = RoundTripLabels { encrypt: "M+e bytes", decrypt: "M+d bytes" };
        self.round_trip_path(Chunking::PerByte, labels, report)?;
        self.leave(Stage::RoundTripBytes);
        Ok(())
    }

    /// Runs every stage in order.
    pub fn run(mut self, report: &mut RunReport) -> Result<ConformanceOutcome, HarnessError> {
        self.key_schedule()?;
        self.keystream(report)?;
        self.stream_continuation(report)?;
        self.mac_only(report)?;
        self.round_trip(report)?;
        self.round_trip_bytes(report)?;
        Ok(ConformanceOutcome { keystream_window: self.keystream_window })
    }
}
