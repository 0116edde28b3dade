//! Bulk versus byte-at-a-time equivalence.
//!
//! One operation runs twice from the same starting state: once as a single
//! call, once as one call per byte. Each path's output window and optional
//! finalised tag are compared against golden vectors.

use crate::cipher::{AuthStreamCipher, Chunking, OpFamily};
use crate::error::HarnessError;
use crate::report::RunReport;
use crate::vectors::{GoldenVectorRegistry, TESTSIZE};

/// Golden comparison applied to the transformed buffer.
#[derive(Debug, Clone, Copy)]
pub struct OutputWindow {
    /// First compared byte
    pub offset: usize,
    /// Golden vector name; its length sets the window size
    pub vector: &'static str,
}

/// What each path is checked against.
#[derive(Debug, Clone, Copy, Default)]
pub struct Expectation {
    pub output: Option<OutputWindow>,
    /// Tag vector; when set, `TESTSIZE` tag bytes are finalised after the op
    pub tag: Option<&'static str>,
}

/// Report labels for the two paths and the tag check. When no output window
/// is expected the tag is reported under the path label instead.
#[derive(Debug, Clone, Copy)]
pub struct Labels {
    pub bulk: &'static str,
    pub incremental: &'static str,
    pub tag: &'static str,
}

/// Buffer and tag one path produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOutcome {
    pub output: Vec<u8>,
    pub tag: Option<[u8; TESTSIZE]>,
}

/// Both paths' results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equivalence {
    pub bulk: PathOutcome,
    pub incremental: PathOutcome,
}

impl Equivalence {
    /// Whether the two paths agree with each other, independent of any vector.
    #[must_use]
    pub fn paths_agree(&self) -> bool {
        self.bulk == self.incremental
    }
}

/// Runs `op` over `input` in bulk and then per byte, calling `rewind` before
/// each path. The context is left where the per-byte path left it.
pub fn check_equivalent<C, F>(
    ctx: &mut C,
    op: OpFamily,
    input: &[u8],
    mut rewind: F,
    expect: &Expectation,
    labels: Labels,
    report: &mut RunReport,
) -> Result<Equivalence, HarnessError>
where
    C: AuthStreamCipher + ?Sized,
    F: FnMut(&mut C),
{
    rewind(ctx);
    let bulk = check_path(ctx, op, input, Chunking::Bulk, expect, labels.bulk, labels.tag, report)?;
    rewind(ctx);
    let incremental = check_path(
        ctx,
        op,
        input,
        Chunking::PerByte,
        expect,
        labels.incremental,
        labels.tag,
        report,
    )?;
    Ok(Equivalence { bulk, incremental })
}

/// Runs `op` over a copy of `input` with one chunking and checks it against
/// `expect`. The caller positions the context first.
#[allow(clippy::too_many_arguments)]
pub fn check_path<C: AuthStreamCipher + ?Sized>(
    ctx: &mut C,
    op: OpFamily,
    input: &[u8],
    chunking: Chunking,
    expect: &Expectation,
    label: &str,
    tag_label: &str,
    report: &mut RunReport,
) -> Result<PathOutcome, HarnessError> {
    let mut output = input.to_vec();
    op.apply_chunked(ctx, &mut output, chunking);

    if let Some(window) = expect.output {
        let vector = GoldenVectorRegistry::get(window.vector)?;
        let end = window.offset + vector.length;
        let slice = output.get(window.offset..end).ok_or(HarnessError::Window {
            offset: window.offset,
            len: vector.length,
            available: output.len(),
        })?;
        report.record(vector.compare(label, slice)?);
    }

    let tag = match expect.tag {
        Some(name) => {
            let vector = GoldenVectorRegistry::get(name)?;
            let mut tag = [0u8; TESTSIZE];
            ctx.finish(&mut tag);
            // a tag-only check is reported under the path's own label
            let tag_label = if expect.output.is_some() { tag_label } else { label };
            report.record(vector.compare(tag_label, &tag)?);
            Some(tag)
        }
        None => None,
    };

    Ok(PathOutcome { output, tag })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shannon::ShannonCipher;
    use crate::vectors::{INPUTSIZE, TEST_KEY, TEST_NONCE};

    const LABELS: Labels = Labels { bulk: "bulk", incremental: "bytes", tag: "tag" };

    /// Passes bulk calls through and corrupts every single-byte keystream call.
    struct FlakyCipher(ShannonCipher);

    impl AuthStreamCipher for FlakyCipher {
        fn key(&mut self, key: &[u8]) {
            self.0.key(key);
        }
        fn nonce(&mut self, nonce: &[u8]) {
            self.0.nonce(nonce);
        }
        fn stream(&mut self, buf: &mut [u8]) {
            self.0.stream(buf);
            if buf.len() == 1 {
                buf[0] ^= 0x80;
            }
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

    fn keystream_expectation() -> Expectation {
        Expectation {
            output: Some(OutputWindow { offset: 0, vector: "testout" }),
            tag: None,
        }
    }

    #[test]
    fn reference_cipher_passes_keystream_check() {
        let mut ctx = ShannonCipher::new(TEST_KEY);
        let mut report = RunReport::new();
        let eq = check_equivalent(
            &mut ctx,
            OpFamily::Keystream,
            &[0u8; INPUTSIZE],
            |c| c.nonce(&TEST_NONCE),
            &keystream_expectation(),
            LABELS,
            &mut report,
        )
        .unwrap();
        assert!(eq.paths_agree());
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.mismatch_count(), 0);
    }

    #[test]
    fn per_byte_divergence_is_counted_not_fatal() {
        let mut ctx = FlakyCipher(ShannonCipher::new(TEST_KEY));
        let mut report = RunReport::new();
        let eq = check_equivalent(
            &mut ctx,
            OpFamily::Keystream,
            &[0u8; INPUTSIZE],
            |c| c.nonce(&TEST_NONCE),
            &keystream_expectation(),
            LABELS,
            &mut report,
        )
        .unwrap();
        assert!(!eq.paths_agree());
        assert!(report.checks[0].passed());
        assert_eq!(report.checks[1].mismatch_count(), TESTSIZE);
        assert_eq!(report.mismatch_count(), TESTSIZE);
    }

    #[test]
    fn tag_is_checked_on_both_paths() {
        let mut ctx = ShannonCipher::new(TEST_KEY);
        let mut report = RunReport::new();
        let eq = check_equivalent(
            &mut ctx,
            OpFamily::MacOnly,
            &[0u8; INPUTSIZE],
            |c| c.nonce(&TEST_NONCE),
            &Expectation { output: None, tag: Some("macout") },
            LABELS,
            &mut report,
        )
        .unwrap();
        assert_eq!(eq.bulk.tag, eq.incremental.tag);
        assert_eq!(report.checks.len(), 2);
        assert!(report.passed());
    }

    #[test]
    fn single_path_records_output_then_tag() {
        let mut ctx = ShannonCipher::new(TEST_KEY);
        ctx.nonce(&TEST_NONCE);
        let mut report = RunReport::new();
        let path = check_path(
            &mut ctx,
            OpFamily::Encrypt,
            &[0u8; INPUTSIZE],
            Chunking::PerByte,
            &Expectation {
                output: Some(OutputWindow { offset: 0, vector: "testout" }),
                tag: Some("macout"),
            },
            "enc",
            "tag",
            &mut report,
        )
        .unwrap();
        let labels: Vec<&str> = report.checks.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["enc", "tag"]);
        assert!(report.passed());
        assert_eq!(path.output.len(), INPUTSIZE);
    }

    #[test]
    fn window_past_output_is_an_error() {
        let mut ctx = ShannonCipher::new(TEST_KEY);
        let mut report = RunReport::new();
        let err = check_equivalent(
            &mut ctx,
            OpFamily::Keystream,
            &[0u8; 10],
            |c| c.nonce(&TEST_NONCE),
            &keystream_expectation(),
            LABELS,
            &mut report,
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Window { offset: 0, len: 20, available: 10 }));
    }
}
