//! Feedback-driven operation sequencing.
//!
//! Each iteration reads its lengths and operation order from the previous
//! tag, runs the operations over a persistent working buffer, finalises a
//! new tag and re-nonces from it. After 10^6 iterations the final tag covers
//! every path through the mid-word buffering logic.

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;

use crate::cipher::AuthStreamCipher;
use crate::error::HarnessError;
use crate::hexfmt;
use crate::report::RunReport;
use crate::vectors::{GoldenVectorRegistry, FEEDBACK_ITERATIONS, TESTSIZE, TEST_KEY};

/// Working buffer size; covers the largest pair of disjoint prefixes (255 + 255).
pub const FEEDBACK_BUFFER_BYTES: usize = 512;
/// Buffer bytes emitted by [`dump_buffer`].
pub const DUMP_BYTES: usize = 510;
/// Shortest tag a step finalises.
const MIN_TAG: usize = 5;

/// State carried between iterations.
#[derive(Clone, PartialEq, Eq)]
pub struct FeedbackState {
    pub buffer: [u8; FEEDBACK_BUFFER_BYTES],
    pub tag: [u8; TESTSIZE],
}

impl FeedbackState {
    #[must_use]
    pub fn zeroed() -> Self {
        Self { buffer: [0; FEEDBACK_BUFFER_BYTES], tag: [0; TESTSIZE] }
    }

    /// BLAKE3 fingerprint of the working buffer.
    #[must_use]
    pub fn buffer_digest(&self) -> blake3::Hash {
        blake3::hash(&self.buffer)
    }
}

impl fmt::Debug for FeedbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackState")
            .field("buffer", &self.buffer_digest().to_hex())
            .field("tag", &hex::encode(self.tag))
            .finish()
    }
}

/// Order of the two operations in a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Interleave {
    MacThenEncrypt,
    EncryptThenMac,
    MacThenDecrypt,
    DecryptThenMac,
}

impl Interleave {
    /// Selector from the two low bits.
    #[must_use]
    pub fn from_bits(b: u8) -> Self {
        match b & 0b11 {
            0 => Interleave::MacThenEncrypt,
            1 => Interleave::EncryptThenMac,
            2 => Interleave::MacThenDecrypt,
            _ => Interleave::DecryptThenMac,
        }
    }

    fn mac_first(self) -> bool {
        matches!(self, Interleave::MacThenEncrypt | Interleave::MacThenDecrypt)
    }

    fn decrypts(self) -> bool {
        matches!(self, Interleave::MacThenDecrypt | Interleave::DecryptThenMac)
    }
}

/// Lengths and ordering derived from a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Step {
    /// Tag bytes finalised this step (5..=20)
    pub tag_len: usize,
    /// Bytes encrypted or decrypted
    pub cipher_len: usize,
    /// Bytes authenticated only
    pub mac_len: usize,
    pub interleave: Interleave,
}

impl Step {
    #[must_use]
    pub fn derive(tag: &[u8; TESTSIZE]) -> Self {
        Self {
            tag_len: MIN_TAG + usize::from(tag[0] % 16),
            cipher_len: usize::from(tag[1]),
            mac_len: usize::from(tag[2]),
            interleave: Interleave::from_bits(tag[3]),
        }
    }

    fn apply<C: AuthStreamCipher + ?Sized>(&self, ctx: &mut C, buffer: &mut [u8]) {
        let (first, second) = if self.interleave.mac_first() {
            (self.mac_len, self.cipher_len)
        } else {
            (self.cipher_len, self.mac_len)
        };
        let (head, rest) = buffer.split_at_mut(first);
        let tail = &mut rest[..second];

        let cipher = |ctx: &mut C, buf: &mut [u8]| {
            if self.interleave.decrypts() {
                ctx.decrypt(buf);
            } else {
                ctx.encrypt(buf);
            }
        };
        if self.interleave.mac_first() {
            ctx.mac_only(head);
            cipher(ctx, tail);
        } else {
            cipher(&mut *ctx, head);
            ctx.mac_only(tail);
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = if self.interleave.decrypts() { "dec" } else { "enc" };
        if self.interleave.mac_first() {
            write!(f, "mac {:3} then {op} {:3}, tag {:2}", self.mac_len, self.cipher_len, self.tag_len)
        } else {
            write!(f, "{op} {:3} then mac {:3}, tag {:2}", self.cipher_len, self.mac_len, self.tag_len)
        }
    }
}

/// One iteration as seen by an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// 1-based iteration number
    pub iteration: usize,
    pub step: Step,
    pub tag: [u8; TESTSIZE],
}

/// Advances the state by one step.
pub fn transition<C: AuthStreamCipher + ?Sized>(
    ctx: &mut C,
    mut state: FeedbackState,
    iteration: usize,
) -> (FeedbackState, Observation) {
    let step = Step::derive(&state.tag);
    step.apply(ctx, &mut state.buffer);
    ctx.finish(&mut state.tag[..step.tag_len]);
    ctx.nonce(&state.tag);
    let observation = Observation { iteration, step, tag: state.tag };
    (state, observation)
}

/// Keys with the test key (no nonce) and runs `iterations` steps from a
/// zeroed state.
pub fn run<C, O>(ctx: &mut C, iterations: usize, mut observer: O) -> FeedbackState
where
    C: AuthStreamCipher + ?Sized,
    O: FnMut(&Observation),
{
    ctx.key(TEST_KEY);
    let mut state = FeedbackState::zeroed();
    for i in 1..=iterations {
        let (next, obs) = transition(ctx, state, i);
        observer(&obs);
        state = next;
    }
    state
}

/// Runs the engine and checks the final tag against `hellmac` when run for
/// the recorded count.
pub fn run_checked<C, O>(
    ctx: &mut C,
    iterations: usize,
    report: &mut RunReport,
    observer: O,
) -> Result<FeedbackState, HarnessError>
where
    C: AuthStreamCipher + ?Sized,
    O: FnMut(&Observation),
{
    let state = run(ctx, iterations, observer);
    if iterations == FEEDBACK_ITERATIONS {
        report.record(GoldenVectorRegistry::get("hellmac")?.compare("hell MAC", &state.tag)?);
    } else {
        report.note(format!(
            "feedback: {iterations} iterations (golden hellmac needs {FEEDBACK_ITERATIONS}), got {}",
            hex::encode(state.tag)
        ));
    }
    report.note(format!("feedback buffer blake3 {}", state.buffer_digest().to_hex()));
    Ok(state)
}

/// Writes the first [`DUMP_BYTES`] buffer bytes, 16 per line.
pub fn dump_buffer<W: Write + ?Sized>(w: &mut W, state: &FeedbackState) -> io::Result<()> {
    hexfmt::write_bulk(w, &state.buffer[..DUMP_BYTES])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shannon::ShannonCipher;

    #[test]
    fn step_derivation() {
        let mut tag = [0u8; TESTSIZE];
        tag[..4].copy_from_slice(&[0x1f, 0xff, 0x03, 0x06]);
        let step = Step::derive(&tag);
        assert_eq!(step.tag_len, 20);
        assert_eq!(step.cipher_len, 255);
        assert_eq!(step.mac_len, 3);
        assert_eq!(step.interleave, Interleave::MacThenDecrypt);
        assert_eq!(Step::derive(&[0; TESTSIZE]).tag_len, 5);
    }

    #[test]
    fn first_step_from_zero_state() {
        let mut ctx = ShannonCipher::new(&[]);
        let state = run(&mut ctx, 1, |_| {});
        let mut want = [0u8; TESTSIZE];
        want[..5].copy_from_slice(&[0x0c, 0x23, 0x75, 0xd6, 0x96]);
        assert_eq!(state.tag, want);
        assert_eq!(state.buffer, [0u8; FEEDBACK_BUFFER_BYTES]);
    }

    #[test]
    fn frozen_tags() {
        let cases: [(usize, &str); 2] = [
            (10, "8c1b15bfc2acc76ea70982f7a91f24855c919875"),
            (1000, "46ac8deaeaf8433be0469353f4cc0c28257fe5a3"),
        ];
        for (n, want) in cases {
            let mut ctx = ShannonCipher::new(&[]);
            assert_eq!(hex::encode(run(&mut ctx, n, |_| {}).tag), want, "n = {n}");
        }
    }

    #[test]
    fn transition_is_deterministic() {
        let mut a = ShannonCipher::new(TEST_KEY);
        let mut b = ShannonCipher::new(TEST_KEY);
        let mut start = FeedbackState::zeroed();
        start.tag[..4].copy_from_slice(&[3, 40, 17, 1]);
        let (sa, oa) = transition(&mut a, start.clone(), 1);
        let (sb, ob) = transition(&mut b, start, 1);
        assert_eq!(sa, sb);
        assert_eq!(oa, ob);
        assert_eq!(oa.step.interleave, Interleave::EncryptThenMac);
    }

    #[test]
    fn observer_sees_every_iteration() {
        let mut ctx = ShannonCipher::new(&[]);
        let mut seen = 0;
        let state = run(&mut ctx, 25, |o| {
            seen += 1;
            assert_eq!(o.iteration, seen);
        });
        assert_eq!(seen, 25);
        let _ = state;
    }

    #[test]
    fn short_run_notes_tag_and_digest() {
        let mut ctx = ShannonCipher::new(&[]);
        let mut report = RunReport::new();
        let state = run_checked(&mut ctx, 10, &mut report, |_| {}).unwrap();
        assert!(report.checks.is_empty());
        assert_eq!(report.notes.len(), 2);
        assert!(report.notes[1].contains(state.buffer_digest().to_hex().as_str()));
    }

    #[test]
    fn dump_is_510_bytes() {
        let mut out = Vec::new();
        dump_buffer(&mut out, &FeedbackState::zeroed()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.split_whitespace().count(), DUMP_BYTES);
        assert_eq!(text.lines().count(), 32);
    }
}
