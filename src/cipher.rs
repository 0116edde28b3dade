//! The contract every primitive under test must satisfy.
//!
//! The harness never looks inside a context: it drives one through the seven
//! operations below and compares what comes out. Any type implementing
//! [`AuthStreamCipher`] can be run through the conformance suite, the stress
//! loops and the benchmark; [`ShannonCipher`](crate::shannon::ShannonCipher)
//! is the implementation shipped with the crate.

use serde::Serialize;

/// Stateful authenticated stream cipher driven through a fixed operation set.
///
/// All buffer operations continue from the context's current keystream
/// position. The authentication accumulator absorbs *plaintext* only, so
/// `mac_only(P)`, `encrypt(P)` and `decrypt(encrypt(P))` must finalise to the
/// same tag under the same key and nonce.
pub trait AuthStreamCipher {
    /// Fully resets the context from `key` (any length, including empty).
    /// Any in-progress authentication is discarded.
    fn key(&mut self, key: &[u8]);

    /// Re-derives per-message state from the current key and `nonce`. Resets
    /// the keystream position and the authentication accumulator. The result
    /// must not depend on earlier nonce calls.
    fn nonce(&mut self, nonce: &[u8]);

    /// XORs the next `buf.len()` keystream bytes into `buf`.
    fn stream(&mut self, buf: &mut [u8]);

    /// Folds `buf` into the authentication accumulator.
    fn mac_only(&mut self, buf: &[u8]);

    /// Plaintext to ciphertext in place, authenticating the plaintext.
    fn encrypt(&mut self, buf: &mut [u8]);

    /// Ciphertext to plaintext in place, authenticating the recovered plaintext.
    fn decrypt(&mut self, buf: &mut [u8]);

    /// Writes a `tag.len()`-byte tag derived from the accumulator. The context
    /// stays usable for further calls.
    fn finish(&mut self, tag: &mut [u8]);
}

/// The buffer-consuming operations whose chunking behaviour is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OpFamily {
    /// `stream`
    Keystream,
    /// `mac_only`
    MacOnly,
    /// `encrypt`
    Encrypt,
    /// `decrypt`
    Decrypt,
}

impl OpFamily {
    /// All four families, in the order the conformance suite visits them.
    pub const ALL: [OpFamily; 4] =
        [OpFamily::Keystream, OpFamily::MacOnly, OpFamily::Encrypt, OpFamily::Decrypt];

    /// Applies this operation to `buf` in a single call.
    pub fn apply<C: AuthStreamCipher + ?Sized>(self, ctx: &mut C, buf: &mut [u8]) {
        match self {
            OpFamily::Keystream => ctx.stream(buf),
            OpFamily::MacOnly => ctx.mac_only(buf),
            OpFamily::Encrypt => ctx.encrypt(buf),
            OpFamily::Decrypt => ctx.decrypt(buf),
        }
    }

    /// Applies this operation to `buf` split according to `chunking`.
    pub fn apply_chunked<C: AuthStreamCipher + ?Sized>(
        self,
        ctx: &mut C,
        buf: &mut [u8],
        chunking: Chunking,
    ) {
        match chunking {
            Chunking::Bulk => self.apply(ctx, buf),
            Chunking::PerByte => {
                for b in buf.chunks_mut(1) {
                    self.apply(ctx, b);
                }
            }
            Chunking::Fixed(n) => {
                for c in buf.chunks_mut(n.max(1)) {
                    self.apply(ctx, c);
                }
            }
        }
    }
}

/// How a buffer is split into calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Chunking {
    /// One call over the whole buffer.
    Bulk,
    /// One call per byte.
    PerByte,
    /// Calls of at most `n` bytes (zero is treated as one).
    Fixed(usize),
}
