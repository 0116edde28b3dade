//! §1.1.0 Overview - Shannon reference primitive
//! - 16-word nonlinear feedback register + 16-word CRC accumulator
//! - Key and nonce loading share one folding routine
//! - Keystream / MAC-only / encrypt / decrypt continue mid-word across calls
//! - Tag finalisation leaves the context usable

/* =============================================================================
 * SHN - shannon.rs - Program v1.0.0
 * Numbering: Program=1.0.0, Sections=§1.X.0, Subsections=§1.X.Y
 * =============================================================================
 */

// ============================================================================
// §1.2.0 Imports & Constants
// ============================================================================
use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::cipher::AuthStreamCipher;

/// Register length in 32-bit words.
pub const N: usize = 16;
/// Cycles used to diffuse key, nonce and MAC state.
const FOLD: usize = N;
/// Starting value of the nonlinear constant before key/nonce loading.
pub const INITKONST: u32 = 0x6996_c53a;
/// Register word that absorbs key material and MAC input.
const KEYP: usize = 13;

// ============================================================================
// §1.3.0 Word Helpers
// ============================================================================

/* §1.3.1 sbox1: nonlinear feedback */
#[inline(always)]
fn sbox1(mut w: u32) -> u32 {
    w ^= w.rotate_left(5) | w.rotate_left(7);
    w ^= w.rotate_left(19) | w.rotate_left(22);
    w
}

/* §1.3.2 sbox2: output filter */
#[inline(always)]
fn sbox2(mut w: u32) -> u32 {
    w ^= w.rotate_left(7) | w.rotate_left(22);
    w ^= w.rotate_left(5) | w.rotate_left(19);
    w
}

/* §1.3.3 le_word: 4 bytes little-endian */
#[inline(always)]
fn le_word(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

// ============================================================================
// §1.4.0 Context
// ============================================================================

/// Shannon cipher context.
///
/// `nbuf` counts the bits of the current keystream word (`sbuf`) still
/// unused; while it is non-zero the partial MAC word lives in `mbuf`.
#[derive(Clone)]
pub struct ShannonCipher {
    r: [u32; N],
    crc: [u32; N],
    init_r: [u32; N],
    konst: u32,
    sbuf: u32,
    mbuf: u32,
    nbuf: u32,
}

impl ShannonCipher {
    /// Creates a context keyed with `key`.
    #[must_use]
    pub fn new(key: &[u8]) -> Self {
        let mut c = Self {
            r: [0; N],
            crc: [0; N],
            init_r: [0; N],
            konst: 0,
            sbuf: 0,
            mbuf: 0,
            nbuf: 0,
        };
        c.key(key);
        c
    }

    /// Register saved after the key schedule, reloaded by every nonce call.
    #[must_use]
    pub fn initial_register(&self) -> &[u32; N] {
        &self.init_r
    }

    /// Copy of the observable state, for debugging and equivalence tests.
    #[must_use]
    pub fn snapshot(&self) -> RegisterSnapshot {
        RegisterSnapshot {
            r: self.r,
            crc: self.crc,
            konst: self.konst,
            sbuf: self.sbuf,
            mbuf: self.mbuf,
            nbuf: self.nbuf,
        }
    }

    /// Finalises `expected.len()` tag bytes and compares them in constant time.
    ///
    /// For library callers that receive a tag alongside ciphertext. The
    /// harness itself reports tags byte by byte and does not use it.
    ///
    /// ```
    /// use shannon_harness::{AuthStreamCipher, ShannonCipher};
    ///
    /// let mut sender = ShannonCipher::new(b"test key 128bits");
    /// sender.nonce(&[0; 4]);
    /// let mut packet = *b"attack at dawn";
    /// sender.encrypt(&mut packet);
    /// let mut tag = [0u8; 16];
    /// sender.finish(&mut tag);
    ///
    /// let mut receiver = ShannonCipher::new(b"test key 128bits");
    /// receiver.nonce(&[0; 4]);
    /// receiver.decrypt(&mut packet);
    /// assert!(receiver.verify_tag(&tag));
    /// assert_eq!(&packet, b"attack at dawn");
    /// ```
    #[must_use]
    pub fn verify_tag(&mut self, expected: &[u8]) -> bool {
        let mut tag = vec![0u8; expected.len()];
        self.finish(&mut tag);
        let ok: bool = tag.ct_eq(expected).into();
        tag.zeroize();
        ok
    }

    /* §1.4.1 cycle: one register step, refreshes sbuf */
    #[inline(always)]
    fn cycle(&mut self) {
        let mut t = self.r[12] ^ self.r[13] ^ self.konst;
        t = sbox1(t) ^ self.r[0].rotate_left(1);
        self.r.copy_within(1.., 0);
        self.r[N - 1] = t;
        t = sbox2(self.r[2] ^ self.r[15]);
        self.r[0] ^= t;
        self.sbuf = t ^ self.r[8] ^ self.r[12];
    }

    /* §1.4.2 crc_func: accumulate one MAC word */
    #[inline(always)]
    fn crc_func(&mut self, i: u32) {
        let t = self.crc[0] ^ self.crc[2] ^ self.crc[15] ^ i;
        self.crc.copy_within(1.., 0);
        self.crc[N - 1] = t;
    }

    /* §1.4.3 mac_func: CRC + register feedback */
    #[inline(always)]
    fn mac_func(&mut self, i: u32) {
        self.crc_func(i);
        self.r[KEYP] ^= i;
    }

    /* §1.4.4 init_state: Fibonacci register */
    fn init_state(&mut self) {
        self.r[0] = 1;
        self.r[1] = 1;
        for i in 2..N {
            self.r[i] = self.r[i - 1].wrapping_add(self.r[i - 2]);
        }
        self.konst = INITKONST;
    }

    fn diffuse(&mut self) {
        for _ in 0..FOLD {
            self.cycle();
        }
    }

    /* §1.4.5 load_key: fold bytes + length, then make it irreversible */
    fn load_key(&mut self, key: &[u8]) {
        let mut words = key.chunks_exact(4);
        for w in &mut words {
            self.r[KEYP] ^= le_word(w);
            self.cycle();
        }
        let tail = words.remainder();
        if !tail.is_empty() {
            let mut xtra = [0u8; 4];
            xtra[..tail.len()].copy_from_slice(tail);
            self.r[KEYP] ^= u32::from_le_bytes(xtra);
            self.cycle();
        }
        self.r[KEYP] ^= key.len() as u32;
        self.cycle();

        self.crc = self.r;
        self.diffuse();
        for (r, c) in self.r.iter_mut().zip(self.crc.iter()) {
            *r ^= *c;
        }
    }
}

// ============================================================================
// §1.5.0 Operation Set
// ============================================================================
impl AuthStreamCipher for ShannonCipher {
    /* §1.5.1 key */
    fn key(&mut self, key: &[u8]) {
        self.init_state();
        self.load_key(key);
        self.konst = self.r[0];
        self.init_r = self.r;
        self.nbuf = 0;
    }

    /* §1.5.2 nonce */
    fn nonce(&mut self, nonce: &[u8]) {
        self.r = self.init_r;
        self.konst = INITKONST;
        self.load_key(nonce);
        self.konst = self.r[0];
        self.nbuf = 0;
    }

    /* §1.5.3 stream: XOR keystream into buf */
    fn stream(&mut self, buf: &mut [u8]) {
        let mut i = 0;
        while self.nbuf != 0 && i < buf.len() {
            buf[i] ^= self.sbuf as u8;
            self.sbuf >>= 8;
            self.nbuf -= 8;
            i += 1;
        }

        let mut words = buf[i..].chunks_exact_mut(4);
        for w in &mut words {
            self.cycle();
            for (b, k) in w.iter_mut().zip(self.sbuf.to_le_bytes()) {
                *b ^= k;
            }
        }

        let tail = words.into_remainder();
        if !tail.is_empty() {
            self.cycle();
            self.nbuf = 32;
            for b in tail {
                *b ^= self.sbuf as u8;
                self.sbuf >>= 8;
                self.nbuf -= 8;
            }
        }
    }

    /* §1.5.4 mac_only */
    fn mac_only(&mut self, buf: &[u8]) {
        let mut i = 0;
        if self.nbuf != 0 {
            while self.nbuf != 0 && i < buf.len() {
                self.mbuf ^= u32::from(buf[i]) << (32 - self.nbuf);
                self.nbuf -= 8;
                i += 1;
            }
            if self.nbuf != 0 {
                return;
            }
            // register already cycled for this word
            self.mac_func(self.mbuf);
        }

        let mut words = buf[i..].chunks_exact(4);
        for w in &mut words {
            self.cycle();
            self.mac_func(le_word(w));
        }

        let tail = words.remainder();
        if !tail.is_empty() {
            self.cycle();
            self.mbuf = 0;
            self.nbuf = 32;
            for &b in tail {
                self.mbuf ^= u32::from(b) << (32 - self.nbuf);
                self.nbuf -= 8;
            }
        }
    }

    /* §1.5.5 encrypt: MAC the plaintext, then mask */
    fn encrypt(&mut self, buf: &mut [u8]) {
        let mut i = 0;
        if self.nbuf != 0 {
            while self.nbuf != 0 && i < buf.len() {
                self.mbuf ^= u32::from(buf[i]) << (32 - self.nbuf);
                buf[i] ^= (self.sbuf >> (32 - self.nbuf)) as u8;
                self.nbuf -= 8;
                i += 1;
            }
            if self.nbuf != 0 {
                return;
            }
            self.mac_func(self.mbuf);
        }

        let mut words = buf[i..].chunks_exact_mut(4);
        for w in &mut words {
            self.cycle();
            let t = le_word(w);
            self.mac_func(t);
            w.copy_from_slice(&(t ^ self.sbuf).to_le_bytes());
        }

        let tail = words.into_remainder();
        if !tail.is_empty() {
            self.cycle();
            self.mbuf = 0;
            self.nbuf = 32;
            for b in tail {
                self.mbuf ^= u32::from(*b) << (32 - self.nbuf);
                *b ^= (self.sbuf >> (32 - self.nbuf)) as u8;
                self.nbuf -= 8;
            }
        }
    }

    /* §1.5.6 decrypt: unmask, then MAC the plaintext */
    fn decrypt(&mut self, buf: &mut [u8]) {
        let mut i = 0;
        if self.nbuf != 0 {
            while self.nbuf != 0 && i < buf.len() {
                buf[i] ^= (self.sbuf >> (32 - self.nbuf)) as u8;
                self.mbuf ^= u32::from(buf[i]) << (32 - self.nbuf);
                self.nbuf -= 8;
                i += 1;
            }
            if self.nbuf != 0 {
                return;
            }
            self.mac_func(self.mbuf);
        }

        let mut words = buf[i..].chunks_exact_mut(4);
        for w in &mut words {
            self.cycle();
            let t = le_word(w) ^ self.sbuf;
            self.mac_func(t);
            w.copy_from_slice(&t.to_le_bytes());
        }

        let tail = words.into_remainder();
        if !tail.is_empty() {
            self.cycle();
            self.mbuf = 0;
            self.nbuf = 32;
            for b in tail {
                *b ^= (self.sbuf >> (32 - self.nbuf)) as u8;
                self.mbuf ^= u32::from(*b) << (32 - self.nbuf);
                self.nbuf -= 8;
            }
        }
    }

    /* §1.5.7 finish: close the MAC and squeeze tag words */
    fn finish(&mut self, tag: &mut [u8]) {
        if self.nbuf != 0 {
            self.mac_func(self.mbuf);
        }

        // Only the register is perturbed, never the CRC, so no plaintext can
        // reproduce the end-of-input marker.
        self.cycle();
        self.r[KEYP] ^= INITKONST ^ (self.nbuf << 3);
        self.nbuf = 0;

        for (r, c) in self.r.iter_mut().zip(self.crc.iter()) {
            *r ^= *c;
        }
        self.diffuse();

        for out in tag.chunks_mut(4) {
            self.cycle();
            let w = self.sbuf.to_le_bytes();
            out.copy_from_slice(&w[..out.len()]);
        }
    }
}

// ============================================================================
// §1.6.0 Snapshots & Hygiene
// ============================================================================

/// Observable state of a [`ShannonCipher`].
///
/// Equality compares the buffered words only while part of the current word
/// is still pending: once `nbuf` is zero they are overwritten before use, and
/// bulk and byte-at-a-time calls legitimately leave different leftovers.
#[derive(Clone, Copy)]
pub struct RegisterSnapshot {
    /// Nonlinear feedback register
    pub r: [u32; N],
    /// CRC accumulator
    pub crc: [u32; N],
    /// Nonlinear constant
    pub konst: u32,
    /// Current keystream word
    pub sbuf: u32,
    /// Partial MAC word
    pub mbuf: u32,
    /// Unused bits of the current word
    pub nbuf: u32,
}

impl PartialEq for RegisterSnapshot {
    fn eq(&self, other: &Self) -> bool {
        let pending = self.nbuf != 0;
        self.r == other.r
            && self.crc == other.crc
            && self.konst == other.konst
            && self.nbuf == other.nbuf
            && (!pending || (self.sbuf == other.sbuf && self.mbuf == other.mbuf))
    }
}

impl Eq for RegisterSnapshot {}

impl fmt::Debug for RegisterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterSnapshot")
            .field("r", &format_args!("{:08x?}", self.r))
            .field("crc", &format_args!("{:08x?}", self.crc))
            .field("konst", &format_args!("{:08x}", self.konst))
            .field("nbuf", &self.nbuf)
            .finish()
    }
}

impl Drop for ShannonCipher {
    fn drop(&mut self) {
        self.r.zeroize();
        self.crc.zeroize();
        self.init_r.zeroize();
        self.konst.zeroize();
        self.sbuf.zeroize();
        self.mbuf.zeroize();
    }
}

// ============================================================================
// §1.7.0 Tests
// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectors::{TEST_KEY, TEST_NONCE};

    fn keyed() -> ShannonCipher {
        let mut c = ShannonCipher::new(TEST_KEY);
        c.nonce(&TEST_NONCE);
        c
    }

    const TESTOUT: [u8; 20] = [
        0x4d, 0x7e, 0xd3, 0x9c, 0xb6, 0x95, 0xd9, 0x6a, 0xcf, 0x52, 0x97, 0x70, 0xec, 0x7d, 0xcc,
        0xbe, 0xae, 0x2b, 0x6f, 0x8c,
    ];
    const MACOUT: [u8; 20] = [
        0x00, 0x13, 0x88, 0xe9, 0x6b, 0xa7, 0x8e, 0x74, 0x4e, 0xb0, 0xb0, 0x30, 0x44, 0x25, 0xc0,
        0x90, 0x36, 0xdc, 0x80, 0x1a,
    ];

    #[test]
    fn saved_register_is_little_endian_loaded() {
        let c = ShannonCipher::new(TEST_KEY);
        assert_eq!(c.initial_register()[0], 0x4e41_f054);
    }

    #[test]
    fn keystream_matches_reference() {
        let mut c = keyed();
        let mut buf = [0u8; 100];
        c.stream(&mut buf);
        assert_eq!(buf[..20], TESTOUT);
    }

    #[test]
    fn mac_of_zeros_matches_reference() {
        let mut c = keyed();
        c.mac_only(&[0u8; 100]);
        let mut tag = [0u8; 20];
        c.finish(&mut tag);
        assert_eq!(tag, MACOUT);
    }

    #[test]
    fn short_tag_is_prefix_of_full_tag() {
        let mut c = keyed();
        c.mac_only(&[0u8; 100]);
        let mut tag = [0xAAu8; 8];
        c.finish(&mut tag[..5]);
        assert_eq!(tag[..5], MACOUT[..5]);
        // bytes past the requested length are untouched
        assert_eq!(tag[5..], [0xAA; 3]);
    }

    #[test]
    fn empty_key_and_nonce_are_accepted() {
        let mut c = ShannonCipher::new(&[]);
        c.nonce(&[]);
        let mut buf = [0u8; 20];
        c.stream(&mut buf);
        assert_eq!(
            buf,
            [
                0x6e, 0x2d, 0x5c, 0xd5, 0xb8, 0x28, 0x9a, 0x5b, 0x62, 0xb5, 0x67, 0x55, 0x6b, 0x01,
                0xf1, 0x33, 0xe9, 0xe8, 0x91, 0xc0
            ]
        );
    }

    #[test]
    fn mac_then_encrypt_shares_partial_word() {
        let mut c = keyed();
        let mut buf: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
        c.mac_only(&buf[..3]);
        c.encrypt(&mut buf[3..]);
        assert_eq!(buf, [0x00, 0x01, 0x02, 0x9f, 0x90, 0x85, 0xee, 0x4a]);
        let mut tag = [0u8; 20];
        c.finish(&mut tag);
        assert_eq!(
            tag,
            [
                0x51, 0x07, 0x9a, 0x35, 0xa2, 0x06, 0x68, 0xd1, 0x22, 0x66, 0xce, 0x56, 0x1c, 0x01,
                0x30, 0x11, 0x54, 0x87, 0x1d, 0x0f
            ]
        );
    }

    #[test]
    fn encrypt_decrypt_round_trip_with_matching_tags() {
        let plain: Vec<u8> = (0..=255u8).cycle().take(333).collect();
        let mut c = keyed();
        let mut buf = plain.clone();
        c.encrypt(&mut buf);
        let mut enc_tag = [0u8; 16];
        c.finish(&mut enc_tag);
        assert_ne!(buf, plain);

        c.nonce(&TEST_NONCE);
        c.decrypt(&mut buf);
        let mut dec_tag = [0u8; 16];
        c.finish(&mut dec_tag);
        assert_eq!(buf, plain);
        assert_eq!(enc_tag, dec_tag);
    }

    #[test]
    fn verify_tag_accepts_and_rejects() {
        let mut c = keyed();
        c.mac_only(&[0u8; 100]);
        assert!(c.verify_tag(&MACOUT));

        let mut forged = MACOUT;
        forged[7] ^= 0x01;
        c.nonce(&TEST_NONCE);
        c.mac_only(&[0u8; 100]);
        assert!(!c.verify_tag(&forged));
    }

    #[test]
    fn nonce_is_independent_of_history() {
        let mut a = keyed();
        let mut scratch = [0u8; 37];
        a.encrypt(&mut scratch);
        a.nonce(&[9, 9, 9]);
        a.nonce(&TEST_NONCE);
        let b = keyed();
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn snapshot_equality_ignores_spent_words() {
        let mut bulk = keyed();
        let mut per_byte = keyed();
        let mut x = [0u8; 8];
        let mut y = [0u8; 8];
        bulk.stream(&mut x);
        for b in y.chunks_mut(1) {
            per_byte.stream(b);
        }
        assert_eq!(x, y);
        assert_ne!(bulk.sbuf, per_byte.sbuf);
        assert_eq!(bulk.snapshot(), per_byte.snapshot());
    }
}
