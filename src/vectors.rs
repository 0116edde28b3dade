//! §2.1.0 Golden vectors
//! - Expected outputs recorded from the reference implementation
//! - Looked up by name; each decodes to exactly its declared length

// ============================================================================
// §2.2.0 Imports & Constants
// ============================================================================
use crate::error::HarnessError;
use crate::report::CheckReport;

/// Bytes compared per golden check.
pub const TESTSIZE: usize = 20;
/// Length of the chunked conformance inputs.
pub const INPUTSIZE: usize = 100;
/// Absolute stream position checked by the continuation stage.
pub const STREAMTEST: usize = 1_000_000;
/// Iterations the stress-loop vectors were recorded with.
pub const ITERATIONS: usize = 999_999;
/// Iterations the feedback vector was recorded with.
pub const FEEDBACK_ITERATIONS: usize = ITERATIONS + 1;

/// Key used by every golden scenario.
pub const TEST_KEY: &[u8] = b"test key 128bits";
/// Nonce used by the conformance stages.
pub const TEST_NONCE: [u8; 4] = [0; 4];
/// First saved register word under the test key when words load with the
/// wrong byte order.
pub const SWAPPED_REGISTER_WORD: u32 = 0x55bf_8df5;

// ============================================================================
// §2.3.0 TestVector
// ============================================================================

/// Named expected byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestVector {
    /// Registry key
    pub name: &'static str,
    /// Space-separated two-digit hex
    pub expected_hex: &'static str,
    /// Declared byte length
    pub length: usize,
}

impl TestVector {
    /// Decodes the expected bytes, checking the declared length.
    pub fn bytes(&self) -> Result<Vec<u8>, HarnessError> {
        let compact: String = self.expected_hex.split_whitespace().collect();
        let out = hex::decode(compact)?;
        if out.len() != self.length {
            return Err(HarnessError::VectorLength {
                name: self.name,
                declared: self.length,
                found: out.len(),
            });
        }
        Ok(out)
    }

    /// Compares the first `length` bytes of `actual` byte by byte.
    ///
    /// Fails structurally only if `actual` is too short; differing bytes are
    /// recorded in the returned report.
    pub fn compare(&self, label: &str, actual: &[u8]) -> Result<CheckReport, HarnessError> {
        let expected = self.bytes()?;
        let window = actual.get(..self.length).ok_or(HarnessError::Window {
            offset: 0,
            len: self.length,
            available: actual.len(),
        })?;
        Ok(CheckReport::compare(label, self.name, &expected, window))
    }
}

// ============================================================================
// §2.4.0 Registry
// ============================================================================

static VECTORS: [TestVector; 7] = [
    TestVector {
        name: "testout",
        expected_hex: "4d 7e d3 9c b6 95 d9 6a cf 52 97 70 ec 7d cc be ae 2b 6f 8c",
        length: TESTSIZE,
    },
    TestVector {
        name: "streamout",
        expected_hex: "27 01 9f c8 84 bb 09 05 ea 08 c9 b5 5f 20 7b 5d 34 80 b4 a3",
        length: TESTSIZE,
    },
    TestVector {
        name: "macout",
        expected_hex: "00 13 88 e9 6b a7 8e 74 4e b0 b0 30 44 25 c0 90 36 dc 80 1a",
        length: TESTSIZE,
    },
    TestVector {
        name: "zeros",
        expected_hex: "00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00",
        length: TESTSIZE,
    },
    TestVector {
        name: "iterout",
        expected_hex: "4e 00 9e 3f 99 3e 3a 1e b9 cb 28 11 a2 e9 09 69 a8 9e 1e f3",
        length: TESTSIZE,
    },
    TestVector {
        name: "nonceout",
        expected_hex: "ca a7 23 3e 5c c1 67 64 3a 11 62 25 71 6e 75 28 18 c1 d6 4f",
        length: TESTSIZE,
    },
    TestVector {
        name: "hellmac",
        expected_hex: "2c ac f6 55 bc 33 09 b5 d3 9b 82 7e 27 fa cf 97 de 83 0f e1",
        length: TESTSIZE,
    },
];

/// Immutable name to vector lookup.
pub struct GoldenVectorRegistry;

impl GoldenVectorRegistry {
    /// Vector registered under `name`.
    pub fn get(name: &str) -> Result<&'static TestVector, HarnessError> {
        VECTORS
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| HarnessError::UnknownVector(name.to_owned()))
    }

    /// Every registered vector.
    #[must_use]
    pub fn all() -> &'static [TestVector] {
        &VECTORS
    }
}
