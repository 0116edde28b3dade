//! Golden-vector conformance, iterated stress and throughput harness for
//! authenticated stream ciphers, with the Shannon cipher as the reference
//! primitive.
//!
//! ```no_run
//! use shannon_harness::{run_test, HarnessConfig, ShannonCipher, Silent, TestMode};
//!
//! let mut ctx = ShannonCipher::new(&[]);
//! let run = run_test(&mut ctx, &HarnessConfig::default(), TestMode::Full, &mut Silent)?;
//! std::process::exit(run.report.exit_code());
//! # Ok::<(), shannon_harness::HarnessError>(())
//! ```

pub mod bench;
pub mod cipher;
pub mod config;
pub mod conformance;
pub mod equivalence;
pub mod error;
pub mod feedback;
pub mod harness;
pub mod hexfmt;
pub mod logging;
pub mod report;
pub mod shannon;
pub mod stress;
pub mod vectors;

pub use cipher::{AuthStreamCipher, Chunking, OpFamily};
pub use config::{BenchConfig, HarnessConfig};
pub use error::HarnessError;
pub use harness::{run_test, write_keystream, RunObserver, Silent, TestMode, TestRun};
pub use report::{CheckReport, Mismatch, RunReport};
pub use shannon::ShannonCipher;
