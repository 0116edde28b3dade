/* =============================================================================
 * SHN - bench.rs - Program v1.0.0
 * Numbering: Sections §5.X.0, Subsections §5.X.Y (code-only labels)
 * Purpose: Throughput of keystream, packet ops and key/nonce schedules.
 * =============================================================================
*/

// ============================================================================
// §5.1.0 Imports
// ============================================================================
use std::fmt;
use std::hint::black_box;
use std::time::Instant;

use cpu_time::ProcessTime;
use rand::RngCore;
use serde::Serialize;
use zeroize::Zeroize;

use crate::cipher::AuthStreamCipher;
use crate::config::BenchConfig;
use crate::vectors::TEST_KEY;

/// Buffer handed to single-stream calls.
pub const BIGBUF_BYTES: usize = 1 << 20;
/// Key and nonce length for the schedule families.
const SCHEDULE_BYTES: usize = 16;

// ============================================================================
// §5.2.0 Families
// ============================================================================

/// Measured operation families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BenchFamily {
    /// One long keystream in 1 MiB calls
    Stream,
    /// Nonce + keystream per block
    PacketStream,
    /// Nonce + mac-only + tag per block
    PacketMac,
    /// Nonce + encrypt + tag per block
    PacketEncrypt,
    /// Nonce + decrypt + tag per block
    PacketDecrypt,
    /// 128-bit key schedule
    KeySetup,
    /// 128-bit nonce schedule
    NonceSetup,
}

impl BenchFamily {
    pub const ALL: [BenchFamily; 7] = [
        BenchFamily::Stream,
        BenchFamily::PacketStream,
        BenchFamily::PacketMac,
        BenchFamily::PacketEncrypt,
        BenchFamily::PacketDecrypt,
        BenchFamily::KeySetup,
        BenchFamily::NonceSetup,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            BenchFamily::Stream => "keystream",
            BenchFamily::PacketStream => "packet stream",
            BenchFamily::PacketMac => "packet MAC",
            BenchFamily::PacketEncrypt => "packet enc+MAC",
            BenchFamily::PacketDecrypt => "packet dec+MAC",
            BenchFamily::KeySetup => "key setup",
            BenchFamily::NonceSetup => "nonce setup",
        }
    }

    /// Schedule families count operations, the rest count bytes.
    #[must_use]
    pub fn counts_ops(self) -> bool {
        matches!(self, BenchFamily::KeySetup | BenchFamily::NonceSetup)
    }
}

// ============================================================================
// §5.2.5 Clocks
// ============================================================================

/// Elapsed seconds of one timed loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    /// Process CPU seconds
    pub cpu: f64,
    /// Wall-clock seconds
    pub wall: f64,
}

/// Process CPU clock, with wall clock alongside.
struct Stopwatch {
    cpu: ProcessTime,
    wall: Instant,
}

impl Stopwatch {
    fn start() -> Self {
        Self { cpu: ProcessTime::now(), wall: Instant::now() }
    }

    fn stop(&self) -> Timing {
        Timing {
            cpu: self.cpu.elapsed().as_secs_f64(),
            wall: self.wall.elapsed().as_secs_f64(),
        }
    }
}

// ============================================================================
// §5.3.0 Results
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub family: BenchFamily,
    /// Bytes processed (zero for schedule families)
    pub bytes: u64,
    /// Calls timed: blocks, buffers or schedules
    pub ops: u64,
    /// Process CPU time
    pub seconds: f64,
    /// Wall-clock time, for reference
    pub wall_seconds: f64,
    /// MB/s, or million ops/s for schedule families, over CPU time
    pub rate: f64,
}

impl BenchResult {
    fn new(family: BenchFamily, bytes: u64, ops: u64, timing: Timing) -> Self {
        let Timing { cpu: seconds, wall: wall_seconds } = timing;
        let secs = seconds.max(1e-9);
        let rate = if family.counts_ops() {
            ops as f64 / 1e6 / secs
        } else {
            bytes as f64 / 1e6 / secs
        };
        Self { family, bytes, ops, seconds, wall_seconds, rate }
    }
}

impl fmt::Display for BenchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.family.counts_ops() {
            write!(
                f,
                "{:>15}: {} ops in {:.3}s → {:.2} Mops/s",
                self.family.label(),
                self.ops,
                self.seconds,
                self.rate
            )
        } else {
            write!(
                f,
                "{:>15}: {:.2} MB in {:.3}s → {:.2} MB/s",
                self.family.label(),
                self.bytes as f64 / 1e6,
                self.seconds,
                self.rate
            )
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BenchReport {
    pub results: Vec<BenchResult>,
}

// ============================================================================
// §5.4.0 Runner
// ============================================================================

/// Times every family in order.
pub fn run_benchmark<C: AuthStreamCipher + ?Sized>(ctx: &mut C, config: &BenchConfig) -> BenchReport {
    /* §5.4.1 random working buffer */
    let mut bigbuf = vec![0u8; BIGBUF_BYTES];
    rand::thread_rng().fill_bytes(&mut bigbuf);

    let results = BenchFamily::ALL
        .iter()
        .map(|&family| {
            let r = run_family(ctx, family, config, &mut bigbuf);
            tracing::info!(family = family.label(), seconds = r.seconds, rate = r.rate, "bench");
            r
        })
        .collect();

    bigbuf.zeroize();
    BenchReport { results }
}

/// Times one family. `bigbuf` must hold at least one block.
pub fn run_family<C: AuthStreamCipher + ?Sized>(
    ctx: &mut C,
    family: BenchFamily,
    config: &BenchConfig,
    bigbuf: &mut [u8],
) -> BenchResult {
    let block = config.block_size.clamp(1, bigbuf.len());
    let mut tag = vec![0u8; config.mac_size];
    let target = config.stream_bytes as u64;
    ctx.key(TEST_KEY);
    ctx.nonce(&[]);

    match family {
        /* §5.4.2 single stream */
        BenchFamily::Stream => {
            let mut done = 0u64;
            let mut ops = 0u64;
            let t0 = Stopwatch::start();
            while done < target {
                ctx.stream(bigbuf);
                done += bigbuf.len() as u64;
                ops += 1;
            }
            BenchResult::new(family, done, ops, t0.stop())
        }

        /* §5.4.3 per-packet families */
        BenchFamily::PacketStream
        | BenchFamily::PacketMac
        | BenchFamily::PacketEncrypt
        | BenchFamily::PacketDecrypt => {
            let mut done = 0u64;
            let mut ops = 0u64;
            let mut nonce = [0u8; 4];
            let t0 = Stopwatch::start();
            while done < target {
                nonce.copy_from_slice(&(ops as u32).to_le_bytes());
                ctx.nonce(&nonce);
                let buf = &mut bigbuf[..block];
                match family {
                    BenchFamily::PacketStream => ctx.stream(buf),
                    BenchFamily::PacketMac => {
                        ctx.mac_only(buf);
                        ctx.finish(&mut tag);
                    }
                    BenchFamily::PacketEncrypt => {
                        ctx.encrypt(buf);
                        ctx.finish(&mut tag);
                    }
                    _ => {
                        ctx.decrypt(buf);
                        ctx.finish(&mut tag);
                    }
                }
                black_box(&tag);
                done += block as u64;
                ops += 1;
            }
            BenchResult::new(family, done, ops, t0.stop())
        }

        /* §5.4.4 schedules: word 3 of the key/nonce carries the counter */
        BenchFamily::KeySetup | BenchFamily::NonceSetup => {
            let mut k = [0u8; SCHEDULE_BYTES];
            let ops = config.schedule_ops as u64;
            let t0 = Stopwatch::start();
            for i in 0..ops {
                k[12..].copy_from_slice(&(i as u32).to_le_bytes());
                if family == BenchFamily::KeySetup {
                    ctx.key(&k);
                } else {
                    ctx.nonce(&k);
                }
            }
            let timing = t0.stop();
            k.zeroize();
            BenchResult::new(family, 0, ops, timing)
        }
    }
}
