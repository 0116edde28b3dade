//! Iterated re-key and re-nonce loops.
//!
//! Both loops feed their own output back in as the next key or nonce, so a
//! single wrong bit anywhere in the schedule diverges the final region.

use crate::cipher::AuthStreamCipher;
use crate::error::HarnessError;
use crate::report::RunReport;
use crate::vectors::{GoldenVectorRegistry, ITERATIONS, TESTSIZE, TEST_KEY};

/// Iterations between progress callbacks.
pub const PROGRESS_INTERVAL: usize = 500;

/// Nonce bytes reused from the region each nonce-evolution step.
const NONCE_BYTES: usize = 4;

/// Repeatedly keys from the region, then XORs fresh keystream into it.
pub fn key_evolution<C, P>(
    ctx: &mut C,
    seed: [u8; TESTSIZE],
    iterations: usize,
    mut progress: P,
) -> [u8; TESTSIZE]
where
    C: AuthStreamCipher + ?Sized,
    P: FnMut(usize),
{
    let mut region = seed;
    for i in 1..=iterations {
        ctx.key(&region);
        ctx.stream(&mut region);
        if i % PROGRESS_INTERVAL == 0 {
            progress(i);
        }
    }
    region
}

/// Keys with the test key, fills the region with keystream, then repeatedly
/// re-nonces from its first four bytes and XORs keystream into them.
pub fn nonce_evolution<C, P>(ctx: &mut C, iterations: usize, mut progress: P) -> [u8; TESTSIZE]
where
    C: AuthStreamCipher + ?Sized,
    P: FnMut(usize),
{
    let mut region = [0u8; TESTSIZE];
    ctx.key(TEST_KEY);
    ctx.nonce(&[]);
    ctx.stream(&mut region);
    for i in 1..=iterations {
        let nonce: [u8; NONCE_BYTES] = [region[0], region[1], region[2], region[3]];
        ctx.nonce(&nonce);
        ctx.stream(&mut region[..NONCE_BYTES]);
        if i % PROGRESS_INTERVAL == 0 {
            progress(i);
        }
    }
    region
}

/// Key evolution checked against `iterout` when run for the recorded count.
pub fn run_key_evolution<C, P>(
    ctx: &mut C,
    seed: [u8; TESTSIZE],
    iterations: usize,
    report: &mut RunReport,
    progress: P,
) -> Result<[u8; TESTSIZE], HarnessError>
where
    C: AuthStreamCipher + ?Sized,
    P: FnMut(usize),
{
    let region = key_evolution(ctx, seed, iterations, progress);
    check_or_note("iterated keys", "iterout", iterations, &region, report)?;
    Ok(region)
}

/// Nonce evolution checked against `nonceout` when run for the recorded count.
pub fn run_nonce_evolution<C, P>(
    ctx: &mut C,
    iterations: usize,
    report: &mut RunReport,
    progress: P,
) -> Result<[u8; TESTSIZE], HarnessError>
where
    C: AuthStreamCipher + ?Sized,
    P: FnMut(usize),
{
    let region = nonce_evolution(ctx, iterations, progress);
    check_or_note("iterated nonces", "nonceout", iterations, &region, report)?;
    Ok(region)
}

fn check_or_note(
    label: &str,
    vector: &str,
    iterations: usize,
    region: &[u8],
    report: &mut RunReport,
) -> Result<(), HarnessError> {
    if iterations == ITERATIONS {
        report.record(GoldenVectorRegistry::get(vector)?.compare(label, region)?);
    } else {
        report.note(format!(
            "{label}: {iterations} iterations (golden {vector} needs {ITERATIONS}), got {}",
            hex::encode(region)
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shannon::ShannonCipher;

    fn testout() -> [u8; TESTSIZE] {
        let mut seed = [0u8; TESTSIZE];
        seed.copy_from_slice(&GoldenVectorRegistry::get("testout").unwrap().bytes().unwrap());
        seed
    }

    #[test]
    fn key_evolution_frozen_prefixes() {
        let cases: [(usize, &str); 3] = [
            (1, "e84a76efefe1ea706544487bd6a716b62ed36a03"),
            (10, "64ada0f1a79242d9d49b5ec226db4eed94228f44"),
            (1000, "93bf8d32860a4f3f6d1bdcf3015dd0003341efdb"),
        ];
        for (n, want) in cases {
            let mut ctx = ShannonCipher::new(&[]);
            let got = key_evolution(&mut ctx, testout(), n, |_| {});
            assert_eq!(hex::encode(got), want, "n = {n}");
        }
    }

    #[test]
    fn nonce_evolution_frozen_prefixes() {
        let tail = "5cc167643a116225716e752818c1d64f";
        let cases: [(usize, &str); 3] = [(1, "687c947d"), (10, "3ae0b69d"), (1000, "aa054115")];
        for (n, head) in cases {
            let mut ctx = ShannonCipher::new(&[]);
            let got = nonce_evolution(&mut ctx, n, |_| {});
            assert_eq!(hex::encode(got), format!("{head}{tail}"), "n = {n}");
        }
    }

    #[test]
    fn zero_iterations_return_the_start() {
        let mut ctx = ShannonCipher::new(&[]);
        assert_eq!(key_evolution(&mut ctx, testout(), 0, |_| {}), testout());
    }

    #[test]
    fn progress_fires_every_interval() {
        let mut ctx = ShannonCipher::new(&[]);
        let mut seen = Vec::new();
        nonce_evolution(&mut ctx, 1_499, |i| seen.push(i));
        assert_eq!(seen, vec![500, 1000]);
    }

    #[test]
    fn short_runs_are_noted_not_compared() {
        let mut ctx = ShannonCipher::new(&[]);
        let mut report = RunReport::new();
        run_key_evolution(&mut ctx, testout(), 10, &mut report, |_| {}).unwrap();
        assert!(report.checks.is_empty());
        assert_eq!(report.notes.len(), 1);
        assert!(report.notes[0].contains("64ada0f1"));
    }
}
