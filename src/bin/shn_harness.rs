//! §7.1.0 Overview - Shannon harness CLI
//! - `-test`  conformance + stress loops + feedback engine
//! - `-quick` conformance only
//! - `-time`  quick conformance, then throughput
//! - default: keystream to stdout for external statistical tools
//!
//! Usage:
//!   shn_harness [-verbose] -test [-json]
//!   shn_harness [-verbose] -quick [-json]
//!   shn_harness -time [-json]
//!   shn_harness [-bulk] [keyhex [noncehex [n]]] | dieharder -a -g 200
//!
//! Exit status is the number of mismatched bytes, saturated at 255.
//!
//! /* =============================================================================
//!  * SHN - shn_harness.rs - Program v1.0.0
//!  * Numbering: Program=1.0.0, Sections=§7.X.0, Subsections=§7.X.Y
//!  * =============================================================================
//!  */

// ============================================================================
// §7.2.0 Imports & Crate Uses
// ============================================================================
use anyhow::{bail, Context, Result};
use std::io::{self, BufWriter, IsTerminal, Write};

use shannon_harness::bench::run_benchmark;
use shannon_harness::feedback::{dump_buffer, FeedbackState, Observation};
use shannon_harness::hexfmt::{format_labelled, format_register, parse_hex_arg};
use shannon_harness::harness::{DEFAULT_HEX_BYTES, DEFAULT_RAW_BYTES};
use shannon_harness::logging::init_tracing;
use shannon_harness::vectors::{SWAPPED_REGISTER_WORD, TEST_KEY};
use shannon_harness::{
    run_test, write_keystream, BenchConfig, HarnessConfig, RunObserver, RunReport,
    ShannonCipher, TestMode,
};

/// Row label of the feedback engine's golden check.
const HELL_MAC_LABEL: &str = "hell MAC";

// ============================================================================
// §7.3.0 Argument Parsing
// ============================================================================
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Test { mode: TestMode, json: bool },
    Time { json: bool },
    Generate { raw: bool, key: Vec<u8>, nonce: Vec<u8>, n: usize },
}

#[derive(Debug, PartialEq, Eq)]
struct Cli {
    verbose: bool,
    command: Command,
}

/* §7.3.1 parse_args: single-dash flags, then positionals */
fn parse_args(mut args: Vec<String>) -> Result<Cli> {
    let verbose = args.first().is_some_and(|a| a == "-verbose");
    if verbose {
        args.remove(0);
    }

    let json = if let Some(pos) = args.iter().position(|a| a == "-json") {
        args.remove(pos);
        true
    } else {
        false
    };

    let command = match args.first().map(String::as_str) {
        Some("-test") => Command::Test { mode: TestMode::Full, json },
        Some("-quick") => Command::Test { mode: TestMode::Quick, json },
        Some("-time") => Command::Time { json },
        _ => {
            if json {
                bail!("-json applies to -test, -quick and -time only");
            }
            let raw = args.first().is_some_and(|a| a == "-bulk");
            if raw {
                args.remove(0);
            }
            if let Some(flag) = args.iter().find(|a| a.starts_with('-')) {
                bail!("unknown flag {flag}");
            }
            let key = parse_hex_arg(args.first().map_or("0000000000000000", String::as_str))
                .context("bad key hex")?;
            let nonce =
                parse_hex_arg(args.get(1).map_or("", String::as_str)).context("bad nonce hex")?;
            let n = match args.get(2) {
                Some(s) => s.parse::<usize>().with_context(|| format!("bad byte count {s:?}"))?,
                None if raw => DEFAULT_RAW_BYTES,
                None => DEFAULT_HEX_BYTES,
            };
            Command::Generate { raw, key, nonce, n }
        }
    };
    Ok(Cli { verbose, command })
}

// ============================================================================
// §7.4.0 Console Observer
// ============================================================================
struct Console {
    verbose: bool,
    progress: bool,
}

impl RunObserver for Console {
    fn stress_progress(&mut self, phase: &'static str, iteration: usize) {
        if self.progress {
            eprint!("\r{phase}: {iteration}");
        }
    }

    fn feedback_step(&mut self, o: &Observation) {
        if self.verbose {
            println!("{:7}  {}  {}", o.iteration, o.step, hex::encode(o.tag));
        }
    }
}

/// The progress counter shares the terminal with nothing else.
fn show_progress(json: bool, verbose: bool, stderr_tty: bool) -> bool {
    !json && !verbose && stderr_tty
}

/* §7.4.1 register_dump: saved register plus byte-order hint */
fn register_dump(label: &str, register: &[u32]) -> String {
    let mut out = format_register(label, register);
    if register.first() == Some(&SWAPPED_REGISTER_WORD) {
        out.push_str("It is probable that byte ordering is incorrect.\n");
    }
    out
}

/* §7.4.2 write_checks: labelled rows, as the tests ran; the feedback
 * buffer dump goes right before its "hell MAC" row */
fn write_checks<W: Write>(
    w: &mut W,
    report: &RunReport,
    feedback: Option<&FeedbackState>,
) -> io::Result<()> {
    let mut pending = feedback;
    for check in &report.checks {
        if check.label == HELL_MAC_LABEL {
            if let Some(state) = pending.take() {
                dump_buffer(w, state)?;
            }
        }
        writeln!(w, "{}", format_labelled(&check.label, &check.observed))?;
        for m in &check.mismatches {
            writeln!(w, "{m}")?;
        }
    }
    if let Some(state) = pending {
        dump_buffer(w, state)?;
    }
    writeln!(
        w,
        "[shn_harness] {} checks, {} mismatched bytes{}",
        report.checks.len(),
        report.mismatch_count(),
        if report.aborted { " (stopped early)" } else { "" }
    )
}

// ============================================================================
// §7.5.0 main
// ============================================================================
fn main() -> Result<()> {
    let cli = parse_args(std::env::args().skip(1).collect())?;
    init_tracing(cli.verbose).map_err(|e| anyhow::anyhow!("{e}"))?;

    let mut ctx = ShannonCipher::new(&[]);

    match cli.command {
        /* §7.5.1 -test / -quick */
        Command::Test { mode, json } => {
            let config = HarnessConfig { verbose: cli.verbose, ..HarnessConfig::from_env() };
            if !config.is_golden() && mode == TestMode::Full {
                tracing::warn!(?config, "non-default iteration counts: stress vectors will not be compared");
            }
            let keyed = ShannonCipher::new(TEST_KEY);
            let register = keyed.initial_register();
            if !json {
                print!("{}", register_dump("saved register", register));
            } else if register[0] == SWAPPED_REGISTER_WORD {
                tracing::warn!("saved register suggests incorrect byte ordering");
            }

            let mut console = Console {
                verbose: config.verbose,
                progress: show_progress(json, config.verbose, io::stderr().is_terminal()),
            };
            let run = run_test(&mut ctx, &config, mode, &mut console).context("test run")?;
            if console.progress && mode == TestMode::Full {
                eprintln!();
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&run.report)?);
            } else {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                write_checks(&mut out, &run.report, run.feedback.as_ref())?;
            }
            std::process::exit(run.report.exit_code());
        }

        /* §7.5.2 -time */
        Command::Time { json } => {
            let config = HarnessConfig::from_env();
            let mut quiet = Console { verbose: false, progress: false };
            let run = run_test(&mut ctx, &config, TestMode::Quick, &mut quiet)
                .context("conformance before timing")?;
            if !run.report.passed() {
                tracing::warn!(mismatches = run.report.mismatch_count(), "conformance failed; timings are of a broken primitive");
            }

            let bench = run_benchmark(&mut ctx, &BenchConfig::from_env());
            if json {
                #[derive(serde::Serialize)]
                struct TimeSummary<'a> {
                    conformance: &'a RunReport,
                    bench: &'a shannon_harness::bench::BenchReport,
                }
                let summary = TimeSummary { conformance: &run.report, bench: &bench };
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                for r in &bench.results {
                    println!("[shn_harness] {r}");
                }
            }
            std::process::exit(run.report.exit_code());
        }

        /* §7.5.3 keystream generation */
        Command::Generate { raw, key, nonce, n } => {
            if cli.verbose {
                let keyed = ShannonCipher::new(&key);
                let dump = register_dump("initial register", keyed.initial_register());
                // raw keystream owns stdout
                if raw {
                    eprint!("{dump}");
                } else {
                    print!("{dump}");
                }
            }
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            write_keystream(&mut ctx, &key, &nonce, n, &mut out, raw).context("writing keystream")?;
            out.flush()?;
        }
    }
    Ok(())
}
