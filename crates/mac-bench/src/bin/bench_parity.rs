// SPDX-License-Identifier: AGPL-3.0-only

//! bench_parity: MAC peripheral vs software reference: parity, polling cost, fault handling
//!
//! Drives the self-test sequence many times and reports:
//!   1. Parity: random operands through the peripheral vs `reference_mac`
//!   2. Submission plans: observed v2 repeat vs distinct second pair
//!   3. Latency: status polls and wall time per self-test as latency grows
//!   4. Faults: exit status for each injected fault
//!
//! Usage:
//!   cargo run --bin bench_parity                        # simulated peripheral
//!   cargo run --bin bench_parity -- --hw                # also run on MAC_DEVICE @ MAC_BASE
//!   cargo run --bin bench_parity -- --task=parity|plans|latency|faults --iters=5000

use anyhow::{bail, Context, Result};
use mac_driver::{
    exit_code, parse_addr, run_self_test, select_backend, BackendSelection, PollConfig,
    SecondSubmission, SelfTest, SimFault, SimulatedMac, TestVectors, Variant,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// ── PRNG ─────────────────────────────────────────────────────────────────────

struct Xoshiro {
    s: [u64; 4],
}

impl Xoshiro {
    fn new(seed: u64) -> Self {
        let s = [
            seed ^ 0x9e3779b97f4a7c15,
            seed.wrapping_add(0x6c62272e07bb0142),
            seed.rotate_left(17),
            seed.rotate_right(5),
        ];
        let mut rng = Self { s };
        for _ in 0..20 {
            let _ = rng.next_u64();
        }
        rng
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);
        let t = self.s[1].wrapping_shl(17);
        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);
        result
    }

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn vectors(&mut self) -> TestVectors {
        TestVectors::new(self.next_u32(), self.next_u32(), self.next_u32(), self.next_u32())
    }
}

// ── Tasks ────────────────────────────────────────────────────────────────────

fn sim(variant: Variant, latency: u32) -> SimulatedMac {
    SimulatedMac::new(variant.status_protocol()).with_latency(latency)
}

fn task_parity(iters: usize) -> Result<()> {
    println!("── 1. Parity: peripheral vs reference ───────────────────────────────");
    let mut rng = Xoshiro::new(42);
    for variant in Variant::ALL {
        let mut agree = 0usize;
        for _ in 0..iters {
            let test = SelfTest::new(variant)
                .with_vectors(rng.vectors())
                .with_second_submission(match variant {
                    Variant::V2 => SecondSubmission::Distinct,
                    Variant::V3 => SecondSubmission::Skip,
                });
            let latency = (rng.next_u64() % 16) as u32;
            if run_self_test(sim(variant, latency), &test).is_ok() {
                agree += 1;
            }
        }
        let pct = 100.0 * agree as f64 / iters as f64;
        println!("  {variant}: {agree}/{iters} agree ({pct:.2}%)");
    }
    Ok(())
}

fn task_plans() -> Result<()> {
    println!("── 2. Submission plans (fixture vectors 2 3 2 5) ────────────────────");
    println!("  {:<4} {:<9} {:>9} {:>9} {:>5}", "var", "second", "hardware", "reference", "exit");
    for variant in Variant::ALL {
        for second in [
            SecondSubmission::Repeat,
            SecondSubmission::Distinct,
            SecondSubmission::Skip,
        ] {
            let test = SelfTest::new(variant).with_second_submission(second);
            let mut driver = test.driver(sim(variant, 4));
            let outcome = test.run(&mut driver);
            let hardware = driver.bus().accumulator();
            println!(
                "  {:<4} {:<9} {:>9} {:>9} {:>5}",
                variant.name(),
                format!("{second:?}"),
                hardware,
                test.reference(),
                exit_code(&outcome)
            );
        }
    }
    println!("  (v2 fixture resubmits the first pair: Repeat is its observed plan)");
    Ok(())
}

fn task_latency(iters: usize) -> Result<()> {
    println!("── 3. Polling cost vs peripheral latency ────────────────────────────");
    println!("  {:>8} {:>12} {:>12}", "latency", "polls/test", "ns/test");
    for latency in [0u32, 1, 4, 16, 64, 256] {
        let test = SelfTest::new(Variant::V3);
        let mut polls = 0u64;
        let start = Instant::now();
        for _ in 0..iters {
            let pass = run_self_test(sim(Variant::V3, latency), &test)
                .context("v3 self-test on simulated peripheral")?;
            polls += pass.polls;
        }
        let ns = start.elapsed().as_nanos() as f64 / iters as f64;
        println!("  {latency:>8} {:>12.1} {ns:>12.0}", polls as f64 / iters as f64);
    }
    Ok(())
}

fn task_faults() -> Result<()> {
    println!("── 4. Fault injection ───────────────────────────────────────────────");
    let poll = PollConfig::default().with_max_polls(10_000);
    let faults = [
        ("none", None),
        ("stuck", Some(SimFault::Stuck)),
        ("skew:1", Some(SimFault::ResultSkew(1))),
        ("force:16", Some(SimFault::ForcedResult(16))),
        ("force:6", Some(SimFault::ForcedResult(6))),
    ];
    for variant in Variant::ALL {
        let test = SelfTest::new(variant).with_poll_config(poll);
        for (label, fault) in faults {
            let mut bus = sim(variant, 2);
            if let Some(f) = fault {
                bus = bus.with_fault(f);
            }
            let outcome = run_self_test(bus, &test);
            let detail = match &outcome {
                Ok(pass) => pass.to_string(),
                Err(e) => e.to_string(),
            };
            println!("  {variant} {label:<9} exit {}  {detail}", exit_code(&outcome));
        }
    }
    Ok(())
}

fn task_hardware() -> Result<()> {
    println!("── 5. Live peripheral ───────────────────────────────────────────────");
    let path = PathBuf::from(std::env::var("MAC_DEVICE").unwrap_or_else(|_| "/dev/mem".into()));
    let base = match std::env::var("MAC_BASE") {
        Ok(s) => parse_addr(&s).context("MAC_BASE")?,
        Err(_) => 0,
    };
    for variant in Variant::ALL {
        let bus = select_backend(&BackendSelection::Mmap { path: path.clone(), base })
            .with_context(|| format!("mapping {}", path.display()))?;
        let test = SelfTest::new(variant).with_second_submission(SecondSubmission::Distinct);
        let start = Instant::now();
        let outcome = run_self_test(bus, &test);
        let us = start.elapsed().as_secs_f64() * 1e6;
        match &outcome {
            Ok(pass) => println!("  {variant}: {pass} ({} polls, {us:.1} µs)", pass.polls),
            Err(e) => println!("  {variant}: {e}"),
        }
    }
    Ok(())
}

const TASKS: [&str; 5] = ["all", "parity", "plans", "latency", "faults"];

/// Value of `--task=`, defaulting to `all`.
fn task_arg(args: &[String]) -> Result<&str> {
    let task = args
        .iter()
        .find_map(|a| a.strip_prefix("--task="))
        .unwrap_or("all");
    if !TASKS.contains(&task) {
        bail!("unknown --task={task} (expected one of {})", TASKS.join(", "));
    }
    Ok(task)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let use_hw = args.iter().any(|a| a == "--hw");
    let task = task_arg(&args)?;
    let iters = match args.iter().find_map(|a| a.strip_prefix("--iters=")) {
        Some(s) => s.parse::<usize>().with_context(|| format!("--iters={s}"))?,
        None => 2_000,
    };

    println!("MAC peripheral parity benchmark  (iterations: {iters})");
    println!();

    match task {
        "parity" => task_parity(iters)?,
        "plans" => task_plans()?,
        "latency" => task_latency(iters)?,
        "faults" => task_faults()?,
        _ => {
            task_parity(iters)?;
            println!();
            task_plans()?;
            println!();
            task_latency(iters)?;
            println!();
            task_faults()?;
        }
    }

    if use_hw {
        println!();
        task_hardware()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("bench_parity")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn task_defaults_to_all() {
        assert_eq!(task_arg(&argv(&["--iters=10"])).unwrap(), "all");
        assert_eq!(task_arg(&argv(&["--task=faults"])).unwrap(), "faults");
    }

    #[test]
    fn unknown_task_is_rejected() {
        let err = task_arg(&argv(&["--task=parit"])).unwrap_err();
        assert!(err.to_string().contains("unknown --task=parit"), "{err}");
    }

    #[test]
    fn prng_is_deterministic_per_seed() {
        let (mut a, mut b) = (Xoshiro::new(7), Xoshiro::new(7));
        assert_eq!(a.vectors(), b.vectors());
        assert_ne!(Xoshiro::new(7).next_u64(), Xoshiro::new(8).next_u64());
    }
}
