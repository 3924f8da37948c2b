//! `mac`: command-line self-test for the memory-mapped MAC peripheral.
//!
//! ```text
//! USAGE:
//!   mac run [options] [X1 Y1 X2 Y2]    Run the self-test (exit 0 pass, 1 mismatch, 2 error)
//!   mac reference X1 Y1 X2 Y2          Print the software reference value
//!   mac regs                           Print the register map
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use mac_driver::{
    exit_code, parse_addr, regs, run_self_test, select_backend, BackendSelection, PollConfig,
    SecondSubmission, SelfTest, SelfTestPass, SimFault, TestVectors, Variant,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mac", about = "MAC peripheral self-test", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Drive the peripheral and compare against the software reference.
    Run(RunArgs),
    /// Print the reference value for a set of operands.
    Reference {
        /// Self-test variant.
        #[arg(long, value_enum, default_value_t = VariantArg::V2)]
        variant: VariantArg,
        /// Operands: X1 Y1 X2 Y2.
        #[arg(num_args = 4, value_names = ["X1", "Y1", "X2", "Y2"], required = true)]
        vectors: Vec<u32>,
    },
    /// Print the register map.
    Regs,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Self-test variant (selects status encoding and reference).
    #[arg(long, value_enum, default_value_t = VariantArg::V2)]
    variant: VariantArg,

    /// Register backend.
    #[arg(long, value_enum, default_value_t = BackendArg::Software)]
    backend: BackendArg,

    /// Device file to map the registers from (mmap backend).
    #[arg(long, env = "MAC_DEVICE", default_value = "/dev/mem")]
    device: PathBuf,

    /// Page-aligned peripheral base within the device file (mmap backend).
    #[arg(long, env = "MAC_BASE", default_value = "0x0", value_parser = parse_addr)]
    base: u64,

    /// Operand pair submitted after the first; defaults to the variant's own.
    #[arg(long, value_enum)]
    second: Option<SecondArg>,

    /// Give up a status wait after this many polls.
    #[arg(long, conflicts_with = "unbounded")]
    max_polls: Option<u64>,

    /// Give up a status wait after this many milliseconds.
    #[arg(long, conflicts_with = "unbounded")]
    timeout_ms: Option<u64>,

    /// Poll without bound, as bare-metal firmware does.
    #[arg(long)]
    unbounded: bool,

    /// Busy status polls per operation (software backend).
    #[arg(long, default_value_t = 0)]
    latency: u32,

    /// Inject a fault: stuck, skew:N or force:N (software backend).
    #[arg(long, value_parser = parse_fault)]
    fault: Option<SimFault>,

    /// Operands: X1 Y1 X2 Y2 (default 2 3 2 5).
    #[arg(num_args = 4, value_names = ["X1", "Y1", "X2", "Y2"])]
    vectors: Option<Vec<u32>>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VariantArg {
    V2,
    V3,
}

impl From<VariantArg> for Variant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::V2 => Self::V2,
            VariantArg::V3 => Self::V3,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Software,
    Mmap,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SecondArg {
    Repeat,
    Distinct,
    Skip,
}

impl From<SecondArg> for SecondSubmission {
    fn from(s: SecondArg) -> Self {
        match s {
            SecondArg::Repeat => Self::Repeat,
            SecondArg::Distinct => Self::Distinct,
            SecondArg::Skip => Self::Skip,
        }
    }
}

fn parse_fault(s: &str) -> std::result::Result<SimFault, String> {
    let value = |v: &str| {
        v.parse::<u32>()
            .map_err(|e| format!("invalid fault value '{v}': {e}"))
    };
    match s.split_once(':') {
        None if s == "stuck" => Ok(SimFault::Stuck),
        Some(("skew", n)) => value(n).map(SimFault::ResultSkew),
        Some(("force", n)) => value(n).map(SimFault::ForcedResult),
        _ => Err(format!("unknown fault '{s}' (expected stuck, skew:N or force:N)")),
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Run(args) => cmd_run(&args),
        Cmd::Reference { variant, vectors } => {
            cmd_reference(variant.into(), &vectors);
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Regs => {
            cmd_regs();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn self_test(args: &RunArgs) -> SelfTest {
    let variant = Variant::from(args.variant);
    let mut test = SelfTest::new(variant);

    if let Some(v) = &args.vectors {
        test = test.with_vectors(TestVectors::new(v[0], v[1], v[2], v[3]));
    }
    if let Some(second) = args.second {
        test = test.with_second_submission(second.into());
    }

    let poll = if args.unbounded {
        PollConfig::unbounded()
    } else {
        let mut poll = PollConfig::default();
        if let Some(n) = args.max_polls {
            poll = poll.with_max_polls(n);
        }
        if let Some(ms) = args.timeout_ms {
            poll = poll.with_timeout(Duration::from_millis(ms));
        }
        poll
    };
    test.with_poll_config(poll)
}

fn backend_selection(args: &RunArgs, variant: Variant) -> BackendSelection {
    match args.backend {
        BackendArg::Software => BackendSelection::Software {
            protocol: variant.status_protocol(),
            latency: args.latency,
            fault: args.fault,
        },
        BackendArg::Mmap => BackendSelection::Mmap {
            path: args.device.clone(),
            base: args.base,
        },
    }
}

fn cmd_run(args: &RunArgs) -> Result<ExitCode> {
    let test = self_test(args);
    let selection = backend_selection(args, test.variant);
    tracing::debug!("Self-test {test:?} on {selection:?}");

    let outcome = select_backend(&selection).and_then(|bus| run_self_test(bus, &test));

    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr().lock();
    let code = report(&outcome, &mut stdout, &mut stderr)?;
    Ok(ExitCode::from(code))
}

/// Print the outcome the way the firmware does and return the exit status.
///
/// Pass and mismatch lines go to `out`; anything that stopped the test from
/// finishing goes to `err`.
fn report(
    outcome: &mac_driver::Result<SelfTestPass>,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<u8> {
    match outcome {
        Ok(pass) => writeln!(out, "{pass}")?,
        Err(e) if e.is_mismatch() => writeln!(out, "{e}")?,
        Err(e) => writeln!(err, "error: {e}")?,
    }
    Ok(exit_code(outcome))
}

fn cmd_reference(variant: Variant, vectors: &[u32]) {
    let value = mac_driver::reference_mac(variant, vectors[0], vectors[1], vectors[2], vectors[3]);
    println!("{value}");
}

fn cmd_regs() {
    println!("Offset  Register");
    for (offset, name) in regs::ALL {
        println!("{offset:#06x}  {name}");
    }
    println!();
    println!(
        "STATUS bits (v3): READY={:#04x} DONE={:#04x}",
        regs::status::READY,
        regs::status::DONE
    );
    println!("STATUS (v2): 0 = idle, nonzero = busy");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use mac_driver::MacError;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["mac", "run"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Cmd::Run(args) => args,
            _ => unreachable!(),
        }
    }

    fn printed(outcome: &mac_driver::Result<SelfTestPass>) -> (u8, String, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = report(outcome, &mut out, &mut err).unwrap();
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_run_v2_fixture() {
        let args = run_args(&[]);
        let test = self_test(&args);
        assert_eq!(test.variant, Variant::V2);
        assert_eq!(test.vectors, TestVectors::default());
        assert_eq!(test.second, SecondSubmission::Repeat);
        assert_eq!(test.poll, PollConfig::default());
    }

    #[test]
    fn flags_override_test_configuration() {
        let args = run_args(&[
            "--variant", "v3", "--second", "distinct", "--max-polls", "10", "--timeout-ms", "25",
            "7", "8", "9", "10",
        ]);
        let test = self_test(&args);
        assert_eq!(test.variant, Variant::V3);
        assert_eq!(test.vectors, TestVectors::new(7, 8, 9, 10));
        assert_eq!(test.second, SecondSubmission::Distinct);
        assert_eq!(test.poll.max_polls, Some(10));
        assert_eq!(test.poll.timeout, Some(Duration::from_millis(25)));
    }

    #[test]
    fn unbounded_conflicts_with_bounds() {
        assert!(Cli::try_parse_from(["mac", "run", "--unbounded", "--max-polls", "5"]).is_err());
        assert!(self_test(&run_args(&["--unbounded"])).poll.is_unbounded());
    }

    #[test]
    fn parses_addresses_and_faults() {
        assert_eq!(parse_addr("0x1000_0000").unwrap(), 0x1000_0000);
        assert_eq!(parse_addr("4096").unwrap(), 4096);
        assert!(parse_addr("0xZZ").is_err());
        assert!(Cli::try_parse_from(["mac", "run", "--base", "0xZZ"]).is_err());
        assert_eq!(parse_fault("stuck").unwrap(), SimFault::Stuck);
        assert_eq!(parse_fault("skew:3").unwrap(), SimFault::ResultSkew(3));
        assert_eq!(parse_fault("force:16").unwrap(), SimFault::ForcedResult(16));
        assert!(parse_fault("force:x").is_err());
        assert!(parse_fault("melt").is_err());
    }

    #[test]
    fn mmap_base_is_decimal_without_prefix() {
        let args = run_args(&["--backend", "mmap", "--device", "/tmp/mac", "--base", "4096"]);
        assert_eq!(
            backend_selection(&args, Variant::V2),
            BackendSelection::Mmap {
                path: PathBuf::from("/tmp/mac"),
                base: 0x1000,
            }
        );
    }

    #[test]
    fn software_selection_carries_fault_and_latency() {
        let args = run_args(&["--variant", "v3", "--latency", "4", "--fault", "skew:1"]);
        let selection = backend_selection(&args, Variant::V3);
        assert_eq!(
            selection,
            BackendSelection::Software {
                protocol: Variant::V3.status_protocol(),
                latency: 4,
                fault: Some(SimFault::ResultSkew(1)),
            }
        );
    }

    #[test]
    fn report_pass_and_mismatch_on_stdout() {
        let pass = Ok(SelfTestPass {
            variant: Variant::V3,
            hardware: 6,
            reference: 6,
            polls: 2,
        });
        assert_eq!(
            printed(&pass),
            (0, "Hardware result 6 is correct for MAC\n".into(), String::new())
        );

        let mismatch = Err(MacError::mismatch(12, 16));
        assert_eq!(
            printed(&mismatch),
            (
                1,
                "Hardware result 12 does not match reference value 16\n".into(),
                String::new()
            )
        );
    }

    #[test]
    fn report_other_errors_on_stderr() {
        let (code, out, err) = printed(&Err(MacError::timeout("done", 5, 0)));
        assert_eq!(code, 2);
        assert!(out.is_empty());
        assert!(err.starts_with("error: Timed out waiting for peripheral done"), "{err}");
    }

    #[test]
    fn end_to_end_on_software_backend() {
        let args = run_args(&["--variant", "v3", "--latency", "3"]);
        let test = self_test(&args);
        let outcome = select_backend(&backend_selection(&args, test.variant))
            .and_then(|bus| run_self_test(bus, &test));
        assert_eq!(printed(&outcome).0, 0);

        let args = run_args(&["--variant", "v2"]);
        let test = self_test(&args);
        let outcome = select_backend(&backend_selection(&args, test.variant))
            .and_then(|bus| run_self_test(bus, &test));
        let (code, out, _) = printed(&outcome);
        assert_eq!(code, 1);
        assert_eq!(out, "Hardware result 12 does not match reference value 16\n");
    }
}
