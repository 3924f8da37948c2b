//! Run both self-test variants against the simulated peripheral.
//!
//! ```text
//! RUST_LOG=debug cargo run -p mac-driver --example simulated_selftest
//! ```

use mac_driver::{exit_code, run_self_test, SelfTest, SimulatedMac, Variant};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    for variant in Variant::ALL {
        let test = SelfTest::new(variant);
        let bus = SimulatedMac::new(variant.status_protocol()).with_latency(16);
        let outcome = run_self_test(bus, &test);
        match &outcome {
            Ok(pass) => println!("[{variant}] {pass}"),
            Err(e) => println!("[{variant}] {e}"),
        }
        println!("[{variant}] exit code {}", exit_code(&outcome));
    }
}
