//! MAC self-test: drive the peripheral, compare with the software oracle
//!
//! # Sequence
//!
//! ```text
//! wait ready ─► MAC := 0 ─► (x1, y1) ─► wait done
//!            ─► second submission (variant dependent) ─► wait done
//!            ─► read MAC ─► compare with reference
//! ```
//!
//! A disagreement is [`MacError::ResultMismatch`], whose message and exit
//! code (1) are what test harnesses key on.

use crate::backend::RegisterBus;
use crate::driver::{MacDriver, PollConfig};
use crate::error::{MacError, Result};
use crate::reference::TestVectors;
use crate::variant::{SecondSubmission, Variant};
use tracing::{info, warn};

/// Self-test configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfTest {
    /// Which variant's status encoding and reference to use
    pub variant: Variant,
    /// Operands fed to the peripheral and to the reference
    pub vectors: TestVectors,
    /// What to submit after the first pair
    pub second: SecondSubmission,
    /// Bounds on every status wait
    pub poll: PollConfig,
}

impl SelfTest {
    /// Self-test for `variant` with the fixture vectors and its observed
    /// second submission.
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            vectors: TestVectors::default(),
            second: variant.default_second_submission(),
            poll: PollConfig::default(),
        }
    }

    /// Use different operands
    #[must_use]
    pub const fn with_vectors(mut self, vectors: TestVectors) -> Self {
        self.vectors = vectors;
        self
    }

    /// Override the second submission
    #[must_use]
    pub const fn with_second_submission(mut self, second: SecondSubmission) -> Self {
        self.second = second;
        self
    }

    /// Override the poll bounds
    #[must_use]
    pub const fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Value the peripheral is expected to produce
    pub const fn reference(&self) -> u32 {
        self.variant.reference(self.vectors)
    }

    /// Build a driver for `bus` configured for this test
    pub fn driver<B: RegisterBus>(&self, bus: B) -> MacDriver<B> {
        MacDriver::new(bus, self.variant.status_protocol()).with_poll_config(self.poll)
    }

    /// Run the sequence on an existing driver.
    ///
    /// The driver's own status protocol and poll bounds are used as given.
    ///
    /// # Errors
    ///
    /// - [`MacError::ResultMismatch`] if the peripheral disagrees with the reference
    /// - [`MacError::Timeout`] if a status wait is exhausted
    /// - any bus error
    pub fn run<B: RegisterBus>(&self, driver: &mut MacDriver<B>) -> Result<SelfTestPass> {
        let TestVectors { x1, y1, x2, y2 } = self.vectors;
        info!(
            "MAC self-test {} ({}), vectors x1={x1} y1={y1} x2={x2} y2={y2}, second {:?}",
            self.variant,
            driver.protocol(),
            self.second
        );

        driver.wait_ready()?;
        driver.reset_accumulator()?;

        driver.submit_operand_pair(x1, y1)?;
        driver.wait_done()?;

        if let Some((x, y)) = self.second.pair(x1, y1, x2, y2) {
            driver.submit_operand_pair(x, y)?;
            driver.wait_done()?;
        }

        let hardware = driver.read_result()?;
        let reference = self.reference();

        if hardware != reference {
            warn!(
                "MAC self-test {} failed: hardware {hardware}, reference {reference}",
                self.variant
            );
            return Err(MacError::mismatch(hardware, reference));
        }

        info!("MAC self-test {} passed ({} status polls)", self.variant, driver.total_polls());
        Ok(SelfTestPass {
            variant: self.variant,
            hardware,
            reference,
            polls: driver.total_polls(),
        })
    }
}

impl Default for SelfTest {
    fn default() -> Self {
        Self::new(Variant::default())
    }
}

/// A self-test whose hardware result matched the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfTestPass {
    /// Variant that ran
    pub variant: Variant,
    /// Result read from the peripheral
    pub hardware: u32,
    /// Reference value it was checked against (equal to `hardware`)
    pub reference: u32,
    /// Status reads spent waiting
    pub polls: u64,
}

impl std::fmt::Display for SelfTestPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hardware result {} is correct for MAC", self.hardware)
    }
}

/// Run `test` against `bus` with a fresh driver.
///
/// # Errors
///
/// See [`SelfTest::run`].
pub fn run_self_test<B: RegisterBus>(bus: B, test: &SelfTest) -> Result<SelfTestPass> {
    let mut driver = test.driver(bus);
    test.run(&mut driver)
}

/// Process exit status for a self-test outcome: 0 pass, 1 mismatch, 2 other.
pub fn exit_code(outcome: &Result<SelfTestPass>) -> u8 {
    match outcome {
        Ok(_) => 0,
        Err(e) => e.exit_code(),
    }
}
