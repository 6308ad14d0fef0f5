//! The discover, open, reset and report sequence.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, error};

use crate::{
    candidate::DeviceCandidate,
    config::{Mode, ResetConfig},
    discovery::{discover, DiscoveryError},
    lister::DeviceLister,
    reset::{DeviceOpener, ResetFailure, ResetHandle, ResetOutcome},
};

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("No matching device found for vendor {vendor:?}")]
    NoMatch { vendor: String },
    #[error("Failed to reset {}", path.display())]
    Candidate {
        path: PathBuf,
        #[source]
        failure: ResetFailure,
    },
}

/// Receives progress of a run as it happens.
pub trait Reporter {
    /// The device file was opened and the reset is about to be issued.
    fn resetting(&mut self, candidate: &DeviceCandidate);
    /// Processing of a device ended. Only called for outcomes that do not end
    /// the run.
    fn finished(&mut self, candidate: &DeviceCandidate, outcome: &ResetOutcome);
}

/// Prints progress to stdout and logs failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn resetting(&mut self, candidate: &DeviceCandidate) {
        println!("Resetting USB device {candidate}");
    }

    fn finished(&mut self, candidate: &DeviceCandidate, outcome: &ResetOutcome) {
        match outcome {
            Ok(()) => println!("Reset successful"),
            Err(failure) => error!("{candidate}: {failure}"),
        }
    }
}

#[derive(Debug)]
pub struct Resetter<O> {
    lister: Box<dyn DeviceLister>,
    opener: O,
    config: ResetConfig,
}

impl<O: DeviceOpener> Resetter<O> {
    #[must_use]
    pub fn new(lister: Box<dyn DeviceLister>, opener: O, config: ResetConfig) -> Self {
        Self {
            lister,
            opener,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ResetConfig {
        &self.config
    }

    /// Reset the matching devices one after another in discovery order.
    ///
    /// Finding no device is an error. In [`Mode::Single`] the first failing
    /// device ends the run with an error. In [`Mode::All`] failures go to the
    /// reporter and the run continues with the next device.
    pub fn run(&self, reporter: &mut dyn Reporter) -> Result<(), RunError> {
        let mut candidates = discover(self.lister.as_ref(), &self.config)?.peekable();

        if candidates.peek().is_none() {
            return Err(RunError::NoMatch {
                vendor: self.config.vendor.clone(),
            });
        }

        for candidate in candidates {
            let outcome = self.reset_candidate(&candidate, reporter);
            match (self.config.mode, outcome) {
                (Mode::Single, Err(failure)) => {
                    return Err(RunError::Candidate {
                        path: candidate.path().to_path_buf(),
                        failure,
                    });
                }
                (_, outcome) => reporter.finished(&candidate, &outcome),
            }
        }

        Ok(())
    }

    /// Open one device file and reset the device behind it.
    ///
    /// The device file is closed again before this returns, whatever the
    /// outcome.
    pub fn reset_candidate(
        &self,
        candidate: &DeviceCandidate,
        reporter: &mut dyn Reporter,
    ) -> ResetOutcome {
        let mut handle = self
            .opener
            .open(candidate.path())
            .map_err(ResetFailure::Open)?;

        reporter.resetting(candidate);
        handle.reset().map_err(ResetFailure::Reset)?;
        debug!("Reset {candidate}");

        Ok(())
    }
}
