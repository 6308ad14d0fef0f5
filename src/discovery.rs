//! Find the device files of all attached devices from one vendor.

use std::{
    io::{self, BufRead},
    num::NonZeroUsize,
    path::Path,
};

use thiserror::Error;
use tracing::{debug, warn};

use crate::{candidate::DeviceCandidate, config::ResetConfig, lister::DeviceLister};

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to run the USB enumeration command")]
    Launch(#[source] io::Error),
    #[error("Failed to enumerate USB devices")]
    Enumerate(#[source] nusb::Error),
}

/// Start discovery with the vendor filter, device root and bound of `config`.
pub fn discover<'a>(
    lister: &'a dyn DeviceLister,
    config: &'a ResetConfig,
) -> Result<Discovery<'a>, DiscoveryError> {
    Ok(Discovery::new(
        lister.list()?,
        &config.vendor,
        &config.device_root,
        config.bound(),
    ))
}

/// Lazily yields the candidates of a listing, in listing order.
///
/// Only lines containing the vendor string are parsed. Iteration ends after
/// `bound` candidates or at the end of the listing. Dropping the iterator
/// releases the listing.
pub struct Discovery<'a> {
    listing: Box<dyn BufRead + 'a>,
    vendor: &'a str,
    device_root: &'a Path,
    remaining: usize,
}

impl<'a> Discovery<'a> {
    #[must_use]
    fn new(
        listing: Box<dyn BufRead + 'a>,
        vendor: &'a str,
        device_root: &'a Path,
        bound: NonZeroUsize,
    ) -> Self {
        Self {
            listing,
            vendor,
            device_root,
            remaining: bound.get(),
        }
    }

    fn next_line(&mut self) -> Option<String> {
        let mut buf = Vec::new();
        match self.listing.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => Some(String::from_utf8_lossy(&buf).into_owned()),
            Err(e) => {
                warn!("Failed to read the USB device listing: {e}");
                None
            }
        }
    }
}

impl Iterator for Discovery<'_> {
    type Item = DeviceCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let (vendor, device_root) = (self.vendor, self.device_root);
        let candidate = std::iter::from_fn(|| self.next_line())
            .filter(|line| line.contains(vendor))
            .find_map(|line| {
                let line = line.trim_end();
                match DeviceCandidate::parse_line(line, device_root) {
                    Ok(candidate) => Some(candidate),
                    Err(e) => {
                        warn!("Skipping listing line {line:?}: {e}");
                        None
                    }
                }
            })?;

        self.remaining -= 1;
        debug!(
            "Found device on bus {} with number {}",
            candidate.bus(),
            candidate.device()
        );
        Some(candidate)
    }
}

impl std::fmt::Debug for Discovery<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("vendor", &self.vendor)
            .field("device_root", &self.device_root)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{config::Mode, lister::FixtureLister};

    const LISTING: &str = "\
Bus 001 Device 004: ID 0483:df11 STMicroelectronics STM Device in DFU Mode
Bus 002 Device 007: ID 1234:5678 OtherVendor Thing
";

    fn config(max_devices: usize) -> ResetConfig {
        ResetConfig {
            max_devices: NonZeroUsize::new(max_devices).unwrap(),
            ..ResetConfig::default()
        }
    }

    fn paths(lister: &dyn DeviceLister, config: &ResetConfig) -> Vec<PathBuf> {
        discover(lister, config)
            .unwrap()
            .map(|candidate| candidate.path().to_path_buf())
            .collect()
    }

    #[test]
    fn finds_only_vendor_devices() {
        let lister = FixtureLister::new(LISTING);

        let candidates: Vec<_> = discover(&lister, &config(10)).unwrap().collect();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].bus(), "001");
        assert_eq!(candidates[0].device(), "004");
        assert_eq!(candidates[0].path(), Path::new("/dev/bus/usb/001/004"));
    }

    #[test]
    fn no_match_yields_nothing() {
        let lister = FixtureLister::new("Bus 002 Device 007: ID 1234:5678 OtherVendor Thing\n");

        assert!(paths(&lister, &config(10)).is_empty());
        assert!(paths(&FixtureLister::default(), &config(10)).is_empty());
    }

    #[test]
    fn stops_at_bound_in_listing_order() {
        let lister = FixtureLister::new(
            "\
Bus 003 Device 009: ID 0483:3748 STMicroelectronics ST-LINK/V2
Bus 001 Device 002: ID 1d6b:0002 Linux Foundation 2.0 root hub
Bus 001 Device 004: ID 0483:df11 STMicroelectronics STM Device in DFU Mode
Bus 002 Device 005: ID 0483:374b STMicroelectronics ST-LINK/V2.1
",
        );

        assert_eq!(
            paths(&lister, &config(2)),
            vec![
                PathBuf::from("/dev/bus/usb/003/009"),
                PathBuf::from("/dev/bus/usb/001/004"),
            ]
        );
    }

    #[test]
    fn single_mode_takes_first_match() {
        let lister = FixtureLister::new(
            "\
Bus 001 Device 004: ID 0483:df11 STMicroelectronics STM Device in DFU Mode
Bus 002 Device 005: ID 0483:374b STMicroelectronics ST-LINK/V2.1
",
        );
        let config = ResetConfig {
            mode: Mode::Single,
            ..config(10)
        };

        assert_eq!(
            paths(&lister, &config),
            vec![PathBuf::from("/dev/bus/usb/001/004")]
        );
    }

    #[test]
    fn vendor_match_is_case_sensitive() {
        let lister = FixtureLister::new("Bus 001 Device 004: ID 0483:df11 stmicroelectronics\n");

        assert!(paths(&lister, &config(10)).is_empty());
    }

    #[test]
    fn malformed_lines_do_not_count_toward_bound() {
        let lister = FixtureLister::new(
            "\
  STMicroelectronics appears in a stray line
Bus 001 Device 004: ID 0483:df11 STMicroelectronics STM Device in DFU Mode
",
        );

        assert_eq!(
            paths(&lister, &config(1)),
            vec![PathBuf::from("/dev/bus/usb/001/004")]
        );
    }

    #[test]
    fn last_line_without_newline_is_used() {
        let lister = FixtureLister::new("Bus 004 Device 010: ID 0483:df11 STMicroelectronics");

        assert_eq!(
            paths(&lister, &config(10)),
            vec![PathBuf::from("/dev/bus/usb/004/010")]
        );
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let listing: &[u8] = b"Bus 001 Device 004: ID 0483:df11 STMicroelectronics \xff\xfe\n";
        let config = config(10);

        let candidates: Vec<_> = Discovery::new(
            Box::new(listing),
            &config.vendor,
            &config.device_root,
            config.bound(),
        )
        .collect();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].path(), Path::new("/dev/bus/usb/001/004"));
    }

    #[test]
    fn stops_unbounded_command_early() {
        let lister = crate::lister::LsusbLister::new("yes")
            .arg("Bus 001 Device 004: ID 0483:df11 STMicroelectronics");

        assert_eq!(paths(&lister, &config(3)).len(), 3);
    }
}
