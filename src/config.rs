use std::{num::NonZeroUsize, path::PathBuf};

/// Vendor substring that selects the devices to reset.
pub const DEFAULT_VENDOR: &str = "STMicroelectronics";

/// Directory that holds the usbfs device files, one subdirectory per bus.
pub const DEFAULT_DEVICE_ROOT: &str = "/dev/bus/usb";

/// Maximum number of devices handled in one run.
pub const DEFAULT_MAX_DEVICES: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => unreachable!(),
};

/// How failures of individual devices affect the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Only the first matching device is reset. Failing to open or reset it
    /// aborts the run.
    Single,
    /// All matching devices up to the bound are reset. Failures are reported
    /// and the next device is processed.
    #[default]
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetConfig {
    /// Case-sensitive substring matched against every enumeration line.
    pub vendor: String,
    pub device_root: PathBuf,
    pub max_devices: NonZeroUsize,
    pub mode: Mode,
}

impl ResetConfig {
    /// The number of candidates discovery may yield for this configuration.
    ///
    /// Single-device mode only ever looks at the first match.
    #[must_use]
    pub const fn bound(&self) -> NonZeroUsize {
        match self.mode {
            Mode::Single => NonZeroUsize::MIN,
            Mode::All => self.max_devices,
        }
    }
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            vendor: DEFAULT_VENDOR.to_string(),
            device_root: PathBuf::from(DEFAULT_DEVICE_ROOT),
            max_devices: DEFAULT_MAX_DEVICES,
            mode: Mode::default(),
        }
    }
}
