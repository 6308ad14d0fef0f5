use std::{num::NonZeroUsize, path::PathBuf};

use clap::{ArgAction, Parser, ValueEnum};
use usbreset::{
    config::{Mode, ResetConfig, DEFAULT_DEVICE_ROOT, DEFAULT_MAX_DEVICES, DEFAULT_VENDOR},
    lister::{DeviceLister, LsusbLister, NativeLister, DEFAULT_LSUSB_COMMAND},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListerKind {
    /// Parse the output of the lsusb command.
    Lsusb,
    /// Enumerate devices through usbfs and sysfs directly.
    Native,
}

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
pub struct Cli {
    /// Reset devices whose listing line contains this string (case-sensitive).
    #[arg(long, value_name = "STRING", default_value = DEFAULT_VENDOR)]
    pub vendor: String,

    /// Reset at most this many devices.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DEVICES)]
    pub max_devices: NonZeroUsize,

    /// Reset only the first matching device and fail if that does not work.
    ///
    /// Without this option, failures are reported and the remaining devices
    /// are still reset.
    #[arg(long, action = ArgAction::SetTrue)]
    pub single: bool,

    /// Directory holding the usbfs device files.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DEVICE_ROOT)]
    pub device_root: PathBuf,

    /// How to find attached devices.
    #[arg(long, value_enum, default_value_t = ListerKind::Lsusb)]
    pub lister: ListerKind,

    /// The lsusb executable. Only used with --lister lsusb.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_LSUSB_COMMAND)]
    pub lsusb_command: PathBuf,

    /// Increase log verbosity. Can be given twice.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    #[must_use]
    pub fn config(&self) -> ResetConfig {
        ResetConfig {
            vendor: self.vendor.clone(),
            device_root: self.device_root.clone(),
            max_devices: self.max_devices,
            mode: if self.single { Mode::Single } else { Mode::All },
        }
    }

    #[must_use]
    pub fn lister(&self) -> Box<dyn DeviceLister> {
        match self.lister {
            ListerKind::Lsusb => Box::new(LsusbLister::new(&self.lsusb_command)),
            ListerKind::Native => Box::new(NativeLister),
        }
    }
}
