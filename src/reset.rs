//! Opening usbfs device files and issuing the port reset.

use std::{
    fmt::Debug,
    fs::{File, OpenOptions},
    io,
    path::Path,
};

use thiserror::Error;
use tracing::trace;
use vmm_sys_util::{ioctl::ioctl, ioctl_io_nr};

// From include/uapi/linux/usbdevice_fs.h: #define USBDEVFS_RESET _IO('U', 20)
ioctl_io_nr!(USBDEVFS_RESET, b'U' as u32, 20);

/// Result of resetting one device.
pub type ResetOutcome = Result<(), ResetFailure>;

#[derive(Error, Debug)]
pub enum ResetFailure {
    #[error("Failed to open USB device file: {0}")]
    Open(io::Error),
    #[error("Failed to reset USB device: {0}")]
    Reset(io::Error),
}

impl ResetFailure {
    /// The OS error behind the failure.
    #[must_use]
    pub const fn os_error(&self) -> &io::Error {
        match self {
            Self::Open(e) | Self::Reset(e) => e,
        }
    }
}

/// An open device that can be reset. Dropping it closes the device.
pub trait ResetHandle {
    fn reset(&mut self) -> io::Result<()>;
}

/// Opens device files for resetting.
pub trait DeviceOpener: Debug {
    type Handle: ResetHandle;

    fn open(&self, path: &Path) -> io::Result<Self::Handle>;
}

/// Opens usbfs device files of the running Linux host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsbDevFs;

impl DeviceOpener for UsbDevFs {
    type Handle = UsbDeviceFile;

    fn open(&self, path: &Path) -> io::Result<Self::Handle> {
        // Write access is enough for the reset request.
        let file = OpenOptions::new().write(true).open(path)?;
        trace!("Opened {path:?} for writing");
        Ok(UsbDeviceFile { file })
    }
}

/// A usbfs device file opened for writing.
#[derive(Debug)]
pub struct UsbDeviceFile {
    file: File,
}

impl ResetHandle for UsbDeviceFile {
    fn reset(&mut self) -> io::Result<()> {
        // SAFETY: USBDEVFS_RESET carries no argument, so the kernel reads or
        // writes no user memory. The file descriptor is owned by `self.file`
        // and stays open for the duration of the call.
        let ret = unsafe { ioctl(&self.file, USBDEVFS_RESET()) };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}
