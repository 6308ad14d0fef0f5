//! Sources of `lsusb`-style device listings.
//!
//! Every lister produces text with one device per line in the form
//! `Bus <bus> Device <device>: ID <vendor>:<product> <description>`.
//! Discovery filters and parses these lines without knowing where they came
//! from.

use std::{
    ffi::OsString,
    fmt::Debug,
    io::{self, BufRead, BufReader, Read},
    path::PathBuf,
    process::{Child, ChildStdout, Command, Stdio},
};

use nusb::MaybeFuture;
use tracing::{debug, warn};

use crate::discovery::DiscoveryError;

/// Name of the enumeration command looked up in `PATH`.
pub const DEFAULT_LSUSB_COMMAND: &str = "lsusb";

pub trait DeviceLister: Debug {
    /// Start an enumeration and hand out its output.
    ///
    /// Any process or handle behind the returned reader is released when the
    /// reader is dropped, whether or not it was read to the end.
    fn list(&self) -> Result<Box<dyn BufRead + '_>, DiscoveryError>;
}

/// Runs an external enumeration command and reads its standard output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsusbLister {
    command: PathBuf,
    args: Vec<OsString>,
}

impl LsusbLister {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(command: P) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument passed to the enumeration command.
    #[must_use]
    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl Default for LsusbLister {
    fn default() -> Self {
        Self::new(DEFAULT_LSUSB_COMMAND)
    }
}

impl LsusbLister {
    fn spawn(&self) -> Result<CommandOutput, DiscoveryError> {
        debug!("Running {:?} {:?}", self.command, self.args);

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(DiscoveryError::Launch)?;

        let Some(stdout) = child.stdout.take() else {
            // Reap the child before reporting, the guard does not exist yet.
            let _ = child.kill();
            let _ = child.wait();
            return Err(DiscoveryError::Launch(io::Error::other(
                "enumeration command has no standard output",
            )));
        };

        Ok(CommandOutput {
            child,
            stdout: BufReader::new(stdout),
            exhausted: false,
        })
    }
}

impl DeviceLister for LsusbLister {
    fn list(&self) -> Result<Box<dyn BufRead + '_>, DiscoveryError> {
        Ok(Box::new(self.spawn()?))
    }
}

/// Standard output of a running enumeration command.
///
/// Dropping it reaps the child. A child whose output was not read to the end
/// is killed first, so stopping early never leaves a process behind.
#[derive(Debug)]
struct CommandOutput {
    child: Child,
    stdout: BufReader<ChildStdout>,
    exhausted: bool,
}

impl Read for CommandOutput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.stdout.read(buf)?;
        self.exhausted = n == 0 && !buf.is_empty();
        Ok(n)
    }
}

impl BufRead for CommandOutput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let buf = self.stdout.fill_buf()?;
        self.exhausted = buf.is_empty();
        Ok(buf)
    }

    fn consume(&mut self, amt: usize) {
        self.stdout.consume(amt);
    }
}

impl Drop for CommandOutput {
    fn drop(&mut self) {
        if !self.exhausted {
            debug!("Stopping enumeration command {} early", self.child.id());
            if let Err(e) = self.child.kill() {
                debug!("Failed to kill enumeration command: {e}");
            }
        }

        match self.child.wait() {
            Ok(status) if !status.success() => {
                debug!("Enumeration command finished with {status}");
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to reap enumeration command: {e}"),
        }
    }
}

/// Enumerates devices through `nusb` without spawning a process.
///
/// Lines carry the manufacturer and product strings the devices report
/// instead of names from the USB ID database `lsusb` uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NativeLister;

impl DeviceLister for NativeLister {
    fn list(&self) -> Result<Box<dyn BufRead + '_>, DiscoveryError> {
        let mut devices: Vec<_> = nusb::list_devices()
            .wait()
            .map_err(DiscoveryError::Enumerate)?
            .collect();
        devices.sort_by_key(|info| (info.busnum(), info.device_address()));

        let listing: String = devices
            .iter()
            .map(|info| {
                listing_line(
                    info.busnum(),
                    info.device_address(),
                    info.vendor_id(),
                    info.product_id(),
                    info.manufacturer_string(),
                    info.product_string(),
                )
            })
            .collect();

        Ok(Box::new(io::Cursor::new(listing.into_bytes())))
    }
}

/// Render one device the way `lsusb` prints it, including the newline.
fn listing_line(
    bus: u8,
    address: u8,
    vendor_id: u16,
    product_id: u16,
    manufacturer: Option<&str>,
    product: Option<&str>,
) -> String {
    let description = [manufacturer, product]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    format!("Bus {bus:03} Device {address:03}: ID {vendor_id:04x}:{product_id:04x} {description}\n")
}

/// A fixed listing, for tests and for replaying captured `lsusb` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureLister {
    listing: String,
}

impl FixtureLister {
    #[must_use]
    pub fn new<S: Into<String>>(listing: S) -> Self {
        Self {
            listing: listing.into(),
        }
    }
}

impl DeviceLister for FixtureLister {
    fn list(&self) -> Result<Box<dyn BufRead + '_>, DiscoveryError> {
        Ok(Box::new(self.listing.as_bytes()))
    }
}
