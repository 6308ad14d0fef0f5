use std::{
    fmt,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Number of characters kept from the bus and device tokens of a listing line.
pub const FIELD_WIDTH: usize = 3;

const BUS_KEYWORD: &str = "Bus";
const DEVICE_KEYWORD: &str = "Device";

/// A USB device found during discovery, addressed by its usbfs device file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCandidate {
    bus: String,
    device: String,
    path: PathBuf,
}

impl DeviceCandidate {
    /// Build a candidate whose device file is `<device_root>/<bus>/<device>`.
    #[must_use]
    pub fn new<P: AsRef<Path>>(bus: String, device: String, device_root: P) -> Self {
        let path = device_root.as_ref().join(&bus).join(&device);
        Self { bus, device, path }
    }

    /// Parse one line of `lsusb`-style output.
    ///
    /// The line has the shape `Bus <bus> Device <device>: ...`. Tokens are
    /// taken positionally after the keywords and cut to [`FIELD_WIDTH`]
    /// characters, so `Bus 0012` yields bus `001` and `004:` yields `004`.
    /// A trailing colon left after truncation is dropped.
    pub fn parse_line<P: AsRef<Path>>(line: &str, device_root: P) -> Result<Self, ParseError> {
        let mut tokens = line.split_whitespace();

        let bus = field_after(&mut tokens, BUS_KEYWORD)?;
        let device = field_after(&mut tokens, DEVICE_KEYWORD)?;

        Ok(Self::new(bus, device, device_root))
    }

    #[must_use]
    pub fn bus(&self) -> &str {
        &self.bus
    }

    #[must_use]
    pub fn device(&self) -> &str {
        &self.device
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for DeviceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

fn field_after<'a, I>(tokens: &mut I, keyword: &'static str) -> Result<String, ParseError>
where
    I: Iterator<Item = &'a str>,
{
    match tokens.next() {
        Some(token) if token == keyword => {}
        _ => return Err(ParseError::MissingKeyword(keyword)),
    }

    let mut field: String = tokens
        .next()
        .ok_or(ParseError::MissingField(keyword))?
        .chars()
        .take(FIELD_WIDTH)
        .collect();
    // Short device numbers keep the colon that separates them from the ID.
    if field.ends_with(':') {
        field.pop();
    }

    // The field becomes a path component below the device root.
    if field.chars().all(|c| c.is_ascii_digit()) {
        Ok(field)
    } else {
        Err(ParseError::NotNumeric(keyword, field))
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected the keyword {0:?}")]
    MissingKeyword(&'static str),
    #[error("no value follows the keyword {0:?}")]
    MissingField(&'static str),
    #[error("the value {1:?} after {0:?} is not a number")]
    NotNumeric(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ROOT: &str = "/dev/bus/usb";

    #[test]
    fn parses_lsusb_line() {
        let candidate = DeviceCandidate::parse_line(
            "Bus 001 Device 004: ID 0483:df11 STMicroelectronics STM Device in DFU Mode",
            ROOT,
        )
        .unwrap();

        assert_eq!(candidate.bus(), "001");
        assert_eq!(candidate.device(), "004");
        assert_eq!(candidate.path(), Path::new("/dev/bus/usb/001/004"));
        assert_eq!(candidate.to_string(), "/dev/bus/usb/001/004");
    }

    #[test]
    fn long_tokens_are_truncated() {
        let candidate = DeviceCandidate::parse_line(
            "Bus 0012 Device 00456: ID 0483:3748 STMicroelectronics",
            ROOT,
        )
        .unwrap();

        assert_eq!(candidate.bus(), "001");
        assert_eq!(candidate.device(), "004");
        assert_eq!(candidate.path(), Path::new("/dev/bus/usb/001/004"));
    }

    #[test]
    fn uses_configured_root() {
        let candidate = DeviceCandidate::parse_line(
            "Bus 003 Device 002: ID 0483:374b STMicroelectronics",
            "/tmp/usb",
        )
        .unwrap();

        assert_eq!(candidate.path(), Path::new("/tmp/usb/003/002"));
    }

    #[test]
    fn short_device_number_drops_colon() {
        let candidate = DeviceCandidate::parse_line("Bus 1 Device 7: ID 0483:df11", ROOT).unwrap();

        assert_eq!(candidate.bus(), "1");
        assert_eq!(candidate.device(), "7");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(
            DeviceCandidate::parse_line("", ROOT),
            Err(ParseError::MissingKeyword("Bus"))
        );
        assert_eq!(
            DeviceCandidate::parse_line("Bus 001 Port 004: ID 0483:df11", ROOT),
            Err(ParseError::MissingKeyword("Device"))
        );
        assert_eq!(
            DeviceCandidate::parse_line("Bus 001 Device", ROOT),
            Err(ParseError::MissingField("Device"))
        );
        assert_eq!(
            DeviceCandidate::parse_line("Bus ../ Device 004:", ROOT),
            Err(ParseError::NotNumeric("Bus", "../".to_string()))
        );
    }

    proptest! {
        #[test]
        fn path_uses_first_three_digits(bus in "[0-9]{1,8}", device in "[0-9]{1,8}") {
            let line = format!("Bus {bus} Device {device}: ID 0483:df11 STMicroelectronics");
            let candidate = DeviceCandidate::parse_line(&line, ROOT).unwrap();

            let bus3: String = bus.chars().take(3).collect();
            let device3: String = device.chars().take(3).collect();
            prop_assert_eq!(candidate.bus(), bus3.as_str());
            prop_assert_eq!(candidate.device(), device3.as_str());
            prop_assert_eq!(
                candidate.path().to_path_buf(),
                PathBuf::from(format!("{ROOT}/{bus3}/{device3}"))
            );
        }
    }
}
