#![deny(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::must_use_candidate
)]
// now allow a few rules which are denied by the above's statement
#![allow(clippy::multiple_crate_versions)]
#![deny(missing_debug_implementations)]
#![deny(rustdoc::all)]

//! usbreset
//!
//! Find USB devices of one vendor and reset them through their usbfs device
//! files in `/dev/bus/usb`.

pub mod candidate;
pub mod config;
pub mod discovery;
pub mod lister;
pub mod reset;
pub mod resetter;
