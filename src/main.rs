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

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;
use usbreset::{
    reset::UsbDevFs,
    resetter::{ConsoleReporter, Resetter},
};

fn main() -> Result<()> {
    let args = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(match args.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        })
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")?;

    // Log messages from the log crate as well.
    tracing_log::LogTracer::init()?;

    let resetter = Resetter::new(args.lister(), UsbDevFs, args.config());
    debug!("Using {:?}", resetter.config());

    resetter.run(&mut ConsoleReporter)?;
    Ok(())
}
