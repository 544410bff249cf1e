//! # lume CLI
//!
//! Command-line interface for the media archiver.
//!
//! ## Usage
//! ```bash
//! lume set-archive ~/Archive
//! lume organize ~/Downloads/phone-dump
//! lume organize ~/Desktop/IMG_0001.jpg --archive ~/Archive --dry-run
//! ```

mod cli;

use lume_archiver::Result;

fn main() -> Result<()> {
    lume_archiver::init_tracing();
    cli::run()
}
