//! Stream mode: forward every notification on the input, in order.

use eyre::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::engine::{Callback, Notification};

pub fn run(input: Option<&Path>, url: Option<String>) -> Result<()> {
    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).context(format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut notifier = super::notifier(url);
    let handled = forward(reader, &mut notifier)?;

    log::info!("Handled {} notifications, {} envelopes delivered", handled, notifier.delivered());
    Ok(())
}

/// Dispatch each non-blank line; returns the number of notifications handled
pub fn forward<R: BufRead>(reader: R, callback: &mut dyn Callback) -> Result<usize> {
    let mut handled = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read notification stream")?;
        if line.trim().is_empty() {
            continue;
        }

        let notification = Notification::parse(&line).context(format!("Invalid notification on line {}", index + 1))?;
        log::debug!("Dispatching {}", notification.event_name());
        notification.dispatch(callback)?;
        handled += 1;
    }

    Ok(handled)
}
