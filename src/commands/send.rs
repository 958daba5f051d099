use eyre::{Context, Result};
use std::io::{self, Read};

use crate::engine::Notification;

pub fn run(payload: Option<&str>, play: Option<String>, url: Option<String>) -> Result<()> {
    // Read payload from stdin if not provided
    let payload_str = match payload {
        Some(p) => p.to_string(),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read payload from stdin")?;
            buffer
        }
    };

    let notification = Notification::parse(payload_str.trim())?;

    let mut notifier = super::notifier(url);
    notifier.set_last_play(play);

    log::info!("Sending {}", notification.event_name());
    notification.dispatch(&mut notifier)
}
