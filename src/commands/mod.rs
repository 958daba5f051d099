pub mod completions;
pub mod config;
pub mod listen;
pub mod send;

use crate::notifier::{JsonNotifier, SystemClock, UreqTransport};

/// Notifier posting over HTTP with wall-clock timestamps
fn notifier(url: Option<String>) -> JsonNotifier {
    JsonNotifier::new(url, Box::new(UreqTransport::new()), Box::new(SystemClock))
}
