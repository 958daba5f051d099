//! Webhook notifier
//!
//! Turns engine lifecycle notifications into JSON envelopes and POSTs them:
//! - `envelope` - envelope shapes, outcome flags, timestamps
//! - `mapper` - the notifier that maps callbacks to envelopes
//! - `delivery` - one best-effort HTTP POST per envelope

pub mod delivery;
pub mod envelope;
pub mod mapper;

pub use delivery::UreqTransport;
pub use envelope::SystemClock;
pub use mapper::JsonNotifier;
