//! Webhook delivery
//!
//! One POST per envelope, no retries. Transport failures come back as
//! [`Delivery::Failed`] so the caller can log and carry on; only
//! serialization errors are returned as `Err`.

use eyre::{Context, Result};

use super::envelope::Envelope;

/// HTTP side of delivery
pub trait Transport {
    /// POST a JSON body and return the raw response body
    fn post_json(&self, url: &str, body: &str) -> Result<Vec<u8>>;
}

/// Blocking transport backed by ureq
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn post_json(&self, url: &str, body: &str) -> Result<Vec<u8>> {
        let mut response = self
            .agent
            .post(url)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())?;

        Ok(response.body_mut().read_to_vec()?)
    }
}

/// Outcome of a single delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Sent; the response body was read and dropped
    Delivered { bytes: usize },
    /// Transport or protocol error
    Failed { message: String },
    /// No destination configured
    Disabled,
}

pub struct DeliveryClient {
    url: Option<String>,
    transport: Box<dyn Transport>,
}

impl DeliveryClient {
    pub fn new(url: Option<String>, transport: Box<dyn Transport>) -> Self {
        Self { url, transport }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Serialize and POST one envelope
    pub fn send(&self, envelope: &Envelope) -> Result<Delivery> {
        let Some(url) = self.url.as_deref() else {
            return Ok(Delivery::Disabled);
        };

        let body = serde_json::to_string(envelope).context("Failed to serialize envelope")?;
        log::debug!("{}", body);
        log::debug!("{}", url);

        match self.transport.post_json(url, &body) {
            Ok(response) => Ok(Delivery::Delivered { bytes: response.len() }),
            Err(e) => Ok(Delivery::Failed {
                message: format!("{:#}", e),
            }),
        }
    }
}
