//! Event envelopes: the JSON records sent to the webhook

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::engine::HostStats;

/// Source of envelope timestamps
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Render a timestamp as naive UTC ISO-8601 with a literal `Z` suffix
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    format!("{}Z", at.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f"))
}

/// Classification of a task's completion on a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Failed,
    Skipped,
    Unreachable,
}

impl Outcome {
    #[cfg(test)]
    pub const ALL: [Outcome; 4] = [Outcome::Ok, Outcome::Failed, Outcome::Skipped, Outcome::Unreachable];

    pub fn name(self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Failed => "failed",
            Outcome::Skipped => "skipped",
            Outcome::Unreachable => "unreachable",
        }
    }

    /// Flag merged into the result payload. Unreachable results already
    /// carry their own `unreachable` key, so none is added for them.
    pub fn flag(self) -> Option<&'static str> {
        match self {
            Outcome::Unreachable => None,
            other => Some(other.name()),
        }
    }

    /// Copy the engine payload, merge the outcome flag and stamp the action
    pub fn augment(self, payload: &Map<String, Value>, action: &str) -> Map<String, Value> {
        let mut result = payload.clone();
        if let Some(flag) = self.flag() {
            result.insert(flag.to_string(), Value::Bool(true));
        }
        result.insert("action".to_string(), Value::String(action.to_string()));
        result
    }
}

/// One event record; `type` is always the first key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    PlayStart {
        id: String,
        start: String,
        name: String,
    },
    TaskHostStart {
        play: Option<String>,
        id: String,
        path: Option<String>,
        name: String,
        start: String,
        host: String,
    },
    TaskStart {
        play: Option<String>,
        id: String,
        path: Option<String>,
        name: String,
        start: String,
    },
    #[serde(rename = "task__handler_start")]
    HandlerTaskStart {
        play: Option<String>,
        id: String,
        path: Option<String>,
        name: String,
        start: String,
        notified_host: Vec<String>,
    },
    TaskHostEnd {
        play: Option<String>,
        id: String,
        path: Option<String>,
        name: String,
        end: String,
        host: String,
        result: Map<String, Value>,
    },
    PlaybookEnd {
        end: String,
        result: BTreeMap<String, HostStats>,
    },
}

impl Envelope {
    /// The `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::PlayStart { .. } => "play_start",
            Envelope::TaskHostStart { .. } => "task_host_start",
            Envelope::TaskStart { .. } => "task_start",
            Envelope::HandlerTaskStart { .. } => "task__handler_start",
            Envelope::TaskHostEnd { .. } => "task_host_end",
            Envelope::PlaybookEnd { .. } => "playbook_end",
        }
    }
}
