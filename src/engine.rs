//! Orchestration engine model
//!
//! The engine reports its progress as a stream of notifications, one JSON
//! object per line, tagged by `event`. Each notification carries the engine's
//! own objects (play, task, host, result, stats) and is dispatched into a
//! [`Callback`] implementation.

use eyre::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A play: a named, ordered unit of work targeting a set of hosts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Play {
    pub uuid: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// Host pattern the play targets; a list of patterns is joined with `,`
    #[serde(default, deserialize_with = "host_pattern")]
    pub hosts: String,
}

impl Play {
    /// Display name, falling back to the host pattern for unnamed plays
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.hosts } else { &self.name }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Host {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Task {
    pub uuid: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// Source location (`file:line`), absent for generated tasks
    #[serde(default)]
    pub path: Option<String>,
    /// Action module the task runs
    #[serde(default, deserialize_with = "null_as_empty")]
    pub action: String,
    /// Hosts that notified this task (handlers only)
    #[serde(default)]
    pub notified_hosts: Vec<Host>,
}

impl Task {
    /// Display name, falling back to the action for unnamed tasks
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.action } else { &self.name }
    }
}

/// Engine values may be `null` where a string is expected
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HostPattern {
    One(String),
    Many(Vec<String>),
}

fn host_pattern<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<HostPattern>::deserialize(deserializer)? {
        None => String::new(),
        Some(HostPattern::One(pattern)) => pattern,
        Some(HostPattern::Many(patterns)) => patterns.join(","),
    })
}

/// Result of one task on one host
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskResult {
    pub host: Host,
    pub task: Task,
    /// The engine's result payload, passed through untouched
    #[serde(default)]
    pub result: serde_json::Map<String, serde_json::Value>,
}

/// Aggregated outcome counters for one host
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HostStats {
    pub ok: u64,
    pub failures: u64,
    pub unreachable: u64,
    pub changed: u64,
    pub skipped: u64,
    pub rescued: u64,
    pub ignored: u64,
}

/// End-of-run statistics
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlaybookStats {
    #[serde(default)]
    pub processed: HashMap<String, HostStats>,
}

impl PlaybookStats {
    /// Counters for a host; hosts without recorded counters summarise to zero
    pub fn summarize(&self, host: &str) -> HostStats {
        self.processed.get(host).cloned().unwrap_or_default()
    }

    /// Per-host summary in ascending host order
    pub fn summary(&self) -> BTreeMap<String, HostStats> {
        self.processed
            .keys()
            .map(|host| (host.clone(), self.summarize(host)))
            .collect()
    }
}

/// Receiver for engine lifecycle notifications
pub trait Callback {
    fn on_play_start(&mut self, play: &Play) -> Result<()>;
    fn on_runner_start(&mut self, host: &Host, task: &Task) -> Result<()>;
    fn on_task_start(&mut self, task: &Task, is_conditional: bool) -> Result<()>;
    fn on_handler_task_start(&mut self, task: &Task) -> Result<()>;
    fn on_runner_ok(&mut self, result: &TaskResult) -> Result<()>;
    fn on_runner_failed(&mut self, result: &TaskResult, ignore_errors: bool) -> Result<()>;
    fn on_runner_skipped(&mut self, result: &TaskResult) -> Result<()>;
    fn on_runner_unreachable(&mut self, result: &TaskResult) -> Result<()>;
    fn on_stats(&mut self, stats: &PlaybookStats) -> Result<()>;
}

/// One line of the engine's notification stream
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    PlayStart {
        play: Play,
    },
    RunnerOnStart {
        host: Host,
        task: Task,
    },
    TaskStart {
        task: Task,
        #[serde(default)]
        is_conditional: bool,
    },
    HandlerTaskStart {
        task: Task,
    },
    RunnerOnOk {
        result: TaskResult,
    },
    RunnerOnFailed {
        result: TaskResult,
        #[serde(default)]
        ignore_errors: bool,
    },
    RunnerOnSkipped {
        result: TaskResult,
    },
    RunnerOnUnreachable {
        result: TaskResult,
    },
    Stats {
        stats: PlaybookStats,
    },
}

impl Notification {
    /// Parse a single notification line
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("Failed to parse notification")
    }

    /// Name of the `event` tag, for logging
    pub fn event_name(&self) -> &'static str {
        match self {
            Notification::PlayStart { .. } => "play_start",
            Notification::RunnerOnStart { .. } => "runner_on_start",
            Notification::TaskStart { .. } => "task_start",
            Notification::HandlerTaskStart { .. } => "handler_task_start",
            Notification::RunnerOnOk { .. } => "runner_on_ok",
            Notification::RunnerOnFailed { .. } => "runner_on_failed",
            Notification::RunnerOnSkipped { .. } => "runner_on_skipped",
            Notification::RunnerOnUnreachable { .. } => "runner_on_unreachable",
            Notification::Stats { .. } => "stats",
        }
    }

    /// Invoke the matching callback
    pub fn dispatch(&self, callback: &mut dyn Callback) -> Result<()> {
        match self {
            Notification::PlayStart { play } => callback.on_play_start(play),
            Notification::RunnerOnStart { host, task } => callback.on_runner_start(host, task),
            Notification::TaskStart { task, is_conditional } => callback.on_task_start(task, *is_conditional),
            Notification::HandlerTaskStart { task } => callback.on_handler_task_start(task),
            Notification::RunnerOnOk { result } => callback.on_runner_ok(result),
            Notification::RunnerOnFailed { result, ignore_errors } => callback.on_runner_failed(result, *ignore_errors),
            Notification::RunnerOnSkipped { result } => callback.on_runner_skipped(result),
            Notification::RunnerOnUnreachable { result } => callback.on_runner_unreachable(result),
            Notification::Stats { stats } => callback.on_stats(stats),
        }
    }
}
