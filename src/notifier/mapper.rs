//! JSON webhook notifier
//!
//! Maps each engine callback to an [`Envelope`] and delivers it inline.

use eyre::Result;

use super::delivery::{Delivery, DeliveryClient, Transport};
use super::envelope::{Clock, Envelope, Outcome, format_timestamp};
use crate::engine::{Callback, Host, Play, PlaybookStats, Task, TaskResult};

pub const MISSING_URL_WARNING: &str = "JSON Webhook URL was not provided. The JSON Webhook URL can be provided using \
     the `JSON_WEBHOOK_URL` environment variable.";

pub struct JsonNotifier {
    client: DeliveryClient,
    clock: Box<dyn Clock>,
    /// Id of the most recently started play
    last_play: Option<String>,
    delivered: usize,
}

impl JsonNotifier {
    /// Build a notifier; without a URL it disables itself and warns once
    pub fn new(url: Option<String>, transport: Box<dyn Transport>, clock: Box<dyn Clock>) -> Self {
        if url.is_none() {
            log::warn!("{}", MISSING_URL_WARNING);
        }

        Self {
            client: DeliveryClient::new(url, transport),
            clock,
            last_play: None,
            delivered: 0,
        }
    }

    pub fn disabled(&self) -> bool {
        self.client.url().is_none()
    }

    #[cfg(test)]
    pub fn last_play(&self) -> Option<&str> {
        self.last_play.as_deref()
    }

    /// Seed the current play, for single-shot sends outside a stream
    pub fn set_last_play(&mut self, play: Option<String>) {
        self.last_play = play;
    }

    /// Envelopes the webhook accepted so far
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    fn now(&self) -> String {
        format_timestamp(self.clock.now())
    }

    fn send_msg(&mut self, envelope: Envelope) -> Result<()> {
        match self.client.send(&envelope)? {
            Delivery::Delivered { bytes } => {
                self.delivered += 1;
                log::debug!("Delivered {} ({} byte response)", envelope.kind(), bytes);
            }
            Delivery::Failed { message } => {
                log::warn!("Could not submit message to webhook: {}", message);
            }
            Delivery::Disabled => {}
        }
        Ok(())
    }

    fn record_task_result(&mut self, outcome: Outcome, result: &TaskResult) -> Result<()> {
        if self.disabled() {
            return Ok(());
        }

        let task = &result.task;
        let envelope = Envelope::TaskHostEnd {
            play: self.last_play.clone(),
            id: task.uuid.clone(),
            path: task.path.clone(),
            name: task.display_name().to_string(),
            end: self.now(),
            host: result.host.name.clone(),
            result: outcome.augment(&result.result, &task.action),
        };
        self.send_msg(envelope)
    }
}

impl Callback for JsonNotifier {
    fn on_play_start(&mut self, play: &Play) -> Result<()> {
        if self.disabled() {
            return Ok(());
        }

        self.last_play = Some(play.uuid.clone());
        let envelope = Envelope::PlayStart {
            id: play.uuid.clone(),
            start: self.now(),
            name: play.display_name().to_string(),
        };
        self.send_msg(envelope)
    }

    fn on_runner_start(&mut self, host: &Host, task: &Task) -> Result<()> {
        if self.disabled() {
            return Ok(());
        }

        let envelope = Envelope::TaskHostStart {
            play: self.last_play.clone(),
            id: task.uuid.clone(),
            path: task.path.clone(),
            name: task.display_name().to_string(),
            start: self.now(),
            host: host.name.clone(),
        };
        self.send_msg(envelope)
    }

    fn on_task_start(&mut self, task: &Task, _is_conditional: bool) -> Result<()> {
        if self.disabled() {
            return Ok(());
        }

        let envelope = Envelope::TaskStart {
            play: self.last_play.clone(),
            id: task.uuid.clone(),
            path: task.path.clone(),
            name: task.display_name().to_string(),
            start: self.now(),
        };
        self.send_msg(envelope)
    }

    fn on_handler_task_start(&mut self, task: &Task) -> Result<()> {
        if self.disabled() {
            return Ok(());
        }

        let envelope = Envelope::HandlerTaskStart {
            play: self.last_play.clone(),
            id: task.uuid.clone(),
            path: task.path.clone(),
            name: task.display_name().to_string(),
            start: self.now(),
            notified_host: task.notified_hosts.iter().map(|h| h.name.clone()).collect(),
        };
        self.send_msg(envelope)
    }

    fn on_runner_ok(&mut self, result: &TaskResult) -> Result<()> {
        self.record_task_result(Outcome::Ok, result)
    }

    fn on_runner_failed(&mut self, result: &TaskResult, _ignore_errors: bool) -> Result<()> {
        self.record_task_result(Outcome::Failed, result)
    }

    fn on_runner_skipped(&mut self, result: &TaskResult) -> Result<()> {
        self.record_task_result(Outcome::Skipped, result)
    }

    fn on_runner_unreachable(&mut self, result: &TaskResult) -> Result<()> {
        self.record_task_result(Outcome::Unreachable, result)
    }

    fn on_stats(&mut self, stats: &PlaybookStats) -> Result<()> {
        if self.disabled() {
            return Ok(());
        }

        let envelope = Envelope::PlaybookEnd {
            end: self.now(),
            result: stats.summary(),
        };
        self.send_msg(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Notification;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::{Value, json};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::Once;

    // Log capture: one global logger, records kept per test thread.
    thread_local! {
        static CAPTURED: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
    }

    struct CaptureLogger;

    impl log::Log for CaptureLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }
        fn log(&self, record: &log::Record) {
            CAPTURED.with(|c| c.borrow_mut().push((record.level(), record.args().to_string())));
        }
        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger;
    static INIT: Once = Once::new();

    fn capture_logs() {
        INIT.call_once(|| {
            log::set_logger(&LOGGER).unwrap();
            log::set_max_level(log::LevelFilter::Trace);
        });
        CAPTURED.with(|c| c.borrow_mut().clear());
    }

    fn warnings() -> Vec<String> {
        CAPTURED.with(|c| {
            c.borrow()
                .iter()
                .filter(|(level, _)| *level == log::Level::Warn)
                .map(|(_, msg)| msg.clone())
                .collect()
        })
    }

    type Sent = Rc<RefCell<Vec<Value>>>;

    struct Recording {
        sent: Sent,
    }

    impl Transport for Recording {
        fn post_json(&self, _url: &str, body: &str) -> Result<Vec<u8>> {
            self.sent.borrow_mut().push(serde_json::from_str(body)?);
            Ok(Vec::new())
        }
    }

    struct Refusing;

    impl Transport for Refusing {
        fn post_json(&self, _url: &str, _body: &str) -> Result<Vec<u8>> {
            eyre::bail!("Connection refused (os error 111)")
        }
    }

    /// Starts at 2024-01-01T00:00:00 and advances one second per reading
    struct SteppingClock {
        next: Cell<DateTime<Utc>>,
    }

    impl SteppingClock {
        fn new() -> Self {
            Self {
                next: Cell::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let now = self.next.get();
            self.next.set(now + Duration::seconds(1));
            now
        }
    }

    fn notifier() -> (JsonNotifier, Sent) {
        let sent: Sent = Rc::default();
        let notifier = JsonNotifier::new(
            Some("http://hook.local".to_string()),
            Box::new(Recording { sent: sent.clone() }),
            Box::new(SteppingClock::new()),
        );
        (notifier, sent)
    }

    fn feed(notifier: &mut JsonNotifier, line: Value) {
        let notification: Notification = serde_json::from_value(line).unwrap();
        notification.dispatch(notifier).unwrap();
    }

    fn task_result(event: &str, payload: Value) -> Value {
        json!({
            "event": event,
            "result": {
                "host": {"name": "web1"},
                "task": {"uuid": "t1", "name": "install", "path": "site.yml:12", "action": "apt"},
                "result": payload
            }
        })
    }

    #[test]
    fn test_play_start_envelope() {
        let (mut notifier, sent) = notifier();
        feed(&mut notifier, json!({"event": "play_start", "play": {"uuid": "abc-123", "name": "deploy"}}));

        assert_eq!(
            serde_json::to_string(&sent.borrow()[0]).unwrap(),
            r#"{"type":"play_start","id":"abc-123","start":"2024-01-01T00:00:00.000000Z","name":"deploy"}"#
        );
        assert_eq!(notifier.last_play(), Some("abc-123"));
        assert_eq!(notifier.delivered(), 1);
    }

    #[test]
    fn test_task_events_carry_current_play() {
        let (mut notifier, sent) = notifier();
        let task = json!({"uuid": "t1", "name": "install", "path": "site.yml:12", "action": "apt"});

        feed(&mut notifier, json!({"event": "task_start", "task": task}));
        feed(&mut notifier, json!({"event": "play_start", "play": {"uuid": "p1", "name": "deploy"}}));
        feed(&mut notifier, json!({"event": "runner_on_start", "host": {"name": "web1"}, "task": task}));
        feed(&mut notifier, json!({"event": "play_start", "play": {"uuid": "p2", "name": "verify"}}));
        feed(&mut notifier, json!({"event": "task_start", "task": task, "is_conditional": false}));

        let sent = sent.borrow();
        assert_eq!(sent[0]["play"], Value::Null);
        assert_eq!(
            sent[2],
            json!({
                "type": "task_host_start",
                "play": "p1",
                "id": "t1",
                "path": "site.yml:12",
                "name": "install",
                "start": "2024-01-01T00:00:02.000000Z",
                "host": "web1"
            })
        );
        assert_eq!(sent[4]["type"], json!("task_start"));
        assert_eq!(sent[4]["play"], json!("p2"));
        assert!(sent[4].get("host").is_none());
    }

    #[test]
    fn test_handler_start_lists_notified_hosts_in_order() {
        let (mut notifier, sent) = notifier();
        feed(
            &mut notifier,
            json!({
                "event": "handler_task_start",
                "task": {
                    "uuid": "h1",
                    "name": "restart nginx",
                    "action": "service",
                    "notified_hosts": [{"name": "web2"}, {"name": "web1"}]
                }
            }),
        );

        let envelope = &sent.borrow()[0];
        assert_eq!(envelope["type"], json!("task__handler_start"));
        assert_eq!(envelope["path"], Value::Null);
        assert_eq!(envelope["notified_host"], json!(["web2", "web1"]));
    }

    #[test]
    fn test_completion_outcome_flags() {
        let cases = [
            ("runner_on_ok", json!({"changed": true}), json!({"changed": true, "ok": true, "action": "apt"})),
            (
                "runner_on_failed",
                json!({"msg": "boom", "rc": 1}),
                json!({"msg": "boom", "rc": 1, "failed": true, "action": "apt"}),
            ),
            (
                "runner_on_skipped",
                json!({"skip_reason": "Conditional result was False"}),
                json!({"skip_reason": "Conditional result was False", "skipped": true, "action": "apt"}),
            ),
            (
                "runner_on_unreachable",
                json!({"unreachable": true, "msg": "ssh"}),
                json!({"unreachable": true, "msg": "ssh", "action": "apt"}),
            ),
        ];

        for (event, payload, expected) in cases {
            let (mut notifier, sent) = notifier();
            feed(&mut notifier, task_result(event, payload));

            let envelope = &sent.borrow()[0];
            assert_eq!(envelope["type"], json!("task_host_end"), "{}", event);
            assert_eq!(envelope["result"], expected, "{}", event);
            assert_eq!(envelope["host"], json!("web1"));
            assert_eq!(envelope["end"], json!("2024-01-01T00:00:00.000000Z"));
        }
    }

    #[test]
    fn test_task_host_end_field_order() {
        let (mut notifier, sent) = notifier();
        feed(&mut notifier, task_result("runner_on_ok", json!({})));

        let envelope = &sent.borrow()[0];
        let keys: Vec<&String> = envelope.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["type", "play", "id", "path", "name", "end", "host", "result"]);
    }

    #[test]
    fn test_playbook_end_hosts_sorted() {
        let (mut notifier, sent) = notifier();
        feed(
            &mut notifier,
            json!({
                "event": "stats",
                "stats": {"processed": {"zeta": {"ok": 1}, "alpha": {"failures": 1}, "mid": {}}}
            }),
        );

        let envelope = &sent.borrow()[0];
        assert_eq!(envelope["type"], json!("playbook_end"));
        let hosts: Vec<&String> = envelope["result"].as_object().unwrap().keys().collect();
        assert_eq!(hosts, vec!["alpha", "mid", "zeta"]);
        assert_eq!(envelope["result"]["alpha"]["failures"], json!(1));
        assert_eq!(envelope["result"]["mid"]["ok"], json!(0));
    }

    #[test]
    fn test_timestamps_non_decreasing() {
        let sent: Sent = Rc::default();
        let mut notifier = JsonNotifier::new(
            Some("http://hook.local".to_string()),
            Box::new(Recording { sent: sent.clone() }),
            Box::new(crate::notifier::SystemClock),
        );
        feed(&mut notifier, json!({"event": "play_start", "play": {"uuid": "p1", "name": "deploy"}}));
        feed(&mut notifier, json!({"event": "task_start", "task": {"uuid": "t1"}}));
        feed(&mut notifier, task_result("runner_on_ok", json!({})));
        feed(&mut notifier, json!({"event": "stats", "stats": {"processed": {}}}));

        let re = regex::Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d{6})?Z$").unwrap();
        let stamps: Vec<String> = sent
            .borrow()
            .iter()
            .map(|e| e.get("start").or_else(|| e.get("end")).unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(stamps.len(), 4);
        for stamp in &stamps {
            assert!(re.is_match(stamp), "bad timestamp {}", stamp);
        }
        for pair in stamps.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_disabled_sends_nothing_and_warns_once() {
        capture_logs();
        let sent: Sent = Rc::default();
        let mut notifier = JsonNotifier::new(
            None,
            Box::new(Recording { sent: sent.clone() }),
            Box::new(SteppingClock::new()),
        );

        feed(&mut notifier, json!({"event": "play_start", "play": {"uuid": "p1", "name": "deploy"}}));
        feed(&mut notifier, task_result("runner_on_failed", json!({})));
        feed(&mut notifier, json!({"event": "stats", "stats": {"processed": {"web1": {}}}}));

        assert!(notifier.disabled());
        assert!(sent.borrow().is_empty());
        assert_eq!(notifier.delivered(), 0);
        assert_eq!(notifier.last_play(), None);
        assert_eq!(warnings(), vec![MISSING_URL_WARNING.to_string()]);
    }

    #[test]
    fn test_delivery_failure_warns_and_continues() {
        capture_logs();
        let mut notifier = JsonNotifier::new(
            Some("http://hook.local".to_string()),
            Box::new(Refusing),
            Box::new(SteppingClock::new()),
        );

        feed(&mut notifier, json!({"event": "play_start", "play": {"uuid": "p1", "name": "deploy"}}));
        feed(&mut notifier, task_result("runner_on_ok", json!({})));

        let warnings = warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("Could not submit message to webhook: "));
        assert!(warnings[0].contains("Connection refused (os error 111)"));
        assert_eq!(notifier.last_play(), Some("p1"));
        assert_eq!(notifier.delivered(), 0);
    }
}
