#![allow(dead_code)]

use std::sync::{Arc, Mutex as StdMutex};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use device_scanners::{ScannerContext, ScannerHost};
use tracker::bus::InMemoryBus;
use tracker::config::{parse_config, RawPlatformConfig};
use tracker::state::Zone;
use tracker::{DeviceTracker, StateRegistry};

#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Log lines recorded while a test's subscriber guard is alive
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<StdMutex<Vec<CapturedEvent>>>);

impl CapturedLogs {
    pub fn contains(&self, level: Level, message: &str) -> bool {
        self.0
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.level == level && e.message == message)
    }

    /// First event logged at `level` with exactly `message`
    pub fn find(&self, level: Level, message: &str) -> Option<CapturedEvent> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.level == level && e.message == message)
            .cloned()
    }

    pub fn count(&self, level: Level) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .count()
    }
}

struct TestCaptureLayer {
    captured: CapturedLogs,
}

impl<S> Layer<S> for TestCaptureLayer
where
    S: Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        if let Some(message) = visitor.message {
            self.captured.0.lock().unwrap().push(CapturedEvent {
                level: *event.metadata().level(),
                message,
                fields: visitor.fields,
            });
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }
}

/// Install a capturing subscriber for the current thread.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let captured = CapturedLogs::default();
    let guard = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(TestCaptureLayer {
            captured: captured.clone(),
        })
        .set_default();
    (captured, guard)
}

pub struct Harness {
    pub bus: Arc<InMemoryBus>,
    pub tracker: Arc<DeviceTracker>,
    pub host: ScannerHost,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_home(None)
    }

    pub fn with_home(home: Option<Zone>) -> Self {
        let bus = Arc::new(InMemoryBus::new());
        let tracker = Arc::new(DeviceTracker::new(Arc::new(StateRegistry::new()), home));
        let host = ScannerHost::new(ScannerContext::new(bus.clone(), Arc::clone(&tracker)));
        Self { bus, tracker, host }
    }
}

/// Parse `[[device_tracker]]` blocks from a TOML snippet
pub fn platform_blocks(toml_src: &str) -> Vec<RawPlatformConfig> {
    parse_config(toml_src).unwrap().device_tracker
}
