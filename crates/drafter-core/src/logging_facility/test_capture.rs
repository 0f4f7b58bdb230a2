//! In-memory event capture for log assertions
//!
//! One global layer records every event for the lifetime of the test
//! process. Tests run in parallel against the same capture, so queries are
//! keyed by `op` and `entity_id` (fresh entities have unique ids).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use drafter_core_types::schema::{FIELD_ENTITY_ID, FIELD_EVENT, FIELD_OP};

#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn op(&self) -> Option<&str> {
        self.field(FIELD_OP)
    }

    /// `start`, `end` or `end_error` for operation events
    pub fn event(&self) -> Option<&str> {
        self.field(FIELD_EVENT)
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.field(FIELD_ENTITY_ID)
    }
}

#[derive(Default)]
struct FieldVisitor(HashMap<String, String>);

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: String) {
        self.0.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }
}

type EventLog = Arc<Mutex<Vec<CapturedEvent>>>;

struct CaptureLayer(EventLog);

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let captured = CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0,
        };
        if let Ok(mut events) = self.0.lock() {
            events.push(captured);
        }
    }
}

/// Shared handle on the captured events
#[derive(Clone)]
pub struct TestCapture {
    events: EventLog,
}

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events of `op` whose `field` equals `value`
    pub fn events_where(&self, op: &str, field: &str, value: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.op() == Some(op) && e.field(field) == Some(value))
            .collect()
    }

    /// Every event mentioning the entity, in emission order
    pub fn for_entity(&self, entity_id: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.entity_id() == Some(entity_id))
            .collect()
    }

    /// The `event` values `op` emitted for one entity, e.g. `["start", "end"]`
    pub fn lifecycle(&self, op: &str, entity_id: &str) -> Vec<String> {
        self.events_where(op, FIELD_ENTITY_ID, entity_id)
            .iter()
            .filter_map(|e| e.event().map(str::to_string))
            .collect()
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().iter().filter(|e| predicate(e)).count()
    }

    /// # Panics
    ///
    /// When no event of `op` has the given `event` value.
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let events = self.events();
        assert!(
            events
                .iter()
                .any(|e| e.op() == Some(op) && e.event() == Some(event)),
            "no {op}/{event} event among {} captured",
            events.len()
        );
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture layer on first use and return the shared handle
///
/// ```
/// use drafter_core::logging_facility::test_capture::init_test_capture;
/// use drafter_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("doc_capture_op", entity_id = "doc-entity");
/// assert_eq!(capture.lifecycle("doc_capture_op", "doc-entity"), vec!["start"]);
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let events = EventLog::default();
            // Fails when a global subscriber already exists; capture stays empty then
            let _ = tracing_subscriber::registry()
                .with(CaptureLayer(events.clone()))
                .try_init();
            TestCapture { events }
        })
        .clone()
}
