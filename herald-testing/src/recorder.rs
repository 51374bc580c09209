// Recording callbacks for testing

use herald_events::{Callback, CallbackError, Event, EventName, Payload, PublicationContext};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// One callback invocation seen by a [`CallRecorder`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Label of the callback that ran
    pub label: String,
    /// Name of the event it received
    pub event_name: EventName,
    /// Payload of the event, for ad hoc events
    pub payload: Option<Payload>,
    /// Line of the `publish` call, for context callbacks
    pub caller_line: Option<u32>,
}

/// Shared log of callback invocations.
///
/// Every callback built from the same recorder appends to one log, so the
/// order of entries is the order the bus ran them in.
#[derive(Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallRecorder {
    /// Create a new recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback that records the call and returns its label
    pub fn callback(&self, label: &str) -> Callback {
        let label = label.to_string();
        self.callback_returning(&label, Value::String(label.clone()))
    }

    /// Callback that records the call and returns `value`
    pub fn callback_returning(&self, label: &str, value: impl Into<Value>) -> Callback {
        let calls = Arc::clone(&self.calls);
        let label = label.to_string();
        let value = value.into();

        Callback::new(move |event: &dyn Event| {
            calls.lock().unwrap().push(record(&label, event, None));
            Ok(value.clone())
        })
    }

    /// Two-argument callback that also records the publish call site
    pub fn context_callback(&self, label: &str) -> Callback {
        let calls = Arc::clone(&self.calls);
        let label = label.to_string();

        Callback::with_context(move |event: &dyn Event, context: &PublicationContext| {
            let line = context.caller_location().line();
            calls
                .lock()
                .unwrap()
                .push(record(&label, event, Some(line)));
            Ok(Value::String(label.clone()))
        })
    }

    /// Get the number of calls
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Labels of the callbacks that ran, in order
    pub fn labels(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|call| call.label.clone())
            .collect()
    }

    /// Check if a callback ran
    pub fn was_called(&self, label: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|call| call.label == label)
    }

    /// Number of calls made by the callback with `label`
    pub fn label_call_count(&self, label: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.label == label)
            .count()
    }

    /// Clear all recorded calls
    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

fn record(label: &str, event: &dyn Event, caller_line: Option<u32>) -> RecordedCall {
    RecordedCall {
        label: label.to_string(),
        event_name: event.event_name(),
        payload: event.payload().cloned(),
        caller_line,
    }
}

/// Callback that always fails with `message`
pub fn failing_callback(message: &str) -> Callback {
    let message = message.to_string();
    Callback::new(move |_event: &dyn Event| -> Result<Value, CallbackError> {
        Err(message.clone().into())
    })
}
