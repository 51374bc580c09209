//! Event definitions and traits

use crate::name::EventName;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Ordered key/value data attached to an ad hoc event.
///
/// Keys keep the order in which they were inserted.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Event trait
///
/// Anything that can be published through the bus. The only thing the bus
/// relies on is [`Event::event_name`]; everything else is for callbacks.
pub trait Event: Send + Sync + Debug + 'static {
    /// Name the event is registered and matched under
    fn event_name(&self) -> EventName;

    /// Ad hoc payload, if this event carries one
    fn payload(&self) -> Option<&Payload> {
        None
    }

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

impl dyn Event {
    /// Downcast to a concrete structured event type
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Whether the event is of concrete type `T`
    pub fn is<T: Event>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Unstructured event: a name plus whatever payload the publisher supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdHocEvent {
    name: EventName,
    payload: Payload,
}

impl AdHocEvent {
    pub fn new(name: EventName, payload: Payload) -> Self {
        Self { name, payload }
    }

    /// Event with an empty payload
    pub fn named(name: EventName) -> Self {
        Self::new(name, Payload::new())
    }

    /// Add a payload entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &EventName {
        &self.name
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Look up a single payload entry
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }
}

impl Event for AdHocEvent {
    fn event_name(&self) -> EventName {
        self.name.clone()
    }

    fn payload(&self) -> Option<&Payload> {
        Some(&self.payload)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The canonical event a publish call resolves to.
#[derive(Debug, Clone)]
pub enum PublishedEvent {
    /// Published by name with an ad hoc payload
    Unstructured(AdHocEvent),
    /// A caller-defined event value
    Structured(Arc<dyn Event>),
}

impl PublishedEvent {
    pub fn structured<E: Event>(event: E) -> Self {
        PublishedEvent::Structured(Arc::new(event))
    }

    pub fn name(&self) -> EventName {
        self.as_event().event_name()
    }

    /// Payload of an unstructured event, or whatever the structured event exposes
    pub fn payload(&self) -> Option<&Payload> {
        self.as_event().payload()
    }

    /// View through the [`Event`] capability, as callbacks receive it
    pub fn as_event(&self) -> &dyn Event {
        match self {
            PublishedEvent::Unstructured(event) => event,
            PublishedEvent::Structured(event) => event.as_ref(),
        }
    }

    /// Downcast a structured event to its concrete type
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        self.as_event().downcast_ref::<T>()
    }
}

impl From<AdHocEvent> for PublishedEvent {
    fn from(event: AdHocEvent) -> Self {
        PublishedEvent::Unstructured(event)
    }
}

impl From<Arc<dyn Event>> for PublishedEvent {
    fn from(event: Arc<dyn Event>) -> Self {
        PublishedEvent::Structured(event)
    }
}
