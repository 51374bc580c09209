//! Subscriptions: a matcher, a callback and a stable id

use crate::error::{BusError, CallbackError, Result};
use crate::event::{Event, PublishedEvent};
use crate::execution::{Benchmark, Execution, PublicationContext};
use crate::matcher::Matcher;
use crate::name::check_symbol;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of a single callback invocation
pub type CallbackResult = std::result::Result<Value, CallbackError>;

type EventFn = dyn Fn(&dyn Event) -> CallbackResult + Send + Sync;
type EventWithContextFn = dyn Fn(&dyn Event, &PublicationContext) -> CallbackResult + Send + Sync;

/// Opaque identifier of a subscription, unique within a bus.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubscriptionId(Arc<str>);

impl SubscriptionId {
    /// Create a validated id
    pub fn new(id: impl AsRef<str>) -> Result<Self> {
        let id = id.as_ref();
        check_symbol(id).map_err(|reason| BusError::InvalidIdentifier {
            id: id.to_string(),
            reason,
        })?;
        Ok(Self(Arc::from(id)))
    }

    /// Generate a globally unique id
    pub fn random() -> Self {
        Self(Arc::from(uuid::Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({:?})", &*self.0)
    }
}

impl std::str::FromStr for SubscriptionId {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for SubscriptionId {
    type Error = BusError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for SubscriptionId {
    type Error = BusError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SubscriptionId> for String {
    fn from(id: SubscriptionId) -> Self {
        id.0.to_string()
    }
}

impl PartialEq<str> for SubscriptionId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for SubscriptionId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// Subscription callback.
///
/// The arity is fixed when the callback is built: [`Callback::new`] takes
/// only the event, [`Callback::with_context`] also receives the
/// [`PublicationContext`]. The bus never probes which form to call.
#[derive(Clone)]
pub enum Callback {
    Event(Arc<EventFn>),
    EventWithContext(Arc<EventWithContextFn>),
}

impl Callback {
    /// Callback that only needs the event
    ///
    /// ```
    /// use herald_events::{Callback, Event};
    ///
    /// let callback = Callback::new(|event: &dyn Event| Ok(event.event_name().to_string()));
    /// # let _ = callback;
    /// ```
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&dyn Event) -> std::result::Result<R, CallbackError> + Send + Sync + 'static,
        R: Into<Value>,
    {
        Callback::Event(Arc::new(move |event: &dyn Event| f(event).map(Into::into)))
    }

    /// Callback that also receives the publication context
    pub fn with_context<F, R>(f: F) -> Self
    where
        F: Fn(&dyn Event, &PublicationContext) -> std::result::Result<R, CallbackError>
            + Send
            + Sync
            + 'static,
        R: Into<Value>,
    {
        Callback::EventWithContext(Arc::new(
            move |event: &dyn Event, context: &PublicationContext| {
                f(event, context).map(Into::into)
            },
        ))
    }

    /// Number of parameters the callback takes
    pub fn arity(&self) -> usize {
        match self {
            Callback::Event(_) => 1,
            Callback::EventWithContext(_) => 2,
        }
    }

    fn call(&self, event: &dyn Event, context: &PublicationContext) -> CallbackResult {
        match self {
            Callback::Event(f) => f(event),
            Callback::EventWithContext(f) => f(event, context),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback(arity = {})", self.arity())
    }
}

/// A registered handler.
///
/// Owned by a bus and handed out as `Arc<Subscription>`; two handles refer
/// to the same subscription only if they point to the same allocation.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    matcher: Matcher,
    callback: Callback,
}

impl Subscription {
    pub fn new(matcher: Matcher, callback: Callback, id: SubscriptionId) -> Self {
        Self {
            id,
            matcher,
            callback,
        }
    }

    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    /// Whether this subscription applies to `event`
    pub fn matches(&self, event: &dyn Event) -> bool {
        self.matcher.matches(event)
    }

    /// Run the callback and record the outcome.
    ///
    /// A callback error is returned as-is.
    pub fn invoke(
        self: &Arc<Self>,
        event: &PublishedEvent,
        context: &PublicationContext,
    ) -> std::result::Result<Execution, CallbackError> {
        let executed_at = Utc::now();
        let started = Instant::now();
        let result = self.callback.call(event.as_event(), context)?;
        let benchmark = Benchmark::new(started.elapsed());

        Ok(Execution::new(Arc::clone(self), result, benchmark, executed_at))
    }
}
