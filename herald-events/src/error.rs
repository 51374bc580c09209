//! Error types for the event bus

use crate::name::EventName;
use crate::subscription::SubscriptionId;
use thiserror::Error;

/// Error returned by a subscription callback.
///
/// The bus never inspects or rewrites it; it comes back from
/// [`Bus::publish`](crate::Bus::publish) inside [`BusError::Callback`]
/// and can be downcast to the concrete type the callback produced.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Event bus errors
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Invalid event name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Event '{name}' is already registered (registered at {origin})")]
    AlreadyRegistered { name: EventName, origin: String },

    #[error(
        "Unknown event '{name}'{}. Registered events: {}",
        did_you_mean(.suggestion),
        known_list(.known)
    )]
    UnknownEvent {
        name: String,
        known: Vec<EventName>,
        suggestion: Option<EventName>,
    },

    #[error("Invalid subscription id {id:?}: {reason}")]
    InvalidIdentifier { id: String, reason: &'static str },

    #[error("A subscription with id '{0}' already exists on this bus")]
    DuplicateSubscriptionId(SubscriptionId),

    #[error("Subscription '{0}' is not active on this bus")]
    UnknownSubscription(SubscriptionId),

    #[error("Invalid matcher pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A callback failed during dispatch. Carries the callback's own error.
    #[error(transparent)]
    Callback(CallbackError),
}

impl BusError {
    /// Whether this error came from a subscription callback rather than from
    /// misuse of the bus itself.
    pub fn is_callback(&self) -> bool {
        matches!(self, BusError::Callback(_))
    }

    /// Take the callback's error back out, if this is one.
    pub fn into_callback_error(self) -> Option<CallbackError> {
        match self {
            BusError::Callback(err) => Some(err),
            _ => None,
        }
    }
}

fn did_you_mean(suggestion: &Option<EventName>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{}'?)", name),
        None => String::new(),
    }
}

fn known_list(known: &[EventName]) -> String {
    if known.is_empty() {
        return "none".to_string();
    }
    known
        .iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result alias for bus operations
pub type Result<T> = std::result::Result<T, BusError>;
