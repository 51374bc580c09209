//! Subscription matchers
//!
//! A matcher decides whether a subscription applies to a published event.
//! The two canonical families are single-event (name equality) and
//! all-events; anything else is a custom predicate over the event.

use crate::error::Result;
use crate::event::Event;
use crate::name::EventName;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&dyn Event) -> bool + Send + Sync>;

/// Match predicate carried by a subscription
#[derive(Clone)]
pub enum Matcher {
    /// Matches events whose name equals the subscribed name
    Event(EventName),
    /// Matches every event
    All,
    /// Arbitrary predicate over the event
    Custom(Predicate),
}

impl Matcher {
    pub fn event(name: EventName) -> Self {
        Matcher::Event(name)
    }

    pub fn all() -> Self {
        Matcher::All
    }

    /// Wrap an arbitrary predicate
    ///
    /// ```
    /// use herald_events::{Event, Matcher};
    ///
    /// let matcher = Matcher::custom(|event: &dyn Event| event.payload().is_some());
    /// # let _ = matcher;
    /// ```
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&dyn Event) -> bool + Send + Sync + 'static,
    {
        Matcher::Custom(Arc::new(predicate))
    }

    /// Match every event whose name starts with `prefix`
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Matcher::custom(move |event| event.event_name().as_str().starts_with(&prefix))
    }

    /// Match every event whose name matches a regular expression
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)?;
        Ok(Matcher::custom(move |event| {
            regex.is_match(event.event_name().as_str())
        }))
    }

    /// Evaluate the predicate
    pub fn matches(&self, event: &dyn Event) -> bool {
        match self {
            Matcher::Event(name) => *name == event.event_name(),
            Matcher::All => true,
            Matcher::Custom(predicate) => predicate(event),
        }
    }

    /// The event this matcher is bound to, for single-event matchers
    pub fn event_name(&self) -> Option<&EventName> {
        match self {
            Matcher::Event(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Event(name) => f.debug_tuple("Event").field(name).finish(),
            Matcher::All => f.write_str("All"),
            Matcher::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
