//! Registry of known event names
//!
//! Every name has to be registered before it can be published,
//! subscribed to or unregistered. The registry keeps registrations in
//! insertion order and remembers where each one came from, so duplicate
//! registrations and typos produce useful errors.

use crate::error::{BusError, Result};
use crate::name::EventName;
use chrono::{DateTime, Utc};

/// One registered event name
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    event_name: EventName,
    origin: String,
    registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(event_name: EventName, origin: impl Into<String>) -> Self {
        Self {
            event_name,
            origin: origin.into(),
            registered_at: Utc::now(),
        }
    }

    pub fn event_name(&self) -> &EventName {
        &self.event_name
    }

    /// Who registered the event (a call site or a free-form description)
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }
}

/// Insertion-ordered set of registrations, unique by event name
#[derive(Debug, Clone, Default)]
pub struct Registry {
    registrations: Vec<Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, recording `origin`.
    ///
    /// Fails with [`BusError::InvalidName`] for a malformed name and with
    /// [`BusError::AlreadyRegistered`] when the name is taken.
    pub fn register(&mut self, name: &str, origin: impl Into<String>) -> Result<Registration> {
        let event_name = EventName::new(name)?;

        if let Some(existing) = self.registration(event_name.as_str()) {
            return Err(BusError::AlreadyRegistered {
                name: event_name,
                origin: existing.origin.clone(),
            });
        }

        let registration = Registration::new(event_name, origin);
        self.registrations.push(registration.clone());
        Ok(registration)
    }

    /// Remove `name`, returning its registration.
    pub fn unregister(&mut self, name: &str) -> Result<Registration> {
        let index = self
            .registrations
            .iter()
            .position(|r| r.event_name == *name)
            .ok_or_else(|| self.unknown_event(name))?;

        Ok(self.registrations.remove(index))
    }

    pub fn registration(&self, name: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.event_name == *name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registration(name).is_some()
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<EventName> {
        self.registrations
            .iter()
            .map(|r| r.event_name.clone())
            .collect()
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Guard used before any use of `name`.
    pub fn check(&self, name: &str) -> Result<()> {
        if self.is_registered(name) {
            Ok(())
        } else {
            Err(self.unknown_event(name))
        }
    }

    /// Registered name for `name`, or the same error [`Registry::check`] gives.
    pub(crate) fn resolve(&self, name: &str) -> Result<EventName> {
        self.registration(name)
            .map(|r| r.event_name.clone())
            .ok_or_else(|| self.unknown_event(name))
    }

    fn unknown_event(&self, name: &str) -> BusError {
        let known = self.names();
        let suggestion = closest_match(name, &known);

        BusError::UnknownEvent {
            name: name.to_string(),
            known,
            suggestion,
        }
    }
}

/// Closest known name within a typo-sized edit distance.
///
/// Names of three characters or fewer allow a single edit; longer ones a
/// third of their length, at least two.
fn closest_match(name: &str, known: &[EventName]) -> Option<EventName> {
    let threshold = match name.chars().count() {
        0..=3 => 1,
        len => (len / 3).max(2),
    };

    known
        .iter()
        .map(|candidate| (levenshtein(name, candidate.as_str()), candidate))
        .filter(|(distance, _)| *distance <= threshold)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.clone())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
