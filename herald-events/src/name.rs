//! Event names and name derivation

use crate::error::{BusError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const MAX_SYMBOL_LEN: usize = 255;

/// Shared validity rule for event names and subscription ids.
pub(crate) fn check_symbol(value: &str) -> std::result::Result<(), &'static str> {
    if value.is_empty() {
        return Err("must not be empty");
    }
    if value.len() > MAX_SYMBOL_LEN {
        return Err("must be at most 255 bytes long");
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("must not contain whitespace or control characters");
    }
    Ok(())
}

/// Name under which events are registered, published and matched.
///
/// Cheap to clone (the string is shared) and compared by value.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventName(Arc<str>);

impl EventName {
    /// Create a validated event name
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_events::EventName;
    ///
    /// let name = EventName::new("order_created").unwrap();
    /// assert_eq!(name, "order_created");
    /// assert!(EventName::new("order created").is_err());
    /// ```
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        check_symbol(name).map_err(|reason| BusError::InvalidName {
            name: name.to_string(),
            reason,
        })?;
        Ok(Self(Arc::from(name)))
    }

    /// Derive the name of type `T` using [`NameStrategy::DEFAULT`].
    ///
    /// ```
    /// use herald_events::EventName;
    ///
    /// struct OrderCreated;
    /// assert_eq!(EventName::of::<OrderCreated>(), "order_created");
    /// ```
    pub fn of<T: ?Sized>() -> Self {
        Self::of_with::<T>(NameStrategy::DEFAULT)
    }

    /// Derive the name of type `T` using an explicit strategy.
    pub fn of_with<T: ?Sized>(strategy: NameStrategy) -> Self {
        Self(Arc::from(strategy.derive(std::any::type_name::<T>())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventName({:?})", &*self.0)
    }
}

impl AsRef<str> for EventName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for EventName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for EventName {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for EventName {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl FromStr for EventName {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for EventName {
    type Error = BusError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for EventName {
    type Error = BusError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<EventName> for String {
    fn from(name: EventName) -> Self {
        name.0.to_string()
    }
}

/// How an event name is derived from a Rust type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameStrategy {
    /// Last path segment in snake_case: `shop::orders::OrderCreated` → `order_created`
    #[default]
    TypeName,
    /// Every path segment in snake_case, joined with `.`:
    /// `shop::orders::OrderCreated` → `shop.orders.order_created`
    Qualified,
}

impl NameStrategy {
    /// Process-wide default used by [`EventName::of`].
    pub const DEFAULT: NameStrategy = NameStrategy::TypeName;

    /// Parse a strategy from its configuration spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "type_name" | "typename" | "short" => Some(NameStrategy::TypeName),
            "qualified" | "full" => Some(NameStrategy::Qualified),
            _ => None,
        }
    }

    /// Derive a name from a fully qualified type name.
    pub fn derive(self, type_name: &str) -> String {
        // Generic arguments never take part in the name.
        let path = type_name.split('<').next().unwrap_or(type_name);

        match self {
            NameStrategy::TypeName => path
                .rsplit("::")
                .find(|s| !s.is_empty())
                .map(to_snake_case)
                .unwrap_or_else(|| to_snake_case(path)),
            NameStrategy::Qualified => path
                .split("::")
                .filter(|s| !s.is_empty())
                .map(to_snake_case)
                .collect::<Vec<_>>()
                .join("."),
        }
    }
}

fn to_snake_case(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::with_capacity(segment.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c.is_whitespace() || c.is_control() {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    out
}
