//! Synchronous in-process publish/subscribe for Herald
//!
//! This crate provides an event bus that dispatches events to callbacks on
//! the publishing thread and hands back a record of what ran.
//!
//! ## Features
//!
//! - **Registry** - Events must be registered before use; typos get suggestions
//! - **Subscriptions** - Single-event, all-events or custom matchers
//! - **Publications** - Every publish returns its executions with results and timings
//! - **Scoped overrides** - Temporarily restrict which subscriptions run
//!
//! ## Quick Start
//!
//! ```rust
//! use herald_events::*;
//! use std::any::Any;
//!
//! // Define an event
//! #[derive(Debug)]
//! struct UserCreated {
//!     email: String,
//! }
//!
//! impl Event for UserCreated {
//!     fn event_name(&self) -> EventName { EventName::of::<Self>() }
//!     fn as_any(&self) -> &dyn Any { self }
//! }
//!
//! let mut bus = Bus::new();
//! bus.register("user_created").unwrap();
//!
//! // Subscribe a callback
//! bus.subscribe(
//!     "user_created",
//!     Callback::new(|event| {
//!         let user = event.downcast_ref::<UserCreated>().ok_or("not a UserCreated")?;
//!         Ok(format!("welcome mail to {}", user.email))
//!     }),
//! )
//! .unwrap();
//!
//! // Publish event
//! let publication = bus
//!     .publish(UserCreated { email: "alice@example.com".to_string() })
//!     .unwrap();
//! assert_eq!(publication.results(), vec!["welcome mail to alice@example.com"]);
//! ```
//!
//! ## Ad hoc events
//!
//! ```rust
//! use herald_events::*;
//! use serde_json::json;
//!
//! let mut bus = Bus::new();
//! bus.register("order_created").unwrap();
//! bus.subscribe_to_all(Callback::with_context(|event, ctx| {
//!     Ok(json!({
//!         "event": event.event_name().as_str(),
//!         "line": ctx.caller_location().line(),
//!     }))
//! }))
//! .unwrap();
//!
//! let mut payload = Payload::new();
//! payload.insert("amount".to_string(), json!(10));
//! let publication = bus.publish_named("order_created", payload).unwrap();
//! assert_eq!(publication.executions().len(), 1);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use herald_events::*;
//!
//! let bus = Bus::builder()
//!     .enable_logging(false)                   // No tracing output
//!     .name_strategy(NameStrategy::Qualified)  // Module-qualified type names
//!     .build()
//!     .unwrap();
//! # let _ = bus;
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use herald_events::*;
//!
//! let bus = Bus::new();
//! bus.register("order_created").unwrap();
//!
//! match bus.publish_named("order_craeted", Payload::new()) {
//!     Ok(_) => unreachable!(),
//!     Err(BusError::UnknownEvent { suggestion, .. }) => {
//!         assert_eq!(suggestion.unwrap(), "order_created");
//!     }
//!     Err(e) => panic!("{e}"),
//! }
//! ```
//!
//! A callback that fails stops the publish call and its error comes back
//! unchanged as [`BusError::Callback`].

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod execution;
pub mod matcher;
pub mod name;
pub mod registry;
pub mod subscription;

pub use bus::{Bus, BusBuilder, SharedRegistry, SubscriptionOverride};
pub use config::{BusConfig, ConfigError};
pub use error::{BusError, CallbackError, Result};
pub use event::{AdHocEvent, Event, Payload, PublishedEvent};
pub use execution::{Benchmark, Execution, Publication, PublicationContext};
pub use matcher::Matcher;
pub use name::{EventName, NameStrategy};
pub use registry::{Registration, Registry};
pub use subscription::{Callback, CallbackResult, Subscription, SubscriptionId};
