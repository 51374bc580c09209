//! Event Bus implementation

use crate::config::BusConfig;
use crate::error::{BusError, Result};
use crate::event::{AdHocEvent, Event, Payload, PublishedEvent};
use crate::execution::{Publication, PublicationContext};
use crate::matcher::Matcher;
use crate::name::{EventName, NameStrategy};
use crate::registry::{Registration, Registry};
use crate::subscription::{Callback, Subscription, SubscriptionId};
use chrono::Utc;
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::HashSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::Location;
use std::sync::Arc;
use tracing::{debug, trace};

/// Registry handle shared between a bus and the buses derived from it
pub type SharedRegistry = Arc<RwLock<Registry>>;

/// Synchronous in-process event bus.
///
/// Holds the registry of known event names and the ordered list of
/// subscriptions. Publishing runs every active matching callback on the
/// calling thread, in subscription order, and stops at the first callback
/// error.
///
/// Mutating methods take `&mut self`; share a bus between threads by
/// wrapping it in a lock.
pub struct Bus {
    registry: SharedRegistry,
    subscriptions: Vec<Arc<Subscription>>,
    /// Subscriptions hidden by an open override; empty outside one
    suspended: Vec<Arc<Subscription>>,
    config: Arc<BusConfig>,
}

impl Bus {
    /// Create new event bus
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create event bus with custom config
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::new())),
            subscriptions: Vec::new(),
            suspended: Vec::new(),
            config: Arc::new(config),
        }
    }

    pub fn builder() -> BusBuilder {
        BusBuilder::new()
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Registry
    // ---------------------------------------------------------------------

    /// Register an event name, recording the caller as its origin.
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_events::Bus;
    ///
    /// let bus = Bus::new();
    /// bus.register("order_created").unwrap();
    /// assert!(bus.register("order_created").is_err());
    /// ```
    #[track_caller]
    pub fn register(&self, name: &str) -> Result<Registration> {
        let origin = Location::caller().to_string();
        self.register_with_origin(name, origin)
    }

    /// Register an event name with an explicit origin description
    pub fn register_with_origin(
        &self,
        name: &str,
        origin: impl Into<String>,
    ) -> Result<Registration> {
        let registration = self.registry.write().register(name, origin)?;

        if self.config.enable_logging {
            debug!(
                event = %registration.event_name(),
                origin = registration.origin(),
                "Registered event"
            );
        }

        Ok(registration)
    }

    /// Register the name derived from type `T` with the configured strategy
    #[track_caller]
    pub fn register_type<T: ?Sized>(&self) -> Result<Registration> {
        let origin = Location::caller().to_string();
        let name = self.event_name_of::<T>();
        self.register_with_origin(name.as_str(), origin)
    }

    /// Name type `T` gets under this bus's [`NameStrategy`]
    pub fn event_name_of<T: ?Sized>(&self) -> EventName {
        EventName::of_with::<T>(self.name_strategy())
    }

    pub fn name_strategy(&self) -> NameStrategy {
        self.config.name_strategy
    }

    /// Unregister an event name.
    ///
    /// Single-event subscriptions bound to the name are removed from this
    /// bus as well, including ones suspended by an open override.
    pub fn unregister(&mut self, name: &str) -> Result<Registration> {
        let registration = self.registry.write().unregister(name)?;

        let before = self.subscriptions.len();
        let bound =
            |s: &Arc<Subscription>| s.matcher().event_name() == Some(registration.event_name());
        self.subscriptions.retain(|s| !bound(s));
        self.suspended.retain(|s| !bound(s));

        if self.config.enable_logging {
            debug!(
                event = %registration.event_name(),
                dropped_subscriptions = before - self.subscriptions.len(),
                "Unregistered event"
            );
        }

        Ok(registration)
    }

    /// Read access to the registry
    pub fn registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read()
    }

    /// Handle to the registry, shared with buses derived from this one
    pub fn shared_registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.read().is_registered(name)
    }

    /// Registered names in registration order
    pub fn event_names(&self) -> Vec<EventName> {
        self.registry.read().names()
    }

    // ---------------------------------------------------------------------
    // Subscriptions
    // ---------------------------------------------------------------------

    /// Subscribe a callback to a registered event
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_events::{Bus, Callback};
    ///
    /// let mut bus = Bus::new();
    /// bus.register("order_created").unwrap();
    /// let subscription = bus
    ///     .subscribe("order_created", Callback::new(|_event| Ok("sent")))
    ///     .unwrap();
    ///
    /// let publication = bus.publish_named("order_created", Default::default()).unwrap();
    /// assert_eq!(publication.executions()[0].result(), "sent");
    /// # let _ = subscription;
    /// ```
    pub fn subscribe(&mut self, name: &str, callback: Callback) -> Result<Arc<Subscription>> {
        self.subscribe_to_event(name, callback, None)
    }

    /// Like [`Bus::subscribe`] with a caller-chosen id
    pub fn subscribe_with_id(
        &mut self,
        name: &str,
        callback: Callback,
        id: SubscriptionId,
    ) -> Result<Arc<Subscription>> {
        self.subscribe_to_event(name, callback, Some(id))
    }

    /// Subscribe a callback to every published event
    pub fn subscribe_to_all(&mut self, callback: Callback) -> Result<Arc<Subscription>> {
        self.subscribe_with_matcher(Matcher::All, callback, None)
    }

    /// Like [`Bus::subscribe_to_all`] with a caller-chosen id
    pub fn subscribe_to_all_with_id(
        &mut self,
        callback: Callback,
        id: SubscriptionId,
    ) -> Result<Arc<Subscription>> {
        self.subscribe_with_matcher(Matcher::All, callback, Some(id))
    }

    /// General form: subscribe with any matcher.
    ///
    /// Without an id a random one is generated. Ids must be unique among all
    /// subscriptions, suspended ones included. A subscription made inside an
    /// override is active straight away and stays after the override ends.
    pub fn subscribe_with_matcher(
        &mut self,
        matcher: Matcher,
        callback: Callback,
        id: Option<SubscriptionId>,
    ) -> Result<Arc<Subscription>> {
        let id = id.unwrap_or_else(SubscriptionId::random);
        if self.subscriptions.iter().any(|s| *s.id() == id) {
            return Err(BusError::DuplicateSubscriptionId(id));
        }

        let subscription = Arc::new(Subscription::new(matcher, callback, id));
        self.subscriptions.push(Arc::clone(&subscription));

        if self.config.enable_logging {
            debug!(
                subscription = %subscription.id(),
                matcher = ?subscription.matcher(),
                arity = subscription.callback().arity(),
                "Subscribed"
            );
        }

        Ok(subscription)
    }

    fn subscribe_to_event(
        &mut self,
        name: &str,
        callback: Callback,
        id: Option<SubscriptionId>,
    ) -> Result<Arc<Subscription>> {
        let event_name = self.registry.read().resolve(name)?;
        self.subscribe_with_matcher(Matcher::Event(event_name), callback, id)
    }

    /// Remove a subscription, suspended or not. Returns whether it was
    /// subscribed.
    ///
    /// The removal outlives any override that is open at the time.
    pub fn unsubscribe(&mut self, subscription: &Arc<Subscription>) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| !Arc::ptr_eq(s, subscription));
        self.suspended.retain(|s| !Arc::ptr_eq(s, subscription));
        let removed = self.subscriptions.len() != before;

        if removed && self.config.enable_logging {
            debug!(subscription = %subscription.id(), "Unsubscribed");
        }

        removed
    }

    /// Active subscription with the given id
    pub fn subscription(&self, id: &SubscriptionId) -> Option<Arc<Subscription>> {
        self.active().find(|s| s.id() == id).cloned()
    }

    /// Active subscriptions in dispatch order
    pub fn subscriptions(&self) -> Vec<Arc<Subscription>> {
        self.active().cloned().collect()
    }

    /// Every subscription in registration order, suspended ones included
    pub fn all_subscriptions(&self) -> &[Arc<Subscription>] {
        &self.subscriptions
    }

    fn active(&self) -> impl Iterator<Item = &Arc<Subscription>> {
        let suspended = &self.suspended;
        self.subscriptions
            .iter()
            .filter(move |s| !contains(suspended, s))
    }

    fn is_active(&self, subscription: &Arc<Subscription>) -> bool {
        self.active().any(|s| Arc::ptr_eq(s, subscription))
    }

    // ---------------------------------------------------------------------
    // Publishing
    // ---------------------------------------------------------------------

    /// Publish a structured event
    #[track_caller]
    pub fn publish<E: Event>(&self, event: E) -> Result<Publication> {
        let caller = Location::caller();
        self.dispatch(PublishedEvent::structured(event), caller)
    }

    /// Publish an ad hoc event by name
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_events::{Bus, Payload};
    /// use serde_json::json;
    ///
    /// let bus = Bus::new();
    /// bus.register("order_created").unwrap();
    ///
    /// let mut payload = Payload::new();
    /// payload.insert("amount".to_string(), json!(10));
    /// let publication = bus.publish_named("order_created", payload).unwrap();
    ///
    /// assert_eq!(publication.event().payload().unwrap()["amount"], 10);
    /// assert!(publication.is_empty());
    /// ```
    #[track_caller]
    pub fn publish_named(&self, name: &str, payload: Payload) -> Result<Publication> {
        let caller = Location::caller();
        let event_name = self.registry.read().resolve(name)?;
        self.dispatch(AdHocEvent::new(event_name, payload).into(), caller)
    }

    /// Publish an event that has already been resolved
    #[track_caller]
    pub fn publish_event(&self, event: PublishedEvent) -> Result<Publication> {
        let caller = Location::caller();
        self.dispatch(event, caller)
    }

    fn dispatch(
        &self,
        event: PublishedEvent,
        caller: &'static Location<'static>,
    ) -> Result<Publication> {
        let name = event.name();
        self.registry.read().check(name.as_str())?;

        let context = PublicationContext::new(caller, Utc::now());
        let matching: Vec<Arc<Subscription>> = self
            .active()
            .filter(|s| s.matches(event.as_event()))
            .cloned()
            .collect();

        if self.config.enable_logging {
            debug!(
                event = %name,
                matched = matching.len(),
                caller = %caller,
                "Publishing event"
            );
        }

        let mut executions = Vec::with_capacity(matching.len());
        for subscription in &matching {
            let execution = subscription
                .invoke(&event, &context)
                .map_err(BusError::Callback)?;

            if self.config.enable_logging {
                trace!(
                    event = %name,
                    subscription = %subscription.id(),
                    elapsed_us = execution.benchmark().elapsed().as_micros() as u64,
                    "Executed subscription"
                );
            }

            executions.push(execution);
        }

        Ok(Publication::new(event, executions, context))
    }

    // ---------------------------------------------------------------------
    // Scoped overrides
    // ---------------------------------------------------------------------

    /// Restrict dispatch to `keep` until the returned guard is dropped.
    ///
    /// Fails with [`BusError::UnknownSubscription`] if any of them is not
    /// active. The kept subscriptions stay in their original order. Other
    /// active subscriptions are suspended, not removed: subscribing,
    /// unsubscribing and unregistering through the guard all persist once
    /// it is dropped.
    pub fn override_only(
        &mut self,
        keep: &[Arc<Subscription>],
    ) -> Result<SubscriptionOverride<'_>> {
        if let Some(missing) = keep.iter().find(|s| !self.is_active(s)) {
            return Err(BusError::UnknownSubscription(missing.id().clone()));
        }

        let hidden = self
            .active()
            .filter(|active| !contains(keep, active))
            .cloned()
            .collect();

        Ok(self.suspend(hidden))
    }

    /// Run `f` with only `keep` active, restoring every subscription
    /// afterwards, even if `f` panics.
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_events::{Bus, Callback};
    /// use serde_json::Value;
    ///
    /// let mut bus = Bus::new();
    /// bus.register("tick").unwrap();
    /// let a = bus.subscribe("tick", Callback::new(|_e| Ok("a"))).unwrap();
    /// bus.subscribe("tick", Callback::new(|_e| Ok("b"))).unwrap();
    ///
    /// let publication = bus
    ///     .performing_only(&[a], |bus| bus.publish_named("tick", Default::default()))
    ///     .unwrap()
    ///     .unwrap();
    /// assert_eq!(publication.results(), vec![&Value::from("a")]);
    /// assert_eq!(bus.subscriptions().len(), 2);
    /// ```
    pub fn performing_only<R, F>(&mut self, keep: &[Arc<Subscription>], f: F) -> Result<R>
    where
        F: FnOnce(&mut Bus) -> R,
    {
        let mut guard = self.override_only(keep)?;
        Ok(f(&mut *guard))
    }

    /// Run `f` with no active subscriptions
    pub fn performing_nothing<R, F>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Bus) -> R,
    {
        let hidden = self.active().cloned().collect();
        let mut guard = self.suspend(hidden);
        f(&mut *guard)
    }

    fn suspend(&mut self, hidden: Vec<Arc<Subscription>>) -> SubscriptionOverride<'_> {
        let previous = self.suspended.clone();
        self.suspended.extend(hidden);

        if self.config.enable_logging {
            debug!(
                active = self.active().count(),
                suspended = self.suspended.len(),
                "Overriding active subscriptions"
            );
        }

        SubscriptionOverride { bus: self, previous }
    }

    // ---------------------------------------------------------------------
    // Derivation and reset
    // ---------------------------------------------------------------------

    /// New bus sharing this bus's registry, with its own subscription list.
    pub fn with_subscriptions(&self, subscriptions: Vec<Arc<Subscription>>) -> Result<Bus> {
        ensure_unique_ids(&subscriptions)?;

        Ok(Bus {
            registry: Arc::clone(&self.registry),
            subscriptions,
            suspended: Vec::new(),
            config: Arc::clone(&self.config),
        })
    }

    /// Drop every registration and subscription.
    ///
    /// The bus gets a fresh registry; buses derived earlier keep the old one.
    pub fn clear(&mut self) -> &mut Self {
        self.registry = Arc::new(RwLock::new(Registry::new()));
        self.subscriptions.clear();
        self.suspended.clear();

        if self.config.enable_logging {
            debug!("Cleared event bus");
        }

        self
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("events", &self.registry.read().names())
            .field("subscriptions", &self.subscriptions.len())
            .field("suspended", &self.suspended.len())
            .field("config", &self.config)
            .finish()
    }
}

fn contains(list: &[Arc<Subscription>], subscription: &Arc<Subscription>) -> bool {
    list.iter().any(|s| Arc::ptr_eq(s, subscription))
}

fn ensure_unique_ids(subscriptions: &[Arc<Subscription>]) -> Result<()> {
    let mut seen = HashSet::with_capacity(subscriptions.len());
    for subscription in subscriptions {
        if !seen.insert(subscription.id()) {
            return Err(BusError::DuplicateSubscriptionId(subscription.id().clone()));
        }
    }
    Ok(())
}

/// Guard returned by [`Bus::override_only`].
///
/// Derefs to the bus; dropping it reactivates the subscriptions the
/// override suspended. Overrides nest: each guard restores the state that
/// was in effect when it was created.
pub struct SubscriptionOverride<'a> {
    bus: &'a mut Bus,
    previous: Vec<Arc<Subscription>>,
}

impl Deref for SubscriptionOverride<'_> {
    type Target = Bus;

    fn deref(&self) -> &Bus {
        &*self.bus
    }
}

impl DerefMut for SubscriptionOverride<'_> {
    fn deref_mut(&mut self) -> &mut Bus {
        &mut *self.bus
    }
}

impl Drop for SubscriptionOverride<'_> {
    fn drop(&mut self) {
        let mut previous = std::mem::take(&mut self.previous);
        previous.retain(|s| contains(&self.bus.subscriptions, s));
        self.bus.suspended = previous;

        if self.bus.config.enable_logging {
            debug!(
                active = self.bus.active().count(),
                suspended = self.bus.suspended.len(),
                "Restored active subscriptions"
            );
        }
    }
}

/// Event bus builder
pub struct BusBuilder {
    config: BusConfig,
    registry: Option<SharedRegistry>,
    subscriptions: Vec<Arc<Subscription>>,
}

impl BusBuilder {
    /// Create new event bus builder
    pub fn new() -> Self {
        Self {
            config: BusConfig::default(),
            registry: None,
            subscriptions: Vec::new(),
        }
    }

    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    pub fn name_strategy(mut self, strategy: NameStrategy) -> Self {
        self.config.name_strategy = strategy;
        self
    }

    /// Start from a pre-built registry
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(Arc::new(RwLock::new(registry)));
        self
    }

    /// Share a registry with another bus
    pub fn shared_registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Seed the subscription list
    pub fn subscriptions(mut self, subscriptions: Vec<Arc<Subscription>>) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    /// Build the event bus
    pub fn build(self) -> Result<Bus> {
        ensure_unique_ids(&self.subscriptions)?;

        Ok(Bus {
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(RwLock::new(Registry::new()))),
            subscriptions: self.subscriptions,
            suspended: Vec::new(),
            config: Arc::new(self.config),
        })
    }
}

impl Default for BusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallbackError;
    use serde_json::{json, Value};
    use std::any::Any;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone)]
    struct OrderShipped {
        order_id: u64,
    }

    impl Event for OrderShipped {
        fn event_name(&self) -> EventName {
            EventName::of::<Self>()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn counter_callback(counter: &Arc<AtomicU32>) -> Callback {
        let counter = Arc::clone(counter);
        Callback::new(move |_event| Ok(counter.fetch_add(1, Ordering::SeqCst) + 1))
    }

    fn labelled(label: &'static str) -> Callback {
        Callback::new(move |_event| Ok(label))
    }

    fn failing(message: &'static str) -> Callback {
        Callback::new(move |_event| -> std::result::Result<Value, CallbackError> {
            Err(message.into())
        })
    }

    fn bus_with(names: &[&str]) -> Bus {
        let bus = Bus::builder().enable_logging(false).build().unwrap();
        for name in names {
            bus.register(name).unwrap();
        }
        bus
    }

    fn id(value: &str) -> SubscriptionId {
        SubscriptionId::new(value).unwrap()
    }

    #[test]
    fn test_register_records_call_site() {
        let bus = bus_with(&[]);
        let line = line!() + 1;
        let registration = bus.register("order_created").unwrap();

        assert!(registration
            .origin()
            .starts_with(&format!("{}:{}:", file!(), line)));
    }

    #[test]
    fn test_register_twice_surfaces_first_origin() {
        let bus = bus_with(&[]);
        bus.register_with_origin("order_created", "checkout flow")
            .unwrap();

        let err = bus.register("order_created").unwrap_err();
        assert!(err.to_string().contains("checkout flow"));
    }

    #[test]
    fn test_subscribe_unknown_event() {
        let mut bus = bus_with(&["order_created"]);
        let err = bus.subscribe("order_craeted", labelled("x")).unwrap_err();

        match err {
            BusError::UnknownEvent { suggestion, .. } => {
                assert_eq!(suggestion.unwrap(), "order_created")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(bus.subscriptions().is_empty());
    }

    #[test]
    fn test_publish_unknown_event_runs_nothing() {
        let mut bus = bus_with(&["foo"]);
        let counter = Arc::new(AtomicU32::new(0));
        bus.subscribe_to_all(counter_callback(&counter)).unwrap();

        assert!(matches!(
            bus.publish_named("bar", Payload::new()),
            Err(BusError::UnknownEvent { .. })
        ));
        assert!(matches!(
            bus.publish(OrderShipped { order_id: 1 }),
            Err(BusError::UnknownEvent { .. })
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_single_event_and_all_matchers() {
        let mut bus = bus_with(&["foo", "bar"]);
        let foo_counter = Arc::new(AtomicU32::new(0));
        let all_counter = Arc::new(AtomicU32::new(0));
        bus.subscribe("foo", counter_callback(&foo_counter)).unwrap();
        bus.subscribe_to_all(counter_callback(&all_counter)).unwrap();

        bus.publish_named("foo", Payload::new()).unwrap();
        bus.publish_named("bar", Payload::new()).unwrap();

        assert_eq!(foo_counter.load(Ordering::SeqCst), 1);
        assert_eq!(all_counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_executions_follow_subscription_order() {
        let mut bus = bus_with(&["tick"]);
        let a = bus.subscribe("tick", labelled("a")).unwrap();
        let b = bus.subscribe("tick", labelled("b")).unwrap();
        let c = bus.subscribe_to_all(labelled("c")).unwrap();

        let publication = bus.publish_named("tick", Payload::new()).unwrap();
        let order: Vec<_> = publication
            .executions()
            .iter()
            .map(|e| e.subscription().id().clone())
            .collect();

        assert_eq!(order, vec![a.id().clone(), b.id().clone(), c.id().clone()]);
        assert_eq!(publication.results(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_structured_event_reaches_callback() {
        let mut bus = bus_with(&[]);
        bus.register_type::<OrderShipped>().unwrap();
        bus.subscribe(
            "order_shipped",
            Callback::new(|event| {
                let shipped = event
                    .downcast_ref::<OrderShipped>()
                    .ok_or("unexpected event type")?;
                Ok(shipped.order_id)
            }),
        )
        .unwrap();

        let publication = bus.publish(OrderShipped { order_id: 42 }).unwrap();
        assert_eq!(publication.executions()[0].result(), &json!(42));
        assert!(publication.event().payload().is_none());
    }

    #[test]
    fn test_context_callback_sees_publish_call_site() {
        let mut bus = bus_with(&["tick"]);
        bus.subscribe(
            "tick",
            Callback::with_context(|_event, ctx| Ok(ctx.caller_location().line())),
        )
        .unwrap();

        let line = line!() + 1;
        let publication = bus.publish_named("tick", Payload::new()).unwrap();

        assert_eq!(publication.executions()[0].result(), &json!(line));
        assert_eq!(publication.context().caller_location().line(), line);
    }

    #[test]
    fn test_callback_error_stops_dispatch() {
        let mut bus = bus_with(&["tick"]);
        let counter = Arc::new(AtomicU32::new(0));
        bus.subscribe("tick", counter_callback(&counter)).unwrap();
        bus.subscribe("tick", failing("card declined")).unwrap();
        bus.subscribe("tick", counter_callback(&counter)).unwrap();

        let err = bus.publish_named("tick", Payload::new()).unwrap_err();

        assert!(err.is_callback());
        assert_eq!(err.to_string(), "card declined");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_subscription_id() {
        let mut bus = bus_with(&["tick"]);
        bus.subscribe_with_id("tick", labelled("a"), id("audit"))
            .unwrap();

        let err = bus
            .subscribe_to_all_with_id(labelled("b"), id("audit"))
            .unwrap_err();

        assert!(matches!(err, BusError::DuplicateSubscriptionId(ref dup) if *dup == "audit"));
        assert_eq!(bus.subscriptions().len(), 1);
    }

    #[test]
    fn test_subscription_lookup_returns_same_object() {
        let mut bus = bus_with(&["tick"]);
        let created = bus
            .subscribe_with_id("tick", labelled("a"), id("mailer"))
            .unwrap();

        let found = bus.subscription(&id("mailer")).unwrap();
        assert!(Arc::ptr_eq(&created, &found));
        assert!(bus.subscription(&id("missing")).is_none());
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let mut bus = bus_with(&["tick"]);
        let counter = Arc::new(AtomicU32::new(0));
        let subscription = bus.subscribe("tick", counter_callback(&counter)).unwrap();

        assert!(bus.unsubscribe(&subscription));
        assert!(!bus.unsubscribe(&subscription));

        bus.publish_named("tick", Payload::new()).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unregister_removes_bound_subscriptions() {
        let mut bus = bus_with(&["foo", "bar"]);
        bus.subscribe("foo", labelled("foo")).unwrap();
        bus.subscribe("bar", labelled("bar")).unwrap();
        let all = bus.subscribe_to_all(labelled("all")).unwrap();

        bus.unregister("foo").unwrap();

        assert!(!bus.is_registered("foo"));
        assert_eq!(bus.subscriptions().len(), 2);
        assert!(bus.subscriptions().iter().any(|s| Arc::ptr_eq(s, &all)));
        assert!(matches!(
            bus.unregister("foo"),
            Err(BusError::UnknownEvent { .. })
        ));
    }

    #[test]
    fn test_performing_only_scopes_and_restores() {
        let mut bus = bus_with(&["tick"]);
        let x_counter = Arc::new(AtomicU32::new(0));
        let y_counter = Arc::new(AtomicU32::new(0));
        let x = bus.subscribe("tick", counter_callback(&x_counter)).unwrap();
        bus.subscribe("tick", counter_callback(&y_counter)).unwrap();

        bus.performing_only(&[x], |bus| {
            bus.publish_named("tick", Payload::new()).unwrap();
        })
        .unwrap();
        assert_eq!(x_counter.load(Ordering::SeqCst), 1);
        assert_eq!(y_counter.load(Ordering::SeqCst), 0);

        bus.publish_named("tick", Payload::new()).unwrap();
        assert_eq!(x_counter.load(Ordering::SeqCst), 2);
        assert_eq!(y_counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_performing_only_keeps_registration_order() {
        let mut bus = bus_with(&["tick"]);
        let a = bus.subscribe("tick", labelled("a")).unwrap();
        bus.subscribe("tick", labelled("b")).unwrap();
        let c = bus.subscribe("tick", labelled("c")).unwrap();

        let publication = bus
            .performing_only(&[c, a], |bus| bus.publish_named("tick", Payload::new()))
            .unwrap()
            .unwrap();

        assert_eq!(publication.results(), vec!["a", "c"]);
    }

    #[test]
    fn test_performing_only_restores_after_callback_error() {
        let mut bus = bus_with(&["tick"]);
        let failing_sub = bus.subscribe("tick", failing("nope")).unwrap();
        bus.subscribe("tick", labelled("other")).unwrap();

        let inner = bus
            .performing_only(&[failing_sub], |bus| {
                bus.publish_named("tick", Payload::new())
            })
            .unwrap();

        assert!(inner.unwrap_err().is_callback());
        assert_eq!(bus.subscriptions().len(), 2);
    }

    #[test]
    fn test_performing_only_restores_after_panic() {
        let mut bus = bus_with(&["tick"]);
        let a = bus.subscribe("tick", labelled("a")).unwrap();
        bus.subscribe("tick", labelled("b")).unwrap();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            bus.performing_only(&[a], |_bus| panic!("block blew up"))
        }));

        assert!(outcome.is_err());
        assert_eq!(bus.subscriptions().len(), 2);
    }

    #[test]
    fn test_performing_only_rejects_inactive_subscription() {
        let mut bus = bus_with(&["tick"]);
        let stale = bus.subscribe("tick", labelled("a")).unwrap();
        bus.unsubscribe(&stale);
        bus.subscribe("tick", labelled("b")).unwrap();

        let err = bus.performing_only(&[stale], |_bus| ()).unwrap_err();

        assert!(matches!(err, BusError::UnknownSubscription(_)));
        assert_eq!(bus.subscriptions().len(), 1);
    }

    #[test]
    fn test_performing_nothing() {
        let mut bus = bus_with(&["tick"]);
        bus.subscribe("tick", labelled("a")).unwrap();

        let publication = bus.performing_nothing(|bus| bus.publish_named("tick", Payload::new()));

        assert!(publication.unwrap().is_empty());
        assert_eq!(bus.subscriptions().len(), 1);
    }

    #[test]
    fn test_override_guard_restores_on_drop() {
        let mut bus = bus_with(&["tick"]);
        let a = bus.subscribe("tick", labelled("a")).unwrap();
        bus.subscribe("tick", labelled("b")).unwrap();

        {
            let guard = bus.override_only(&[a]).unwrap();
            assert_eq!(guard.subscriptions().len(), 1);
            assert_eq!(guard.all_subscriptions().len(), 2);
        }

        assert_eq!(bus.subscriptions().len(), 2);
    }

    #[test]
    fn test_unsubscribe_inside_performing_only_persists() {
        let mut bus = bus_with(&["tick"]);
        let counter = Arc::new(AtomicU32::new(0));
        let kept = bus.subscribe("tick", counter_callback(&counter)).unwrap();
        let hidden = bus.subscribe("tick", counter_callback(&counter)).unwrap();

        let removed = bus
            .performing_only(&[Arc::clone(&kept)], |bus| {
                (bus.unsubscribe(&kept), bus.unsubscribe(&hidden))
            })
            .unwrap();
        assert_eq!(removed, (true, true));

        bus.publish_named("tick", Payload::new()).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(bus.all_subscriptions().is_empty());
        assert!(!bus.unsubscribe(&kept));
    }

    #[test]
    fn test_subscribe_inside_performing_nothing_runs_and_persists() {
        let mut bus = bus_with(&["tick"]);
        bus.subscribe("tick", labelled("old")).unwrap();

        let (created, inside) = bus.performing_nothing(|bus| {
            let created = bus.subscribe("tick", labelled("new")).unwrap();
            let inside = bus.publish_named("tick", Payload::new()).unwrap();
            (created, inside)
        });
        assert_eq!(inside.results(), vec!["new"]);

        let after = bus.publish_named("tick", Payload::new()).unwrap();
        assert_eq!(after.results(), vec!["old", "new"]);
        let found = bus.subscription(created.id()).unwrap();
        assert!(Arc::ptr_eq(&found, &created));
    }

    #[test]
    fn test_unregister_inside_performing_nothing_drops_suspended_subscriptions() {
        let mut bus = bus_with(&["tick"]);
        let counter = Arc::new(AtomicU32::new(0));
        bus.subscribe("tick", counter_callback(&counter)).unwrap();
        let all = bus.subscribe_to_all(labelled("all")).unwrap();

        bus.performing_nothing(|bus| bus.unregister("tick")).unwrap();
        bus.register("tick").unwrap();

        let publication = bus.publish_named("tick", Payload::new()).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(publication.results(), vec!["all"]);
        assert_eq!(bus.all_subscriptions().len(), 1);
        assert!(Arc::ptr_eq(&bus.all_subscriptions()[0], &all));
    }

    #[test]
    fn test_duplicate_id_rejected_against_suspended_subscription() {
        let mut bus = bus_with(&["tick"]);
        bus.subscribe_with_id("tick", labelled("a"), id("audit"))
            .unwrap();

        let err = bus
            .performing_nothing(|bus| bus.subscribe_to_all_with_id(labelled("b"), id("audit")))
            .unwrap_err();

        assert!(matches!(err, BusError::DuplicateSubscriptionId(ref dup) if *dup == "audit"));
        assert_eq!(bus.all_subscriptions().len(), 1);
        assert_eq!(bus.subscriptions().len(), 1);
    }

    #[test]
    fn test_nested_overrides_keep_inner_subscriptions() {
        let mut bus = bus_with(&["tick"]);
        let a = bus.subscribe("tick", labelled("a")).unwrap();
        bus.subscribe("tick", labelled("b")).unwrap();

        let publication = bus
            .performing_only(&[a], |bus| {
                bus.performing_nothing(|bus| bus.subscribe("tick", labelled("c")).unwrap());
                bus.publish_named("tick", Payload::new()).unwrap()
            })
            .unwrap();
        assert_eq!(publication.results(), vec!["a", "c"]);

        let after = bus.publish_named("tick", Payload::new()).unwrap();
        assert_eq!(after.results(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_clear_inside_override() {
        let mut bus = bus_with(&["tick"]);
        let a = bus.subscribe("tick", labelled("a")).unwrap();
        bus.subscribe("tick", labelled("b")).unwrap();

        bus.performing_only(&[a], |bus| {
            bus.clear();
        })
        .unwrap();

        assert!(bus.all_subscriptions().is_empty());
        assert!(bus.subscriptions().is_empty());
    }

    #[test]
    fn test_with_subscriptions_shares_registry() {
        let mut bus = bus_with(&["tick"]);
        let a = bus.subscribe("tick", labelled("a")).unwrap();
        bus.subscribe("tick", labelled("b")).unwrap();

        let mut derived = bus.with_subscriptions(vec![Arc::clone(&a)]).unwrap();
        derived.register("tock").unwrap();
        derived.subscribe("tock", labelled("tock")).unwrap();

        assert!(bus.is_registered("tock"));
        assert_eq!(bus.subscriptions().len(), 2);
        assert_eq!(derived.subscriptions().len(), 2);

        let publication = derived.publish_named("tick", Payload::new()).unwrap();
        assert_eq!(publication.results(), vec!["a"]);
    }

    #[test]
    fn test_with_subscriptions_rejects_duplicate_ids() {
        let mut bus = bus_with(&["tick"]);
        let a = bus.subscribe("tick", labelled("a")).unwrap();

        let err = bus
            .with_subscriptions(vec![Arc::clone(&a), Arc::clone(&a)])
            .unwrap_err();
        assert!(matches!(err, BusError::DuplicateSubscriptionId(_)));
    }

    #[test]
    fn test_clear() {
        let mut bus = bus_with(&["tick"]);
        bus.subscribe("tick", labelled("a")).unwrap();
        let registry = bus.shared_registry();

        bus.clear().register("fresh").unwrap();

        assert_eq!(bus.event_names(), vec!["fresh"]);
        assert!(bus.subscriptions().is_empty());
        assert!(registry.read().is_registered("tick"));
    }

    #[test]
    fn test_builder_injects_registry_and_subscriptions() {
        let mut registry = Registry::new();
        registry.register("tick", "fixture").unwrap();
        let seed = Arc::new(Subscription::new(
            Matcher::all(),
            labelled("seed"),
            id("seed"),
        ));

        let bus = Bus::builder()
            .enable_logging(false)
            .registry(registry)
            .subscriptions(vec![seed])
            .build()
            .unwrap();

        let publication = bus.publish_named("tick", Payload::new()).unwrap();
        assert_eq!(publication.results(), vec!["seed"]);
        assert_eq!(bus.registry().registration("tick").unwrap().origin(), "fixture");
    }

    #[test]
    fn test_name_strategy_from_config() {
        let bus = Bus::builder()
            .enable_logging(false)
            .name_strategy(NameStrategy::Qualified)
            .build()
            .unwrap();

        let registration = bus.register_type::<OrderShipped>().unwrap();
        assert!(registration
            .event_name()
            .as_str()
            .ends_with("bus.tests.order_shipped"));
    }
}
