//! Records produced by dispatch: one [`Execution`] per invoked
//! subscription, one [`Publication`] per publish call.

use crate::event::PublishedEvent;
use crate::subscription::{Subscription, SubscriptionId};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

/// Metadata shared by every callback triggered from one publish call.
#[derive(Debug, Clone, Copy)]
pub struct PublicationContext {
    caller_location: &'static Location<'static>,
    published_at: DateTime<Utc>,
}

impl PublicationContext {
    /// Snapshot the calling location and the current time.
    #[track_caller]
    pub fn capture() -> Self {
        Self::new(Location::caller(), Utc::now())
    }

    pub fn new(caller_location: &'static Location<'static>, published_at: DateTime<Utc>) -> Self {
        Self {
            caller_location,
            published_at,
        }
    }

    /// Where `publish` was called from
    pub fn caller_location(&self) -> &'static Location<'static> {
        self.caller_location
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}

/// Timing of a single callback invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Benchmark {
    elapsed: Duration,
}

impl Benchmark {
    pub fn new(elapsed: Duration) -> Self {
        Self { elapsed }
    }

    /// Wall-clock time spent inside the callback
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Result of invoking one subscription during a publish call
#[derive(Debug, Clone)]
pub struct Execution {
    subscription: Arc<Subscription>,
    result: Value,
    benchmark: Benchmark,
    executed_at: DateTime<Utc>,
}

impl Execution {
    pub fn new(
        subscription: Arc<Subscription>,
        result: Value,
        benchmark: Benchmark,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subscription,
            result,
            benchmark,
            executed_at,
        }
    }

    pub fn subscription(&self) -> &Arc<Subscription> {
        &self.subscription
    }

    /// Value returned by the callback
    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn benchmark(&self) -> &Benchmark {
        &self.benchmark
    }

    pub fn executed_at(&self) -> DateTime<Utc> {
        self.executed_at
    }
}

/// Outcome of one publish call
#[derive(Debug, Clone)]
pub struct Publication {
    event: PublishedEvent,
    executions: Vec<Execution>,
    context: PublicationContext,
}

impl Publication {
    pub fn new(
        event: PublishedEvent,
        executions: Vec<Execution>,
        context: PublicationContext,
    ) -> Self {
        Self {
            event,
            executions,
            context,
        }
    }

    pub fn event(&self) -> &PublishedEvent {
        &self.event
    }

    /// Executions in dispatch order
    pub fn executions(&self) -> &[Execution] {
        &self.executions
    }

    pub fn context(&self) -> &PublicationContext {
        &self.context
    }

    /// Callback results in dispatch order
    pub fn results(&self) -> Vec<&Value> {
        self.executions.iter().map(Execution::result).collect()
    }

    /// Execution produced by the subscription with `id`, if it ran
    pub fn execution_for(&self, id: &SubscriptionId) -> Option<&Execution> {
        self.executions
            .iter()
            .find(|execution| execution.subscription().id() == id)
    }

    /// True when no subscription matched
    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }

    /// Total time spent in callbacks
    pub fn total_elapsed(&self) -> Duration {
        self.executions
            .iter()
            .map(|execution| execution.benchmark().elapsed())
            .sum()
    }
}
