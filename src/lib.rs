// Herald - A synchronous in-process event bus for Rust
//
// Register event names, subscribe callbacks, publish events and get back a
// record of every callback that ran.

// Re-export core functionality
pub use herald_events::*;

// Re-export optional crates
#[cfg(feature = "log")]
pub use herald_log;

#[cfg(feature = "testing")]
pub use herald_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AdHocEvent,
        Bus,
        BusConfig,
        BusError,
        Callback,
        CallbackError,
        Event,
        EventName,
        Matcher,
        Payload,
        Publication,
        PublicationContext,
        Subscription,
        SubscriptionId,
    };
}
