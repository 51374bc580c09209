//! Testing utilities for code that uses the Herald event bus.
//!
//! ## Quick Start
//!
//! ```
//! use herald_testing::*;
//! use herald_events::Payload;
//!
//! let mut bus = quiet_bus(&["order_created"]);
//! let recorder = CallRecorder::new();
//! let mailer = bus
//!     .subscribe("order_created", recorder.callback("mailer"))
//!     .unwrap();
//!
//! let publication = bus.publish_named("order_created", Payload::new()).unwrap();
//!
//! assert_executed(&publication, &mailer);
//! assert_eq!(recorder.labels(), vec!["mailer"]);
//! ```

pub mod assertions;
pub mod recorder;

pub use assertions::*;
pub use recorder::*;

use herald_events::Bus;

/// Bus with logging disabled and `names` registered.
///
/// Each registration's origin is `"fixture"`.
pub fn quiet_bus(names: &[&str]) -> Bus {
    let bus = Bus::builder()
        .enable_logging(false)
        .build()
        .expect("empty builder has no duplicate subscriptions");

    for name in names {
        bus.register_with_origin(name, "fixture")
            .unwrap_or_else(|e| panic!("failed to register fixture event '{}': {}", name, e));
    }

    bus
}
