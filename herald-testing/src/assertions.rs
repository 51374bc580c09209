// Test assertions for publications

use herald_events::{BusError, Publication, Subscription};
use serde_json::Value;
use std::sync::Arc;

/// Assert that a subscription ran during the publication
pub fn assert_executed(publication: &Publication, subscription: &Arc<Subscription>) {
    assert!(
        executed(publication, subscription),
        "Expected subscription '{}' to run for '{}', but it didn't",
        subscription.id(),
        publication.event().name()
    );
}

/// Assert that a subscription did not run during the publication
pub fn assert_not_executed(publication: &Publication, subscription: &Arc<Subscription>) {
    assert!(
        !executed(publication, subscription),
        "Expected subscription '{}' not to run for '{}'",
        subscription.id(),
        publication.event().name()
    );
}

/// Assert that exactly these subscriptions ran, in this order
pub fn assert_execution_order(publication: &Publication, expected: &[&Arc<Subscription>]) {
    let actual: Vec<String> = publication
        .executions()
        .iter()
        .map(|e| e.subscription().id().to_string())
        .collect();
    let expected_ids: Vec<String> = expected.iter().map(|s| s.id().to_string()).collect();

    assert_eq!(
        actual, expected_ids,
        "Execution order mismatch for '{}'",
        publication.event().name()
    );
}

/// Assert the callback results, in dispatch order
pub fn assert_results(publication: &Publication, expected: &[Value]) {
    let actual: Vec<Value> = publication.results().into_iter().cloned().collect();
    assert_eq!(actual, expected, "Callback results do not match");
}

/// Assert that an operation failed because `name` is not registered
pub fn assert_unknown_event<T: std::fmt::Debug>(result: &Result<T, BusError>, name: &str) {
    match result {
        Err(BusError::UnknownEvent { name: actual, .. }) => assert_eq!(
            actual, name,
            "Expected unknown event '{}', got '{}'",
            name, actual
        ),
        other => panic!("Expected UnknownEvent for '{}', got {:?}", name, other),
    }
}

fn executed(publication: &Publication, subscription: &Arc<Subscription>) -> bool {
    publication
        .executions()
        .iter()
        .any(|e| Arc::ptr_eq(e.subscription(), subscription))
}
