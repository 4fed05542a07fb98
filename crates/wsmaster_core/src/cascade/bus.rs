//! Synchronous in-process event bus for before-removal events.
//!
//! # Responsibility
//! - Keep the ordered subscriber list per event kind.
//! - Deliver events on the publisher's call stack, inside its transaction.
//!
//! # Invariants
//! - Delivery order equals registration order.
//! - The first failing subscriber stops delivery and its error is returned.
//! - Publish iterates a copy of the list, so (un)subscribing while a publish
//!   is running never affects that publish.

use super::error::CascadeResult;
use super::event::{CascadeEvent, CascadeEventKind};
use super::scope::CascadeScope;
use super::subscriber::CascadeSubscriber;
use log::{debug, error};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type SubscriberList = Vec<Arc<dyn CascadeSubscriber>>;

static GLOBAL_BUS: Lazy<Arc<EventBus>> = Lazy::new(|| Arc::new(EventBus::new()));

/// Returns the process-wide bus.
///
/// Wiring code installs subscribers once at startup; tests usually build
/// their own `EventBus` instead.
pub fn global_bus() -> Arc<EventBus> {
    Arc::clone(&GLOBAL_BUS)
}

/// Subscriber registry keyed by event kind.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<BTreeMap<CascadeEventKind, SubscriberList>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `subscriber` to the delivery list of `kind`.
    ///
    /// Returns `false` when the same subscriber instance is already
    /// registered for `kind`.
    pub fn subscribe(&self, kind: CascadeEventKind, subscriber: Arc<dyn CascadeSubscriber>) -> bool {
        let mut registry = self.registry();
        let list = registry.entry(kind).or_default();
        if list
            .iter()
            .any(|existing| same_subscriber(existing.as_ref(), subscriber.as_ref()))
        {
            return false;
        }
        debug!(
            "event=cascade_subscribe module=cascade status=ok kind={} subscriber={} position={}",
            kind,
            subscriber.name(),
            list.len()
        );
        list.push(subscriber);
        true
    }

    /// Removes `subscriber` from `kind`. Absent subscribers are a no-op.
    pub fn unsubscribe(&self, kind: CascadeEventKind, subscriber: &dyn CascadeSubscriber) -> bool {
        let mut registry = self.registry();
        let Some(list) = registry.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|existing| !same_subscriber(existing.as_ref(), subscriber));
        let removed = list.len() != before;
        if list.is_empty() {
            registry.remove(&kind);
        }
        if removed {
            debug!(
                "event=cascade_unsubscribe module=cascade status=ok kind={} subscriber={}",
                kind,
                subscriber.name()
            );
        }
        removed
    }

    pub fn subscriber_count(&self, kind: CascadeEventKind) -> usize {
        self.registry().get(&kind).map_or(0, Vec::len)
    }

    /// Subscriber names for `kind` in delivery order.
    pub fn subscriber_names(&self, kind: CascadeEventKind) -> Vec<&'static str> {
        self.registry()
            .get(&kind)
            .map(|list| list.iter().map(|subscriber| subscriber.name()).collect())
            .unwrap_or_default()
    }

    /// Delivers `event` to its subscribers in registration order.
    ///
    /// # Errors
    /// Returns the first subscriber error; later subscribers are skipped.
    pub fn publish(&self, scope: &CascadeScope<'_>, event: &CascadeEvent) -> CascadeResult<()> {
        let kind = event.kind();
        let subscribers = self.registry().get(&kind).cloned().unwrap_or_default();

        debug!(
            "event=cascade_publish module=cascade status=start kind={} entity={} subscribers={} depth={}",
            kind,
            event.entity(),
            subscribers.len(),
            scope.depth()
        );

        for subscriber in &subscribers {
            if let Err(err) = subscriber.on_event(scope, event) {
                error!(
                    "event=cascade_subscriber module=cascade status=error kind={} subscriber={} entity={} depth={} error={}",
                    kind,
                    subscriber.name(),
                    event.entity(),
                    scope.depth(),
                    err
                );
                return Err(err);
            }
            debug!(
                "event=cascade_subscriber module=cascade status=ok kind={} subscriber={} entity={}",
                kind,
                subscriber.name(),
                event.entity()
            );
        }

        debug!(
            "event=cascade_publish module=cascade status=ok kind={} entity={}",
            kind,
            event.entity()
        );
        Ok(())
    }

    fn registry(&self) -> MutexGuard<'_, BTreeMap<CascadeEventKind, SubscriberList>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for EventBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry();
        let mut map = f.debug_map();
        for (kind, list) in registry.iter() {
            let names: Vec<&'static str> = list.iter().map(|subscriber| subscriber.name()).collect();
            map.entry(kind, &names);
        }
        map.finish()
    }
}

fn same_subscriber(left: &dyn CascadeSubscriber, right: &dyn CascadeSubscriber) -> bool {
    std::ptr::eq(
        left as *const dyn CascadeSubscriber as *const (),
        right as *const dyn CascadeSubscriber as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::{global_bus, EventBus};
    use crate::cascade::error::{CascadeError, CascadeResult};
    use crate::cascade::event::{CascadeEvent, CascadeEventKind};
    use crate::cascade::scope::CascadeScope;
    use crate::cascade::subscriber::CascadeSubscriber;
    use rusqlite::{Connection, Transaction, TransactionBehavior};
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    struct Recorder {
        name: &'static str,
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl CascadeSubscriber for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn on_event(&self, _scope: &CascadeScope<'_>, _event: &CascadeEvent) -> CascadeResult<()> {
            self.calls.lock().expect("calls lock").push(self.name);
            if self.fail {
                return Err(CascadeError::Subscriber {
                    subscriber: self.name,
                    message: "rejected".to_string(),
                });
            }
            Ok(())
        }
    }

    fn recorder(
        name: &'static str,
        calls: &Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> Arc<Recorder> {
        Arc::new(Recorder {
            name,
            calls: Arc::clone(calls),
            fail,
        })
    }

    fn publish(bus: &EventBus, event: CascadeEvent) -> CascadeResult<()> {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Deferred).expect("begin tx");
        let scope = CascadeScope::new(&tx, bus);
        bus.publish(&scope, &event)
    }

    #[test]
    fn delivers_in_registration_order_and_only_to_matching_kind() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(
            CascadeEventKind::BeforeUserRemoved,
            recorder("first", &calls, false),
        );
        bus.subscribe(
            CascadeEventKind::BeforeUserRemoved,
            recorder("second", &calls, false),
        );
        bus.subscribe(
            CascadeEventKind::BeforeAccountRemoved,
            recorder("other", &calls, false),
        );

        publish(&bus, CascadeEvent::BeforeUserRemoved(Uuid::new_v4())).expect("publish succeeds");

        assert_eq!(*calls.lock().expect("calls lock"), vec!["first", "second"]);
    }

    #[test]
    fn first_failure_skips_remaining_subscribers() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(
            CascadeEventKind::BeforeUserRemoved,
            recorder("ok", &calls, false),
        );
        bus.subscribe(
            CascadeEventKind::BeforeUserRemoved,
            recorder("broken", &calls, true),
        );
        bus.subscribe(
            CascadeEventKind::BeforeUserRemoved,
            recorder("never", &calls, false),
        );

        let err = publish(&bus, CascadeEvent::BeforeUserRemoved(Uuid::new_v4()))
            .expect_err("broken subscriber fails the publish");

        assert!(matches!(
            err,
            CascadeError::Subscriber {
                subscriber: "broken",
                ..
            }
        ));
        assert_eq!(*calls.lock().expect("calls lock"), vec!["ok", "broken"]);
    }

    #[test]
    fn subscribe_is_idempotent_per_instance_and_unsubscribe_absent_is_noop() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let subscriber = recorder("once", &calls, false);
        let stranger = recorder("stranger", &calls, false);

        assert!(bus.subscribe(CascadeEventKind::BeforeWorkspaceRemoved, subscriber.clone()));
        assert!(!bus.subscribe(CascadeEventKind::BeforeWorkspaceRemoved, subscriber.clone()));
        assert_eq!(bus.subscriber_count(CascadeEventKind::BeforeWorkspaceRemoved), 1);

        assert!(!bus.unsubscribe(CascadeEventKind::BeforeWorkspaceRemoved, stranger.as_ref()));
        assert!(!bus.unsubscribe(CascadeEventKind::BeforeUserRemoved, subscriber.as_ref()));
        assert!(bus.unsubscribe(CascadeEventKind::BeforeWorkspaceRemoved, subscriber.as_ref()));
        assert!(!bus.unsubscribe(CascadeEventKind::BeforeWorkspaceRemoved, subscriber.as_ref()));
        assert_eq!(bus.subscriber_count(CascadeEventKind::BeforeWorkspaceRemoved), 0);
    }

    #[test]
    fn publish_without_subscribers_succeeds() {
        let bus = EventBus::new();
        publish(&bus, CascadeEvent::BeforeAccountRemoved(Uuid::new_v4()))
            .expect("empty publish succeeds");
    }

    #[test]
    fn subscriber_names_follow_delivery_order() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(
            CascadeEventKind::BeforeUserRemoved,
            recorder("a", &calls, false),
        );
        bus.subscribe(
            CascadeEventKind::BeforeUserRemoved,
            recorder("b", &calls, false),
        );
        assert_eq!(
            bus.subscriber_names(CascadeEventKind::BeforeUserRemoved),
            vec!["a", "b"]
        );
        assert!(format!("{bus:?}").contains("before_user_removed"));
    }

    #[test]
    fn concurrent_registration_keeps_every_subscriber() {
        let bus = Arc::new(EventBus::new());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bus = Arc::clone(&bus);
                let subscriber = recorder("worker", &calls, false);
                std::thread::spawn(move || {
                    bus.subscribe(CascadeEventKind::BeforeUserRemoved, subscriber)
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().expect("worker thread"));
        }
        assert_eq!(bus.subscriber_count(CascadeEventKind::BeforeUserRemoved), 8);
    }

    #[test]
    fn global_bus_is_shared() {
        assert!(Arc::ptr_eq(&global_bus(), &global_bus()));
    }
}
