//! Skeleton source - the seam between the depth sensor and the tick loop
//!
//! The sensor polling thread writes skeletons into a [`SensorHub`]; the
//! application tick reads them back. Both sides go through one mutex, and a
//! reader takes a whole-frame snapshot under a single acquisition so joints of
//! one user are never torn across two sensor frames.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};

use parking_lot::Mutex;

use diskinect_core::{Skeleton, UserId};

/// User lifecycle notifications from the sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorEvent {
    /// A new user entered the sensor's view
    UserAppeared(UserId),
    /// The sensor lost a user
    UserLost(UserId),
}

/// Receiving end of a sensor event subscription.
///
/// Dropping it unsubscribes; the hub prunes the dead sender on its next send.
pub struct EventSubscription {
    rx: Receiver<SensorEvent>,
}

impl EventSubscription {
    /// Take every event queued since the last drain, in arrival order
    pub fn drain(&self) -> Vec<SensorEvent> {
        self.rx.try_iter().collect()
    }
}

/// Anything that can deliver per-user skeletons and lifecycle events.
pub trait SkeletonSource: Send + Sync {
    /// Latest skeleton for a user (empty if unknown)
    fn skeleton(&self, user: UserId) -> Skeleton;

    /// Is the user currently tracked?
    fn is_tracking(&self, user: UserId) -> bool;

    /// Latest skeletons of all users, read under one lock acquisition
    fn snapshot(&self) -> HashMap<UserId, Skeleton>;

    /// Subscribe to appeared/lost events
    fn subscribe(&self) -> EventSubscription;
}

/// Shared per-user skeleton map, written by the sensor thread
#[derive(Default)]
pub struct SensorHub {
    skeletons: Mutex<HashMap<UserId, Skeleton>>,
    subscribers: Mutex<Vec<Sender<SensorEvent>>>,
}

impl SensorHub {
    pub fn new() -> Self {
        SensorHub::default()
    }

    /// Register a new user and notify subscribers
    pub fn user_appeared(&self, user: UserId) {
        self.skeletons.lock().insert(user, Skeleton::empty());
        self.broadcast(SensorEvent::UserAppeared(user));
    }

    /// Forget a user and notify subscribers
    pub fn user_lost(&self, user: UserId) {
        self.skeletons.lock().remove(&user);
        self.broadcast(SensorEvent::UserLost(user));
    }

    /// Store the latest skeleton for one user
    pub fn publish(&self, user: UserId, skeleton: Skeleton) {
        self.skeletons.lock().insert(user, skeleton);
    }

    /// Store a whole sensor frame under one lock acquisition
    pub fn publish_frame(&self, frame: impl IntoIterator<Item = (UserId, Skeleton)>) {
        let mut skeletons = self.skeletons.lock();
        for (user, skeleton) in frame {
            skeletons.insert(user, skeleton);
        }
    }

    /// Number of live subscriptions (as of the last broadcast)
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn broadcast(&self, event: SensorEvent) {
        self.subscribers.lock().retain(|tx| tx.send(event).is_ok());
    }
}

impl SkeletonSource for SensorHub {
    fn skeleton(&self, user: UserId) -> Skeleton {
        self.skeletons.lock().get(&user).cloned().unwrap_or_default()
    }

    fn is_tracking(&self, user: UserId) -> bool {
        self.skeletons
            .lock()
            .get(&user)
            .map(|s| s.is_tracking)
            .unwrap_or(false)
    }

    fn snapshot(&self) -> HashMap<UserId, Skeleton> {
        self.skeletons.lock().clone()
    }

    fn subscribe(&self) -> EventSubscription {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        EventSubscription { rx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_reach_subscribers_in_order() {
        let hub = SensorHub::new();
        let sub = hub.subscribe();

        hub.user_appeared(UserId::new(1));
        hub.user_appeared(UserId::new(2));
        hub.user_lost(UserId::new(1));

        assert_eq!(
            sub.drain(),
            vec![
                SensorEvent::UserAppeared(UserId::new(1)),
                SensorEvent::UserAppeared(UserId::new(2)),
                SensorEvent::UserLost(UserId::new(1)),
            ]
        );
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let hub = SensorHub::new();
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);

        drop(sub);
        hub.user_appeared(UserId::new(1));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_snapshot_and_tracking() {
        let hub = SensorHub::new();
        let user = UserId::new(4);

        hub.user_appeared(user);
        assert!(!hub.is_tracking(user));

        hub.publish(user, Skeleton::tracked());
        assert!(hub.is_tracking(user));
        assert_eq!(hub.snapshot().len(), 1);

        hub.user_lost(user);
        assert!(!hub.is_tracking(user));
        assert_eq!(hub.skeleton(user), Skeleton::empty());
    }

    #[test]
    fn test_concurrent_publish_and_snapshot() {
        use std::sync::Arc;
        use std::thread;

        let hub = Arc::new(SensorHub::new());
        let writer = {
            let hub = Arc::clone(&hub);
            thread::spawn(move || {
                for i in 0..500u32 {
                    hub.publish_frame((1..=3).map(|u| (UserId::new(u), Skeleton::tracked())));
                    if i % 50 == 0 {
                        hub.user_appeared(UserId::new(10 + i));
                    }
                }
            })
        };

        for _ in 0..500 {
            let snapshot = hub.snapshot();
            assert!(snapshot.len() <= 3 + 10);
        }
        writer.join().unwrap();
        assert!(hub.is_tracking(UserId::new(2)));
    }
}
