use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

pub const LEVEL_DID_LOAD: &str = "levelDidLoad";
pub const LEVEL_WILL_UNLOAD: &str = "levelWillUnload";
pub const MAP_DID_LOAD: &str = "mapDidLoad";
pub const OBJECT_UPDATE_INTERACTABLE: &str = "objectUpdate:interactable";

type Handler = Rc<dyn Fn(&Value)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Name + JSON payload publish/subscribe with synchronous delivery.
///
/// Delivery snapshots the subscriber list for the emitted event, so handlers
/// may subscribe, unsubscribe, or emit while a delivery pass is running.
/// A handler added during `emit` sees only later events.
#[derive(Default)]
pub struct EventBus {
    inner: RefCell<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    subscribers: HashMap<String, Vec<(Subscription, Handler)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event: &str, handler: impl Fn(&Value) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = Subscription(inner.next_id);
        inner.next_id += 1;
        inner
            .subscribers
            .entry(event.to_string())
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut inner = self.inner.borrow_mut();
        for handlers in inner.subscribers.values_mut() {
            if let Some(position) = handlers.iter().position(|(id, _)| *id == subscription) {
                handlers.remove(position);
                return true;
            }
        }
        false
    }

    pub fn emit(&self, event: &str, payload: &Value) {
        let snapshot = {
            let inner = self.inner.borrow();
            inner
                .subscribers
                .get(event)
                .map(|handlers| {
                    handlers
                        .iter()
                        .map(|(_, handler)| Rc::clone(handler))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        };
        for handler in snapshot {
            handler(payload);
        }
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .subscribers
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
