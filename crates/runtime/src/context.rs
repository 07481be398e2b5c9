use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::events::EventBus;

pub const COMBINED_CONTEXT_EVENT: &str = "contextUpdate";

/// Shared progression state, keyed by top-level name.
///
/// Applying a patch emits one `contextUpdate:<key>` event per key whose value
/// actually changed, followed by a single combined `contextUpdate` event
/// carrying the full snapshot. Level scripts rely on both granularities.
pub struct ContextStore {
    bus: Rc<EventBus>,
    values: RefCell<Map<String, Value>>,
    version: Cell<u64>,
}

impl ContextStore {
    pub fn new(bus: Rc<EventBus>) -> Self {
        Self {
            bus,
            values: RefCell::new(Map::new()),
            version: Cell::new(0),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.get()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    pub fn snapshot(&self) -> Value {
        Value::Object(self.values.borrow().clone())
    }

    pub fn event_name_for(key: &str) -> String {
        format!("{COMBINED_CONTEXT_EVENT}:{key}")
    }

    /// Merge `patch` over the current values, top-level key by key.
    /// Setting a key to its current value is a no-op and emits nothing.
    pub fn apply(&self, patch: Map<String, Value>) {
        let mut changed = Vec::<(String, Value)>::new();
        {
            let mut values = self.values.borrow_mut();
            for (key, value) in patch {
                if values.get(&key) == Some(&value) {
                    continue;
                }
                values.insert(key.clone(), value.clone());
                changed.push((key, value));
            }
        }
        if changed.is_empty() {
            return;
        }
        self.version.set(self.version.get() + 1);
        for (key, value) in &changed {
            self.bus.emit(&Self::event_name_for(key), value);
        }
        self.bus.emit(COMBINED_CONTEXT_EVENT, &self.snapshot());
    }
}
