//! Entity-query surface for externally-authored level scripts, with an
//! optional deferred-execution delay drained by the frame loop.

use std::rc::Rc;

use crate::entity::{Entity, EntityRecord};

/// Scripts address entities by name or by arbitrary predicate.
#[derive(Clone)]
pub enum EntitySelector {
    Key(String),
    Predicate(Rc<dyn Fn(&EntityRecord) -> bool>),
}

impl EntitySelector {
    pub fn key(name: &str) -> Self {
        Self::Key(name.to_string())
    }

    pub fn predicate(predicate: impl Fn(&EntityRecord) -> bool + 'static) -> Self {
        Self::Predicate(Rc::new(predicate))
    }

    pub fn matches(&self, record: &EntityRecord) -> bool {
        match self {
            Self::Key(name) => record.instance.core().name == *name,
            Self::Predicate(predicate) => predicate(record),
        }
    }
}

#[derive(Clone)]
pub enum WorldAction {
    Show,
    Hide,
    Destroy,
    ForEach(Rc<dyn Fn(&mut dyn Entity)>),
}

#[derive(Clone)]
pub struct WorldCommand {
    pub action: WorldAction,
    pub selector: EntitySelector,
}

/// Commands scheduled against the level clock. Ordering among commands due
/// on the same frame is submission order.
#[derive(Default)]
pub struct DeferredQueue {
    items: Vec<(f64, WorldCommand)>,
}

impl DeferredQueue {
    pub fn push(&mut self, due_ms: f64, command: WorldCommand) {
        self.items.push((due_ms, command));
    }

    pub fn drain_due(&mut self, now_ms: f64) -> Vec<WorldCommand> {
        let mut due = Vec::new();
        let mut remaining = Vec::with_capacity(self.items.len());
        for (due_ms, command) in self.items.drain(..) {
            if due_ms <= now_ms {
                due.push(command);
            } else {
                remaining.push((due_ms, command));
            }
        }
        self.items = remaining;
        due
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> WorldCommand {
        WorldCommand {
            action: WorldAction::Hide,
            selector: EntitySelector::key("chest"),
        }
    }

    #[test]
    fn drain_due_keeps_future_items() {
        let mut queue = DeferredQueue::default();
        queue.push(100.0, command());
        queue.push(500.0, command());

        assert!(queue.drain_due(50.0).is_empty());
        assert_eq!(queue.drain_due(100.0).len(), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_due(1000.0).len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn same_frame_commands_drain_in_submission_order() {
        let mut queue = DeferredQueue::default();
        queue.push(100.0, WorldCommand {
            action: WorldAction::Hide,
            selector: EntitySelector::key("first"),
        });
        queue.push(100.0, WorldCommand {
            action: WorldAction::Show,
            selector: EntitySelector::key("second"),
        });
        let due = queue.drain_due(100.0);
        let names = due
            .iter()
            .map(|command| match &command.selector {
                EntitySelector::Key(name) => name.as_str(),
                EntitySelector::Predicate(_) => "<predicate>",
            })
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["first", "second"]);
    }
}
