//! Small state machines shared by entity variants: in-range tracking for
//! interactables and contact-count tracking for the player.

use runtime::{StateDef, StateMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEdge {
    Entered,
    Exited,
}

#[derive(Debug, Clone, Copy, Default)]
struct RangeSignals {
    entered: bool,
    exited: bool,
}

/// Two-state in/out machine; `observe` reports only the edges, so callers
/// emit their events exactly once per crossing. Also used for area-overlap
/// tracking.
pub struct RangeTracker {
    fsm: StateMachine<RangeSignals>,
}

impl RangeTracker {
    pub fn new() -> Self {
        let mut fsm = StateMachine::new("out");
        fsm.add_state(
            "out",
            StateDef::new()
                .action("enter", "in")
                .on_enter(|signals: &mut RangeSignals| signals.exited = true),
        )
        .add_state(
            "in",
            StateDef::new()
                .action("exit", "out")
                .on_enter(|signals: &mut RangeSignals| signals.entered = true),
        );
        Self { fsm }
    }

    pub fn is_in(&self) -> bool {
        self.fsm.current() == "in"
    }

    pub fn observe(&mut self, in_range: bool) -> Option<RangeEdge> {
        let mut signals = RangeSignals::default();
        if in_range {
            self.fsm.action("enter", &mut signals);
        } else {
            self.fsm.action("exit", &mut signals);
        }
        if signals.entered {
            Some(RangeEdge::Entered)
        } else if signals.exited {
            Some(RangeEdge::Exited)
        } else {
            None
        }
    }
}

impl Default for RangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactLevel {
    Clear,
    Single,
    Crowded,
}

#[derive(Debug, Clone, Copy, Default)]
struct ContactSignals {
    entered: Option<ContactLevel>,
}

/// Tracks whether the player is colliding with zero, one, or many bodies.
pub struct ContactTracker {
    fsm: StateMachine<ContactSignals>,
}

impl ContactTracker {
    pub fn new() -> Self {
        let mut fsm = StateMachine::new("clear");
        fsm.add_state(
            "clear",
            StateDef::new()
                .action("one", "single")
                .action("many", "crowded")
                .on_enter(|signals: &mut ContactSignals| {
                    signals.entered = Some(ContactLevel::Clear)
                }),
        )
        .add_state(
            "single",
            StateDef::new()
                .action("none", "clear")
                .action("many", "crowded")
                .on_enter(|signals: &mut ContactSignals| {
                    signals.entered = Some(ContactLevel::Single)
                }),
        )
        .add_state(
            "crowded",
            StateDef::new()
                .action("none", "clear")
                .action("one", "single")
                .on_enter(|signals: &mut ContactSignals| {
                    signals.entered = Some(ContactLevel::Crowded)
                }),
        );
        Self { fsm }
    }

    pub fn level(&self) -> ContactLevel {
        match self.fsm.current() {
            "single" => ContactLevel::Single,
            "crowded" => ContactLevel::Crowded,
            _ => ContactLevel::Clear,
        }
    }

    /// Feeds this frame's contact count; returns the new level only when it
    /// changed.
    pub fn observe(&mut self, contact_count: usize) -> Option<ContactLevel> {
        let action = match contact_count {
            0 => "none",
            1 => "one",
            _ => "many",
        };
        let mut signals = ContactSignals::default();
        self.fsm.action(action, &mut signals);
        signals.entered
    }
}

impl Default for ContactTracker {
    fn default() -> Self {
        Self::new()
    }
}
