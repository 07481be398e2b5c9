use std::collections::HashMap;

type EnterHook<C> = Box<dyn FnMut(&mut C)>;

/// One state's declaration: the actions it accepts (action name → target
/// state) and an optional `on_enter` side-effect hook.
pub struct StateDef<C> {
    actions: HashMap<String, String>,
    on_enter: Option<EnterHook<C>>,
}

impl<C> StateDef<C> {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            on_enter: None,
        }
    }

    pub fn action(mut self, name: &str, target_state: &str) -> Self {
        self.actions.insert(name.to_string(), target_state.to_string());
        self
    }

    pub fn on_enter(mut self, hook: impl FnMut(&mut C) + 'static) -> Self {
        self.on_enter = Some(Box::new(hook));
        self
    }
}

impl<C> Default for StateDef<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal finite-state machine. There is no global transition table; each
/// state independently declares the actions it accepts. Side effects run
/// through `on_enter`, fired exactly once per transition. Constructing the
/// machine does not fire the initial state's hook.
pub struct StateMachine<C> {
    current: String,
    states: HashMap<String, StateDef<C>>,
}

impl<C> StateMachine<C> {
    pub fn new(initial_state: &str) -> Self {
        Self {
            current: initial_state.to_string(),
            states: HashMap::new(),
        }
    }

    pub fn add_state(&mut self, name: &str, def: StateDef<C>) -> &mut Self {
        self.states.insert(name.to_string(), def);
        self
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn can_handle(&self, action: &str) -> bool {
        self.states
            .get(&self.current)
            .is_some_and(|state| state.actions.contains_key(action))
    }

    /// Runs `action` if the current state declares it; otherwise a no-op.
    /// Returns whether a transition happened.
    pub fn action(&mut self, name: &str, ctx: &mut C) -> bool {
        let Some(target) = self
            .states
            .get(&self.current)
            .and_then(|state| state.actions.get(name))
            .cloned()
        else {
            return false;
        };
        self.transition(&target, ctx);
        true
    }

    /// Unconditionally enters `state`, firing its `on_enter` hook once.
    /// Re-entering the current state fires the hook again.
    pub fn transition(&mut self, state: &str, ctx: &mut C) {
        self.current = state.to_string();
        if let Some(hook) = self
            .states
            .get_mut(state)
            .and_then(|def| def.on_enter.as_mut())
        {
            hook(ctx);
        }
    }
}
