//! Generic Finite State Machine
//!
//! A registry-based state machine shared by the player controller and the
//! enemy AI. Every state is constructed once, registered under an enum key and
//! reused across activations; the machine only tracks which key is current.
//!
//! # Lifecycle
//!
//! 1. `add_state()` - register each state once (duplicate keys are rejected)
//! 2. `initialize()` - pick the starting state and run its `enter()`
//! 3. `update()` / `fixed_update()` - forwarded to the current state every tick
//! 4. `change_state()` - `exit()` on the old state, then `enter()` on the new one
//!
//! Hook failures never escape the machine: they are logged, and a failed
//! `enter()` rolls the machine back to the state it came from.
//!
//! # Example
//!
//! ```ignore
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Door { Open, Closed }
//!
//! let mut fsm = StateMachine::new("door");
//! fsm.add_state(OpenState::default())?;
//! fsm.add_state(ClosedState::default())?;
//! fsm.initialize(Door::Closed, &mut ctx)?;
//! fsm.update(&mut ctx); // ClosedState may return Transition::To(Door::Open)
//! ```

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

// ============================================================================
// State Keys
// ============================================================================

/// Key type identifying a state inside a machine.
///
/// Implemented automatically for any small copyable enum.
pub trait StateId: Copy + Eq + Hash + fmt::Debug + 'static {}

impl<T: Copy + Eq + Hash + fmt::Debug + 'static> StateId for T {}

// ============================================================================
// Errors
// ============================================================================

/// Failure raised from inside a state hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateError {
    message: String,
}

impl StateError {
    /// Create a new hook error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StateError {}

/// Result type returned by state hooks.
pub type StateResult<T = ()> = Result<T, StateError>;

/// Errors reported by [`StateMachine`] operations.
#[derive(Debug, Clone, PartialEq)]
pub enum FsmError<K> {
    /// A state with this key is already registered
    DuplicateState(K),
    /// No state is registered under this key
    UnknownState(K),
    /// The machine has no current state yet
    NotInitialized,
    /// The target's `enter()` failed and the machine rolled back
    EnterFailed {
        /// State whose entry hook failed
        state: K,
        /// The hook error
        source: StateError,
    },
}

impl<K: fmt::Debug> fmt::Display for FsmError<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateState(k) => write!(f, "state {k:?} is already registered"),
            Self::UnknownState(k) => write!(f, "state {k:?} is not registered"),
            Self::NotInitialized => write!(f, "state machine has not been initialized"),
            Self::EnterFailed { state, source } => {
                write!(f, "entering state {state:?} failed: {source}")
            }
        }
    }
}

impl<K: fmt::Debug> std::error::Error for FsmError<K> {}

// ============================================================================
// State Trait
// ============================================================================

/// Transition decision returned from [`State::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<K> {
    /// Stay in the current state.
    None,
    /// Change to the state registered under this key.
    To(K),
}

/// A state owned by a [`StateMachine`].
///
/// Timers and other per-activation data live on the state itself and are
/// reset in `enter()`, since the same instance is reused on every activation.
pub trait State<K: StateId, Ctx>: fmt::Debug {
    /// Key this state is registered under.
    fn id(&self) -> K;

    /// Called once each time the state becomes current.
    fn enter(&mut self, _ctx: &mut Ctx) -> StateResult {
        Ok(())
    }

    /// Called every frame while current.
    fn update(&mut self, ctx: &mut Ctx) -> StateResult<Transition<K>>;

    /// Called every fixed (physics) step while current.
    fn fixed_update(&mut self, _ctx: &mut Ctx) -> StateResult {
        Ok(())
    }

    /// Called once when the state stops being current.
    fn exit(&mut self, _ctx: &mut Ctx) -> StateResult {
        Ok(())
    }
}

// ============================================================================
// State Machine
// ============================================================================

/// Registry of states plus the key of the single active one.
pub struct StateMachine<K: StateId, Ctx> {
    /// Owner label used in log output
    label: String,
    /// Registered states, keyed by their id
    states: FxHashMap<K, Box<dyn State<K, Ctx>>>,
    /// Currently active state, `None` until initialized
    current: Option<K>,
}

impl<K: StateId, Ctx> StateMachine<K, Ctx> {
    /// Create an empty machine. `label` identifies the owner in logs.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            states: FxHashMap::default(),
            current: None,
        }
    }

    /// Register a state under its own id.
    ///
    /// A second state with the same id is rejected and the registry is left
    /// untouched.
    pub fn add_state<S: State<K, Ctx> + 'static>(&mut self, state: S) -> Result<(), FsmError<K>> {
        let id = state.id();
        if self.states.contains_key(&id) {
            log::warn!("{}: state {id:?} already registered, ignoring", self.label);
            return Err(FsmError::DuplicateState(id));
        }
        self.states.insert(id, Box::new(state));
        Ok(())
    }

    /// Make `initial` the current state and run its `enter()`.
    pub fn initialize(&mut self, initial: K, ctx: &mut Ctx) -> Result<(), FsmError<K>> {
        let Some(state) = self.states.get_mut(&initial) else {
            log::error!(
                "{}: cannot initialize with unregistered state {initial:?}",
                self.label
            );
            return Err(FsmError::UnknownState(initial));
        };

        self.current = Some(initial);
        if let Err(source) = state.enter(ctx) {
            log::error!("{}: error entering {initial:?}: {source}", self.label);
            self.current = None;
            return Err(FsmError::EnterFailed {
                state: initial,
                source,
            });
        }

        log::debug!("{}: initialized in {initial:?}", self.label);
        Ok(())
    }

    /// Transition to `target`.
    ///
    /// Requesting the current state does nothing. An unregistered target is
    /// refused and the current state stays active. If the target's `enter()`
    /// fails, the previous state becomes current again and is re-entered.
    pub fn change_state(&mut self, target: K, ctx: &mut Ctx) -> Result<(), FsmError<K>> {
        if !self.states.contains_key(&target) {
            log::error!(
                "{}: transition to unregistered state {target:?} aborted",
                self.label
            );
            return Err(FsmError::UnknownState(target));
        }
        if self.current == Some(target) {
            return Ok(());
        }

        let previous = self.current;
        if let Some(prev) = previous {
            if let Some(state) = self.states.get_mut(&prev) {
                if let Err(e) = state.exit(ctx) {
                    log::error!("{}: error exiting {prev:?}: {e}", self.label);
                }
            }
        }

        self.current = Some(target);
        let entered = match self.states.get_mut(&target) {
            Some(state) => state.enter(ctx),
            None => Ok(()),
        };

        match entered {
            Ok(()) => {
                log::debug!("{}: {previous:?} -> {target:?}", self.label);
                Ok(())
            }
            Err(source) => {
                log::error!(
                    "{}: error entering {target:?}, rolling back to {previous:?}: {source}",
                    self.label
                );
                self.current = previous;
                if let Some(prev) = previous {
                    if let Some(state) = self.states.get_mut(&prev) {
                        if let Err(e) = state.enter(ctx) {
                            log::error!("{}: error re-entering {prev:?}: {e}", self.label);
                        }
                    }
                }
                Err(FsmError::EnterFailed {
                    state: target,
                    source,
                })
            }
        }
    }

    /// Run the current state's frame update and apply any transition it asks for.
    pub fn update(&mut self, ctx: &mut Ctx) {
        let Some(current) = self.current else {
            return;
        };
        let outcome = match self.states.get_mut(&current) {
            Some(state) => state.update(ctx),
            None => return,
        };

        match outcome {
            Ok(Transition::None) => {}
            Ok(Transition::To(next)) => {
                // Failures are already logged inside change_state.
                let _ = self.change_state(next, ctx);
            }
            Err(e) => log::error!("{}: error updating {current:?}: {e}", self.label),
        }
    }

    /// Run the current state's fixed-step update.
    pub fn fixed_update(&mut self, ctx: &mut Ctx) {
        let Some(current) = self.current else {
            return;
        };
        if let Some(state) = self.states.get_mut(&current) {
            if let Err(e) = state.fixed_update(ctx) {
                log::error!("{}: error in fixed update of {current:?}: {e}", self.label);
            }
        }
    }

    /// Key of the active state.
    #[must_use]
    pub fn current(&self) -> Option<K> {
        self.current
    }

    /// Check if `kind` is the active state.
    #[must_use]
    pub fn is_in_state(&self, kind: K) -> bool {
        self.current == Some(kind)
    }

    /// Check if a state is registered under `kind`.
    #[must_use]
    pub fn contains(&self, kind: K) -> bool {
        self.states.contains_key(&kind)
    }

    /// Number of registered states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no state has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Owner label used in logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<K: StateId, Ctx> fmt::Debug for StateMachine<K, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("label", &self.label)
            .field("current", &self.current)
            .field("states", &self.states.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
