//! Core building blocks
//!
//! The generic state machine, the event bus and frame timing

pub mod events;
pub mod fsm;
mod random;
mod time;

pub use events::{EventBus, EventError, EventHandler, EventKind, EventQueue, GameEvent, handler};
pub use fsm::{FsmError, State, StateError, StateId, StateMachine, StateResult, Transition};
pub use random::{FastRandom, RandomSource};
pub use time::Time;
