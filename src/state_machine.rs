//! Turn state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod recovery;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{ChatKind, Effect, TurnOutcome};
pub use event::Event;
pub use state::{SessionContext, TurnState};
pub use transition::{transition, TransitionError};
