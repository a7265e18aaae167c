//! Explicit state machine core.
//!
//! # Data Flow
//! ```text
//! UI / host code
//!     → MachineHandle::send(event)
//!     → driver.rs (serialized event loop)
//!     → Flow::transition (synchronous state + context update)
//!     → commands → Effects::run (async service call)
//!     → completion event fed back into Flow::transition
//!     → Snapshot published (watch channel) → selectors re-derive view state
//! ```
//!
//! # Design Decisions
//! - Transitions are synchronous; suspension points exist only inside
//!   `Effects::run` (a network or storage call)
//! - One transition at a time per machine instance; events arriving while an
//!   invocation is pending queue in the mailbox
//! - Events not handled in the current state are dropped by the transition
//!   table, never buffered for later

pub mod driver;

use std::fmt;
use std::time::Duration;

use futures_util::future::BoxFuture;

/// Outcome of one transition: an optional target state plus commands for the
/// driver to execute.
#[derive(Debug)]
pub struct Step<S, C> {
    /// Target state, or `None` to stay where we are.
    pub next: Option<S>,
    /// Commands to run after the (possible) state change.
    pub commands: Vec<C>,
}

impl<S, C> Step<S, C> {
    /// Stay in the current state, run nothing.
    pub fn stay() -> Self {
        Self {
            next: None,
            commands: Vec::new(),
        }
    }

    /// Move to `state`.
    pub fn to(state: S) -> Self {
        Self {
            next: Some(state),
            commands: Vec::new(),
        }
    }

    /// Attach a command to this step.
    pub fn with(mut self, command: C) -> Self {
        self.commands.push(command);
        self
    }
}

/// A machine definition: its states, typed context, accepted events, and the
/// transition table. Context mutations happen only inside [`Flow::transition`].
pub trait Flow: Send + Sync + 'static {
    type State: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;
    type Context: Clone + fmt::Debug + Send + Sync + 'static;
    type Event: fmt::Debug + Send + 'static;
    type Command: fmt::Debug + Send + 'static;

    /// Stable identity, used for logging and metrics labels.
    fn id(&self) -> &'static str;

    /// Initial state and context.
    fn initial(&self) -> (Self::State, Self::Context);

    /// Apply one event. Unhandled events must return [`Step::stay`].
    fn transition(
        &self,
        state: &Self::State,
        context: &mut Self::Context,
        event: Self::Event,
    ) -> Step<Self::State, Self::Command>;

    /// Commands invoked when a state becomes current.
    fn on_enter(&self, state: &Self::State, context: &Self::Context) -> Vec<Self::Command>;

    /// Timer-based transition: the returned event is delivered if no external
    /// event arrives within the duration while `state` is current.
    fn after(&self, state: &Self::State) -> Option<(Duration, Self::Event)> {
        let _ = state;
        None
    }

    /// Tags attached to snapshots of `state`, consumed by UI selectors.
    fn tags(&self, state: &Self::State) -> &'static [&'static str] {
        let _ = state;
        &[]
    }
}

/// Interprets commands produced by a flow. Each command maps to at most one
/// completion event, consumed exactly once by the transition that follows.
pub trait Effects<F: Flow>: Send + Sync + 'static {
    fn run(&self, command: F::Command) -> BoxFuture<'_, Option<F::Event>>;
}

/// Immutable view of a machine, published after every transition.
#[derive(Debug, Clone)]
pub struct Snapshot<S, C> {
    pub state: S,
    pub context: C,
    pub tags: &'static [&'static str],
}

impl<S, C> Snapshot<S, C> {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }
}
