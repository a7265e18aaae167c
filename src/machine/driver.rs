//! Machine interpreter loop.
//!
//! # Responsibilities
//! - Run one tokio task per machine instance
//! - Execute invoked commands to completion before accepting the next event
//! - Publish a snapshot after every transition
//! - Tear down on shutdown without applying in-flight results
//!
//! # Design Decisions
//! - External events queue in an unbounded mailbox while an invocation is
//!   pending; ordering per instance is strictly serialized
//! - A shutdown signal received mid-invocation abandons the result; the
//!   context of a torn-down machine is never mutated again

use std::collections::VecDeque;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep_until, Instant};

use super::{Effects, Flow, Snapshot};

/// Handle to a running machine instance: send events, derive view state.
pub struct MachineHandle<F: Flow> {
    events: mpsc::UnboundedSender<F::Event>,
    snapshots: watch::Receiver<Snapshot<F::State, F::Context>>,
}

impl<F: Flow> Clone for MachineHandle<F> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            snapshots: self.snapshots.clone(),
        }
    }
}

impl<F: Flow> MachineHandle<F> {
    /// Enqueue an event into the running instance.
    pub fn send(&self, event: F::Event) {
        if self.events.send(event).is_err() {
            tracing::warn!("machine stopped, event dropped");
        }
    }

    /// Apply a pure selector to the current snapshot.
    pub fn select<T>(&self, selector: impl FnOnce(&Snapshot<F::State, F::Context>) -> T) -> T {
        selector(&self.snapshots.borrow())
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<F::State, F::Context>> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies the predicate. Returns
    /// `None` if the machine stopped first.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&Snapshot<F::State, F::Context>) -> bool,
    ) -> Option<Snapshot<F::State, F::Context>> {
        let mut rx = self.snapshots.clone();
        rx.wait_for(|snapshot| predicate(snapshot))
            .await
            .ok()
            .map(|snapshot| snapshot.clone())
    }
}

/// Spawn the interpreter for `flow`, returning its handle.
pub fn spawn<F, E>(flow: F, effects: E, mut shutdown: broadcast::Receiver<()>) -> MachineHandle<F>
where
    F: Flow,
    E: Effects<F>,
{
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<F::Event>();
    let (initial_state, initial_context) = flow.initial();
    let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot {
        state: initial_state.clone(),
        context: initial_context.clone(),
        tags: flow.tags(&initial_state),
    });

    tokio::spawn(async move {
        let mut state = initial_state;
        let mut context = initial_context;
        let mut pending: VecDeque<F::Command> = flow.on_enter(&state, &context).into();

        loop {
            // Drain pending invocations before accepting the next external
            // event, so a completion is never interleaved with another
            // transition's effects.
            while let Some(command) = pending.pop_front() {
                tracing::debug!(machine = flow.id(), command = ?command, "running command");
                let completion = tokio::select! {
                    completion = effects.run(command) => completion,
                    _ = shutdown.recv() => return,
                };
                if let Some(event) = completion {
                    apply(&flow, &mut state, &mut context, event, &mut pending, &snapshot_tx);
                }
            }

            // The delayed transition's deadline is fixed at state entry:
            // events the transition table drops must not restart it.
            match flow.after(&state) {
                Some((delay, timer_event)) => {
                    let deadline = Instant::now() + delay;
                    let mut timer_event = Some(timer_event);
                    loop {
                        tokio::select! {
                            received = event_rx.recv() => match received {
                                Some(event) => {
                                    let before = state.clone();
                                    apply(&flow, &mut state, &mut context, event, &mut pending, &snapshot_tx);
                                    if state != before || !pending.is_empty() {
                                        break;
                                    }
                                }
                                None => return,
                            },
                            _ = sleep_until(deadline) => {
                                if let Some(event) = timer_event.take() {
                                    apply(&flow, &mut state, &mut context, event, &mut pending, &snapshot_tx);
                                }
                                break;
                            }
                            _ = shutdown.recv() => return,
                        }
                    }
                }
                None => {
                    let event = tokio::select! {
                        received = event_rx.recv() => match received {
                            Some(event) => event,
                            None => return,
                        },
                        _ = shutdown.recv() => return,
                    };
                    apply(&flow, &mut state, &mut context, event, &mut pending, &snapshot_tx);
                }
            }
        }
    });

    MachineHandle {
        events: event_tx,
        snapshots: snapshot_rx,
    }
}

fn apply<F: Flow>(
    flow: &F,
    state: &mut F::State,
    context: &mut F::Context,
    event: F::Event,
    pending: &mut VecDeque<F::Command>,
    snapshots: &watch::Sender<Snapshot<F::State, F::Context>>,
) {
    tracing::trace!(machine = flow.id(), event = ?event, "applying event");
    let step = flow.transition(state, context, event);
    pending.extend(step.commands);

    if let Some(next) = step.next {
        if next != *state {
            tracing::debug!(machine = flow.id(), from = ?state, to = ?next, "transition");
            metrics::counter!("machine_transitions_total", "machine" => flow.id()).increment(1);
            *state = next;
            pending.extend(flow.on_enter(state, context));
        }
    }

    let _ = snapshots.send(Snapshot {
        state: state.clone(),
        context: context.clone(),
        tags: flow.tags(state),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Step;
    use futures_util::future::BoxFuture;

    #[derive(Debug, Clone, PartialEq)]
    enum TestState {
        Idle,
        Working,
    }

    #[derive(Debug, Clone, Default)]
    struct TestContext {
        total: u32,
    }

    #[derive(Debug)]
    enum TestEvent {
        Go,
        Done(u32),
    }

    #[derive(Debug)]
    enum TestCommand {
        Work,
    }

    struct TestFlow;

    impl Flow for TestFlow {
        type State = TestState;
        type Context = TestContext;
        type Event = TestEvent;
        type Command = TestCommand;

        fn id(&self) -> &'static str {
            "test"
        }

        fn initial(&self) -> (TestState, TestContext) {
            (TestState::Idle, TestContext::default())
        }

        fn transition(
            &self,
            state: &TestState,
            context: &mut TestContext,
            event: TestEvent,
        ) -> Step<TestState, TestCommand> {
            match (state, event) {
                (TestState::Idle, TestEvent::Go) => Step::to(TestState::Working),
                (TestState::Working, TestEvent::Done(amount)) => {
                    context.total += amount;
                    Step::to(TestState::Idle)
                }
                _ => Step::stay(),
            }
        }

        fn on_enter(&self, state: &TestState, _context: &TestContext) -> Vec<TestCommand> {
            match state {
                TestState::Working => vec![TestCommand::Work],
                TestState::Idle => Vec::new(),
            }
        }
    }

    struct TestEffects;

    impl Effects<TestFlow> for TestEffects {
        fn run(&self, command: TestCommand) -> BoxFuture<'_, Option<TestEvent>> {
            Box::pin(async move {
                match command {
                    TestCommand::Work => Some(TestEvent::Done(7)),
                }
            })
        }
    }

    #[tokio::test]
    async fn test_driver_round_trip() {
        let shutdown = crate::lifecycle::Shutdown::new();
        let handle = spawn(TestFlow, TestEffects, shutdown.subscribe());

        handle.send(TestEvent::Go);
        let snapshot = handle
            .wait_for(|s| s.state == TestState::Idle && s.context.total == 7)
            .await
            .expect("machine stopped early");
        assert_eq!(snapshot.context.total, 7);

        // Unhandled event in Idle is dropped without effect.
        handle.send(TestEvent::Done(100));
        handle.send(TestEvent::Go);
        let snapshot = handle
            .wait_for(|s| s.context.total == 14)
            .await
            .expect("machine stopped early");
        assert_eq!(snapshot.context.total, 14);
    }

    #[derive(Debug, Clone, PartialEq)]
    enum TimerState {
        Waiting,
        Fired,
    }

    #[derive(Debug)]
    enum TimerEvent {
        Elapsed,
        Noise,
    }

    #[derive(Debug)]
    enum TimerCommand {}

    struct TimerFlow;

    impl Flow for TimerFlow {
        type State = TimerState;
        type Context = ();
        type Event = TimerEvent;
        type Command = TimerCommand;

        fn id(&self) -> &'static str {
            "timer"
        }

        fn initial(&self) -> (TimerState, ()) {
            (TimerState::Waiting, ())
        }

        fn transition(
            &self,
            state: &TimerState,
            _context: &mut (),
            event: TimerEvent,
        ) -> Step<TimerState, TimerCommand> {
            match (state, event) {
                (TimerState::Waiting, TimerEvent::Elapsed) => Step::to(TimerState::Fired),
                _ => Step::stay(),
            }
        }

        fn on_enter(&self, _state: &TimerState, _context: &()) -> Vec<TimerCommand> {
            Vec::new()
        }

        fn after(&self, state: &TimerState) -> Option<(std::time::Duration, TimerEvent)> {
            match state {
                TimerState::Waiting => {
                    Some((std::time::Duration::from_millis(100), TimerEvent::Elapsed))
                }
                TimerState::Fired => None,
            }
        }
    }

    struct NoEffects;

    impl Effects<TimerFlow> for NoEffects {
        fn run(&self, command: TimerCommand) -> BoxFuture<'_, Option<TimerEvent>> {
            match command {}
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_events_do_not_restart_timer() {
        let shutdown = crate::lifecycle::Shutdown::new();
        let handle = spawn(TimerFlow, NoEffects, shutdown.subscribe());
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        // 60 ms in, a dropped event arrives.
        tokio::time::advance(std::time::Duration::from_millis(60)).await;
        handle.send(TimerEvent::Noise);
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(handle.select(|s| s.state.clone()), TimerState::Waiting);

        // 105 ms after state entry the timer fires; a restarted countdown
        // would still have 55 ms to go.
        tokio::time::advance(std::time::Duration::from_millis(45)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(handle.select(|s| s.state.clone()), TimerState::Fired);
    }

    #[tokio::test]
    async fn test_shutdown_stops_machine() {
        let shutdown = crate::lifecycle::Shutdown::new();
        let handle = spawn(TestFlow, TestEffects, shutdown.subscribe());
        shutdown.trigger();
        tokio::task::yield_now().await;
        // After teardown no further snapshot is published.
        handle.send(TestEvent::Go);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(handle.select(|s| s.context.total), 0);
    }
}
