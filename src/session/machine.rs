//! Run-session state machine.
//!
//! Single source of truth for connection and run state. The machine is
//! synchronous and owns no I/O: transport events and run requests are fed
//! in, host events are buffered and drained with
//! [`RunSessionStateMachine::take_events`].
//!
//! # Transitions
//!
//! | From | Event | To |
//! |------|-------|----|
//! | not `Closed` | transport open | connection `Open`, run unchanged |
//! | not `Closed` | transport lost | connection `Failed`, run `Idle` |
//! | any | dispose | connection `Closed`, run `Idle` |
//! | `Idle`/`ReadyToRun` | run requested | `Starting` |
//! | `Starting` | `running` | `Running`, output cleared |
//! | `Starting`/`Running` | `ready` | `ReadyToRun` |
//! | any | content | unchanged, output appended |
//! | `Starting` | send failed | previous run state, error appended |
//!
//! Output is not cleared when a run is requested. It is cleared only once
//! the service confirms with `running`, so a rejected send or a dropped
//! connection keeps the previous output visible.

// ============================================================================
// Imports
// ============================================================================

use std::mem;

use tracing::{debug, trace, warn};

use crate::command::CommandSurface;
use crate::error::{Error, Result};
use crate::output::OutputSink;
use crate::protocol::{Inbound, Outbound};

use super::event::SessionEvent;
use super::state::{ConnectionState, RunState, SessionState};

// ============================================================================
// RunSessionStateMachine
// ============================================================================

/// Interprets protocol messages and run requests for one session.
#[derive(Debug, Default)]
pub struct RunSessionStateMachine {
    state: SessionState,
    output: OutputSink,
    events: Vec<SessionEvent>,
}

// ============================================================================
// RunSessionStateMachine - Accessors
// ============================================================================

impl RunSessionStateMachine {
    /// Creates a machine in the initial `Connecting`/`Idle` state.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state snapshot.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the projected run command.
    #[inline]
    #[must_use]
    pub const fn command(&self) -> CommandSurface {
        CommandSurface::project(self.state)
    }

    /// Returns the output buffer.
    #[inline]
    #[must_use]
    pub const fn output(&self) -> &OutputSink {
        &self.output
    }

    /// Drains host events produced since the last call.
    #[must_use]
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        mem::take(&mut self.events)
    }
}

// ============================================================================
// RunSessionStateMachine - Transport Events
// ============================================================================

impl RunSessionStateMachine {
    /// Handles the transport becoming open.
    ///
    /// Ignored once the session is disposed.
    pub fn on_transport_open(&mut self) {
        if self.is_disposed("open") {
            return;
        }
        self.transition(|state| state.connection = ConnectionState::Open);
    }

    /// Handles the transport reopening after a loss.
    ///
    /// A run in flight on the old socket cannot be resumed, so the run state
    /// restarts from `Idle`. Ignored once the session is disposed.
    pub fn on_reconnected(&mut self) {
        if self.is_disposed("reconnect") {
            return;
        }
        self.transition(|state| {
            state.connection = ConnectionState::Open;
            state.run = RunState::Idle;
        });
    }

    /// Handles a socket error or remote close.
    pub fn on_transport_lost(&mut self, reason: &str) {
        if self.is_disposed(reason) {
            return;
        }

        let changed = self.transition(|state| {
            state.connection = ConnectionState::Failed;
            state.run = RunState::Idle;
        });

        if changed {
            self.append(&format!("Connection lost: {reason}\n"));
        }
    }

    /// Handles local disposal of the session.
    pub fn on_disposed(&mut self) {
        self.transition(|state| {
            state.connection = ConnectionState::Closed;
            state.run = RunState::Idle;
        });
    }

    /// Handles one inbound text message.
    pub fn on_inbound(&mut self, text: &str) {
        match Inbound::parse(text) {
            Inbound::Running => {
                if self.state.run != RunState::Starting {
                    warn!(state = %self.state, "Unexpected running sentinel");
                    return;
                }
                self.transition(|state| state.run = RunState::Running);
                self.output.clear();
                self.events.push(SessionEvent::OutputCleared);
            }

            Inbound::Ready => {
                if !self.state.run.is_busy() {
                    debug!(state = %self.state, "Ready sentinel outside a run");
                    return;
                }
                self.transition(|state| state.run = RunState::ReadyToRun);
            }

            Inbound::Content(content) => self.append(content),
        }
    }
}

// ============================================================================
// RunSessionStateMachine - Run Requests
// ============================================================================

impl RunSessionStateMachine {
    /// Requests a run of `source`.
    ///
    /// `send` puts the message on the wire. It is only called when the run is
    /// accepted.
    ///
    /// # Errors
    ///
    /// - [`Error::RunRejected`] if `source` is empty, a run is in flight or
    ///   the connection is not open
    /// - any error returned by `send`; the run state is restored and the
    ///   error text is appended to the output
    pub fn request_run<F>(&mut self, source: &str, send: F) -> Result<()>
    where
        F: FnOnce(String) -> Result<()>,
    {
        // An empty body is a keep-alive on the wire and would never be answered.
        let refusal = if source.is_empty() {
            Some("source is empty".to_string())
        } else if !self.state.connection.is_open() {
            Some(format!("connection is {}", self.state.connection))
        } else if !self.state.accepts_run() {
            Some(format!("a run is already {}", self.state.run))
        } else {
            None
        };

        if let Some(reason) = refusal {
            warn!(state = %self.state, %reason, "Run rejected");
            self.events.push(SessionEvent::RunRejected(reason.clone()));
            return Err(Error::run_rejected(reason));
        }

        let previous = self.state.run;
        self.events.push(SessionEvent::RunRequested(source.to_owned()));
        self.transition(|state| state.run = RunState::Starting);

        if let Err(e) = send(Outbound::run(source).into_text()) {
            warn!(error = %e, "Failed to send run request");
            self.transition(|state| state.run = previous);
            self.append(&format!("{e}\n"));
            return Err(e);
        }

        trace!(bytes = source.len(), "Run request sent");
        Ok(())
    }
}

// ============================================================================
// RunSessionStateMachine - Internals
// ============================================================================

impl RunSessionStateMachine {
    /// Applies a state change and queues the derived host events.
    ///
    /// Returns `true` if the state changed.
    fn transition(&mut self, apply: impl FnOnce(&mut SessionState)) -> bool {
        let before = self.state;
        apply(&mut self.state);
        debug_assert!(self.state.is_consistent(), "inconsistent {}", self.state);

        if self.state == before {
            return false;
        }

        debug!(from = %before, to = %self.state, "Session transition");
        self.events.push(SessionEvent::StateChanged(self.state));

        let enabled = self.state.accepts_run();
        if enabled != before.accepts_run() {
            self.events.push(SessionEvent::CommandEnabled(enabled));
        }

        true
    }

    fn is_disposed(&self, what: &str) -> bool {
        let disposed = self.state.connection == ConnectionState::Closed;
        if disposed {
            trace!(what, "Transport event after dispose ignored");
        }
        disposed
    }

    fn append(&mut self, text: &str) {
        let stored = self.output.append(text).to_owned();
        self.events.push(SessionEvent::OutputAppended(stored));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;

    use proptest::prelude::*;
    use tokio_test::{assert_err, assert_ok};

    fn open_machine() -> RunSessionStateMachine {
        let mut machine = RunSessionStateMachine::new();
        machine.on_transport_open();
        let _ = machine.take_events();
        machine
    }

    fn accept(_: String) -> Result<()> {
        Ok(())
    }

    #[test]
    fn test_initial_state() {
        let machine = RunSessionStateMachine::new();
        assert_eq!(machine.state(), SessionState::INITIAL);
        assert!(!machine.command().enabled);
        assert!(machine.output().is_empty());
    }

    #[test]
    fn test_open_enables_command() {
        let mut machine = RunSessionStateMachine::new();
        machine.on_transport_open();

        assert_eq!(machine.state().connection, ConnectionState::Open);
        assert_eq!(
            machine.take_events(),
            vec![
                SessionEvent::StateChanged(SessionState {
                    connection: ConnectionState::Open,
                    run: RunState::Idle,
                }),
                SessionEvent::CommandEnabled(true),
            ]
        );
    }

    #[test]
    fn test_full_run_scenario() {
        let mut machine = open_machine();
        let sent = RefCell::new(Vec::new());

        machine
            .request_run("print(1)", |text| {
                sent.borrow_mut().push(text);
                Ok(())
            })
            .expect("run accepted");
        assert_eq!(machine.state().run, RunState::Starting);
        assert!(!machine.command().enabled);

        machine.on_inbound("running");
        assert_eq!(machine.state().run, RunState::Running);

        machine.on_inbound("1\n");
        machine.on_inbound("ready");

        assert_eq!(machine.state().run, RunState::ReadyToRun);
        assert_eq!(machine.output().chunks(), ["1\n"]);
        assert!(machine.command().enabled);
        assert_eq!(sent.into_inner(), vec!["print(1)".to_string()]);
    }

    #[test]
    fn test_event_sequence_for_run() {
        let mut machine = open_machine();
        machine.request_run("x", accept).expect("run accepted");
        machine.on_inbound("running");
        machine.on_inbound("<out>");
        machine.on_inbound("ready");

        let starting = SessionState {
            connection: ConnectionState::Open,
            run: RunState::Starting,
        };
        let running = SessionState {
            run: RunState::Running,
            ..starting
        };
        let ready = SessionState {
            run: RunState::ReadyToRun,
            ..starting
        };

        assert_eq!(
            machine.take_events(),
            vec![
                SessionEvent::RunRequested("x".into()),
                SessionEvent::StateChanged(starting),
                SessionEvent::CommandEnabled(false),
                SessionEvent::StateChanged(running),
                SessionEvent::OutputCleared,
                SessionEvent::OutputAppended("&lt;out>".into()),
                SessionEvent::StateChanged(ready),
                SessionEvent::CommandEnabled(true),
            ]
        );
    }

    #[test]
    fn test_output_kept_until_running_confirmed() {
        let mut machine = open_machine();
        machine.on_inbound("previous\n");

        machine.request_run("x", accept).expect("run accepted");
        assert_eq!(machine.output().chunks(), ["previous\n"]);

        machine.on_inbound("running");
        assert!(machine.output().is_empty());
    }

    #[test]
    fn test_rejects_run_while_busy() {
        let mut machine = open_machine();
        machine.request_run("first", accept).expect("run accepted");
        let _ = machine.take_events();

        let mut calls = 0;
        let err = assert_err!(machine.request_run("second", |_| {
            calls += 1;
            Ok(())
        }));

        assert!(err.is_rejection());
        assert_eq!(calls, 0);
        assert_eq!(machine.state().run, RunState::Starting);
        assert!(matches!(
            machine.take_events().as_slice(),
            [SessionEvent::RunRejected(_)]
        ));

        machine.on_inbound("running");
        assert_err!(machine.request_run("third", accept));
        assert_eq!(machine.state().run, RunState::Running);
    }

    #[test]
    fn test_rejects_run_when_not_open() {
        let mut machine = RunSessionStateMachine::new();
        let err = machine.request_run("x", accept).unwrap_err();
        assert!(err.is_rejection());
        assert!(err.to_string().contains("connecting"));
        assert_eq!(machine.state(), SessionState::INITIAL);
    }

    #[test]
    fn test_send_failure_restores_state_and_reports() {
        let mut machine = open_machine();
        machine.on_inbound("kept\n");

        let err = machine
            .request_run("x", |_| Err(Error::NotConnected))
            .unwrap_err();

        assert!(matches!(err, Error::NotConnected));
        assert_eq!(machine.state().run, RunState::Idle);
        assert!(machine.command().enabled);
        assert_eq!(
            machine.output().chunks(),
            ["kept\n", "Not connected to the execution service\n"]
        );
    }

    #[test]
    fn test_failure_before_running_reverts_to_idle() {
        let mut machine = open_machine();
        machine.request_run("x", accept).expect("run accepted");
        machine.on_transport_lost("closed by remote");

        let state = machine.state();
        assert_eq!(state.connection, ConnectionState::Failed);
        assert_eq!(state.run, RunState::Idle);
        assert!(state.is_consistent());
        assert!(!machine.command().enabled);
        assert_eq!(
            machine.output().chunks(),
            ["Connection lost: closed by remote\n"]
        );
    }

    #[test]
    fn test_failure_while_running() {
        let mut machine = open_machine();
        machine.request_run("x", accept).expect("run accepted");
        machine.on_inbound("running");
        machine.on_transport_lost("reset");

        assert_eq!(machine.state().run, RunState::Idle);
        assert!(machine.state().is_consistent());
        assert_err!(machine.request_run("y", accept));
    }

    #[test]
    fn test_repeated_loss_reports_once() {
        let mut machine = open_machine();
        machine.on_transport_lost("reset");
        machine.on_transport_lost("reset");
        assert_eq!(machine.output().len(), 1);
    }

    #[test]
    fn test_reconnect_resets_to_idle() {
        let mut machine = open_machine();
        machine.request_run("x", accept).expect("run accepted");
        machine.on_transport_lost("reset");
        machine.on_reconnected();
        assert_ok!(machine.request_run("y", accept));
        machine.on_transport_lost("reset");
        machine.on_reconnected();

        assert_eq!(
            machine.state(),
            SessionState {
                connection: ConnectionState::Open,
                run: RunState::Idle,
            }
        );
        assert!(machine.command().enabled);
    }

    #[test]
    fn test_dispose_ignores_late_loss() {
        let mut machine = open_machine();
        machine.on_disposed();
        machine.on_transport_lost("closed");

        assert_eq!(machine.state().connection, ConnectionState::Closed);
        assert!(machine.output().is_empty());
    }

    #[test]
    fn test_dispose_ignores_late_open() {
        let mut machine = open_machine();
        machine.on_disposed();
        let _ = machine.take_events();

        machine.on_transport_open();
        machine.on_reconnected();

        assert_eq!(
            machine.state(),
            SessionState {
                connection: ConnectionState::Closed,
                run: RunState::Idle,
            }
        );
        assert!(!machine.command().enabled);
        assert!(machine.take_events().is_empty());
        assert_err!(machine.request_run("x", accept));
    }

    #[test]
    fn test_rejects_empty_source() {
        let mut machine = open_machine();
        let mut calls = 0;

        let err = assert_err!(machine.request_run("", |_| {
            calls += 1;
            Ok(())
        }));

        assert!(err.is_rejection());
        assert!(err.to_string().contains("empty"));
        assert_eq!(calls, 0);
        assert_eq!(machine.state().run, RunState::Idle);
        assert!(machine.command().enabled);
        assert!(matches!(
            machine.take_events().as_slice(),
            [SessionEvent::RunRejected(_)]
        ));

        assert_ok!(machine.request_run(" ", accept));
    }

    #[test]
    fn test_unexpected_sentinels_leave_state() {
        let mut machine = open_machine();
        machine.on_inbound("running");
        machine.on_inbound("ready");
        assert_eq!(machine.state().run, RunState::Idle);
        assert!(machine.take_events().is_empty());
    }

    #[test]
    fn test_ready_during_starting() {
        let mut machine = open_machine();
        machine.request_run("x", accept).expect("run accepted");
        machine.on_inbound("ready");
        assert_eq!(machine.state().run, RunState::ReadyToRun);
    }

    #[test]
    fn test_sentinel_text_is_never_output() {
        // Output that equals a sentinel is consumed as a sentinel.
        let mut machine = open_machine();
        machine.request_run("print('ready')", accept).expect("run accepted");
        machine.on_inbound("running");
        machine.on_inbound("ready");

        assert!(machine.output().is_empty());
        assert_eq!(machine.state().run, RunState::ReadyToRun);
    }

    // ------------------------------------------------------------------------
    // Property: transitions follow the table, in order
    // ------------------------------------------------------------------------

    #[derive(Debug, Clone)]
    enum Op {
        Open,
        Reconnect,
        Lost,
        Run,
        RunSendFails,
        Running,
        Ready,
        Content(String),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            1 => Just(Op::Open),
            1 => Just(Op::Reconnect),
            1 => Just(Op::Lost),
            3 => Just(Op::Run),
            1 => Just(Op::RunSendFails),
            3 => Just(Op::Running),
            3 => Just(Op::Ready),
            2 => "[a-z<\n]{0,8}".prop_map(Op::Content),
        ]
    }

    /// Reference model of the transition table.
    fn model(state: SessionState, op: &Op) -> SessionState {
        use ConnectionState::{Failed, Open};
        use RunState::{Idle, ReadyToRun, Running, Starting};

        let mut next = state;
        match op {
            Op::Open => next.connection = Open,
            Op::Reconnect => {
                next.connection = Open;
                next.run = Idle;
            }
            Op::Lost => {
                next.connection = Failed;
                next.run = Idle;
            }
            Op::Run if state.accepts_run() => next.run = Starting,
            Op::Run | Op::RunSendFails => {}
            Op::Running if state.run == Starting => next.run = Running,
            Op::Ready if state.run.is_busy() => next.run = ReadyToRun,
            Op::Content(text) if text == "running" => return model(state, &Op::Running),
            Op::Content(text) if text == "ready" => return model(state, &Op::Ready),
            Op::Running | Op::Ready | Op::Content(_) => {}
        }
        next
    }

    proptest! {
        #[test]
        fn prop_machine_matches_model(ops in prop::collection::vec(op_strategy(), 0..64)) {
            let mut machine = RunSessionStateMachine::new();
            let mut expected = SessionState::INITIAL;
            let mut sends = 0usize;

            for op in &ops {
                let accepted_before = machine.state().accepts_run();

                match op {
                    Op::Open => machine.on_transport_open(),
                    Op::Reconnect => machine.on_reconnected(),
                    Op::Lost => machine.on_transport_lost("lost"),
                    Op::Run => {
                        let result = machine.request_run("src", |_| {
                            sends += 1;
                            Ok(())
                        });
                        prop_assert_eq!(result.is_ok(), accepted_before);
                    }
                    Op::RunSendFails => {
                        let _ = machine.request_run("src", |_| Err(Error::NotConnected));
                    }
                    Op::Running => machine.on_inbound("running"),
                    Op::Ready => machine.on_inbound("ready"),
                    Op::Content(text) => machine.on_inbound(text),
                }

                expected = model(expected, op);
                prop_assert_eq!(machine.state(), expected);
                prop_assert!(machine.state().is_consistent());
                prop_assert_eq!(
                    machine.command(),
                    CommandSurface::project(machine.state())
                );
            }

            let accepted_runs = ops
                .iter()
                .scan(SessionState::INITIAL, |state, op| {
                    let accepted = matches!(op, Op::Run) && state.accepts_run();
                    *state = model(*state, op);
                    Some(accepted)
                })
                .filter(|accepted| *accepted)
                .count();
            prop_assert_eq!(sends, accepted_runs);
        }
    }
}
