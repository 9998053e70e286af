//! Streaming facade: execution as a lazy event sequence.
//!
//! `CompiledGraph::stream` runs the engine on a background task and returns
//! an [`EventStream`] — a single-consumer, finite `Stream` of
//! [`ExecutionEvent`]s ending in a `Done` event. Dropping the stream stops
//! emission; the engine completes in the background unless its runtime is
//! torn down. An idle timeout (default 5 s) terminates the stream with the
//! last-seen state.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant, Sleep};
use tokio_stream::Stream;

use crate::state::{GraphState, StateUpdate};

/// Default idle timeout: events absent this long end the stream.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Terminal outcome delivered by the final `Done` event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// The graph reached `__end__` or an empty frontier.
    Complete { state: GraphState },
    /// A node interrupted; resume with the thread's checkpoint.
    Interrupted { value: Value, state: GraphState },
    /// The invocation failed.
    Failed { reason: String },
    /// No events arrived within the idle timeout; carries the last state
    /// observed through a `StepEnd` event, if any.
    IdleTimeout { state: Option<GraphState> },
}

/// Event emitted while running a graph.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    /// A super-step is starting with this active set.
    StepStart { step: usize, nodes: Vec<String> },
    /// A node is about to execute.
    NodeStart { node: String },
    /// A node completed; its update has been merged.
    NodeEnd { node: String, update: StateUpdate },
    /// A super-step finished; the state has the managed key stripped.
    StepEnd { step: usize, state: GraphState },
    /// Terminal event; the stream ends after it.
    Done(StreamOutcome),
}

/// Single-consumer stream of execution events.
///
/// Finite and not restartable. `with_idle_timeout` adjusts the inactivity
/// bound before consumption starts.
pub struct EventStream {
    rx: mpsc::Receiver<ExecutionEvent>,
    idle_timeout: Duration,
    deadline: Pin<Box<Sleep>>,
    last_state: Option<GraphState>,
    finished: bool,
}

impl EventStream {
    pub(crate) fn new(rx: mpsc::Receiver<ExecutionEvent>) -> Self {
        Self {
            rx,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            deadline: Box::pin(sleep(DEFAULT_IDLE_TIMEOUT)),
            last_state: None,
            finished: false,
        }
    }

    /// Replaces the idle timeout, resetting the current deadline.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self.deadline.as_mut().reset(Instant::now() + timeout);
        self
    }
}

impl Stream for EventStream {
    type Item = ExecutionEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                let next_deadline = Instant::now() + this.idle_timeout;
                this.deadline.as_mut().reset(next_deadline);
                match &event {
                    ExecutionEvent::StepEnd { state, .. } => {
                        this.last_state = Some(state.clone());
                    }
                    ExecutionEvent::Done(_) => this.finished = true,
                    _ => {}
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => match this.deadline.as_mut().poll(cx) {
                Poll::Ready(()) => {
                    this.finished = true;
                    Poll::Ready(Some(ExecutionEvent::Done(StreamOutcome::IdleTimeout {
                        state: this.last_state.take(),
                    })))
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    /// **Scenario**: events pass through in order and the stream ends after Done.
    #[tokio::test]
    async fn passes_events_through_and_ends_on_done() {
        let (tx, rx) = mpsc::channel(8);
        let stream = EventStream::new(rx);
        tx.send(ExecutionEvent::NodeStart { node: "a".into() })
            .await
            .unwrap();
        tx.send(ExecutionEvent::Done(StreamOutcome::Complete {
            state: GraphState::new(),
        }))
        .await
        .unwrap();

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ExecutionEvent::NodeStart { .. }));
        assert!(matches!(events[1], ExecutionEvent::Done(_)));
    }

    /// **Scenario**: silence beyond the idle timeout ends the stream with the
    /// last-seen state.
    #[tokio::test]
    async fn idle_timeout_terminates_with_last_state() {
        let (tx, rx) = mpsc::channel(8);
        let state: GraphState =
            [("k".to_string(), serde_json::json!(1))].into_iter().collect();
        tx.send(ExecutionEvent::StepEnd {
            step: 0,
            state: state.clone(),
        })
        .await
        .unwrap();
        // Keep tx alive so the channel does not close; just stay silent.
        let stream = EventStream::new(rx).with_idle_timeout(Duration::from_millis(20));
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
        match &events[1] {
            ExecutionEvent::Done(StreamOutcome::IdleTimeout { state: last }) => {
                assert_eq!(last.as_ref(), Some(&state));
            }
            other => panic!("expected IdleTimeout, got {:?}", other),
        }
        drop(tx);
    }

    /// **Scenario**: a closed channel without Done ends the stream cleanly.
    #[tokio::test]
    async fn closed_channel_ends_stream() {
        let (tx, rx) = mpsc::channel::<ExecutionEvent>(8);
        drop(tx);
        let events: Vec<_> = EventStream::new(rx).collect().await;
        assert!(events.is_empty());
    }
}
