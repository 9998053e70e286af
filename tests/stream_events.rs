//! Streaming facade: event ordering, terminal events, frontier visibility,
//! idle timeout, and consumer cancellation.


use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_stream::StreamExt;

use heddle::{
    interrupt, CheckpointStore, ExecutionEvent, GraphState, InvokeOptions, MemorySaver,
    NodeOutput, StateGraph, StateSchema, StateUpdate, StreamOutcome, END, REMAINING_STEPS, START,
};

fn int(state: &GraphState, key: &str) -> i64 {
    state.get(key).and_then(|v| v.as_i64()).unwrap_or(0)
}

fn two_step_graph() -> heddle::CompiledGraph {
    let mut graph = StateGraph::new(StateSchema::new().field("value", json!(0)));
    graph.add_node_fn("first", |state: GraphState| async move {
        Ok(NodeOutput::update(
            StateUpdate::new().set("value", json!(int(&state, "value") + 1)),
        ))
    });
    graph.add_node_fn("second", |state: GraphState| async move {
        Ok(NodeOutput::update(
            StateUpdate::new().set("value", json!(int(&state, "value") * 2)),
        ))
    });
    graph.add_edge(START, "first");
    graph.add_edge("first", "second");
    graph.add_edge("second", END);
    graph.compile().unwrap()
}

/// **Scenario**: a two-step run emits step/node events in order and ends
/// with Done(Complete).
#[tokio::test]
async fn event_sequence_for_linear_run() {
    let compiled = two_step_graph();
    let events: Vec<_> = compiled
        .stream(
            StateUpdate::new().set("value", json!(1)),
            InvokeOptions::default(),
        )
        .collect()
        .await;

    let kinds: Vec<&'static str> = events
        .iter()
        .map(|event| match event {
            ExecutionEvent::StepStart { .. } => "step_start",
            ExecutionEvent::NodeStart { .. } => "node_start",
            ExecutionEvent::NodeEnd { .. } => "node_end",
            ExecutionEvent::StepEnd { .. } => "step_end",
            ExecutionEvent::Done(_) => "done",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "step_start",
            "node_start",
            "node_end",
            "step_end",
            "step_start",
            "node_start",
            "node_end",
            "step_end",
            "done",
        ]
    );

    match &events[0] {
        ExecutionEvent::StepStart { step, nodes } => {
            assert_eq!(*step, 0);
            assert_eq!(nodes, &vec!["first".to_string()]);
        }
        other => panic!("expected StepStart, got {:?}", other),
    }
    match &events[3] {
        ExecutionEvent::StepEnd { step, state } => {
            assert_eq!(*step, 0);
            assert_eq!(state.get("value"), Some(&json!(2)));
            assert!(!state.contains_key(REMAINING_STEPS));
        }
        other => panic!("expected StepEnd, got {:?}", other),
    }
    match events.last().unwrap() {
        ExecutionEvent::Done(StreamOutcome::Complete { state }) => {
            assert_eq!(state.get("value"), Some(&json!(4)));
        }
        other => panic!("expected Done(Complete), got {:?}", other),
    }
}

/// **Scenario**: when a node returns a command with a goto and also has a
/// fixed edge, the next StepStart lists the goto target first.
#[tokio::test]
async fn command_goto_precedes_fixed_edge_in_frontier() {
    let mut graph = StateGraph::new(StateSchema::new().field("k", json!(0)));
    graph.add_node_fn("decide", |_state: GraphState| async move {
        Ok(NodeOutput::command(StateUpdate::new(), ["preferred"]))
    });
    for name in ["preferred", "fallback"] {
        graph.add_node_fn(name, |_state: GraphState| async move {
            Ok(NodeOutput::update(StateUpdate::new()))
        });
        graph.add_edge(name, END);
    }
    graph.add_edge(START, "decide");
    graph.add_edge("decide", "fallback");
    let compiled = graph.compile().unwrap();

    let events: Vec<_> = compiled
        .stream(StateUpdate::new(), InvokeOptions::default())
        .collect()
        .await;
    let second_step = events
        .iter()
        .find_map(|event| match event {
            ExecutionEvent::StepStart { step: 1, nodes } => Some(nodes.clone()),
            _ => None,
        })
        .expect("second step starts");
    assert_eq!(
        second_step,
        vec!["preferred".to_string(), "fallback".to_string()],
        "goto target must precede the edge-derived target"
    );
}

/// **Scenario**: an interrupting run ends the stream with Done(Interrupted).
#[tokio::test]
async fn interrupt_ends_stream() {
    let mut graph = StateGraph::new(StateSchema::new().field("k", json!(0)));
    graph.add_node_fn("pauser", |_state: GraphState| async move {
        let _ = interrupt(json!("hold"))?;
        Ok(NodeOutput::update(StateUpdate::new()))
    });
    graph.add_edge(START, "pauser");
    graph.add_edge("pauser", END);
    let compiled = graph.compile().unwrap();

    let events: Vec<_> = compiled
        .stream(StateUpdate::new(), InvokeOptions::default())
        .collect()
        .await;
    match events.last().unwrap() {
        ExecutionEvent::Done(StreamOutcome::Interrupted { value, .. }) => {
            assert_eq!(value, &json!("hold"));
        }
        other => panic!("expected Done(Interrupted), got {:?}", other),
    }
}

/// **Scenario**: a failing node ends the stream with Done(Failed).
#[tokio::test]
async fn failure_ends_stream() {
    let mut graph = StateGraph::new(StateSchema::new());
    graph.add_node_fn("broken", |_state: GraphState| async move {
        Err(heddle::NodeError::failed("boom"))
    });
    graph.add_edge(START, "broken");
    graph.add_edge("broken", END);
    let compiled = graph.compile().unwrap();

    let events: Vec<_> = compiled
        .stream(StateUpdate::new(), InvokeOptions::default())
        .collect()
        .await;
    match events.last().unwrap() {
        ExecutionEvent::Done(StreamOutcome::Failed { reason }) => {
            assert!(reason.contains("boom"), "{}", reason);
        }
        other => panic!("expected Done(Failed), got {:?}", other),
    }
}

/// **Scenario**: a silent producer trips the idle timeout, which reports the
/// last-seen state (none here, since the node stalls inside step 0).
#[tokio::test]
async fn idle_timeout_ends_stream() {
    let mut graph = StateGraph::new(StateSchema::new());
    graph.add_node_fn("slow", |_state: GraphState| async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(NodeOutput::update(StateUpdate::new()))
    });
    graph.add_edge(START, "slow");
    graph.add_edge("slow", END);
    let compiled = graph.compile().unwrap();

    let events: Vec<_> = compiled
        .stream(StateUpdate::new(), InvokeOptions::default())
        .with_idle_timeout(Duration::from_millis(30))
        .collect()
        .await;
    match events.last().unwrap() {
        ExecutionEvent::Done(StreamOutcome::IdleTimeout { state }) => {
            assert!(state.is_none(), "no step completed before the stall");
        }
        other => panic!("expected Done(IdleTimeout), got {:?}", other),
    }
}

/// **Scenario**: dropping the stream stops emission but the execution
/// completes in the background (observed through its checkpoints).
#[tokio::test]
async fn consumer_cancellation_does_not_stop_engine() {
    let saver = Arc::new(MemorySaver::new());
    let mut graph = StateGraph::new(StateSchema::new().field("value", json!(0)));
    graph.add_node_fn("first", |state: GraphState| async move {
        Ok(NodeOutput::update(
            StateUpdate::new().set("value", json!(int(&state, "value") + 1)),
        ))
    });
    graph.add_node_fn("second", |state: GraphState| async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(NodeOutput::update(
            StateUpdate::new().set("value", json!(int(&state, "value") * 2)),
        ))
    });
    graph.add_edge(START, "first");
    graph.add_edge("first", "second");
    graph.add_edge("second", END);
    let compiled = graph.compile_with_checkpointer(saver.clone()).unwrap();
    let options = InvokeOptions::default().with_thread_id("t1");

    let mut stream = compiled.stream(StateUpdate::new().set("value", json!(1)), options.clone());
    let first_event = stream.next().await;
    assert!(first_event.is_some());
    drop(stream);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let checkpoint = saver
        .load(&options.config)
        .await
        .unwrap()
        .expect("engine finished in the background");
    assert_eq!(checkpoint.step, 1);
    assert_eq!(checkpoint.state.get("value"), Some(&json!(4)));
}
