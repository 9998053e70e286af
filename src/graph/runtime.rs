//! The super-step engine.
//!
//! Drives the bulk-synchronous loop: select the frontier, run its nodes in
//! parallel, fold their updates through the reducers, resolve routing,
//! enforce the recursion bound, emit events, persist checkpoints, and honor
//! cooperative interrupts.
//!
//! Ordering guarantees: between super-steps there is a strict happens-before
//! (all of step `t` is merged and persisted before step `t+1` starts).
//! Within a step, task order is unobservable and updates fold in completion
//! order; keys written by multiple concurrent nodes need a commutative
//! reducer. On an interrupt in a parallel step, sibling tasks are not
//! pre-empted — they run to completion and their updates are discarded.

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::{GraphError, NodeError};
use crate::graph::compiled::{CompiledGraph, RunOutcome};
use crate::graph::conditional::Dispatch;
use crate::graph::frontier::{resolve_frontier, ResolvedFrontier};
use crate::graph::interrupt::with_resume_slot;
use crate::graph::logging::{
    log_graph_complete, log_interrupt, log_node_complete, log_node_start, log_step_end,
    log_step_start,
};
use crate::graph::node::{NodeContext, NodeOutput};
use crate::graph::state_graph::{END, START};
use crate::memory::{Checkpoint, PendingInterrupt};
use crate::state::{apply_update, inject_managed, strip_managed, GraphState, StateUpdate};
use crate::stream::ExecutionEvent;

/// Default super-step bound per invocation.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// Result of executing one frontier.
enum StepOutcome {
    /// Every node returned an output; results are in task-completion order.
    Completed(Vec<(String, NodeOutput)>),
    /// A node suspended; sibling results were discarded.
    Interrupted { node: String, value: Value },
}

/// One engine invocation: borrows the compiled graph, owns the run options.
pub(crate) struct Engine<'g> {
    graph: &'g CompiledGraph,
    limit: usize,
    ctx: NodeContext,
    events: Option<mpsc::Sender<ExecutionEvent>>,
}

impl<'g> Engine<'g> {
    pub(crate) fn new(
        graph: &'g CompiledGraph,
        limit: usize,
        ctx: NodeContext,
        events: Option<mpsc::Sender<ExecutionEvent>>,
    ) -> Self {
        Self {
            graph,
            limit,
            ctx,
            events,
        }
    }

    /// Resolves `__start__` as if it had just executed, then runs the loop
    /// from step 0.
    pub(crate) async fn run_from_start(
        &self,
        state: GraphState,
    ) -> Result<RunOutcome, GraphError> {
        let resolved =
            resolve_frontier(self.graph, &[START.to_string()], &state, &[])?;
        self.run_dispatches(resolved.dispatches).await?;
        self.run(state, resolved.nodes, 0, None).await
    }

    /// Resume mode: re-run exactly the interrupting node recorded in
    /// `checkpoint` with the resume value in the ambient slot, then continue
    /// with the standard post-step flow.
    pub(crate) async fn run_resume(
        &self,
        checkpoint: Checkpoint,
        resume_value: Value,
    ) -> Result<RunOutcome, GraphError> {
        let pending: PendingInterrupt = checkpoint
            .pending_interrupts
            .as_ref()
            .and_then(|pending| pending.first())
            .cloned()
            .ok_or(GraphError::NoPendingInterrupt)?;
        if !self.graph.nodes.contains_key(&pending.node) {
            return Err(GraphError::UnknownNode(pending.node));
        }

        let mut state = checkpoint.state;
        // The interrupted step already counted; the re-run is the next one.
        let step = checkpoint.step + 1;
        let mut parent_id = Some(checkpoint.checkpoint_id);
        if step >= self.limit {
            return Err(GraphError::RecursionLimit {
                limit: self.limit,
                step,
                frontier: vec![pending.node],
            });
        }

        let frontier = vec![pending.node.clone()];
        self.emit(ExecutionEvent::StepStart {
            step,
            nodes: frontier.clone(),
        })
        .await;
        log_step_start(step, &frontier);
        inject_managed(&mut state, step, self.limit);

        self.emit(ExecutionEvent::NodeStart {
            node: pending.node.clone(),
        })
        .await;
        log_node_start(&pending.node);
        let node = self
            .graph
            .nodes
            .get(&pending.node)
            .expect("resume node checked against the node set")
            .clone();
        let result = with_resume_slot(
            Some(resume_value),
            node.run(state.clone(), self.ctx.clone()),
        )
        .await;

        match result {
            Ok(output) => {
                let next = self
                    .finish_step(
                        &mut state,
                        &frontier,
                        vec![(pending.node, output)],
                        step,
                        &mut parent_id,
                    )
                    .await?;
                self.run(state, next, step + 1, parent_id).await
            }
            Err(NodeError::Interrupted(interrupt)) => {
                strip_managed(&mut state);
                self.persist_interrupt(&state, &pending.node, &interrupt.value, step, &mut parent_id)
                    .await?;
                log_interrupt(&pending.node);
                Ok(RunOutcome::Interrupted {
                    value: interrupt.value,
                    state,
                })
            }
            Err(NodeError::Failed(message)) => Err(GraphError::NodeFailed {
                node: pending.node,
                message,
            }),
        }
    }

    /// The BSP loop. `parent_id` chains the checkpoints of this invocation.
    async fn run(
        &self,
        mut state: GraphState,
        mut frontier: Vec<String>,
        mut step: usize,
        mut parent_id: Option<String>,
    ) -> Result<RunOutcome, GraphError> {
        loop {
            frontier.retain(|name| name != END);
            if frontier.is_empty() {
                log_graph_complete(step);
                return Ok(RunOutcome::Complete(state));
            }
            if step >= self.limit {
                return Err(GraphError::RecursionLimit {
                    limit: self.limit,
                    step,
                    frontier,
                });
            }

            self.emit(ExecutionEvent::StepStart {
                step,
                nodes: frontier.clone(),
            })
            .await;
            log_step_start(step, &frontier);
            inject_managed(&mut state, step, self.limit);

            match self.execute_step(&frontier, &state).await? {
                StepOutcome::Interrupted { node, value } => {
                    strip_managed(&mut state);
                    self.persist_interrupt(&state, &node, &value, step, &mut parent_id)
                        .await?;
                    log_interrupt(&node);
                    return Ok(RunOutcome::Interrupted { value, state });
                }
                StepOutcome::Completed(results) => {
                    let executed = std::mem::take(&mut frontier);
                    frontier = self
                        .finish_step(&mut state, &executed, results, step, &mut parent_id)
                        .await?;
                    step += 1;
                }
            }
        }
    }

    /// Post-step flow shared by the loop and the resume pass: fold updates in
    /// completion order, strip the managed key, resolve routing, run
    /// dispatches, emit events, persist a checkpoint. Returns the next
    /// frontier.
    async fn finish_step(
        &self,
        state: &mut GraphState,
        executed: &[String],
        results: Vec<(String, NodeOutput)>,
        step: usize,
        parent_id: &mut Option<String>,
    ) -> Result<Vec<String>, GraphError> {
        let mut gotos: Vec<String> = Vec::new();
        let mut completed: Vec<(String, StateUpdate)> = Vec::new();
        for (node, output) in results {
            let (update, mut node_gotos) = output.into_parts();
            apply_update(state, &update, &self.graph.reducers);
            gotos.append(&mut node_gotos);
            completed.push((node, update));
        }
        strip_managed(state);

        let ResolvedFrontier { nodes, dispatches } =
            resolve_frontier(self.graph, executed, state, &gotos)?;
        self.run_dispatches(dispatches).await?;

        for (node, update) in completed {
            self.emit(ExecutionEvent::NodeEnd { node: node.clone(), update })
                .await;
            log_node_complete(&node);
        }
        self.emit(ExecutionEvent::StepEnd {
            step,
            state: state.clone(),
        })
        .await;
        log_step_end(step);

        self.persist_step(state, &nodes, step, parent_id).await?;
        Ok(nodes)
    }

    /// Executes the active set: inline for a single node, forked tasks for
    /// two or more. Tasks are independent of the engine; a panic surfaces as
    /// an invocation failure, never a crash of the caller.
    async fn execute_step(
        &self,
        frontier: &[String],
        state: &GraphState,
    ) -> Result<StepOutcome, GraphError> {
        if let [name] = frontier {
            self.emit(ExecutionEvent::NodeStart { node: name.clone() }).await;
            log_node_start(name);
            let node = self
                .graph
                .nodes
                .get(name)
                .ok_or_else(|| GraphError::UnknownNode(name.clone()))?
                .clone();
            let result =
                with_resume_slot(None, node.run(state.clone(), self.ctx.clone())).await;
            return match result {
                Ok(output) => Ok(StepOutcome::Completed(vec![(name.clone(), output)])),
                Err(NodeError::Interrupted(interrupt)) => Ok(StepOutcome::Interrupted {
                    node: name.clone(),
                    value: interrupt.value,
                }),
                Err(NodeError::Failed(message)) => Err(GraphError::NodeFailed {
                    node: name.clone(),
                    message,
                }),
            };
        }

        let mut tasks = JoinSet::new();
        for name in frontier {
            self.emit(ExecutionEvent::NodeStart { node: name.clone() }).await;
            log_node_start(name);
            let node = self
                .graph
                .nodes
                .get(name)
                .ok_or_else(|| GraphError::UnknownNode(name.clone()))?
                .clone();
            let name = name.clone();
            let state = state.clone();
            let ctx = self.ctx.clone();
            tasks.spawn(async move {
                let result = with_resume_slot(None, node.run(state, ctx)).await;
                (name, result)
            });
        }

        // Drain every task even after an interrupt or failure: siblings run
        // to completion, only their results are dropped.
        let mut results: Vec<(String, NodeOutput)> = Vec::new();
        let mut interrupted: Option<(String, Value)> = None;
        let mut failed: Option<GraphError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(output))) => results.push((name, output)),
                Ok((name, Err(NodeError::Interrupted(interrupt)))) => {
                    if interrupted.is_none() {
                        interrupted = Some((name, interrupt.value));
                    }
                }
                Ok((name, Err(NodeError::Failed(message)))) => {
                    if failed.is_none() {
                        failed = Some(GraphError::NodeFailed { node: name, message });
                    }
                }
                Err(join_error) => {
                    if failed.is_none() {
                        failed = Some(GraphError::NodeFailed {
                            node: "<task>".to_string(),
                            message: join_error.to_string(),
                        });
                    }
                }
            }
        }
        if let Some(error) = failed {
            return Err(error);
        }
        if let Some((node, value)) = interrupted {
            return Ok(StepOutcome::Interrupted { node, value });
        }
        Ok(StepOutcome::Completed(results))
    }

    /// Runs dynamic fan-out requests one by one; updates are discarded. An
    /// interrupt raised inside a dispatch is discarded with its result; a
    /// failure is still fatal.
    async fn run_dispatches(&self, dispatches: Vec<Dispatch>) -> Result<(), GraphError> {
        for dispatch in dispatches {
            let Dispatch { node: name, state } = dispatch;
            let node = self
                .graph
                .nodes
                .get(&name)
                .ok_or_else(|| GraphError::UnknownNode(name.clone()))?
                .clone();
            match with_resume_slot(None, node.run(state, self.ctx.clone())).await {
                Ok(_) | Err(NodeError::Interrupted(_)) => {}
                Err(NodeError::Failed(message)) => {
                    return Err(GraphError::NodeFailed { node: name, message });
                }
            }
        }
        Ok(())
    }

    /// Persists a normal per-step checkpoint when a store and thread id are
    /// configured. A save error fails the invocation.
    async fn persist_step(
        &self,
        state: &GraphState,
        next_nodes: &[String],
        step: usize,
        parent_id: &mut Option<String>,
    ) -> Result<(), GraphError> {
        let (Some(store), Some(thread_id)) = (
            self.graph.checkpointer.as_ref(),
            self.ctx.config.thread_id.as_deref(),
        ) else {
            return Ok(());
        };
        let mut checkpoint =
            Checkpoint::new(thread_id, state.clone(), next_nodes.to_vec(), step);
        checkpoint.parent_id = parent_id.clone();
        checkpoint.metadata.insert("source".into(), json!("loop"));
        store.save(&self.ctx.config, &checkpoint).await?;
        *parent_id = Some(checkpoint.checkpoint_id);
        Ok(())
    }

    /// Persists an interrupt checkpoint: next step is exactly the
    /// interrupting node, with the pending payload recorded for resume.
    async fn persist_interrupt(
        &self,
        state: &GraphState,
        node: &str,
        value: &Value,
        step: usize,
        parent_id: &mut Option<String>,
    ) -> Result<(), GraphError> {
        let (Some(store), Some(thread_id)) = (
            self.graph.checkpointer.as_ref(),
            self.ctx.config.thread_id.as_deref(),
        ) else {
            return Ok(());
        };
        let mut checkpoint =
            Checkpoint::new(thread_id, state.clone(), vec![node.to_string()], step);
        checkpoint.parent_id = parent_id.clone();
        checkpoint.metadata.insert("source".into(), json!("interrupt"));
        checkpoint.pending_interrupts = Some(vec![PendingInterrupt {
            value: value.clone(),
            node: node.to_string(),
        }]);
        store.save(&self.ctx.config, &checkpoint).await?;
        *parent_id = Some(checkpoint.checkpoint_id);
        Ok(())
    }

    /// Forwards an event to the stream consumer, if one is attached. A gone
    /// consumer stops emission without affecting the run.
    async fn emit(&self, event: ExecutionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}
