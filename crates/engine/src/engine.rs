// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAG interpreter: implements the six-step execution protocol from §4.4 —
//! transition the finished node's state, store its output, compute
//! successor candidates from outgoing edges, check readiness, enqueue ready
//! candidates, and check whether the instance as a whole is done.
//!
//! Loop/foreach re-entrancy falls out of the same mechanism used for plain
//! conditional branching: when an outgoing edge's target already has a
//! terminal `NodeState` (it's being revisited along a cycle), the engine
//! treats that as one more loop iteration, resets the target to `pending`,
//! and bumps a per-edge counter capped at `maxIterations` (default 1000).

use crate::executor::{build_eval_context, eval_expr, NodeOutcome};
use oj_core::instance::{NodeState, NodeStatus};
use oj_core::workflow::{EdgeId, NodeConfig};
use oj_core::{Clock, InstanceStatus, NodeId, OjResult, Workflow, WorkflowInstance};
use oj_expr::is_truthy;
use serde_json::Value;

const DEFAULT_MAX_ITERATIONS: u64 = 1000;

#[derive(Debug, Clone, Default)]
pub struct AdvanceResult {
    /// Nodes now `ready` and safe to enqueue.
    pub ready: Vec<NodeId>,
    pub instance_status: InstanceStatus,
}

/// Marks `node_id` as currently executing. Called by the dispatching worker
/// right before invoking the node executor.
pub fn begin_node(clock: &dyn Clock, instance: &mut WorkflowInstance, node_id: &NodeId) {
    let mut state = instance.node_state(node_id);
    state.transition(clock, NodeStatus::Running);
    instance.set_node_state(node_id, state);
}

/// Applies the result of executing `node_id` and advances the DAG.
pub fn advance(
    clock: &dyn Clock,
    workflow: &Workflow,
    instance: &mut WorkflowInstance,
    node_id: &NodeId,
    outcome: NodeOutcome,
) -> OjResult<AdvanceResult> {
    match outcome {
        NodeOutcome::Done(value) => {
            instance.set_output(node_id, value.clone());
            finalize(clock, instance, node_id, NodeStatus::Done, None);
            apply_side_effects(workflow, instance, node_id, &value);
        }
        NodeOutcome::Failed(message) => {
            let retryable = retry_policy(workflow, node_id);
            let attempts = instance.node_state(node_id).attempts;
            if let Some((max_attempts, _backoff_ms)) = retryable {
                if attempts < max_attempts {
                    let mut state = instance.node_state(node_id);
                    state.error = Some(message);
                    state.transition(clock, NodeStatus::Pending);
                    instance.set_node_state(node_id, state);
                    return Ok(AdvanceResult {
                        ready: vec![node_id.clone()],
                        instance_status: instance.status,
                    });
                }
            }
            finalize(clock, instance, node_id, NodeStatus::Failed, Some(message));
        }
        NodeOutcome::Waiting | NodeOutcome::ScheduleResume(_) => {
            let mut state = instance.node_state(node_id);
            state.transition(clock, NodeStatus::Waiting);
            instance.set_node_state(node_id, state);
            return Ok(AdvanceResult {
                ready: Vec::new(),
                instance_status: instance.status,
            });
        }
    }

    let ready = compute_successors(clock, workflow, instance, node_id)?;
    let status = check_completion(workflow, instance);
    instance.status = status;
    if status == InstanceStatus::Completed && instance.completed_at.is_none() {
        instance.completed_at = Some(clock.now());
    }
    Ok(AdvanceResult { ready, instance_status: status })
}

/// Applies an externally-driven state change (`human` approval, a
/// `schedule`/`delay` timer firing) and advances the DAG the same way a
/// normal node completion would. This is the only sanctioned way to write
/// `nodeStates` outside of `advance`/`recover_on_start`.
pub fn external_transition(
    clock: &dyn Clock,
    workflow: &Workflow,
    instance: &mut WorkflowInstance,
    node_id: &NodeId,
    outcome: NodeOutcome,
) -> OjResult<AdvanceResult> {
    advance(clock, workflow, instance, node_id, outcome)
}

/// Scans for nodes left `running` by a crashed subprocess, resets them to
/// `pending` (their previous attempt counts as failed), and returns every
/// node that is now ready to (re-)enqueue.
pub fn recover_on_start(clock: &dyn Clock, workflow: &Workflow, instance: &mut WorkflowInstance) -> Vec<NodeId> {
    let mut touched = Vec::new();
    for node in &workflow.nodes {
        let mut state = instance.node_state(&node.id);
        if state.status() == NodeStatus::Running {
            state.attempts += 1;
            state.transition(clock, NodeStatus::Pending);
            instance.set_node_state(&node.id, state);
            touched.push(node.id.clone());
        }
    }
    let ready_ids: Vec<NodeId> = workflow
        .nodes
        .iter()
        .filter(|n| instance.node_state(&n.id).status() == NodeStatus::Pending)
        .filter(|n| is_ready(workflow, instance, &n.id))
        .map(|n| n.id.clone())
        .collect();

    ready_ids
        .into_iter()
        .map(|id| {
            let mut state = instance.node_state(&id);
            state.transition(clock, NodeStatus::Ready);
            instance.set_node_state(&id, state);
            id
        })
        .collect()
}

fn finalize(clock: &dyn Clock, instance: &mut WorkflowInstance, node_id: &NodeId, status: NodeStatus, error: Option<String>) {
    let mut state = instance.node_state(node_id);
    state.error = error;
    state.transition(clock, status);
    instance.set_node_state(node_id, state);
}

fn retry_policy(workflow: &Workflow, node_id: &NodeId) -> Option<(u32, u64)> {
    match &workflow.node(node_id)?.config {
        NodeConfig::Task { retry, .. } => Some((retry.max_attempts, retry.backoff_ms)),
        _ => None,
    }
}

/// `assign`/`script` nodes write their resolved assignments straight into
/// `instance.variables`; every other node type's output is opaque.
fn apply_side_effects(workflow: &Workflow, instance: &mut WorkflowInstance, node_id: &NodeId, value: &Value) {
    let Some(node) = workflow.node(node_id) else { return };
    if !matches!(node.config, NodeConfig::Assign { .. } | NodeConfig::Script { .. }) {
        return;
    }
    let Some(assignments) = value.get("assignments").and_then(|a| a.as_array()) else { return };
    for assignment in assignments {
        let (Some(path), Some(assigned)) = (assignment.get("path").and_then(|p| p.as_str()), assignment.get("value")) else {
            continue;
        };
        instance.set_variable_path(path, assigned.clone());
    }
}

fn compute_successors(
    clock: &dyn Clock,
    workflow: &Workflow,
    instance: &mut WorkflowInstance,
    node_id: &NodeId,
) -> OjResult<Vec<NodeId>> {
    let mut ready = Vec::new();
    let edges: Vec<_> = workflow.outgoing_edges(node_id).cloned().collect();
    for edge in edges {
        let taken = match &edge.condition {
            None => true,
            Some(expr) => {
                let ctx = build_eval_context(clock, workflow, instance, &[]);
                is_truthy(&eval_expr(expr, &ctx)?)
            }
        };

        if !taken {
            let mut state = instance.node_state(&edge.to);
            if state.status() == NodeStatus::Pending {
                state.transition(clock, NodeStatus::Skipped);
                instance.set_node_state(&edge.to, state);
            }
            continue;
        }

        let target_status = instance.node_state(&edge.to).status();
        if target_status.is_terminal() {
            if !revisit_for_loop(clock, workflow, instance, node_id, &edge.id, &edge.to) {
                continue;
            }
        }

        if is_ready(workflow, instance, &edge.to) {
            let mut state = instance.node_state(&edge.to);
            if state.status() == NodeStatus::Pending {
                state.transition(clock, NodeStatus::Ready);
                instance.set_node_state(&edge.to, state);
                ready.push(edge.to.clone());
            }
        }
    }
    Ok(ready)
}

/// Returns true if the target should be reset to `pending` and treated as a
/// fresh loop iteration; false if the per-edge iteration cap has been hit,
/// in which case the cycle is simply not re-entered (the loop concludes
/// rather than failing the whole instance).
fn revisit_for_loop(
    clock: &dyn Clock,
    workflow: &Workflow,
    instance: &mut WorkflowInstance,
    from: &NodeId,
    edge_id: &EdgeId,
    target: &NodeId,
) -> bool {
    let cap = workflow
        .node(from)
        .and_then(|n| match &n.config {
            NodeConfig::Loop { max_iterations, .. } => Some(*max_iterations),
            _ => None,
        })
        .unwrap_or(DEFAULT_MAX_ITERATIONS);
    let count = instance.loop_count(edge_id);
    if count >= cap {
        tracing::warn!(edge = %edge_id, cap, "loop iteration cap reached, not re-entering");
        return false;
    }
    instance.increment_loop_count(edge_id);
    instance.set_node_state(target, NodeState::pending());
    true
}

fn is_ready(workflow: &Workflow, instance: &WorkflowInstance, node_id: &NodeId) -> bool {
    let mut incoming = workflow.incoming_edges(node_id).peekable();
    if incoming.peek().is_none() {
        return true;
    }
    incoming.all(|edge| {
        matches!(
            instance.node_state(&edge.from).status(),
            NodeStatus::Done | NodeStatus::Skipped
        )
    })
}

fn check_completion(workflow: &Workflow, instance: &WorkflowInstance) -> InstanceStatus {
    let any_failed = workflow
        .nodes
        .iter()
        .any(|n| instance.node_state(&n.id).status() == NodeStatus::Failed);
    if any_failed {
        return InstanceStatus::Failed;
    }
    let any_end_done = workflow
        .nodes
        .iter()
        .any(|n| matches!(n.config, NodeConfig::End) && instance.node_state(&n.id).status() == NodeStatus::Done);
    if any_end_done {
        return InstanceStatus::Completed;
    }
    let all_terminal = workflow
        .nodes
        .iter()
        .all(|n| instance.node_state(&n.id).status().is_terminal());
    if all_terminal {
        return InstanceStatus::Completed;
    }
    InstanceStatus::Running
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
