// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node executors: one `execute_node` per §4.3 node type. Each executor
//! receives the node, its workflow, and the current instance (read-only —
//! state mutation is the engine's job) and returns an outcome the engine
//! uses to advance `NodeState`.

use chrono::{DateTime, Utc};
use oj_adapters::llm::{InvokeRequest, LlmInvoker, OnChunk};
use oj_core::workflow::{Assignment, DelayUnit, LoopMode, NodeConfig};
use oj_core::{Clock, Node, NodeOutput, OjError, OjResult, Workflow, WorkflowInstance};
use oj_expr::{eval, is_truthy, EvalContext, Parser};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::cron::CronSchedule;

/// What a node execution produced.
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    /// The node is finished; carries the value to store under
    /// `instance.outputs[nodeId]`.
    Done(Value),
    /// The node is terminal-failed; carries the error message.
    Failed(String),
    /// The node is parked (`human`), waiting on an external transition.
    Waiting,
    /// The node should resume at the given instant (`delay`/`schedule`).
    ScheduleResume(DateTime<Utc>),
}

pub struct ExecutionContext<'a> {
    pub clock: &'a dyn Clock,
    pub llm: &'a dyn LlmInvoker,
}

/// Builds the expression evaluation scope for `workflow`/`instance`, with
/// extra loop/foreach bindings merged in last so they can shadow the base
/// scope. Top-level maps keyed by node id get the same hyphen/underscore
/// dual-indexing `NodeOutput` applies to structured output content, since
/// node ids may themselves be hyphenated.
pub fn build_eval_context(
    clock: &dyn Clock,
    workflow: &Workflow,
    instance: &WorkflowInstance,
    extra: &[(&str, Value)],
) -> EvalContext {
    let mut ctx = EvalContext::new(clock.now().timestamp_millis());

    let mut outputs = Map::new();
    for (node_id, value) in &instance.outputs {
        insert_aliased(&mut outputs, node_id, value.clone());
    }
    ctx.set("outputs", Value::Object(outputs));

    let mut variables = Map::new();
    for (key, value) in &workflow.variables {
        variables.insert(key.clone(), value.clone());
    }
    for (key, value) in &instance.variables {
        variables.insert(key.clone(), value.clone());
    }
    ctx.set("variables", Value::Object(variables));

    let mut node_states = Map::new();
    for node in &workflow.nodes {
        let state = instance.node_state(&node.id);
        let entry = serde_json::json!({
            "status": format!("{:?}", state.status()).to_lowercase(),
            "attempts": state.attempts,
        });
        insert_aliased(&mut node_states, node.id.as_str(), entry);
    }
    ctx.set("nodeStates", Value::Object(node_states));

    ctx.set("inputs", workflow.inputs.clone().unwrap_or(Value::Null));

    for (key, value) in extra {
        ctx.set(*key, value.clone());
    }
    ctx
}

fn insert_aliased(map: &mut Map<String, Value>, key: &str, value: Value) {
    if key.contains('-') {
        map.insert(key.replace('-', "_"), value.clone());
    }
    map.insert(key.to_string(), value);
}

pub(crate) fn eval_expr(src: &str, ctx: &EvalContext) -> OjResult<Value> {
    let expr = Parser::parse(src).map_err(|e| OjError::Expression(e.to_string()))?;
    eval(&expr, ctx).map_err(|e| OjError::Expression(e.to_string()))
}

/// Executes one node. Never returns an `Err` for a node-level failure —
/// those surface as `NodeOutcome::Failed` so the engine can apply retry
/// policy; `Err` is reserved for evaluator/programming errors outside the
/// node's own control (e.g. a malformed expression the engine should
/// surface as `NodeFailed` without retry bookkeeping).
pub async fn execute_node(
    ctx: &ExecutionContext<'_>,
    cancel: CancellationToken,
    workflow: &Workflow,
    instance: &WorkflowInstance,
    node: &Node,
) -> NodeOutcome {
    match &node.config {
        NodeConfig::Start | NodeConfig::End | NodeConfig::Condition | NodeConfig::Parallel | NodeConfig::Join => {
            NodeOutcome::Done(Value::Null)
        }
        NodeConfig::Task { persona, prompt, model, stream: _, .. } => {
            execute_task(ctx, cancel, workflow, instance, persona.as_deref(), prompt, model.as_deref()).await
        }
        NodeConfig::Human { .. } => NodeOutcome::Waiting,
        NodeConfig::Delay { value, unit } => {
            let ms = *value * unit.factor_ms();
            NodeOutcome::ScheduleResume(ctx.clock.now() + chrono::Duration::milliseconds(ms as i64))
        }
        NodeConfig::Schedule { datetime, cron } => execute_schedule(ctx, *datetime, cron.as_deref()),
        NodeConfig::Switch { expression, cases, default } => execute_switch(workflow, instance, ctx.clock, expression, cases, default.as_ref()),
        NodeConfig::Assign { assignments } => execute_assign(workflow, instance, ctx.clock, assignments),
        NodeConfig::Script { expression, output_var, assignments } => {
            execute_script(workflow, instance, ctx.clock, expression.as_deref(), output_var.as_deref(), assignments)
        }
        NodeConfig::Loop { mode, condition, count, .. } => execute_loop_check(workflow, instance, ctx.clock, *mode, condition.as_deref(), *count),
        NodeConfig::Foreach { collection, .. } => execute_foreach_collection(workflow, instance, ctx.clock, collection),
    }
}

async fn execute_task(
    ctx: &ExecutionContext<'_>,
    cancel: CancellationToken,
    workflow: &Workflow,
    instance: &WorkflowInstance,
    persona: Option<&str>,
    prompt_template: &str,
    model: Option<&str>,
) -> NodeOutcome {
    let eval_ctx = build_eval_context(ctx.clock, workflow, instance, &[]);
    let prompt = match interpolate(prompt_template, &eval_ctx) {
        Ok(p) => p,
        Err(e) => return NodeOutcome::Failed(e.to_string()),
    };
    let prompt = match persona {
        Some(p) => format!("{p}\n\n{prompt}"),
        None => prompt,
    };
    let request = InvokeRequest {
        prompt,
        model: model.map(String::from).or_else(|| workflow.settings.default_model.clone()),
        session_id: instance.session_id.clone(),
        timeout: Duration::from_secs(600),
    };
    let mut on_chunk: Box<OnChunk> = Box::new(|_: &str| {});
    match ctx.llm.invoke(request, cancel, &mut *on_chunk).await {
        Ok(response) => {
            let output = NodeOutput::parse_llm_response(&response.text);
            NodeOutcome::Done(output.into_value())
        }
        Err(e) => NodeOutcome::Failed(e.to_string()),
    }
}

/// Replaces `{{expr}}` spans in `template` with the string form of each
/// expression's evaluated value; plain text passes through untouched.
fn interpolate(template: &str, ctx: &EvalContext) -> OjResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let expr_src = after[..end].trim();
        let value = eval_expr(expr_src, ctx)?;
        out.push_str(&value_to_display(&value));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn execute_schedule(ctx: &ExecutionContext<'_>, datetime: Option<DateTime<Utc>>, cron: Option<&str>) -> NodeOutcome {
    if let Some(at) = datetime {
        let now = ctx.clock.now();
        return NodeOutcome::ScheduleResume(if at <= now { now } else { at });
    }
    if let Some(expr) = cron {
        return match CronSchedule::parse(expr).and_then(|s| s.next_after(&ctx.clock.now())) {
            Ok(at) => NodeOutcome::ScheduleResume(at),
            Err(e) => NodeOutcome::Failed(e.to_string()),
        };
    }
    NodeOutcome::Failed("schedule node has neither datetime nor cron".into())
}

fn execute_switch(
    workflow: &Workflow,
    instance: &WorkflowInstance,
    clock: &dyn Clock,
    expression: &str,
    cases: &[oj_core::workflow::SwitchCase],
    default: Option<&oj_core::workflow::NodeId>,
) -> NodeOutcome {
    let eval_ctx = build_eval_context(clock, workflow, instance, &[]);
    let value = match eval_expr(expression, &eval_ctx) {
        Ok(v) => v,
        Err(e) => return NodeOutcome::Failed(e.to_string()),
    };
    let selected = cases
        .iter()
        .find(|case| case.value == value)
        .map(|case| case.target.as_str())
        .or_else(|| default.map(|d| d.as_str()));
    match selected {
        Some(target) => NodeOutcome::Done(serde_json::json!({ "selected": target })),
        None => NodeOutcome::Failed(format!("switch expression matched no case and no default: {value}")),
    }
}

fn execute_assign(
    workflow: &Workflow,
    instance: &WorkflowInstance,
    clock: &dyn Clock,
    assignments: &[Assignment],
) -> NodeOutcome {
    match resolve_assignments(workflow, instance, clock, assignments) {
        Ok(resolved) => NodeOutcome::Done(serde_json::json!({ "assignments": resolved })),
        Err(e) => NodeOutcome::Failed(e.to_string()),
    }
}

fn execute_script(
    workflow: &Workflow,
    instance: &WorkflowInstance,
    clock: &dyn Clock,
    expression: Option<&str>,
    output_var: Option<&str>,
    assignments: &[Assignment],
) -> NodeOutcome {
    let eval_ctx = build_eval_context(clock, workflow, instance, &[]);
    let mut resolved = match resolve_assignments(workflow, instance, clock, assignments) {
        Ok(r) => r,
        Err(e) => return NodeOutcome::Failed(e.to_string()),
    };
    if let Some(expr) = expression {
        let value = match eval_expr(expr, &eval_ctx) {
            Ok(v) => v,
            Err(e) => return NodeOutcome::Failed(e.to_string()),
        };
        if let Some(var) = output_var {
            resolved.push(serde_json::json!({ "path": var, "value": value }));
        }
    }
    NodeOutcome::Done(serde_json::json!({ "assignments": resolved }))
}

fn resolve_assignments(
    workflow: &Workflow,
    instance: &WorkflowInstance,
    clock: &dyn Clock,
    assignments: &[Assignment],
) -> OjResult<Vec<Value>> {
    let eval_ctx = build_eval_context(clock, workflow, instance, &[]);
    let mut resolved = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let value = if assignment.is_expression {
            let src = assignment
                .value
                .as_str()
                .ok_or_else(|| OjError::InvalidState("expression assignment value must be a string".into()))?;
            eval_expr(src, &eval_ctx)?
        } else {
            assignment.value.clone()
        };
        resolved.push(serde_json::json!({ "path": assignment.path, "value": value }));
    }
    Ok(resolved)
}

fn execute_loop_check(
    workflow: &Workflow,
    instance: &WorkflowInstance,
    clock: &dyn Clock,
    mode: LoopMode,
    condition: Option<&str>,
    count: Option<u64>,
) -> NodeOutcome {
    let eval_ctx = build_eval_context(clock, workflow, instance, &[]);
    let continue_loop = match mode {
        LoopMode::While => match condition {
            Some(expr) => match eval_expr(expr, &eval_ctx) {
                Ok(v) => is_truthy(&v),
                Err(e) => return NodeOutcome::Failed(e.to_string()),
            },
            None => false,
        },
        LoopMode::Until => match condition {
            Some(expr) => match eval_expr(expr, &eval_ctx) {
                Ok(v) => !is_truthy(&v),
                Err(e) => return NodeOutcome::Failed(e.to_string()),
            },
            None => false,
        },
        LoopMode::For => count.map(|_| true).unwrap_or(false),
    };
    NodeOutcome::Done(serde_json::json!({ "continue": continue_loop }))
}

fn execute_foreach_collection(
    workflow: &Workflow,
    instance: &WorkflowInstance,
    clock: &dyn Clock,
    collection: &str,
) -> NodeOutcome {
    let eval_ctx = build_eval_context(clock, workflow, instance, &[]);
    match eval_expr(collection, &eval_ctx) {
        Ok(Value::Array(items)) => NodeOutcome::Done(Value::Array(items)),
        Ok(other) => NodeOutcome::Failed(format!("foreach collection did not evaluate to a sequence: {other}")),
        Err(e) => NodeOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
