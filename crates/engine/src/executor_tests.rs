use super::*;
use oj_adapters::llm::{FakeInvoker, InvokeResponse};
use oj_core::workflow::{DelayUnit, ForeachMode, LoopMode, NodeConfig, WorkflowSettings};
use oj_core::{Edge, FakeClock, Node, NodeId, Workflow};

fn node(id: &str, config: NodeConfig) -> Node {
    Node {
        id: NodeId::new(id),
        name: id.to_string(),
        config,
    }
}

fn workflow(nodes: Vec<Node>) -> Workflow {
    Workflow {
        id: oj_core::WorkflowId::new("wf-1"),
        task_id: "task-1".into(),
        name: "test".into(),
        description: String::new(),
        version: 1,
        nodes,
        edges: Vec::<Edge>::new(),
        variables: Default::default(),
        inputs: None,
        outputs: None,
        settings: WorkflowSettings::default(),
    }
}

fn instance(workflow: &Workflow) -> WorkflowInstance {
    let clock = FakeClock::new(chrono::Utc::now());
    WorkflowInstance::new(&clock, oj_core::InstanceId::new("inst-1"), workflow.id.as_str())
}

fn fake_ctx<'a>(clock: &'a FakeClock, invoker: &'a FakeInvoker) -> ExecutionContext<'a> {
    ExecutionContext { clock, llm: invoker }
}

#[tokio::test]
async fn start_and_end_are_noop_done() {
    let clock = FakeClock::new(chrono::Utc::now());
    let invoker = FakeInvoker { response: InvokeResponse::default() };
    let ctx = fake_ctx(&clock, &invoker);
    let wf = workflow(vec![node("start", NodeConfig::Start)]);
    let inst = instance(&wf);
    let outcome = execute_node(&ctx, CancellationToken::new(), &wf, &inst, &wf.nodes[0]).await;
    assert!(matches!(outcome, NodeOutcome::Done(Value::Null)));
}

#[tokio::test]
async fn task_node_invokes_llm_and_parses_output() {
    let clock = FakeClock::new(chrono::Utc::now());
    let invoker = FakeInvoker {
        response: InvokeResponse {
            text: "```json\n{\"answer\": 42}\n```".into(),
            session_id: Some("sess-1".into()),
            cost_usd: None,
        },
    };
    let ctx = fake_ctx(&clock, &invoker);
    let task = node(
        "t1",
        NodeConfig::Task {
            persona: None,
            prompt: "say hi".into(),
            model: None,
            retry: Default::default(),
            stream: false,
        },
    );
    let wf = workflow(vec![task.clone()]);
    let inst = instance(&wf);
    let outcome = execute_node(&ctx, CancellationToken::new(), &wf, &inst, &task).await;
    match outcome {
        NodeOutcome::Done(Value::Object(map)) => {
            assert_eq!(map.get("answer"), Some(&Value::from(42)));
        }
        other => panic!("expected structured done output, got {other:?}"),
    }
}

#[tokio::test]
async fn task_prompt_interpolates_variables() {
    let clock = FakeClock::new(chrono::Utc::now());
    let invoker = FakeInvoker { response: InvokeResponse { text: "ok".into(), session_id: None, cost_usd: None } };
    let ctx = fake_ctx(&clock, &invoker);
    let task = node(
        "t1",
        NodeConfig::Task {
            persona: None,
            prompt: "hello {{variables.name}}".into(),
            model: None,
            retry: Default::default(),
            stream: false,
        },
    );
    let mut wf = workflow(vec![task.clone()]);
    wf.variables.insert("name".into(), Value::String("world".into()));
    let inst = instance(&wf);
    let outcome = execute_node(&ctx, CancellationToken::new(), &wf, &inst, &task).await;
    assert!(matches!(outcome, NodeOutcome::Done(_)));
}

#[tokio::test]
async fn human_node_waits() {
    let clock = FakeClock::new(chrono::Utc::now());
    let invoker = FakeInvoker { response: InvokeResponse::default() };
    let ctx = fake_ctx(&clock, &invoker);
    let wf = workflow(vec![node("h", NodeConfig::Human { prompt: "approve?".into() })]);
    let inst = instance(&wf);
    let outcome = execute_node(&ctx, CancellationToken::new(), &wf, &inst, &wf.nodes[0]).await;
    assert!(matches!(outcome, NodeOutcome::Waiting));
}

#[tokio::test]
async fn delay_node_schedules_resume_in_the_future() {
    let base = chrono::Utc::now();
    let clock = FakeClock::new(base);
    let invoker = FakeInvoker { response: InvokeResponse::default() };
    let ctx = fake_ctx(&clock, &invoker);
    let wf = workflow(vec![node("d", NodeConfig::Delay { value: 5.0, unit: DelayUnit::M })]);
    let inst = instance(&wf);
    let outcome = execute_node(&ctx, CancellationToken::new(), &wf, &inst, &wf.nodes[0]).await;
    match outcome {
        NodeOutcome::ScheduleResume(at) => assert_eq!(at, base + chrono::Duration::minutes(5)),
        other => panic!("expected ScheduleResume, got {other:?}"),
    }
}

#[tokio::test]
async fn switch_node_selects_matching_case() {
    let clock = FakeClock::new(chrono::Utc::now());
    let invoker = FakeInvoker { response: InvokeResponse::default() };
    let ctx = fake_ctx(&clock, &invoker);
    let wf = workflow(vec![node(
        "sw",
        NodeConfig::Switch {
            expression: "variables.choice".into(),
            cases: vec![oj_core::workflow::SwitchCase { value: Value::from("b"), target: NodeId::new("branch-b") }],
            default: Some(NodeId::new("branch-default")),
        },
    )]);
    let mut inst = instance(&wf);
    inst.variables.insert("choice".into(), Value::from("b"));
    let outcome = execute_node(&ctx, CancellationToken::new(), &wf, &inst, &wf.nodes[0]).await;
    match outcome {
        NodeOutcome::Done(Value::Object(map)) => assert_eq!(map.get("selected"), Some(&Value::from("branch-b"))),
        other => panic!("expected selected branch, got {other:?}"),
    }
}

#[tokio::test]
async fn switch_node_falls_back_to_default() {
    let clock = FakeClock::new(chrono::Utc::now());
    let invoker = FakeInvoker { response: InvokeResponse::default() };
    let ctx = fake_ctx(&clock, &invoker);
    let wf = workflow(vec![node(
        "sw",
        NodeConfig::Switch {
            expression: "variables.choice".into(),
            cases: vec![oj_core::workflow::SwitchCase { value: Value::from("b"), target: NodeId::new("branch-b") }],
            default: Some(NodeId::new("branch-default")),
        },
    )]);
    let mut inst = instance(&wf);
    inst.variables.insert("choice".into(), Value::from("z"));
    let outcome = execute_node(&ctx, CancellationToken::new(), &wf, &inst, &wf.nodes[0]).await;
    match outcome {
        NodeOutcome::Done(Value::Object(map)) => assert_eq!(map.get("selected"), Some(&Value::from("branch-default"))),
        other => panic!("expected default branch, got {other:?}"),
    }
}

#[tokio::test]
async fn assign_node_resolves_expression_values() {
    let clock = FakeClock::new(chrono::Utc::now());
    let invoker = FakeInvoker { response: InvokeResponse::default() };
    let ctx = fake_ctx(&clock, &invoker);
    let wf = workflow(vec![node(
        "a",
        NodeConfig::Assign {
            assignments: vec![oj_core::workflow::Assignment { path: "total".into(), value: Value::from("1 + 2"), is_expression: true }],
        },
    )]);
    let inst = instance(&wf);
    let outcome = execute_node(&ctx, CancellationToken::new(), &wf, &inst, &wf.nodes[0]).await;
    match outcome {
        NodeOutcome::Done(Value::Object(map)) => {
            let assignments = map.get("assignments").unwrap().as_array().unwrap();
            assert_eq!(assignments[0].get("value"), Some(&Value::from(3)));
        }
        other => panic!("expected assignments, got {other:?}"),
    }
}

#[tokio::test]
async fn foreach_collection_must_be_a_sequence() {
    let clock = FakeClock::new(chrono::Utc::now());
    let invoker = FakeInvoker { response: InvokeResponse::default() };
    let ctx = fake_ctx(&clock, &invoker);
    let wf = workflow(vec![node(
        "fe",
        NodeConfig::Foreach {
            collection: "variables.items".into(),
            item_var: "item".into(),
            index_var: None,
            body: NodeId::new("body"),
            mode: ForeachMode::Sequential,
            max_parallel: None,
        },
    )]);
    let mut inst = instance(&wf);
    inst.variables.insert("items".into(), Value::from("not-a-list"));
    let outcome = execute_node(&ctx, CancellationToken::new(), &wf, &inst, &wf.nodes[0]).await;
    assert!(matches!(outcome, NodeOutcome::Failed(_)));
}

#[tokio::test]
async fn loop_while_continues_when_condition_holds() {
    let clock = FakeClock::new(chrono::Utc::now());
    let invoker = FakeInvoker { response: InvokeResponse::default() };
    let ctx = fake_ctx(&clock, &invoker);
    let wf = workflow(vec![node(
        "lp",
        NodeConfig::Loop {
            mode: LoopMode::While,
            condition: Some("variables.n < 3".into()),
            count: None,
            body: NodeId::new("body"),
            max_iterations: 1000,
        },
    )]);
    let mut inst = instance(&wf);
    inst.variables.insert("n".into(), Value::from(1));
    let outcome = execute_node(&ctx, CancellationToken::new(), &wf, &inst, &wf.nodes[0]).await;
    match outcome {
        NodeOutcome::Done(Value::Object(map)) => assert_eq!(map.get("continue"), Some(&Value::Bool(true))),
        other => panic!("expected continue=true, got {other:?}"),
    }
}

#[test]
fn build_eval_context_aliases_hyphenated_node_ids() {
    let clock = FakeClock::new(chrono::Utc::now());
    let wf = workflow(vec![node("my-node", NodeConfig::Start)]);
    let mut inst = instance(&wf);
    inst.outputs.insert("my-node".into(), Value::from("ok"));
    let ctx = build_eval_context(&clock, &wf, &inst, &[]);
    let outputs = ctx.get("outputs").unwrap();
    assert_eq!(outputs.get("my_node"), Some(&Value::from("ok")));
    assert_eq!(outputs.get("my-node"), Some(&Value::from("ok")));
}
