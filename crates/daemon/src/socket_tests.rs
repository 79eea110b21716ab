use super::*;
use oj_core::task::TaskOutput;
use oj_core::{FakeClock, Task, TaskPriority, TaskSource, TaskStatus};
use oj_storage::FsStoreIo;

const LINEAR_TOML: &str = r#"
name = "linear"

[nodes.start]
type = "start"
next = [{ to = "end" }]

[nodes.end]
type = "end"
"#;

fn server(dir: &std::path::Path) -> ControlServer {
    let io: Arc<dyn oj_storage::StoreIo> = Arc::new(FsStoreIo);
    let task_store = Arc::new(TaskStore::new(dir.join("tasks"), Arc::clone(&io)));
    let queue = Arc::new(QueueStore::new(dir.join("queue.json"), dir.join("queue.json.lock"), Arc::clone(&io)));
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::default());
    let supervisor = Arc::new(Supervisor::new(dir.to_path_buf(), Arc::clone(&task_store), Arc::clone(&io), Arc::clone(&clock)));
    ControlServer::new(dir.join("daemon.sock"), dir.to_path_buf(), task_store, queue, supervisor, clock)
}

fn seed_task(server: &ControlServer, task_id: &str) {
    let id = TaskId::new(task_id.to_string());
    let now = server.clock.now();
    let task = Task {
        id,
        title: "a task".into(),
        description: String::new(),
        priority: TaskPriority::default(),
        status: TaskStatus::Pending,
        retry_count: 0,
        source: TaskSource::User,
        created_at: now,
        updated_at: now,
        workflow_id: None,
        output: TaskOutput::default(),
    };
    server.task_store.save_task(&task).unwrap();
}

#[test]
fn workflow_create_persists_workflow_instance_and_enqueues_the_start_node() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(dir.path());
    seed_task(&server, "task-1");

    let result = server.workflow_create("task-1", LINEAR_TOML, "toml").unwrap();
    assert!(result.get("instance_id").is_some());

    let id = TaskId::new("task-1".to_string());
    let instance = server.task_store.get_instance(&id).unwrap().expect("instance saved");
    assert_eq!(instance.workflow_id, "task-1");

    let job = server
        .queue
        .list_waiting()
        .unwrap()
        .into_iter()
        .find(|j| j.data.instance_id == instance.id.to_string())
        .expect("start job enqueued");
    assert_eq!(job.data.node_id, "start");
}

#[test]
fn workflow_status_reports_not_found_for_a_task_with_no_instance() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(dir.path());
    seed_task(&server, "task-2");

    let err = server.workflow_status("task-2").unwrap_err();
    assert!(matches!(err, OjError::NotFound(_)));
}

#[test]
fn task_pause_updates_status_without_touching_the_process_record() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(dir.path());
    seed_task(&server, "task-3");

    server.task_pause("task-3").unwrap();

    let id = TaskId::new("task-3".to_string());
    let task = server.task_store.get_task(&id).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Paused);
}

#[test]
fn self_check_reports_no_orphans_when_nothing_has_been_spawned() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(dir.path());

    let result = server.self_check().unwrap();
    assert_eq!(result["orphaned_tasks"], serde_json::json!([]));
}
