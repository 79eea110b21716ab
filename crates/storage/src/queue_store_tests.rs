use super::*;
use crate::io::FsStoreIo;
use oj_core::{FakeClock, JobData};
use tempfile::tempdir;

fn store(dir: &std::path::Path) -> QueueStore {
    QueueStore::new(dir.join("queue.json"), dir.join("queue.json.lock"), Arc::new(FsStoreIo))
}

fn data(node: &str) -> JobData {
    JobData {
        workflow_id: "wf-1".into(),
        instance_id: "inst-1".into(),
        node_id: node.into(),
        attempt: 1,
    }
}

#[test]
fn enqueue_then_list_waiting() {
    let dir = tempdir().expect("tempdir");
    let store = store(dir.path());
    let clock = FakeClock::default();

    let job = store.enqueue(&clock, data("start")).expect("enqueue");
    let waiting = store.list_waiting().expect("list");
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].id, job.id);
}

#[test]
fn enqueue_rejects_conflicting_non_terminal_job() {
    let dir = tempdir().expect("tempdir");
    let store = store(dir.path());
    let clock = FakeClock::default();

    store.enqueue(&clock, data("start")).expect("first enqueue");
    let err = store.enqueue(&clock, data("start")).unwrap_err();
    assert!(matches!(err, OjError::InvalidState(_)));
}

#[test]
fn set_status_enforces_forward_only_transitions() {
    let dir = tempdir().expect("tempdir");
    let store = store(dir.path());
    let clock = FakeClock::default();
    let job = store.enqueue(&clock, data("start")).expect("enqueue");

    let running = store
        .set_status(&clock, &job.id, JobStatus::Running)
        .expect("waiting -> running");
    assert_eq!(running.status, JobStatus::Running);

    let err = store
        .set_status(&clock, &job.id, JobStatus::Waiting)
        .unwrap_err();
    assert!(matches!(err, OjError::InvalidState(_)));
}

#[test]
fn completed_job_frees_the_slot_for_a_new_job() {
    let dir = tempdir().expect("tempdir");
    let store = store(dir.path());
    let clock = FakeClock::default();
    let job = store.enqueue(&clock, data("start")).expect("enqueue");
    store.set_status(&clock, &job.id, JobStatus::Running).expect("run");
    store
        .set_status(&clock, &job.id, JobStatus::Completed)
        .expect("complete");

    let second = store.enqueue(&clock, data("start")).expect("re-enqueue");
    assert_ne!(second.id, job.id);
}

#[test]
fn concurrent_enqueues_produce_no_lost_updates() {
    let dir = tempdir().expect("tempdir");
    let queue_path = dir.path().join("queue.json");
    let lock_path = dir.path().join("queue.json.lock");
    let store = Arc::new(QueueStore::new(queue_path, lock_path, Arc::new(FsStoreIo)));
    let clock = FakeClock::default();

    let workers = 3;
    let ops = 10;
    let handles: Vec<_> = (0..workers)
        .map(|w| {
            let store = Arc::clone(&store);
            let clock = clock.clone();
            std::thread::spawn(move || {
                for i in 0..ops {
                    store
                        .enqueue(&clock, data(&format!("node-{w}-{i}")))
                        .expect("enqueue");
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("join");
    }

    assert_eq!(store.all().expect("all").len(), workers * ops);
}
