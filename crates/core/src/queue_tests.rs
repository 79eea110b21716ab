use super::*;

#[test]
fn status_transitions_follow_forward_only_path() {
    assert!(JobStatus::Waiting.can_transition_to(JobStatus::Running));
    assert!(JobStatus::Running.can_transition_to(JobStatus::Completed));
    assert!(JobStatus::Running.can_transition_to(JobStatus::HumanWaiting));
    assert!(!JobStatus::Completed.can_transition_to(JobStatus::Running));
    assert!(!JobStatus::Waiting.can_transition_to(JobStatus::Completed));
}

#[test]
fn failed_job_can_be_requeued() {
    assert!(JobStatus::Failed.can_transition_to(JobStatus::Waiting));
}

#[test]
fn conflicts_with_detects_same_slot() {
    let job = Job::new(
        QueueJobId::new("j1"),
        JobData {
            workflow_id: "wf".into(),
            instance_id: "i1".into(),
            node_id: "n1".into(),
            attempt: 1,
        },
        Utc::now(),
    );
    let other = JobData {
        workflow_id: "wf".into(),
        instance_id: "i1".into(),
        node_id: "n1".into(),
        attempt: 2,
    };
    assert!(job.conflicts_with(&other));
}

#[test]
fn terminal_job_does_not_conflict() {
    let mut job = Job::new(
        QueueJobId::new("j1"),
        JobData {
            workflow_id: "wf".into(),
            instance_id: "i1".into(),
            node_id: "n1".into(),
            attempt: 1,
        },
        Utc::now(),
    );
    job.status = JobStatus::Completed;
    let other = job.data.clone();
    assert!(!job.conflicts_with(&other));
}
