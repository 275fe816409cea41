//! Task board walkthrough: every store operation, with both error kinds
//! handled by the caller.
//!
//! Run with `RUST_LOG=debug cargo run --example task_board`.

use record_store::{
    DuplicateIdError, NotFoundError, Patch, Record, RecordStore, SharedRecordStore, StoreError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Record)]
struct Task {
    id: u32,
    title: String,
    status: TaskStatus,
    priority: Priority,
}

fn task(id: u32, title: &str, status: TaskStatus, priority: Priority) -> Task {
    Task {
        id,
        title: title.to_string(),
        status,
        priority,
    }
}

fn main() -> Result<(), StoreError<u32>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut board = RecordStore::with_capacity(4);
    board.insert(task(1, "Complete Homework", TaskStatus::Pending, Priority::High))?;
    board.insert(task(2, "Review PRs", TaskStatus::InProgress, Priority::Medium))?;
    board.insert(task(3, "Plan sprint", TaskStatus::Pending, Priority::Low))?;
    info!(count = board.len(), "board seeded");

    match board.insert(task(2, "Duplicate", TaskStatus::Pending, Priority::Low)) {
        Ok(()) => warn!("duplicate insert unexpectedly accepted"),
        Err(DuplicateIdError { id }) => info!(id, "duplicate insert rejected"),
    }

    let before = board.snapshot();

    let patch = TaskPatch::default().status(TaskStatus::Completed);
    debug!(empty = patch.is_empty(), "applying patch");
    let done = board.update(&1, patch)?;
    info!(id = done.id, status = ?done.status, "task updated");

    match board.remove(&42) {
        Ok(task) => warn!(id = task.id, "removed a task that should not exist"),
        Err(NotFoundError { id }) => info!(id, "nothing to remove"),
    }

    for task in board.filter(|t| t.status == TaskStatus::Pending) {
        info!(id = task.id, title = %task.title, "pending");
    }

    info!(
        before = %before.to_json()?,
        after = %board.snapshot().to_json()?,
        "snapshot unaffected by update"
    );

    let shared = SharedRecordStore::from(board);
    let worker = shared.clone();
    let handle = std::thread::spawn(move || {
        worker.upsert(task(4, "Ship release", TaskStatus::InProgress, Priority::High))
    });
    match handle.join() {
        Ok(result) => {
            result?;
        }
        Err(_) => warn!("worker thread panicked"),
    }

    let urgent = shared.count(|t| t.priority == Priority::High)?;
    info!(urgent, total = shared.len()?, "shared board");

    Ok(())
}
