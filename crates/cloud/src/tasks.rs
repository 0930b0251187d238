//! Export task bookkeeping shared by the bundled stores.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{CloudError, Result};
use crate::service::{ExportRequest, TaskId, TaskState};

struct TaskEntry {
    /// Taken when the task starts
    request: Option<ExportRequest>,
    state: TaskState,
}

/// Created export tasks and their states.
pub(crate) struct TaskRegistry {
    prefix: &'static str,
    next: AtomicU64,
    tasks: Mutex<BTreeMap<TaskId, TaskEntry>>,
}

impl TaskRegistry {
    pub(crate) fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(1),
            tasks: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<TaskId, TaskEntry>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new task in the `READY` state.
    pub(crate) fn register(&self, request: ExportRequest) -> TaskId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let id = TaskId(format!("{}_{:04}", self.prefix, n));
        self.lock().insert(
            id.clone(),
            TaskEntry {
                request: Some(request),
                state: TaskState::Ready,
            },
        );
        id
    }

    /// Move a `READY` task to `RUNNING`, handing back its request.
    pub(crate) fn begin(&self, id: &TaskId) -> Result<ExportRequest> {
        let mut tasks = self.lock();
        let entry = tasks
            .get_mut(id)
            .ok_or_else(|| CloudError::task(id.0.clone(), "unknown task"))?;
        if entry.state != TaskState::Ready {
            return Err(CloudError::task(
                id.0.clone(),
                format!("cannot start task in state {}", entry.state),
            ));
        }
        let request = entry
            .request
            .take()
            .ok_or_else(|| CloudError::task(id.0.clone(), "task has no export request"))?;
        entry.state = TaskState::Running;
        Ok(request)
    }

    pub(crate) fn set_state(&self, id: &TaskId, state: TaskState) {
        if let Some(entry) = self.lock().get_mut(id) {
            entry.state = state;
        }
    }

    pub(crate) fn state(&self, id: &TaskId) -> Result<TaskState> {
        self.lock()
            .get(id)
            .map(|entry| entry.state.clone())
            .ok_or_else(|| CloudError::task(id.0.clone(), "unknown task"))
    }
}
