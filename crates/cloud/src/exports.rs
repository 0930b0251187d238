//! Export task records and the start-and-poll tracker.

use std::fmt;
use std::thread::sleep;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tracing::{debug, error, info, warn};

use crate::service::{ComputeService, TaskId, TaskState};

/// Default pause between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Lifecycle of one export, as reported back to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Planned in dry-run mode; never submitted
    MockCreated,
    /// A dry-run task passed through the tracker
    MockTaskSkipped,
    /// Registered with the executor, not yet started
    Created,
    Started,
    FailedToCreate,
    FailedToStart,
    FailedToGetStatus,
    /// Last state reported by the executor
    Remote(TaskState),
}

impl TaskStatus {
    /// Statuses the tracker never starts or polls
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::FailedToCreate | Self::FailedToStart | Self::MockCreated | Self::MockTaskSkipped
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MockCreated => f.write_str("mock_created"),
            Self::MockTaskSkipped => f.write_str("mock_task_skipped"),
            Self::Created => f.write_str("created"),
            Self::Started => f.write_str("started"),
            Self::FailedToCreate => f.write_str("failed_to_create"),
            Self::FailedToStart => f.write_str("failed_to_start"),
            Self::FailedToGetStatus => f.write_str("failed_to_get_status"),
            Self::Remote(state) => f.write_str(&state.as_str().to_lowercase()),
        }
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One monthly image export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportTask {
    /// Executor handle; `None` for dry-run and failed tasks
    pub task: Option<TaskId>,
    /// Image name
    pub image: String,
    /// Target asset path
    pub target: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportTask {
    pub fn mock(image: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            task: None,
            image: image.into(),
            target: target.into(),
            status: TaskStatus::MockCreated,
            error: None,
        }
    }

    pub fn created(id: TaskId, image: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            task: Some(id),
            image: image.into(),
            target: target.into(),
            status: TaskStatus::Created,
            error: None,
        }
    }

    pub fn failed_to_create(
        image: impl Into<String>,
        target: impl Into<String>,
        error: impl ToString,
    ) -> Self {
        Self {
            task: None,
            image: image.into(),
            target: target.into(),
            status: TaskStatus::FailedToCreate,
            error: Some(error.to_string()),
        }
    }

    fn fail(&mut self, status: TaskStatus, error: impl ToString) {
        self.status = status;
        self.error = Some(error.to_string());
    }
}

/// Start every startable task, then poll until all have finished.
///
/// Dry-run tasks become `mock_task_skipped`; failed tasks are left alone.
/// A status that cannot be read, or an unknown executor state, ends
/// tracking for that task. Sleeps `poll_interval` between rounds.
pub fn track_exports<S>(
    service: &S,
    mut tasks: Vec<ExportTask>,
    poll_interval: Duration,
) -> Vec<ExportTask>
where
    S: ComputeService + ?Sized,
{
    debug!(tasks = tasks.len(), "Starting export tasks");

    for task in tasks.iter_mut() {
        if task.status.is_skipped() {
            info!(image = %task.image, status = %task.status, "Skipping task");
            if task.status == TaskStatus::MockCreated {
                task.status = TaskStatus::MockTaskSkipped;
            }
            continue;
        }
        let Some(id) = task.task.clone() else {
            task.fail(TaskStatus::FailedToStart, "task has no executor handle");
            continue;
        };
        match service.start_task(&id) {
            Ok(()) => task.status = TaskStatus::Started,
            Err(e) => {
                error!(image = %task.image, target = %task.target, error = %e, "Failed to start task");
                task.fail(TaskStatus::FailedToStart, e);
            }
        }
    }

    let mut finished = vec![false; tasks.len()];
    loop {
        let mut unfinished = false;
        for (task, done) in tasks.iter_mut().zip(finished.iter_mut()) {
            if *done {
                continue;
            }
            if task.status.is_skipped() {
                *done = true;
                continue;
            }
            let Some(id) = task.task.clone() else {
                *done = true;
                continue;
            };

            match service.task_status(&id) {
                Ok(state) => {
                    task.status = TaskStatus::Remote(state.clone());
                    match state {
                        TaskState::Submitted | TaskState::Ready | TaskState::Running => {
                            unfinished = true;
                        }
                        TaskState::Completed
                        | TaskState::Failed
                        | TaskState::Cancelled
                        | TaskState::Unsubmitted => {
                            info!(image = %task.image, target = %task.target, status = %task.status, "Task finished");
                            *done = true;
                        }
                        TaskState::Other(_) => {
                            warn!(image = %task.image, target = %task.target, status = %task.status, "Task finished with unknown status");
                            *done = true;
                        }
                    }
                }
                Err(e) => {
                    error!(image = %task.image, error = %e, "Failed to get task status");
                    task.fail(TaskStatus::FailedToGetStatus, e);
                    *done = true;
                }
            }
        }

        if !unfinished {
            break;
        }
        sleep(poll_interval);
    }

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CloudError, Result};
    use crate::service::{AssetInfo, ExportRequest};
    use chrono::NaiveDate;
    use snowcover_core::series::{BandSet, RasterFrame, RasterSeries};
    use snowcover_core::vector::FeatureCollection;
    use std::collections::{BTreeMap, BTreeSet, VecDeque};
    use std::sync::Mutex;

    /// Executor whose tasks report a scripted sequence of states
    #[derive(Default)]
    struct ScriptedExecutor {
        scripts: Mutex<BTreeMap<String, VecDeque<Result<TaskState>>>>,
        started: Mutex<Vec<String>>,
        refuse_start: Vec<String>,
    }

    impl ScriptedExecutor {
        fn script(self, id: &str, states: Vec<Result<TaskState>>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(id.to_string(), states.into());
            self
        }
    }

    impl ComputeService for ScriptedExecutor {
        fn get_asset(&self, path: &str) -> Result<AssetInfo> {
            Err(CloudError::AssetNotFound(path.to_string()))
        }
        fn list_assets(&self, _: &str) -> Result<Vec<AssetInfo>> {
            Ok(Vec::new())
        }
        fn series_dates(&self, _: &str) -> Result<Vec<NaiveDate>> {
            Ok(Vec::new())
        }
        fn read_series(&self, _: &str, _: &BTreeSet<NaiveDate>) -> Result<RasterSeries<BandSet>> {
            Ok(RasterSeries::new())
        }
        fn read_image(&self, path: &str) -> Result<RasterFrame<BandSet>> {
            Err(CloudError::AssetNotFound(path.to_string()))
        }
        fn read_table(&self, path: &str) -> Result<FeatureCollection> {
            Err(CloudError::AssetNotFound(path.to_string()))
        }
        fn create_export(&self, request: ExportRequest) -> Result<TaskId> {
            Ok(TaskId(request.description))
        }
        fn start_task(&self, id: &TaskId) -> Result<()> {
            if self.refuse_start.contains(&id.0) {
                return Err(CloudError::task(id.0.clone(), "quota exceeded"));
            }
            self.started.lock().unwrap().push(id.0.clone());
            Ok(())
        }
        fn task_status(&self, id: &TaskId) -> Result<TaskState> {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.get_mut(&id.0).unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                match script.front().unwrap() {
                    Ok(state) => Ok(state.clone()),
                    Err(_) => Err(CloudError::task(id.0.clone(), "status unavailable")),
                }
            }
        }
    }

    fn created(id: &str) -> ExportTask {
        ExportTask::created(TaskId(id.to_string()), id, format!("out/{}", id))
    }

    #[test]
    fn test_polls_until_finished() {
        let executor = ScriptedExecutor::default()
            .script(
                "a",
                vec![
                    Ok(TaskState::Ready),
                    Ok(TaskState::Running),
                    Ok(TaskState::Completed),
                ],
            )
            .script("b", vec![Ok(TaskState::Failed)]);

        let out = track_exports(&executor, vec![created("a"), created("b")], Duration::ZERO);
        assert_eq!(out[0].status, TaskStatus::Remote(TaskState::Completed));
        assert_eq!(out[1].status, TaskStatus::Remote(TaskState::Failed));
        assert_eq!(*executor.started.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_skipped_statuses_not_started() {
        let executor = ScriptedExecutor::default();
        let tasks = vec![
            ExportTask::mock("m", "out/m"),
            ExportTask::failed_to_create("f", "out/f", "boom"),
        ];
        let out = track_exports(&executor, tasks, Duration::ZERO);
        assert_eq!(out[0].status, TaskStatus::MockTaskSkipped);
        assert_eq!(out[1].status, TaskStatus::FailedToCreate);
        assert_eq!(out[1].error.as_deref(), Some("boom"));
        assert!(executor.started.lock().unwrap().is_empty());
    }

    #[test]
    fn test_start_failure_recorded() {
        let executor = ScriptedExecutor {
            refuse_start: vec!["a".to_string()],
            ..Default::default()
        };
        let out = track_exports(&executor, vec![created("a")], Duration::ZERO);
        assert_eq!(out[0].status, TaskStatus::FailedToStart);
        assert_eq!(out[0].error.as_deref(), Some("task a: quota exceeded"));
    }

    #[test]
    fn test_status_failure_and_unknown_state_finish() {
        let executor = ScriptedExecutor::default()
            .script("a", vec![Err(CloudError::task("a", "gone"))])
            .script("b", vec![Ok(TaskState::Other("PAUSED".to_string()))]);
        let out = track_exports(&executor, vec![created("a"), created("b")], Duration::ZERO);
        assert_eq!(out[0].status, TaskStatus::FailedToGetStatus);
        assert!(out[0].error.is_some());
        assert_eq!(out[1].status.to_string(), "paused");
    }

    #[test]
    fn test_status_serializes_as_text() {
        let task = ExportTask::mock("img_2023_01", "out/img_2023_01");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "mock_created");
        assert!(json.get("error").is_none());
    }
}
