use parking_lot::Mutex;

/// Returned by [`Task::result`] while no result exists.
pub const NO_RESULT: &str = "No result (task not finished)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    NotStarted,
    Running,
    Completed,
    Cancelled,
    Interrupted,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Cancelled | TaskState::Interrupted
        )
    }
}

/// Consistent copy of a task's fields, taken under a single lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: u64,
    pub name: String,
    pub state: TaskState,
    pub status: String,
    pub working: bool,
    pub finished: bool,
    pub result: Option<String>,
}

#[derive(Debug)]
struct TaskInner {
    state: TaskState,
    status: String,
    result: Option<String>,
    cancelled: bool,
    working: bool,
    waiting: bool,
}

impl TaskInner {
    fn is_finished(&self) -> bool {
        self.result.is_some() || self.cancelled
    }
}

/// A unit of simulated work. Shared between the manager and the worker thread
/// that drives it; every field behind the lock changes only under it.
#[derive(Debug)]
pub struct Task {
    id: u64,
    name: String,
    inner: Mutex<TaskInner>,
}

impl Task {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: format!("Task-{}", id),
            inner: Mutex::new(TaskInner {
                state: TaskState::NotStarted,
                status: "not started".to_string(),
                result: None,
                cancelled: false,
                working: false,
                waiting: false,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requests cancellation. Idempotent; the worker notices at its next step.
    pub fn cancel(&self) {
        self.inner.lock().cancelled = true;
    }

    /// Sets the cancel flag only if the task has not finished yet. The check
    /// and the write happen under one lock, so a task that completes
    /// concurrently keeps its result.
    pub fn try_cancel(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.is_finished() {
            return false;
        }
        inner.cancelled = true;
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    /// True once the task has a result or has been cancelled.
    pub fn is_finished(&self) -> bool {
        self.inner.lock().is_finished()
    }

    pub fn status(&self) -> String {
        self.inner.lock().status.clone()
    }

    /// The completion message, or [`NO_RESULT`].
    pub fn result(&self) -> String {
        self.inner
            .lock()
            .result
            .clone()
            .unwrap_or_else(|| NO_RESULT.to_string())
    }

    #[cfg(test)]
    pub(crate) fn has_result(&self) -> bool {
        self.inner.lock().result.is_some()
    }

    pub fn is_working(&self) -> bool {
        self.inner.lock().working
    }

    /// True while the worker sits in its step delay.
    pub fn is_waiting(&self) -> bool {
        self.inner.lock().waiting
    }

    pub fn state(&self) -> TaskState {
        self.inner.lock().state
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let inner = self.inner.lock();
        TaskSnapshot {
            id: self.id,
            name: self.name.clone(),
            state: inner.state,
            status: inner.status.clone(),
            working: inner.working,
            finished: inner.is_finished(),
            result: inner.result.clone(),
        }
    }

    pub(crate) fn start(&self) {
        let mut inner = self.inner.lock();
        inner.state = TaskState::Running;
        inner.working = true;
        inner.status = "in progress".to_string();
    }

    /// Checks the cancel flag and, if clear, records the new step.
    /// Returns `false` after moving the task to `Cancelled`.
    pub(crate) fn enter_step(&self, step: u32, steps: u32) -> bool {
        let mut inner = self.inner.lock();
        if inner.cancelled {
            inner.state = TaskState::Cancelled;
            inner.status = format!("cancelled at step {}", step);
            inner.working = false;
            return false;
        }
        inner.status = format!("running step {}/{}", step, steps);
        true
    }

    pub(crate) fn set_waiting(&self, waiting: bool) {
        self.inner.lock().waiting = waiting;
    }

    pub(crate) fn interrupt(&self) {
        let mut inner = self.inner.lock();
        inner.state = TaskState::Interrupted;
        inner.status = "interrupted".to_string();
        inner.working = false;
        inner.waiting = false;
    }

    /// Stores the result after the last step, unless a cancel landed after
    /// that step's check. Returns the terminal state reached.
    pub(crate) fn complete(&self, steps: u32, total: u64) -> TaskState {
        let mut inner = self.inner.lock();
        inner.working = false;
        inner.waiting = false;
        if inner.cancelled {
            inner.state = TaskState::Cancelled;
            inner.status = format!("cancelled at step {}", steps);
            return TaskState::Cancelled;
        }
        inner.result = Some(format!("Task {} finished. Sum total: {}", self.name, total));
        inner.state = TaskState::Completed;
        inner.status = "completed".to_string();
        TaskState::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_idle_and_unfinished() {
        let task = Task::new(7);

        assert_eq!(task.id(), 7);
        assert_eq!(task.name(), "Task-7");
        assert_eq!(task.state(), TaskState::NotStarted);
        assert_eq!(task.status(), "not started");
        assert_eq!(task.result(), NO_RESULT);
        assert!(!task.is_working());
        assert!(!task.is_finished());
    }

    #[test]
    fn cancel_is_idempotent_and_finishes_task() {
        let task = Task::new(1);
        task.cancel();
        task.cancel();

        assert!(task.is_cancelled());
        assert!(task.is_finished());
        assert!(!task.has_result());
    }

    #[test]
    fn try_cancel_refuses_finished_tasks() {
        let completed = Task::new(1);
        completed.start();
        completed.complete(1, 10);
        assert!(!completed.try_cancel());
        assert!(!completed.is_cancelled());

        let running = Task::new(2);
        running.start();
        assert!(running.try_cancel());
        assert!(!running.try_cancel());
    }

    #[test]
    fn enter_step_observes_cancellation() {
        let task = Task::new(1);
        task.start();
        assert!(task.enter_step(1, 15));
        assert_eq!(task.status(), "running step 1/15");

        task.cancel();
        assert!(!task.enter_step(2, 15));

        let snapshot = task.snapshot();
        assert_eq!(snapshot.state, TaskState::Cancelled);
        assert_eq!(snapshot.status, "cancelled at step 2");
        assert!(!snapshot.working);
        assert!(snapshot.finished);
        assert_eq!(snapshot.result, None);
    }

    #[test]
    fn complete_sets_result_once_running_stops() {
        let task = Task::new(3);
        task.start();
        assert!(task.is_working());

        assert_eq!(task.complete(15, 42), TaskState::Completed);

        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(task.status(), "completed");
        assert_eq!(task.result(), "Task Task-3 finished. Sum total: 42");
        assert!(task.is_finished());
        assert!(!task.is_working());
    }

    #[test]
    fn cancel_after_last_step_check_keeps_result_empty() {
        let task = Task::new(1);
        task.start();
        assert!(task.enter_step(15, 15));
        assert!(task.try_cancel());

        assert_eq!(task.complete(15, 123), TaskState::Cancelled);

        let snapshot = task.snapshot();
        assert_eq!(snapshot.state, TaskState::Cancelled);
        assert_eq!(snapshot.status, "cancelled at step 15");
        assert_eq!(snapshot.result, None);
        assert!(snapshot.finished);
        assert!(!snapshot.working);
        assert_eq!(task.result(), NO_RESULT);
    }

    #[test]
    fn terminal_states() {
        assert!(!TaskState::NotStarted.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());
        assert!(TaskState::Interrupted.is_terminal());
    }
}
