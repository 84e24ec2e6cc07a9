use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, OnceLock,
    },
    thread::JoinHandle,
};

use crossbeam_channel::{bounded, Sender, TrySendError};
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::config::TaskConfig;
use crate::error::ManagerError;
use crate::models::{
    message::WorkerSignal,
    task::{Task, TaskSnapshot, TaskState},
};
use crate::worker::worker::spawn_worker_thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    New,
    Runnable,
    TimedWaiting,
    Terminated,
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ThreadState::New => "NEW",
            ThreadState::Runnable => "RUNNABLE",
            ThreadState::TimedWaiting => "TIMED_WAITING",
            ThreadState::Terminated => "TERMINATED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub task_id: u64,
    pub name: String,
    /// Kernel thread id, once the thread has recorded it.
    pub native_id: Option<u64>,
    pub alive: bool,
    pub state: ThreadState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub id: u64,
    pub name: String,
    pub result: String,
}

/// A worker thread together with the task it drives and the channel used to
/// wake it.
struct WorkerHandle {
    task: Arc<Task>,
    handle: JoinHandle<()>,
    interrupt: Sender<WorkerSignal>,
    native_id: Arc<OnceLock<u64>>,
}

impl WorkerHandle {
    fn task_id(&self) -> u64 {
        self.task.id()
    }

    fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }

    fn interrupt(&self) {
        match self.interrupt.try_send(WorkerSignal::Interrupt) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                debug!("Worker for task '{}' already gone.", self.task_id());
            }
        }
    }

    fn info(&self) -> ThreadInfo {
        let alive = self.is_alive();
        let state = if !alive {
            ThreadState::Terminated
        } else if self.task.state() == TaskState::NotStarted {
            ThreadState::New
        } else if self.task.is_waiting() {
            ThreadState::TimedWaiting
        } else {
            ThreadState::Runnable
        };

        ThreadInfo {
            task_id: self.task_id(),
            name: self.handle.thread().name().unwrap_or("<unnamed>").to_string(),
            native_id: self.native_id.get().copied(),
            alive,
            state,
        }
    }
}

#[derive(Default)]
struct Registry {
    tasks: HashMap<u64, Arc<Task>>,
    /// In creation order.
    workers: Vec<WorkerHandle>,
}

/// Owns every task and the thread running it. Tasks are never removed.
pub struct TaskManager {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
    config: TaskConfig,
}

impl TaskManager {
    pub fn new(config: TaskConfig) -> Self {
        TaskManager {
            registry: Mutex::new(Registry::default()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Starts `count` tasks and returns their ids in creation order. If a
    /// spawn fails, the ids started before it come back in the error.
    pub fn start_tasks(&self, count: usize) -> Result<Vec<u64>, ManagerError> {
        let mut started = Vec::with_capacity(count);
        for _ in 0..count {
            match self.start_single_task() {
                Ok(id) => started.push(id),
                Err(source) => {
                    return Err(ManagerError::PartialStart {
                        started,
                        source: Box::new(source),
                    })
                }
            }
        }
        Ok(started)
    }

    pub fn start_single_task(&self) -> Result<u64, ManagerError> {
        // Held across id allocation and push so `workers` stays in id order.
        let mut registry = self.registry.lock();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let task = Arc::new(Task::new(id));
        let (sender, receiver) = bounded(1);
        let native_id = Arc::new(OnceLock::new());

        let handle = spawn_worker_thread(
            Arc::clone(&task),
            self.config.clone(),
            receiver,
            Arc::clone(&native_id),
        )
        .map_err(|source| ManagerError::Spawn { id, source })?;

        registry.tasks.insert(id, Arc::clone(&task));
        registry.workers.push(WorkerHandle {
            task,
            handle,
            interrupt: sender,
            native_id,
        });
        info!("Task '{}' created.", id);
        Ok(id)
    }

    /// Snapshots of every task, ordered by id.
    pub fn list_tasks(&self) -> Vec<TaskSnapshot> {
        let registry = self.registry.lock();
        let mut tasks: Vec<TaskSnapshot> =
            registry.tasks.values().map(|task| task.snapshot()).collect();
        tasks.sort_by_key(|task| task.id);
        tasks
    }

    pub fn get_task(&self, id: u64) -> Option<Arc<Task>> {
        self.registry.lock().tasks.get(&id).cloned()
    }

    pub fn task_result(&self, id: u64) -> Result<TaskResult, ManagerError> {
        let task = self.get_task(id).ok_or(ManagerError::NotFound(id))?;
        Ok(TaskResult {
            id,
            name: task.name().to_string(),
            result: task.result(),
        })
    }

    /// Flags the task as cancelled and wakes its thread if it is in its
    /// step delay. A thread busy computing stops at its next delay or step.
    pub fn cancel_task(&self, id: u64) -> Result<(), ManagerError> {
        let registry = self.registry.lock();
        let task = registry.tasks.get(&id).ok_or(ManagerError::NotFound(id))?;
        if !task.try_cancel() {
            return Err(ManagerError::AlreadyFinished(id));
        }

        match registry.workers.iter().find(|worker| worker.task_id() == id) {
            Some(worker) => worker.interrupt(),
            None => warn!("Task '{}' has no worker thread.", id),
        }
        info!("Task '{}' cancelled.", id);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn task_count(&self) -> usize {
        self.registry.lock().tasks.len()
    }

    /// Number of thread handles ever recorded, alive or not.
    pub fn thread_count(&self) -> usize {
        self.registry.lock().workers.len()
    }

    /// Threads that have not terminated yet, in creation order.
    pub fn active_threads(&self) -> Vec<ThreadInfo> {
        self.registry
            .lock()
            .workers
            .iter()
            .filter(|worker| worker.is_alive())
            .map(WorkerHandle::info)
            .collect()
    }
}
