use std::{
    hint::black_box,
    io,
    sync::{Arc, OnceLock},
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, warn};
use rand::Rng;

use crate::config::TaskConfig;
use crate::models::{
    message::WorkerSignal,
    task::{Task, TaskState},
};

pub fn thread_name(task_id: u64) -> String {
    format!("task-{}", task_id)
}

/// Starts the thread that drives `task`. The thread stores its kernel thread
/// id in `native_id` before doing anything else.
pub fn spawn_worker_thread(
    task: Arc<Task>,
    config: TaskConfig,
    signals: Receiver<WorkerSignal>,
    native_id: Arc<OnceLock<u64>>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(thread_name(task.id()))
        .spawn(move || {
            if let Some(tid) = native_thread_id() {
                let _ = native_id.set(tid);
            }
            let outcome = run_task(&task, &config, &signals);
            info!("Task '{}' ended: {:?}", task.id(), outcome);
        })
}

/// Runs the step loop on the calling thread and returns the terminal state.
///
/// Cancellation is only checked at the top of each step; a cancel that lands
/// during the computation is seen through the interrupt signal at the
/// following delay, or at the next step boundary.
pub fn run_task(task: &Task, config: &TaskConfig, signals: &Receiver<WorkerSignal>) -> TaskState {
    task.start();
    let mut rng = rand::thread_rng();
    let mut total: u64 = 0;

    for step in 1..=config.steps {
        if !task.enter_step(step, config.steps) {
            info!("Task '{}' cancelled at step {}.", task.id(), step);
            return TaskState::Cancelled;
        }

        let bound = if config.work_bounds.is_empty() {
            config.work_bounds.start
        } else {
            rng.gen_range(config.work_bounds.clone())
        };
        total = total.saturating_add(sum_to(bound));
        debug!("Task '{}' step {}: summed to {}.", task.id(), step, bound);

        task.set_waiting(true);
        let woken = signals.recv_timeout(config.step_delay);
        task.set_waiting(false);

        match woken {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(WorkerSignal::Interrupt) => {
                info!("Task '{}' interrupted at step {}.", task.id(), step);
                task.interrupt();
                return TaskState::Interrupted;
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Task '{}' lost its manager, stopping.", task.id());
                task.interrupt();
                return TaskState::Interrupted;
            }
        }
    }

    let outcome = task.complete(config.steps, total);
    if outcome == TaskState::Cancelled {
        info!("Task '{}' cancelled after its last step.", task.id());
    }
    outcome
}

fn sum_to(bound: u64) -> u64 {
    (1..=bound).fold(0u64, |acc, j| black_box(acc.wrapping_add(j)))
}

#[cfg(target_os = "linux")]
fn native_thread_id() -> Option<u64> {
    let tid = unsafe { libc::syscall(libc::SYS_gettid) };
    u64::try_from(tid).ok()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn native_thread_id() -> Option<u64> {
    Some(unsafe { libc::pthread_self() } as usize as u64)
}

#[cfg(not(unix))]
fn native_thread_id() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossbeam_channel::bounded;

    use super::*;
    use crate::models::task::NO_RESULT;

    fn fixed_config(steps: u32, delay_ms: u64) -> TaskConfig {
        TaskConfig {
            steps,
            step_delay: Duration::from_millis(delay_ms),
            work_bounds: 10..11,
        }
    }

    #[test]
    fn completes_all_steps_with_accumulated_sum() {
        let task = Task::new(1);
        let (_tx, rx) = bounded(1);

        let outcome = run_task(&task, &fixed_config(3, 1), &rx);

        assert_eq!(outcome, TaskState::Completed);
        assert_eq!(task.status(), "completed");
        // 1..=10 sums to 55, three times.
        assert_eq!(task.result(), "Task Task-1 finished. Sum total: 165");
        assert!(!task.is_working());
        assert!(!task.is_waiting());
    }

    #[test]
    fn cancelled_before_first_step_produces_no_result() {
        let task = Task::new(1);
        let (_tx, rx) = bounded(1);
        task.cancel();

        let outcome = run_task(&task, &fixed_config(15, 1), &rx);

        assert_eq!(outcome, TaskState::Cancelled);
        assert_eq!(task.status(), "cancelled at step 1");
        assert_eq!(task.result(), NO_RESULT);
        assert!(task.is_finished());
        assert!(!task.is_working());
    }

    #[test]
    fn pending_interrupt_ends_the_first_delay() {
        let task = Task::new(2);
        let (tx, rx) = bounded(1);
        tx.send(WorkerSignal::Interrupt).unwrap();

        let outcome = run_task(&task, &fixed_config(15, 60_000), &rx);

        assert_eq!(outcome, TaskState::Interrupted);
        assert_eq!(task.status(), "interrupted");
        assert!(!task.has_result());
        assert!(!task.is_working());
    }

    #[test]
    fn disconnected_channel_counts_as_interrupt() {
        let task = Task::new(4);
        let (tx, rx) = bounded::<WorkerSignal>(1);
        drop(tx);

        let outcome = run_task(&task, &fixed_config(15, 60_000), &rx);

        assert_eq!(outcome, TaskState::Interrupted);
        assert_eq!(task.result(), NO_RESULT);
    }

    #[test]
    fn empty_work_bounds_use_the_lower_bound() {
        let task = Task::new(5);
        let (_tx, rx) = bounded(1);
        let config = TaskConfig {
            steps: 1,
            step_delay: Duration::from_millis(1),
            work_bounds: 4..4,
        };

        run_task(&task, &config, &rx);

        assert_eq!(task.result(), "Task Task-5 finished. Sum total: 10");
    }

    #[test]
    fn spawned_thread_is_named_after_task() {
        let task = Arc::new(Task::new(9));
        let (_tx, rx) = bounded(1);
        let native_id = Arc::new(OnceLock::new());

        let handle = spawn_worker_thread(
            Arc::clone(&task),
            fixed_config(1, 1),
            rx,
            Arc::clone(&native_id),
        )
        .unwrap();

        assert_eq!(handle.thread().name(), Some("task-9"));
        handle.join().unwrap();
        assert_eq!(task.state(), TaskState::Completed);
        #[cfg(unix)]
        assert!(native_id.get().is_some());
    }
}
