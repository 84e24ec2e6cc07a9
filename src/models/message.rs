/// Sent from the manager to a worker thread over its private channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerSignal {
    /// Wake the worker out of its step delay and stop it.
    Interrupt,
}
