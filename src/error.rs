use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Task {0} not found")]
    NotFound(u64),

    #[error("Cannot cancel task {0} (already finished)")]
    AlreadyFinished(u64),

    #[error("Failed to spawn worker thread for task {id}: {source}")]
    Spawn {
        id: u64,
        #[source]
        source: io::Error,
    },

    #[error("{source}")]
    PartialStart {
        started: Vec<u64>,
        #[source]
        source: Box<ManagerError>,
    },
}
