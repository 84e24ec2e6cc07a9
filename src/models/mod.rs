pub mod message;
pub mod task;
