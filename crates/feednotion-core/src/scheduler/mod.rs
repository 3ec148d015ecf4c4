mod service;
pub mod tasks;

pub use service::{JobRunner, JobState};
pub use tasks::{process_feed, EntryFailure, Pipeline, RunReport, Stage};
