//! Application state management

use crate::scheduler::SchedulerHandle;
use fleet_sources::PushHandle;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Read side of the polling scheduler
    pub scheduler: SchedulerHandle,

    /// Ingest buffer, present only when the configured source is `push`
    pub push: Option<PushHandle>,
}

impl AppState {
    pub fn new(scheduler: SchedulerHandle, push: Option<PushHandle>) -> Self {
        Self { scheduler, push }
    }
}
