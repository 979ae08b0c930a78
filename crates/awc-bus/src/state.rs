//! Shared state handed to every route handler.

use std::sync::Arc;

use awc_core::store::Store;
use awc_queue::WorkQueue;

use crate::event_bus::EventBus;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<Store>,
    pub queue: Arc<WorkQueue>,
    pub bus: Arc<EventBus>,
    pub bearer_token: Arc<String>,
    pub ping_secs: u64,
}

impl ApiState {
    pub fn new(
        store: Arc<Store>,
        queue: Arc<WorkQueue>,
        bus: Arc<EventBus>,
        bearer_token: impl Into<String>,
        ping_secs: u64,
    ) -> Self {
        Self {
            store,
            queue,
            bus,
            bearer_token: Arc::new(bearer_token.into()),
            ping_secs,
        }
    }
}
