//! Application state for the web layer.

use std::sync::Arc;

use crate::booking::{BookingFlow, FlowSettings};
use crate::domain::Topology;
use crate::store::{Clock, MemoryStore, SessionDraftStore};

/// The booking pipeline as the server runs it.
pub type Flow = BookingFlow<MemoryStore, SessionDraftStore>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Booking pipeline
    pub flow: Flow,

    /// Document store behind the pipeline, shared with the delivery sweep
    pub store: Arc<MemoryStore>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        store: Arc<MemoryStore>,
        drafts: SessionDraftStore,
        topology: Topology,
        clock: Arc<dyn Clock>,
        settings: FlowSettings,
    ) -> Self {
        let flow = BookingFlow::new(
            Arc::clone(&store),
            Arc::new(drafts),
            Arc::new(topology),
            clock,
            settings,
        );
        Self { flow, store }
    }
}
